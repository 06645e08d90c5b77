use tracing::{debug, info, warn};
use vastu_config::LayoutConfig;
use vastu_core::geometry::{Point2, Rect};

use crate::adjacency;
use crate::errors::{Diagnostic, LayoutError};
use crate::model::{
    CompassZone, Compliance, ComplianceLevel, Layout, PlacedRoom, Plot, RoomRequirement,
    validate_requirements,
};
use crate::openings;
use crate::zones::ZoneMap;

/// 中心区对应的放宽级数。
pub const CENTER_STAGE: usize = CompassZone::RING_HOPS + 1;
/// 放宽到整个地块的级数。
pub const OPEN_PLOT_STAGE: usize = CompassZone::RING_HOPS + 2;

const SCORE_EPSILON: f64 = 1e-9;
const MIN_RANK_WEIGHT: f64 = 0.05;

/// 房间所属的搜索区域。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegionRef {
    Zone(CompassZone),
    Plot,
}

#[derive(Debug, Clone)]
pub(crate) struct Placement {
    pub rect: Rect,
    pub region: RegionRef,
    pub compliance: Compliance,
    reference: Option<Point2>,
    weight: f64,
}

impl Placement {
    /// 按当前矩形重新计算分数；修复阶段只在原区域内移动，方位与级别不变。
    fn rescore(&mut self, config: &LayoutConfig, diagonal: f64) {
        self.compliance.score = zone_score(config, &self.rect, self.reference, self.weight, diagonal);
    }
}

/// `weight × (1 − distance_weight × d / diagonal)`，无参考点时即为权重。
fn zone_score(
    config: &LayoutConfig,
    rect: &Rect,
    reference: Option<Point2>,
    weight: f64,
    diagonal: f64,
) -> f64 {
    match reference {
        Some(reference) => {
            let distance = rect.distance_to_point(reference);
            weight * (1.0 - config.distance_weight * distance / diagonal)
        }
        None => weight,
    }
}

/// 放置与修复阶段共享的只读几何上下文。
pub(crate) struct SearchSpace<'a> {
    pub plot: &'a Plot,
    pub zones: &'a ZoneMap,
    pub config: &'a LayoutConfig,
    plot_rect: Option<Rect>,
}

impl<'a> SearchSpace<'a> {
    pub fn new(plot: &'a Plot, zones: &'a ZoneMap, config: &'a LayoutConfig) -> Self {
        Self {
            plot,
            zones,
            config,
            plot_rect: plot.as_rect(config.tolerance),
        }
    }

    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.config.tolerance
    }

    pub fn region_bounds(&self, region: RegionRef) -> Rect {
        match region {
            RegionRef::Zone(zone) => self.zones.region(zone).bounds(),
            RegionRef::Plot => self.plot.bounds_rect(),
        }
    }

    /// 矩形是否位于地块以及指定区域之内。
    pub fn region_contains(&self, region: RegionRef, rect: &Rect) -> bool {
        let tolerance = self.tolerance();
        let inside_plot = match self.plot_rect {
            Some(plot_rect) => plot_rect.contains_rect(rect, tolerance),
            None => self.plot.boundary().contains_rect(rect, tolerance),
        };
        inside_plot
            && match region {
                RegionRef::Zone(zone) => self.zones.region(zone).contains_rect(rect, tolerance),
                RegionRef::Plot => true,
            }
    }

    pub fn touches_excluded(&self, requirement: &RoomRequirement, rect: &Rect) -> bool {
        requirement
            .excluded_zones
            .iter()
            .any(|zone| self.zones.region(*zone).overlaps_rect(rect, self.tolerance()))
    }

    /// 面积与长宽比是否满足需求。
    pub fn fits(&self, requirement: &RoomRequirement, rect: &Rect) -> bool {
        let tolerance = self.tolerance();
        let area = rect.area();
        let aspect = rect.aspect_ratio();
        area >= requirement.min_area - tolerance
            && area <= requirement.resolved_max_area(self.config.area_growth) + tolerance
            && aspect >= requirement.min_aspect - tolerance
            && aspect <= requirement.resolved_max_aspect(self.config.default_max_aspect) + tolerance
    }
}

/// 搜索阶段中的一个候选区域。
#[derive(Debug, Clone, Copy)]
struct StageEntry {
    region: RegionRef,
    zone: Option<CompassZone>,
    reference: Option<Point2>,
    weight: f64,
    level: ComplianceLevel,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    rect: Rect,
    score: f64,
    order: usize,
    entry: StageEntry,
}

impl Candidate {
    /// 排序：分数高者优先，其次面积大，再按区域顺序，最后按 (y, x) 较小。
    fn beats(&self, other: &Candidate, tolerance: f64) -> bool {
        if (self.score - other.score).abs() > SCORE_EPSILON {
            return self.score > other.score;
        }
        let (area, other_area) = (self.rect.area(), other.rect.area());
        if (area - other_area).abs() > tolerance {
            return area > other_area;
        }
        if self.order != other.order {
            return self.order < other.order;
        }
        let (y, other_y) = (self.rect.min().y(), other.rect.min().y());
        if (y - other_y).abs() > tolerance {
            return y < other_y;
        }
        self.rect.min().x() < other.rect.min().x() - tolerance
    }
}

/// 贪心式布局优化器：按优先级逐个放置房间，必要时逐级放宽方位。
#[derive(Debug, Clone, Default)]
pub struct LayoutOptimizer {
    config: LayoutConfig,
}

impl LayoutOptimizer {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn with_strictness(mut self, strictness: f64) -> Self {
        self.config.strictness = strictness.clamp(0.0, 1.0);
        self
    }

    #[inline]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// 严格度允许的最大放宽级数：`round((1 - strictness) × OPEN_PLOT_STAGE)`。
    pub fn max_stage(&self) -> usize {
        let strictness = self.config.strictness.clamp(0.0, 1.0);
        ((1.0 - strictness) * OPEN_PLOT_STAGE as f64).round() as usize
    }

    pub fn optimize(
        &self,
        plot: &Plot,
        requirements: &[RoomRequirement],
    ) -> Result<Layout, LayoutError> {
        plot.validate()?;
        validate_requirements(requirements)?;

        let required: f64 = requirements.iter().map(|room| room.min_area).sum();
        let available = plot.area();
        if required > available + self.config.tolerance {
            warn!(required, available, "房间最小面积之和超过地块面积");
            return Err(LayoutError::PlotTooSmall {
                required,
                available,
            });
        }

        info!(
            rooms = requirements.len(),
            plot_area = available,
            strictness = self.config.strictness,
            "开始布局"
        );

        let zones = ZoneMap::build(plot, &self.config);
        let space = SearchSpace::new(plot, &zones, &self.config);

        let mut slots: Vec<Option<Placement>> = vec![None; requirements.len()];
        let mut placed: Vec<Rect> = Vec::with_capacity(requirements.len());
        for index in placement_order(requirements) {
            let requirement = &requirements[index];
            let Some(placement) = self.place(&space, requirement, &placed) else {
                warn!(room = %requirement.name, "房间无可行位置");
                return Err(LayoutError::PlacementInfeasible {
                    room: requirement.name.clone(),
                });
            };
            debug!(
                room = %requirement.name,
                zone = ?placement.compliance.zone,
                level = ?placement.compliance.level,
                score = placement.compliance.score,
                "房间已放置"
            );
            placed.push(placement.rect);
            slots[index] = Some(placement);
        }
        let mut placements: Vec<Placement> = slots.into_iter().flatten().collect();

        let unsatisfied = adjacency::repair(&space, requirements, &mut placements);
        let diagonal = plot.diagonal().max(f64::EPSILON);
        for placement in &mut placements {
            placement.rescore(&self.config, diagonal);
        }

        let rects: Vec<Rect> = placements.iter().map(|placement| placement.rect).collect();
        let doors = openings::assign_doors(plot, &rects, requirements, &self.config);

        let mut diagnostics = Vec::new();
        let mut rooms = Vec::with_capacity(placements.len());
        for (index, (placement, door)) in placements.into_iter().zip(doors).enumerate() {
            let requirement = requirements[index].clone();
            if placement.compliance.level.is_degraded() {
                diagnostics.push(Diagnostic::Degraded {
                    room: requirement.name.clone(),
                    zone: placement.compliance.zone,
                });
            }
            let unsatisfied_adjacency: Vec<String> = unsatisfied
                .iter()
                .filter(|(room, _)| *room == index)
                .map(|(_, target)| requirements[*target].name.clone())
                .collect();
            for target in &unsatisfied_adjacency {
                diagnostics.push(Diagnostic::AdjacencyUnsatisfied {
                    room: requirement.name.clone(),
                    target: target.clone(),
                });
            }
            if door.is_none() {
                diagnostics.push(Diagnostic::NoDoorway {
                    room: requirement.name.clone(),
                });
            }
            let walls = openings::build_walls(
                plot,
                &placement.rect,
                self.config.wall_thickness,
                self.config.tolerance,
            );
            rooms.push(PlacedRoom {
                index,
                requirement,
                rect: placement.rect,
                compliance: placement.compliance,
                walls,
                openings: door.into_iter().collect(),
                unsatisfied_adjacency,
            });
        }

        let layout = Layout {
            plot: plot.clone(),
            rooms,
            diagnostics,
            wall_thickness: self.config.wall_thickness,
        };
        info!(
            degraded = layout.rooms.iter().filter(|room| room.is_degraded()).count(),
            diagnostics = layout.diagnostics.len(),
            mean_score = layout.mean_score(),
            "布局完成"
        );
        Ok(layout)
    }

    fn place(
        &self,
        space: &SearchSpace<'_>,
        requirement: &RoomRequirement,
        placed: &[Rect],
    ) -> Option<Placement> {
        for stage in self.stages(space, requirement) {
            if let Some(candidate) = self.best_in_stage(space, requirement, &stage, placed) {
                let entry = candidate.entry;
                return Some(Placement {
                    rect: candidate.rect,
                    region: entry.region,
                    compliance: Compliance {
                        zone: entry.zone,
                        level: entry.level,
                        score: candidate.score,
                    },
                    reference: entry.reference,
                    weight: entry.weight,
                });
            }
            debug!(room = %requirement.name, "当前阶段无候选，继续放宽");
        }
        None
    }

    /// 按放宽顺序生成搜索阶段：首选方位、环上逐跳邻居、中心、整个地块。
    fn stages(&self, space: &SearchSpace<'_>, requirement: &RoomRequirement) -> Vec<Vec<StageEntry>> {
        if !requirement.is_zoned() {
            return vec![vec![StageEntry {
                region: RegionRef::Plot,
                zone: None,
                reference: None,
                weight: 1.0,
                level: ComplianceLevel::Unzoned,
            }]];
        }

        let zones = space.zones;
        let config = &self.config;
        let mut tried: Vec<CompassZone> = Vec::new();
        let mut stages = Vec::new();

        let preferred: Vec<StageEntry> = requirement
            .preferred_zones
            .iter()
            .enumerate()
            .map(|(rank, pref)| StageEntry {
                region: RegionRef::Zone(pref.zone),
                zone: Some(pref.zone),
                reference: Some(zones.reference_point(pref.zone)),
                weight: pref
                    .weight
                    .unwrap_or((1.0 - config.rank_decay * rank as f64).max(MIN_RANK_WEIGHT)),
                level: ComplianceLevel::Preferred { rank },
            })
            .collect();
        tried.extend(requirement.preferred_zones.iter().map(|pref| pref.zone));
        stages.push(preferred);

        let max_stage = self.max_stage();
        let relaxed_entry = |zone: CompassZone, hops: usize, tried: &mut Vec<CompassZone>| {
            if tried.contains(&zone) || requirement.excluded_zones.contains(&zone) {
                return None;
            }
            tried.push(zone);
            Some(StageEntry {
                region: RegionRef::Zone(zone),
                zone: Some(zone),
                reference: Some(zones.reference_point(zone)),
                weight: config.relaxed_weight / hops as f64,
                level: ComplianceLevel::Relaxed { hops },
            })
        };

        for hops in 1..=CompassZone::RING_HOPS.min(max_stage) {
            let mut entries = Vec::new();
            for pref in &requirement.preferred_zones {
                let neighbours: Vec<CompassZone> = if pref.zone == CompassZone::Center {
                    if hops == 1 {
                        CompassZone::RING.to_vec()
                    } else {
                        Vec::new()
                    }
                } else {
                    vec![pref.zone.clockwise(hops as i32), pref.zone.clockwise(-(hops as i32))]
                };
                entries.extend(
                    neighbours
                        .into_iter()
                        .filter_map(|zone| relaxed_entry(zone, hops, &mut tried)),
                );
            }
            stages.push(entries);
        }

        if max_stage >= CENTER_STAGE {
            stages.push(
                relaxed_entry(CompassZone::Center, CENTER_STAGE, &mut tried)
                    .into_iter()
                    .collect(),
            );
        }

        if max_stage >= OPEN_PLOT_STAGE {
            let anchor = requirement
                .preferred_zones
                .first()
                .map(|pref| zones.reference_point(pref.zone));
            stages.push(vec![StageEntry {
                region: RegionRef::Plot,
                zone: None,
                reference: anchor,
                weight: config.relaxed_weight / OPEN_PLOT_STAGE as f64,
                level: ComplianceLevel::OpenPlot,
            }]);
        }
        stages
    }

    fn best_in_stage(
        &self,
        space: &SearchSpace<'_>,
        requirement: &RoomRequirement,
        stage: &[StageEntry],
        placed: &[Rect],
    ) -> Option<Candidate> {
        let tolerance = space.tolerance();
        let diagonal = space.plot.diagonal().max(f64::EPSILON);
        let mut best: Option<Candidate> = None;

        for (order, entry) in stage.iter().enumerate() {
            let bounds = space.region_bounds(entry.region);
            let anchor = entry.reference.unwrap_or(bounds.min());
            self.for_each_candidate(space, requirement, bounds, anchor, placed, |rect| {
                if !space.region_contains(entry.region, &rect)
                    || placed
                        .iter()
                        .any(|other| other.overlaps_interior(&rect, tolerance))
                    || space.touches_excluded(requirement, &rect)
                {
                    return;
                }
                let score = zone_score(&self.config, &rect, entry.reference, entry.weight, diagonal);
                let candidate = Candidate {
                    rect,
                    score,
                    order,
                    entry: *entry,
                };
                if best
                    .as_ref()
                    .is_none_or(|current| candidate.beats(current, tolerance))
                {
                    best = Some(candidate);
                }
            });
        }
        best
    }

    /// 在区域边界、等分线与已放置房间边界构成的网格上枚举容器矩形，
    /// 并从每个容器中截取满足面积与长宽比的最大矩形。
    fn for_each_candidate(
        &self,
        space: &SearchSpace<'_>,
        requirement: &RoomRequirement,
        bounds: Rect,
        anchor: Point2,
        placed: &[Rect],
        mut visit: impl FnMut(Rect),
    ) {
        let tolerance = space.tolerance();
        let resolution = self.config.search_resolution;
        let plot_vertices = space.plot.boundary().vertices();
        let edges: Vec<Rect> = placed
            .iter()
            .copied()
            .chain(space.zones.regions().map(|region| region.bounds()))
            .collect();
        let xs = axis_stops(
            bounds.min().x(),
            bounds.max().x(),
            resolution,
            edges
                .iter()
                .flat_map(|rect| [rect.min().x(), rect.max().x()])
                .chain(plot_vertices.iter().map(|p| p.x())),
            tolerance,
        );
        let ys = axis_stops(
            bounds.min().y(),
            bounds.max().y(),
            resolution,
            edges
                .iter()
                .flat_map(|rect| [rect.min().y(), rect.max().y()])
                .chain(plot_vertices.iter().map(|p| p.y())),
            tolerance,
        );

        let min_area = requirement.min_area;
        let max_area = requirement.resolved_max_area(self.config.area_growth);
        let max_aspect = requirement.resolved_max_aspect(self.config.default_max_aspect);
        for (i, &x0) in xs.iter().enumerate() {
            for &x1 in &xs[i + 1..] {
                for (k, &y0) in ys.iter().enumerate() {
                    for &y1 in &ys[k + 1..] {
                        let container = Rect::new(x0, y0, x1, y1);
                        if container.area() < min_area - tolerance {
                            continue;
                        }
                        let Some((width, height)) = fit_extent(
                            container.width(),
                            container.height(),
                            min_area,
                            max_area,
                            requirement.min_aspect,
                            max_aspect,
                            tolerance,
                        ) else {
                            continue;
                        };
                        visit(anchor_in(&container, width, height, anchor));
                    }
                }
            }
        }
    }
}

/// 放置顺序：有方位要求者优先，其次最小面积大者，再按优先级数字小者，最后按原始下标。
pub fn placement_order(requirements: &[RoomRequirement]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..requirements.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (&requirements[a], &requirements[b]);
        rb.is_zoned()
            .cmp(&ra.is_zoned())
            .then_with(|| rb.min_area.total_cmp(&ra.min_area))
            .then_with(|| ra.priority.cmp(&rb.priority))
            .then_with(|| a.cmp(&b))
    });
    order
}

fn axis_stops(
    lo: f64,
    hi: f64,
    resolution: u32,
    extra: impl IntoIterator<Item = f64>,
    tolerance: f64,
) -> Vec<f64> {
    let mut stops = vec![lo, hi];
    let step = (hi - lo) / f64::from(resolution.max(1));
    stops.extend((1..resolution).map(|i| lo + step * f64::from(i)));
    stops.extend(
        extra
            .into_iter()
            .filter(|value| *value > lo + tolerance && *value < hi - tolerance),
    );
    stops.sort_by(f64::total_cmp);
    stops.dedup_by(|a, b| (*a - *b).abs() <= tolerance);
    stops
}

/// 在 `width × height` 的容器内求满足长宽比与面积上限的最大尺寸。
fn fit_extent(
    width: f64,
    height: f64,
    min_area: f64,
    max_area: f64,
    min_aspect: f64,
    max_aspect: f64,
    tolerance: f64,
) -> Option<(f64, f64)> {
    let (mut w, mut h) = (width, height);
    if w > h * max_aspect {
        w = h * max_aspect;
    } else if h > w * max_aspect {
        h = w * max_aspect;
    }
    if w.max(h) < w.min(h) * min_aspect - tolerance {
        if w >= h {
            h = w / min_aspect;
        } else {
            w = h / min_aspect;
        }
    }
    let area = w * h;
    if area > max_area {
        let factor = (max_area / area).sqrt();
        w *= factor;
        h *= factor;
    }
    if w * h < min_area - tolerance || w <= tolerance || h <= tolerance {
        None
    } else {
        Some((w, h))
    }
}

/// 把 `width × height` 矩形放在容器中离 `anchor` 最近的角上。
fn anchor_in(container: &Rect, width: f64, height: f64, anchor: Point2) -> Rect {
    let mut nearest = container.min();
    let mut nearest_distance = f64::INFINITY;
    for corner in container.corners() {
        let distance = corner.distance_to(anchor);
        if distance < nearest_distance - 1e-12 {
            nearest = corner;
            nearest_distance = distance;
        }
    }
    let x0 = if (nearest.x() - container.min().x()).abs() <= f64::EPSILON {
        container.min().x()
    } else {
        container.max().x() - width
    };
    let y0 = if (nearest.y() - container.min().y()).abs() <= f64::EPSILON {
        container.min().y()
    } else {
        container.max().y() - height
    };
    Rect::new(x0, y0, x0 + width, y0 + height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardinalSide, RoomCategory};
    use vastu_core::geometry::{Point2, Polygon, TOLERANCE};

    fn assert_layout_invariants(layout: &Layout) {
        let plot_rect = layout.plot.bounds_rect();
        for (i, room) in layout.rooms.iter().enumerate() {
            assert!(
                layout.plot.boundary().contains_rect(&room.rect, 1e-6),
                "{} 超出地块 {:?}",
                room.name(),
                plot_rect
            );
            assert!(room.area() >= room.requirement.min_area - 1e-6);
            for other in &layout.rooms[i + 1..] {
                assert!(
                    !room.rect.overlaps_interior(&other.rect, 1e-6),
                    "{} 与 {} 重叠",
                    room.name(),
                    other.name()
                );
            }
        }
    }

    fn house_program() -> Vec<RoomRequirement> {
        vec![
            RoomRequirement::new("Living", RoomCategory::Living, 16.0).prefer(CompassZone::NorthEast),
            RoomRequirement::new("Kitchen", RoomCategory::Kitchen, 9.0).prefer(CompassZone::SouthEast),
            RoomRequirement::new("Master Bedroom", RoomCategory::MasterBedroom, 14.0)
                .prefer(CompassZone::SouthWest),
            RoomRequirement::new("Bedroom", RoomCategory::Bedroom, 12.0)
                .prefer(CompassZone::SouthWest)
                .prefer(CompassZone::South)
                .prefer(CompassZone::West),
            RoomRequirement::new("Dining", RoomCategory::Dining, 9.0).prefer(CompassZone::West),
            RoomRequirement::new("Toilet", RoomCategory::Toilet, 4.0).prefer(CompassZone::NorthWest),
            RoomRequirement::new("Pooja", RoomCategory::Pooja, 2.0)
                .prefer(CompassZone::NorthEast)
                .prefer(CompassZone::East),
        ]
    }

    #[test]
    fn kitchen_lands_in_south_east_with_full_score() {
        let plot = Plot::rectangle(10.0, 8.0).with_entry(CardinalSide::South);
        let rooms = vec![
            RoomRequirement::new("Kitchen", RoomCategory::Kitchen, 9.0)
                .prefer(CompassZone::SouthEast)
                .entrance(),
        ];
        let layout = LayoutOptimizer::default()
            .optimize(&plot, &rooms)
            .expect("单个厨房应可放置");

        let kitchen = layout.room("Kitchen").expect("厨房存在");
        let zones = ZoneMap::build(&plot, &LayoutConfig::default());
        assert!(zones
            .region(CompassZone::SouthEast)
            .contains_rect(&kitchen.rect, TOLERANCE));
        assert!(kitchen.rect.min().x() >= 5.0 - 1e-9 && kitchen.rect.max().y() <= 4.0 + 1e-9);
        assert!(kitchen.area() >= 9.0);
        assert_eq!(kitchen.compliance.zone, Some(CompassZone::SouthEast));
        assert_eq!(kitchen.compliance.level, ComplianceLevel::Preferred { rank: 0 });
        assert!((kitchen.compliance.score - 1.0).abs() < 1e-9);
        assert!(!layout.is_degraded());
        assert!(layout.diagnostics.is_empty(), "{:?}", layout.diagnostics);
    }

    #[test]
    fn second_north_room_is_relaxed_to_a_neighbour() {
        let plot = Plot::rectangle(10.0, 8.0);
        let rooms = vec![
            RoomRequirement::new("Study", RoomCategory::Study, 5.0).prefer(CompassZone::North),
            RoomRequirement::new("Reading", RoomCategory::Study, 4.0).prefer(CompassZone::North),
        ];
        let layout = LayoutOptimizer::default()
            .optimize(&plot, &rooms)
            .expect("第二个房间应被放宽而不是失败");
        assert_layout_invariants(&layout);

        let study = layout.room("Study").expect("Study 存在");
        assert_eq!(study.compliance.zone, Some(CompassZone::North));
        assert_eq!(study.compliance.level, ComplianceLevel::Preferred { rank: 0 });

        let reading = layout.room("Reading").expect("Reading 存在");
        assert!(matches!(
            reading.compliance.zone,
            Some(CompassZone::NorthEast) | Some(CompassZone::NorthWest)
        ));
        assert_eq!(reading.compliance.level, ComplianceLevel::Relaxed { hops: 1 });
        assert!(reading.is_degraded());
        assert!(reading.compliance.score < study.compliance.score);
        assert!(layout.diagnostics.iter().any(|diag| matches!(
            diag,
            Diagnostic::Degraded { room, .. } if room == "Reading"
        )));
    }

    #[test]
    fn full_strictness_refuses_to_relax() {
        let plot = Plot::rectangle(10.0, 8.0);
        let rooms = vec![
            RoomRequirement::new("Study", RoomCategory::Study, 5.0).prefer(CompassZone::North),
            RoomRequirement::new("Reading", RoomCategory::Study, 4.0).prefer(CompassZone::North),
        ];
        let err = LayoutOptimizer::default()
            .with_strictness(1.0)
            .optimize(&plot, &rooms)
            .expect_err("严格模式下不应放宽");
        assert_eq!(
            err,
            LayoutError::PlacementInfeasible {
                room: "Reading".to_string()
            }
        );
    }

    #[test]
    fn oversized_program_fails_before_placement() {
        let plot = Plot::rectangle(3.0, 3.0);
        let rooms = vec![RoomRequirement::new("Hall", RoomCategory::Living, 20.0)];
        let err = LayoutOptimizer::default()
            .optimize(&plot, &rooms)
            .expect_err("面积不足");
        match err {
            LayoutError::PlotTooSmall {
                required,
                available,
            } => {
                assert!((required - 20.0).abs() < 1e-9);
                assert!((available - 9.0).abs() < 1e-9);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unreachable_adjacency_is_reported_not_fatal() {
        let plot = Plot::rectangle(10.0, 8.0);
        let rooms = vec![
            RoomRequirement::new("Kitchen", RoomCategory::Kitchen, 9.0).prefer(CompassZone::SouthEast),
            RoomRequirement::new("Store", RoomCategory::Store, 4.0)
                .prefer(CompassZone::NorthWest)
                .must_touch("Kitchen"),
        ];
        let layout = LayoutOptimizer::default()
            .optimize(&plot, &rooms)
            .expect("相邻失败不应导致布局失败");
        assert_layout_invariants(&layout);
        assert!(layout.diagnostics.contains(&Diagnostic::AdjacencyUnsatisfied {
            room: "Store".to_string(),
            target: "Kitchen".to_string(),
        }));
        let store = layout.room("Store").expect("Store 存在");
        assert_eq!(store.unsatisfied_adjacency, vec!["Kitchen".to_string()]);
    }

    #[test]
    fn repaired_rooms_are_rescored_at_their_final_position() {
        let plot = Plot::rectangle(10.0, 8.0);
        let rooms = vec![
            RoomRequirement::new("Kitchen", RoomCategory::Kitchen, 4.0)
                .prefer(CompassZone::SouthEast)
                .with_max_area(5.0),
            RoomRequirement::new("Dining", RoomCategory::Dining, 2.0)
                .prefer(CompassZone::South)
                .with_max_area(3.0)
                .must_touch("Kitchen"),
        ];
        let config = LayoutConfig::default();
        let layout = LayoutOptimizer::new(config.clone())
            .optimize(&plot, &rooms)
            .expect("小户型应可布局");
        assert_layout_invariants(&layout);

        let zones = ZoneMap::build(&plot, &config);
        let diagonal = plot.diagonal();
        for room in &layout.rooms {
            let zone = room.compliance.zone.expect("两个房间都有方位");
            assert!(zones.region(zone).contains_rect(&room.rect, 1e-6));
            let rank = room.requirement.rank_of(zone).expect("应落在首选方位");
            let weight = (1.0 - config.rank_decay * rank as f64).max(MIN_RANK_WEIGHT);
            let distance = room.rect.distance_to_point(zones.reference_point(zone));
            let expected = weight * (1.0 - config.distance_weight * distance / diagonal);
            assert!(
                (room.compliance.score - expected).abs() < 1e-9,
                "{} 的分数 {} 与位置不符，应为 {expected}",
                room.name(),
                room.compliance.score
            );
        }
    }

    #[test]
    fn house_program_respects_invariants() {
        let plot = Plot::rectangle(12.0, 15.0);
        let rooms = house_program();
        let layout = LayoutOptimizer::default()
            .optimize(&plot, &rooms)
            .expect("常规住宅应可布置");
        assert_eq!(layout.rooms.len(), rooms.len());
        for (index, room) in layout.rooms.iter().enumerate() {
            assert_eq!(room.index, index);
            assert_eq!(room.name(), rooms[index].name);
            assert_eq!(room.walls.len(), 4);
        }
        assert_layout_invariants(&layout);
        let living = layout.room("Living").expect("Living 存在");
        assert_eq!(living.compliance.zone, Some(CompassZone::NorthEast));
    }

    #[test]
    fn identical_input_gives_identical_layout() {
        let plot = Plot::rectangle(12.0, 15.0).with_north_angle(10.0);
        let rooms = house_program();
        let optimizer = LayoutOptimizer::default();
        let first = optimizer.optimize(&plot, &rooms).expect("第一次布局");
        let second = optimizer.optimize(&plot, &rooms).expect("第二次布局");
        assert_eq!(first, second);
        let first_json = serde_json::to_string(&first).expect("序列化");
        let second_json = serde_json::to_string(&second).expect("序列化");
        assert_eq!(first_json, second_json);
    }

    #[test]
    fn unzoned_rooms_are_not_degraded() {
        let plot = Plot::rectangle(10.0, 8.0);
        let rooms = vec![RoomRequirement::new("Gym", RoomCategory::Other, 6.0)];
        let layout = LayoutOptimizer::default()
            .optimize(&plot, &rooms)
            .expect("无方位房间应放在地块内");
        let gym = &layout.rooms[0];
        assert_eq!(gym.compliance.level, ComplianceLevel::Unzoned);
        assert!(!gym.is_degraded());
        assert!(!layout.is_degraded());
    }

    #[test]
    fn excluded_zones_are_avoided() {
        let plot = Plot::rectangle(10.0, 8.0);
        let rooms = vec![
            RoomRequirement::new("Store", RoomCategory::Store, 30.0)
                .exclude(CompassZone::NorthEast)
                .exclude(CompassZone::Center),
        ];
        let layout = LayoutOptimizer::default()
            .optimize(&plot, &rooms)
            .expect("应避开禁止方位放置");
        let zones = ZoneMap::build(&plot, &LayoutConfig::default());
        let store = &layout.rooms[0];
        assert!(!zones
            .region(CompassZone::NorthEast)
            .overlaps_rect(&store.rect, TOLERANCE));
        assert!(!zones
            .region(CompassZone::Center)
            .overlaps_rect(&store.rect, TOLERANCE));
    }

    #[test]
    fn polygon_plots_use_wedges() {
        let plot = Plot::new(Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(14.0, 0.0),
            Point2::new(14.0, 8.0),
            Point2::new(7.0, 13.0),
            Point2::new(0.0, 8.0),
        ]));
        let rooms = vec![
            RoomRequirement::new("Kitchen", RoomCategory::Kitchen, 8.0).prefer(CompassZone::SouthEast),
            RoomRequirement::new("Master Bedroom", RoomCategory::MasterBedroom, 10.0)
                .prefer(CompassZone::SouthWest),
        ];
        let layout = LayoutOptimizer::default()
            .optimize(&plot, &rooms)
            .expect("多边形地块应可布置");
        assert_layout_invariants(&layout);
        let kitchen = layout.room("Kitchen").expect("厨房存在");
        assert_eq!(kitchen.compliance.zone, Some(CompassZone::SouthEast));
        assert!(kitchen.rect.centroid().x() > 7.0);
    }

    #[test]
    fn placement_order_prefers_zoned_and_large_rooms() {
        let rooms = vec![
            RoomRequirement::new("Gym", RoomCategory::Other, 30.0),
            RoomRequirement::new("Toilet", RoomCategory::Toilet, 4.0).prefer(CompassZone::NorthWest),
            RoomRequirement::new("Living", RoomCategory::Living, 16.0).prefer(CompassZone::NorthEast),
            RoomRequirement::new("Pooja", RoomCategory::Pooja, 4.0)
                .prefer(CompassZone::NorthEast)
                .with_priority(1),
        ];
        assert_eq!(placement_order(&rooms), vec![2, 3, 1, 0]);
    }

    #[test]
    fn fit_extent_honours_bounds() {
        let (w, h) = fit_extent(4.0, 3.2, 9.0, 13.5, 1.0, 2.5, 1e-9).expect("应有可行尺寸");
        assert!((w - 4.0).abs() < 1e-12 && (h - 3.2).abs() < 1e-12);

        let (w, h) = fit_extent(10.0, 2.0, 4.0, 100.0, 1.0, 2.0, 1e-9).expect("长宽比裁剪后可行");
        assert!((w - 4.0).abs() < 1e-12 && (h - 2.0).abs() < 1e-12);

        let (w, h) = fit_extent(6.0, 6.0, 4.0, 9.0, 1.0, 2.0, 1e-9).expect("面积上限裁剪后可行");
        assert!((w * h - 9.0).abs() < 1e-9);

        assert!(fit_extent(1.0, 8.0, 6.0, 10.0, 1.0, 2.0, 1e-9).is_none());
    }
}
