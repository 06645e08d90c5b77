use tracing::{debug, warn};
use vastu_core::geometry::Rect;

use crate::model::RoomRequirement;
use crate::optimizer::{Placement, SearchSpace};

/// 两个矩形共享的边界长度是否达到 `min_length`。
pub fn touches(a: &Rect, b: &Rect, min_length: f64, tolerance: f64) -> bool {
    a.shared_boundary(b, tolerance)
        .is_some_and(|(_, segment)| segment.length() >= min_length - tolerance)
}

/// 需求中列出的相邻关系（房间下标, 目标下标），按需求顺序展开。
pub fn adjacency_pairs(requirements: &[RoomRequirement]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (index, requirement) in requirements.iter().enumerate() {
        for target in &requirement.adjacent_to {
            if let Some(target_index) = requirements
                .iter()
                .position(|other| other.name.eq_ignore_ascii_case(target))
            {
                pairs.push((index, target_index));
            }
        }
    }
    pairs
}

/// 逐对修复"必须相邻"要求，返回仍未满足的 (房间, 目标) 列表。
///
/// 依次尝试：拉伸房间贴合目标；平移房间贴合目标；在目标自身区域内移动目标后再拉伸/平移。
/// 每次移动都必须留在房间原区域内、不产生重叠，并保持已满足的其他相邻关系。
pub(crate) fn repair(
    space: &SearchSpace<'_>,
    requirements: &[RoomRequirement],
    placements: &mut [Placement],
) -> Vec<(usize, usize)> {
    let pairs = adjacency_pairs(requirements);
    let mut unsatisfied = Vec::new();
    let repairer = Repairer {
        space,
        requirements,
        pairs: &pairs,
    };

    for &(room, target) in &pairs {
        if repairer.satisfied(placements, room, target) {
            continue;
        }
        if repairer.repair_pair(placements, room, target) {
            debug!(
                room = %requirements[room].name,
                target = %requirements[target].name,
                "相邻关系已修复"
            );
        } else {
            warn!(
                room = %requirements[room].name,
                target = %requirements[target].name,
                "无法满足相邻要求"
            );
            unsatisfied.push((room, target));
        }
    }
    unsatisfied
}

struct Repairer<'s, 'a> {
    space: &'s SearchSpace<'a>,
    requirements: &'s [RoomRequirement],
    pairs: &'s [(usize, usize)],
}

impl Repairer<'_, '_> {
    fn min_touch(&self) -> f64 {
        self.space.config.min_touch_length
    }

    fn satisfied(&self, placements: &[Placement], room: usize, target: usize) -> bool {
        touches(
            &placements[room].rect,
            &placements[target].rect,
            self.min_touch(),
            self.space.tolerance(),
        )
    }

    fn repair_pair(&self, placements: &mut [Placement], room: usize, target: usize) -> bool {
        let kept = self.satisfied_pairs(placements);
        let target_rect = placements[target].rect;

        if let Some(rect) = self.stretch(placements, room, &target_rect, &kept) {
            placements[room].rect = rect;
            return true;
        }
        if let Some(rect) = self.shift(placements, room, &target_rect, &kept) {
            placements[room].rect = rect;
            return true;
        }

        let room_rect = placements[room].rect;
        if let Some(rect) = self.shift(placements, target, &room_rect, &kept) {
            placements[target].rect = rect;
            return true;
        }
        for moved_target in self.approach(placements, target, &room_rect, &kept) {
            let original = placements[target].rect;
            placements[target].rect = moved_target;
            let attempt = self
                .stretch(placements, room, &moved_target, &kept)
                .or_else(|| self.shift(placements, room, &moved_target, &kept));
            if let Some(rect) = attempt {
                placements[room].rect = rect;
                return true;
            }
            placements[target].rect = original;
        }
        false
    }

    fn satisfied_pairs(&self, placements: &[Placement]) -> Vec<(usize, usize)> {
        self.pairs
            .iter()
            .copied()
            .filter(|&(a, b)| self.satisfied(placements, a, b))
            .collect()
    }

    /// 把 `mover` 移到 `rect` 是否合法。
    fn accepts(
        &self,
        placements: &[Placement],
        mover: usize,
        rect: &Rect,
        kept: &[(usize, usize)],
    ) -> bool {
        let space = self.space;
        let tolerance = space.tolerance();
        let requirement = &self.requirements[mover];
        if !space.fits(requirement, rect)
            || !space.region_contains(placements[mover].region, rect)
            || space.touches_excluded(requirement, rect)
        {
            return false;
        }
        let overlaps = placements
            .iter()
            .enumerate()
            .any(|(index, other)| index != mover && other.rect.overlaps_interior(rect, tolerance));
        if overlaps {
            return false;
        }
        kept.iter()
            .filter(|(a, b)| *a == mover || *b == mover)
            .all(|&(a, b)| {
                let rect_a = if a == mover { *rect } else { placements[a].rect };
                let rect_b = if b == mover { *rect } else { placements[b].rect };
                touches(&rect_a, &rect_b, self.min_touch(), tolerance)
            })
    }

    /// 拉伸房间朝向目标的一条边，使其贴到目标上。
    fn stretch(
        &self,
        placements: &[Placement],
        mover: usize,
        target: &Rect,
        kept: &[(usize, usize)],
    ) -> Option<Rect> {
        let tolerance = self.space.tolerance();
        let min_touch = self.min_touch();
        let rect = placements[mover].rect;
        let (x0, y0, x1, y1) = (rect.min().x(), rect.min().y(), rect.max().x(), rect.max().y());
        let (tx0, ty0, tx1, ty1) = (
            target.min().x(),
            target.min().y(),
            target.max().x(),
            target.max().y(),
        );
        let overlap_x = x1.min(tx1) - x0.max(tx0);
        let overlap_y = y1.min(ty1) - y0.max(ty0);

        let mut options = Vec::new();
        if overlap_y >= min_touch - tolerance {
            if tx0 >= x1 - tolerance {
                options.push(Rect::new(x0, y0, tx0, y1));
            }
            if tx1 <= x0 + tolerance {
                options.push(Rect::new(tx1, y0, x1, y1));
            }
        }
        if overlap_x >= min_touch - tolerance {
            if ty0 >= y1 - tolerance {
                options.push(Rect::new(x0, y0, x1, ty0));
            }
            if ty1 <= y0 + tolerance {
                options.push(Rect::new(x0, ty1, x1, y1));
            }
        }
        options
            .into_iter()
            .find(|candidate| self.accepts(placements, mover, candidate, kept))
    }

    /// 平移房间使其与目标贴边，并沿垂直方向尝试对齐。
    fn shift(
        &self,
        placements: &[Placement],
        mover: usize,
        target: &Rect,
        kept: &[(usize, usize)],
    ) -> Option<Rect> {
        flush_translations(&placements[mover].rect, target)
            .into_iter()
            .map(|(dx, dy)| placements[mover].rect.translate(dx, dy))
            .find(|candidate| {
                touches(candidate, target, self.min_touch(), self.space.tolerance())
                    && self.accepts(placements, mover, candidate, kept)
            })
    }

    /// 目标在自身区域内朝房间方向移动的候选位置（按贴近程度排列）。
    fn approach(
        &self,
        placements: &[Placement],
        mover: usize,
        toward: &Rect,
        kept: &[(usize, usize)],
    ) -> Vec<Rect> {
        let rect = placements[mover].rect;
        let bounds = self.space.region_bounds(placements[mover].region);
        let gap_x = toward.centroid().x() - rect.centroid().x();
        let gap_y = toward.centroid().y() - rect.centroid().y();
        let dx = if gap_x > 0.0 {
            (bounds.max().x() - rect.max().x()).max(0.0)
        } else {
            (bounds.min().x() - rect.min().x()).min(0.0)
        };
        let dy = if gap_y > 0.0 {
            (bounds.max().y() - rect.max().y()).max(0.0)
        } else {
            (bounds.min().y() - rect.min().y()).min(0.0)
        };
        [(dx, dy), (dx, 0.0), (0.0, dy)]
            .into_iter()
            .filter(|(dx, dy)| dx.abs() > f64::EPSILON || dy.abs() > f64::EPSILON)
            .map(|(dx, dy)| rect.translate(dx, dy))
            .filter(|candidate| self.accepts(placements, mover, candidate, kept))
            .collect()
    }
}

/// 使 `rect` 与 `target` 贴边的平移量：先确定贴合方向，再尝试不动、底/左对齐、顶/右对齐、居中。
fn flush_translations(rect: &Rect, target: &Rect) -> Vec<(f64, f64)> {
    let mut moves = Vec::new();
    let align = |lo: f64, hi: f64, target_lo: f64, target_hi: f64| {
        [
            0.0,
            target_lo - lo,
            target_hi - hi,
            (target_lo + target_hi) * 0.5 - (lo + hi) * 0.5,
        ]
    };

    let horizontal = [
        target.min().x() - rect.max().x(),
        target.max().x() - rect.min().x(),
    ];
    let vertical = [
        target.min().y() - rect.max().y(),
        target.max().y() - rect.min().y(),
    ];
    let along_y = align(rect.min().y(), rect.max().y(), target.min().y(), target.max().y());
    let along_x = align(rect.min().x(), rect.max().x(), target.min().x(), target.max().x());

    let mut horizontal_moves: Vec<f64> = horizontal.to_vec();
    horizontal_moves.sort_by(|a, b| a.abs().total_cmp(&b.abs()));
    let mut vertical_moves: Vec<f64> = vertical.to_vec();
    vertical_moves.sort_by(|a, b| a.abs().total_cmp(&b.abs()));

    for dx in horizontal_moves {
        moves.extend(along_y.iter().map(|dy| (dx, *dy)));
    }
    for dy in vertical_moves {
        moves.extend(along_x.iter().map(|dx| (*dx, dy)));
    }
    moves.sort_by(|a, b| (a.0.abs() + a.1.abs()).total_cmp(&(b.0.abs() + b.1.abs())));
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompassZone, RoomCategory};
    use crate::optimizer::LayoutOptimizer;
    use crate::Plot;

    #[test]
    fn touching_requires_minimum_shared_length() {
        let a = Rect::new(0.0, 0.0, 3.0, 3.0);
        let b = Rect::new(3.0, 2.5, 5.0, 6.0);
        assert!(!touches(&a, &b, 1.0, 1e-9));
        assert!(touches(&a, &b, 0.5, 1e-9));
        let c = Rect::new(3.0, 0.0, 5.0, 3.0);
        assert!(touches(&a, &c, 1.0, 1e-9));
    }

    #[test]
    fn pairs_follow_requirement_order() {
        let rooms = vec![
            RoomRequirement::new("Kitchen", RoomCategory::Kitchen, 9.0),
            RoomRequirement::new("Dining", RoomCategory::Dining, 8.0).must_touch("kitchen"),
            RoomRequirement::new("Living", RoomCategory::Living, 12.0)
                .must_touch("Dining")
                .must_touch("Kitchen"),
        ];
        assert_eq!(adjacency_pairs(&rooms), vec![(1, 0), (2, 1), (2, 0)]);
    }

    #[test]
    fn flush_moves_are_sorted_by_distance() {
        let rect = Rect::new(0.0, 0.0, 2.0, 2.0);
        let target = Rect::new(2.5, 0.0, 4.5, 2.0);
        let moves = flush_translations(&rect, &target);
        let (dx, dy) = moves[0];
        assert!((dx - 0.5).abs() < 1e-12);
        assert!(dy.abs() < 1e-12);
    }

    #[test]
    fn dining_ends_up_touching_kitchen() {
        let plot = Plot::rectangle(10.0, 8.0);
        let rooms = vec![
            RoomRequirement::new("Kitchen", RoomCategory::Kitchen, 9.0).prefer(CompassZone::SouthEast),
            RoomRequirement::new("Dining", RoomCategory::Dining, 4.0)
                .with_max_area(6.0)
                .prefer(CompassZone::South)
                .must_touch("Kitchen"),
        ];
        let layout = LayoutOptimizer::default()
            .optimize(&plot, &rooms)
            .expect("布局成功");
        let kitchen = layout.room("Kitchen").expect("厨房存在");
        let dining = layout.room("Dining").expect("餐厅存在");
        assert!(
            touches(&kitchen.rect, &dining.rect, 1.0, 1e-6),
            "kitchen {:?} dining {:?}",
            kitchen.rect,
            dining.rect
        );
        assert!(dining.unsatisfied_adjacency.is_empty());
        assert!(layout.diagnostics.iter().all(|diag| !matches!(
            diag,
            crate::Diagnostic::AdjacencyUnsatisfied { .. }
        )));
        assert!(!kitchen.rect.overlaps_interior(&dining.rect, 1e-6));
    }
}
