use tracing::{debug, warn};
use vastu_config::LayoutConfig;
use vastu_core::geometry::{Point2, Rect, RectSide, Segment};

use crate::model::{Adjoining, Opening, Plot, RoomCategory, RoomRequirement, WallSegment};

/// 房间四条墙的中心线：矩形各边向内偏移半个墙厚，位于地块边界上的为外墙。
pub fn build_walls(
    plot: &Plot,
    rect: &Rect,
    thickness: f64,
    tolerance: f64,
) -> Vec<WallSegment> {
    let inner = rect.inset(thickness * 0.5).unwrap_or(*rect);
    RectSide::ALL
        .into_iter()
        .map(|side| WallSegment {
            side,
            centerline: inner.side(side),
            thickness,
            is_exterior: !plot
                .boundary_overlaps(&rect.side(side), tolerance)
                .is_empty(),
        })
        .collect()
}

/// 房间一条边上的连续区段及其另一侧空间。
#[derive(Debug, Clone, Copy)]
struct Stretch {
    side: RectSide,
    start: f64,
    end: f64,
    adjoining: Adjoining,
}

impl Stretch {
    #[inline]
    fn length(&self) -> f64 {
        self.end - self.start
    }

    fn opening(&self, width: f64) -> Opening {
        Opening {
            side: self.side,
            offset: (self.start + self.end) * 0.5,
            width,
            adjoining: self.adjoining,
        }
    }
}

/// 入口房间：显式标记者，其次第一个门厅，再次第一个客厅。
pub fn entrance_room(requirements: &[RoomRequirement]) -> Option<usize> {
    requirements
        .iter()
        .position(|room| room.is_entrance)
        .or_else(|| {
            requirements
                .iter()
                .position(|room| room.category == RoomCategory::Entrance)
        })
        .or_else(|| {
            requirements
                .iter()
                .position(|room| room.category == RoomCategory::Living)
        })
}

/// 为每个房间分配一个门洞；没有足够长的边时为 None。
pub(crate) fn assign_doors(
    plot: &Plot,
    rects: &[Rect],
    requirements: &[RoomRequirement],
    config: &LayoutConfig,
) -> Vec<Option<Opening>> {
    let tolerance = config.tolerance;
    let needed = config.door_width + config.door_clearance;
    let entrance = entrance_room(requirements);

    (0..rects.len())
        .map(|index| {
            let stretches: Vec<Stretch> = RectSide::ALL
                .into_iter()
                .flat_map(|side| side_stretches(plot, rects, index, side, tolerance))
                .collect();
            let door = if Some(index) == entrance {
                entrance_door(plot, &rects[index], &stretches, config)
            } else {
                interior_door(&stretches, config.door_width, needed, tolerance)
            };
            match &door {
                Some(opening) => debug!(
                    room = %requirements[index].name,
                    side = ?opening.side,
                    adjoining = ?opening.adjoining,
                    "门洞已分配"
                ),
                None => warn!(room = %requirements[index].name, "没有可放置门洞的墙段"),
            }
            door
        })
        .collect()
}

fn entrance_door(
    plot: &Plot,
    rect: &Rect,
    stretches: &[Stretch],
    config: &LayoutConfig,
) -> Option<Opening> {
    let tolerance = config.tolerance;
    if let Some(edge) = plot.entry_edge() {
        let on_edge = RectSide::ALL
            .into_iter()
            .filter_map(|side| {
                let segment = rect.side(side);
                let overlap = segment.collinear_overlap(&edge, tolerance)?;
                let (start, end) = project_span(&segment, &overlap);
                Some(Stretch {
                    side,
                    start,
                    end,
                    adjoining: Adjoining::Exterior,
                })
            })
            .filter(|stretch| stretch.length() >= config.door_width - tolerance);
        if let Some(stretch) = longest(on_edge, tolerance) {
            return Some(stretch.opening(config.door_width));
        }
    }

    let entry = plot.direction_of(plot.entry().bearing());
    let facing = RectSide::ALL
        .into_iter()
        .max_by(|a, b| a.outward().dot(entry).total_cmp(&b.outward().dot(entry)))?;
    let needed = config.door_width + config.door_clearance;
    longest(
        stretches
            .iter()
            .copied()
            .filter(|stretch| stretch.side == facing && stretch.length() >= needed - tolerance),
        tolerance,
    )
    .map(|stretch| stretch.opening(config.door_width))
    .or_else(|| interior_door(stretches, config.door_width, needed, tolerance))
}

/// 优先朝向交通空间，其次相邻房间，最后外墙。
fn interior_door(
    stretches: &[Stretch],
    width: f64,
    needed: f64,
    tolerance: f64,
) -> Option<Opening> {
    let pick = |want: fn(&Adjoining) -> bool| {
        longest(
            stretches
                .iter()
                .copied()
                .filter(|stretch| want(&stretch.adjoining) && stretch.length() >= needed - tolerance),
            tolerance,
        )
    };
    pick(|adjoining| matches!(adjoining, Adjoining::Circulation))
        .or_else(|| pick(|adjoining| matches!(adjoining, Adjoining::Room(_))))
        .or_else(|| pick(|adjoining| matches!(adjoining, Adjoining::Exterior)))
        .map(|stretch| stretch.opening(width))
}

/// 最长区段；等长时保留先出现者。
fn longest(stretches: impl Iterator<Item = Stretch>, tolerance: f64) -> Option<Stretch> {
    stretches.fold(None, |best: Option<Stretch>, stretch| match best {
        Some(current) if stretch.length() <= current.length() + tolerance => Some(current),
        _ => Some(stretch),
    })
}

/// 把房间一条边切分为外墙、相邻房间与交通空间三类区段。
fn side_stretches(
    plot: &Plot,
    rects: &[Rect],
    index: usize,
    side: RectSide,
    tolerance: f64,
) -> Vec<Stretch> {
    let rect = &rects[index];
    let segment = rect.side(side);
    let length = segment.length();

    let mut occupied: Vec<Stretch> = plot
        .boundary_overlaps(&segment, tolerance)
        .iter()
        .map(|overlap| {
            let (start, end) = project_span(&segment, overlap);
            Stretch {
                side,
                start,
                end,
                adjoining: Adjoining::Exterior,
            }
        })
        .collect();
    for (other_index, other) in rects.iter().enumerate() {
        if other_index == index {
            continue;
        }
        if let Some(overlap) = segment.collinear_overlap(&other.side(side.opposite()), tolerance) {
            let (start, end) = project_span(&segment, &overlap);
            occupied.push(Stretch {
                side,
                start,
                end,
                adjoining: Adjoining::Room(other_index),
            });
        }
    }
    occupied.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut stretches = Vec::with_capacity(occupied.len() * 2 + 1);
    let mut cursor = 0.0_f64;
    for stretch in occupied {
        if stretch.start > cursor + tolerance {
            stretches.push(Stretch {
                side,
                start: cursor,
                end: stretch.start,
                adjoining: Adjoining::Circulation,
            });
        }
        cursor = cursor.max(stretch.end);
        stretches.push(stretch);
    }
    if length > cursor + tolerance {
        stretches.push(Stretch {
            side,
            start: cursor,
            end: length,
            adjoining: Adjoining::Circulation,
        });
    }
    stretches
}

/// `part` 在 `segment` 上的参数区间（自起点的距离）。
fn project_span(segment: &Segment, part: &Segment) -> (f64, f64) {
    let distance = |point: Point2| segment.start.distance_to(point);
    let (a, b) = (distance(part.start), distance(part.end));
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CardinalSide;

    fn config() -> LayoutConfig {
        LayoutConfig::default()
    }

    #[test]
    fn corner_room_has_two_exterior_walls() {
        let plot = Plot::rectangle(10.0, 8.0);
        let rect = Rect::new(0.0, 0.0, 4.0, 3.0);
        let walls = build_walls(&plot, &rect, 0.2, 1e-6);
        assert_eq!(walls.len(), 4);
        let exterior: Vec<RectSide> = walls
            .iter()
            .filter(|wall| wall.is_exterior)
            .map(|wall| wall.side)
            .collect();
        assert_eq!(exterior, vec![RectSide::Bottom, RectSide::Left]);

        let bottom = &walls[0];
        assert!(bottom.centerline.start.approx_eq(Point2::new(0.1, 0.1), 1e-12));
        assert!(bottom.centerline.end.approx_eq(Point2::new(3.9, 0.1), 1e-12));
    }

    #[test]
    fn entrance_room_opens_onto_entry_edge() {
        let plot = Plot::rectangle(10.0, 8.0).with_entry(CardinalSide::South);
        let rects = [Rect::new(0.0, 0.0, 4.0, 4.0), Rect::new(4.0, 0.0, 8.0, 4.0)];
        let rooms = [
            RoomRequirement::new("Foyer", RoomCategory::Entrance, 9.0),
            RoomRequirement::new("Study", RoomCategory::Study, 9.0),
        ];
        let doors = assign_doors(&plot, &rects, &rooms, &config());

        let foyer = doors[0].expect("门厅应有门");
        assert_eq!(foyer.side, RectSide::Bottom);
        assert_eq!(foyer.adjoining, Adjoining::Exterior);
        assert!((foyer.offset - 2.0).abs() < 1e-9);
        assert!((foyer.width - config().door_width).abs() < 1e-12);

        let study = doors[1].expect("书房应有门");
        assert_eq!(study.adjoining, Adjoining::Circulation);
        assert_eq!(study.side, RectSide::Right, "等长时按边的顺序取第一条");
    }

    #[test]
    fn enclosed_room_falls_back_to_shared_wall() {
        let plot = Plot::rectangle(8.0, 4.0);
        let rects = [Rect::new(0.0, 0.0, 4.0, 4.0), Rect::new(4.0, 0.0, 8.0, 4.0)];
        let rooms = [
            RoomRequirement::new("Hall", RoomCategory::Other, 9.0).entrance(),
            RoomRequirement::new("Store", RoomCategory::Store, 9.0),
        ];
        let doors = assign_doors(&plot, &rects, &rooms, &config());
        let store = doors[1].expect("储藏室应通过共享墙开门");
        assert_eq!(store.side, RectSide::Left);
        assert_eq!(store.adjoining, Adjoining::Room(0));
        assert!((store.offset - 2.0).abs() < 1e-9);
    }

    #[test]
    fn tiny_room_gets_no_door() {
        let plot = Plot::rectangle(10.0, 8.0);
        let rects = [Rect::new(3.0, 3.0, 3.8, 3.8)];
        let rooms = [RoomRequirement::new("Shaft", RoomCategory::Other, 0.5)];
        let doors = assign_doors(&plot, &rects, &rooms, &config());
        assert!(doors[0].is_none());
    }

    #[test]
    fn stretches_cover_the_whole_side() {
        let plot = Plot::rectangle(10.0, 8.0);
        let rects = [Rect::new(0.0, 0.0, 6.0, 3.0), Rect::new(1.0, 3.0, 3.0, 6.0)];
        let stretches = side_stretches(&plot, &rects, 0, RectSide::Top, 1e-9);
        let kinds: Vec<Adjoining> = stretches.iter().map(|stretch| stretch.adjoining).collect();
        assert_eq!(
            kinds,
            vec![Adjoining::Circulation, Adjoining::Room(1), Adjoining::Circulation]
        );
        let total: f64 = stretches.iter().map(Stretch::length).sum();
        assert!((total - 6.0).abs() < 1e-9);
    }
}
