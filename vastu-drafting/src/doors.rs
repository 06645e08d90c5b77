use serde::Serialize;
use vastu_core::document::Document;
use vastu_core::geometry::{Point2, Rect};
use vastu_engine::Layout;
use vastu_engine::model::{Adjoining, Opening};

/// 已输出的门符号，供文字避让使用。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DoorSymbol {
    pub room: usize,
    pub hinge: Point2,
    pub swing_bounds: Rect,
    pub swings_into_room: bool,
}

/// 门扇开向两侧中较大的空间；外门总是向内开。
pub fn swings_into_room(layout: &Layout, room: usize, adjoining: Adjoining) -> bool {
    let area = layout.rooms[room].area();
    match adjoining {
        Adjoining::Exterior => true,
        Adjoining::Room(other) => layout
            .rooms
            .get(other)
            .is_none_or(|neighbour| area >= neighbour.area()),
        Adjoining::Circulation => area >= layout.circulation_area(),
    }
}

/// 绘制单个门：两条门框线、门扇与 90° 开启弧线。
pub fn emit_door(
    document: &mut Document,
    layout: &Layout,
    room: usize,
    opening: &Opening,
    thickness: f64,
    door_layer: &str,
    swing_layer: &str,
) -> Option<DoorSymbol> {
    let placed = &layout.rooms[room];
    let segment = opening.segment(&placed.rect);
    let width = segment.length();
    let closed = segment.direction()?;
    let outward = opening.side.outward();
    let exterior = placed
        .walls
        .iter()
        .any(|wall| wall.side == opening.side && wall.is_exterior);
    let (lo, hi) = if exterior {
        (-thickness, 0.0)
    } else {
        (-thickness * 0.5, thickness * 0.5)
    };

    for jamb in [segment.start, segment.end] {
        document.add_line(
            jamb.translate(outward.scale(lo)),
            jamb.translate(outward.scale(hi)),
            door_layer,
        );
    }

    let into_room = swings_into_room(layout, room, opening.adjoining);
    let swing = if into_room { outward.scale(-1.0) } else { outward };
    let hinge = segment.start;
    let leaf_end = hinge.translate(swing.scale(width));
    document.add_line(hinge, leaf_end, door_layer);

    let closed_angle = closed.y().atan2(closed.x());
    let open_angle = swing.y().atan2(swing.x());
    let cross = closed.x() * swing.y() - closed.y() * swing.x();
    let (start_angle, end_angle) = if cross > 0.0 {
        (closed_angle, open_angle)
    } else {
        (open_angle, closed_angle)
    };
    document.add_arc(hinge, width, start_angle, end_angle, swing_layer);

    let far_corner = hinge
        .translate(closed.scale(width))
        .translate(swing.scale(width));
    Some(DoorSymbol {
        room,
        hinge,
        swing_bounds: Rect::from_corners(hinge, far_corner),
        swings_into_room: into_room,
    })
}

pub fn emit_doors(
    document: &mut Document,
    layout: &Layout,
    thickness: f64,
    door_layer: &str,
    swing_layer: &str,
) -> Vec<DoorSymbol> {
    layout
        .rooms
        .iter()
        .enumerate()
        .flat_map(|(index, room)| room.openings.iter().map(move |opening| (index, opening)))
        .filter_map(|(index, opening)| {
            emit_door(document, layout, index, opening, thickness, door_layer, swing_layer)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{side_by_side, unequal_pair, with_door};
    use vastu_core::document::Entity;
    use vastu_core::geometry::RectSide;

    #[test]
    fn door_swings_into_the_larger_room() {
        let layout = unequal_pair();
        assert!(swings_into_room(&layout, 0, Adjoining::Room(1)));
        assert!(!swings_into_room(&layout, 1, Adjoining::Room(0)));
        assert!(swings_into_room(&layout, 1, Adjoining::Exterior));
    }

    #[test]
    fn door_symbol_geometry() {
        let layout = with_door(
            side_by_side(),
            0,
            Opening {
                side: RectSide::Bottom,
                offset: 2.0,
                width: 0.9,
                adjoining: Adjoining::Exterior,
            },
        );
        let mut document = Document::new();
        let doors = emit_doors(&mut document, &layout, 0.2, "A-DOOR", "A-DOOR-SWING");
        assert_eq!(doors.len(), 1);
        let door = doors[0];
        assert!(door.swings_into_room);
        assert!(door.hinge.approx_eq(Point2::new(1.55, 0.0), 1e-9));
        assert!(
            door.swing_bounds
                .max()
                .approx_eq(Point2::new(2.45, 0.9), 1e-9)
        );

        assert_eq!(document.entities_on("A-DOOR").count(), 3);
        let arc = document
            .entities_on("A-DOOR-SWING")
            .find_map(|entity| match entity {
                Entity::Arc(arc) => Some(arc.clone()),
                _ => None,
            })
            .expect("应有开启弧线");
        assert!((arc.radius - 0.9).abs() < 1e-9);
        assert!((arc.sweep() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }
}
