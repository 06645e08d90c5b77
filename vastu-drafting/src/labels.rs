use serde::Serialize;
use vastu_config::DraftingConfig;
use vastu_core::document::{Document, TextAlignment};
use vastu_core::geometry::{Point2, Rect};
use vastu_engine::Layout;

/// 单个字符宽度相对字高的估算系数。
const CHAR_WIDTH_FACTOR: f64 = 0.6;
/// 两行文字之间的行距（相对字高）。
const LINE_GAP: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomLabel {
    pub room: usize,
    pub anchor: Point2,
    pub height: f64,
    pub bounds: Rect,
    /// 为避让门扇沿长轴方向的偏移量。
    pub shift: f64,
}

pub fn area_text(area: f64) -> String {
    format!("{area:.2} m²")
}

/// 字高：`clamp(min(w, h) × ratio, min, max)`。
pub fn text_height(rect: &Rect, config: &DraftingConfig) -> f64 {
    (rect.width().min(rect.height()) * config.text_height_ratio)
        .clamp(config.min_text_height, config.max_text_height)
}

/// 以 `center` 为中心的两行标注所占范围。
pub fn label_box(center: Point2, lines: &[&str], height: f64) -> Rect {
    let chars = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);
    let width = chars as f64 * height * CHAR_WIDTH_FACTOR;
    let total = lines.len() as f64 * height + (lines.len().saturating_sub(1)) as f64 * LINE_GAP * height;
    Rect::new(
        center.x() - width * 0.5,
        center.y() - total * 0.5,
        center.x() + width * 0.5,
        center.y() + total * 0.5,
    )
}

/// 沿一个轴避让全部障碍所需的最小偏移；幅值相同时取正向，无法避让时为 0。
pub fn clearance_shift(label: &Rect, obstacles: &[Rect], horizontal: bool, tolerance: f64) -> f64 {
    let collides = |shift: f64| {
        let moved = if horizontal {
            label.translate(shift, 0.0)
        } else {
            label.translate(0.0, shift)
        };
        obstacles
            .iter()
            .any(|obstacle| obstacle.overlaps_interior(&moved, tolerance))
    };
    if !collides(0.0) {
        return 0.0;
    }

    let (lo, hi) = if horizontal {
        (label.min().x(), label.max().x())
    } else {
        (label.min().y(), label.max().y())
    };
    let mut candidates: Vec<f64> = obstacles
        .iter()
        .flat_map(|obstacle| {
            let (o_lo, o_hi) = if horizontal {
                (obstacle.min().x(), obstacle.max().x())
            } else {
                (obstacle.min().y(), obstacle.max().y())
            };
            [o_hi - lo, o_lo - hi]
        })
        .collect();
    candidates.sort_by(|a, b| {
        a.abs()
            .total_cmp(&b.abs())
            .then_with(|| b.total_cmp(a))
    });
    candidates
        .into_iter()
        .find(|shift| !collides(*shift))
        .unwrap_or(0.0)
}

/// 在每个房间质心处输出名称与面积，必要时避让门扇。
pub fn emit_labels(
    document: &mut Document,
    layout: &Layout,
    swings: &[Rect],
    config: &DraftingConfig,
    layer: &str,
) -> Vec<RoomLabel> {
    let tolerance = config.merge_tolerance;
    layout
        .rooms
        .iter()
        .enumerate()
        .map(|(index, room)| {
            let rect = room.rect;
            let height = text_height(&rect, config);
            let area = area_text(room.area());
            let lines = [room.name(), area.as_str()];
            let centroid = rect.centroid();
            let horizontal = rect.width() >= rect.height();
            let initial = label_box(centroid, &lines, height);
            let shift = clearance_shift(&initial, swings, horizontal, tolerance);
            let anchor = if horizontal {
                Point2::new(centroid.x() + shift, centroid.y())
            } else {
                Point2::new(centroid.x(), centroid.y() + shift)
            };

            let step = (height + LINE_GAP * height) * 0.5;
            document.add_text(
                Point2::new(anchor.x(), anchor.y() + step),
                room.name(),
                height,
                0.0,
                TextAlignment::MiddleCenter,
                layer,
            );
            document.add_text(
                Point2::new(anchor.x(), anchor.y() - step),
                area.clone(),
                height,
                0.0,
                TextAlignment::MiddleCenter,
                layer,
            );
            RoomLabel {
                room: index,
                anchor,
                height,
                bounds: label_box(anchor, &lines, height),
                shift,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_uses_two_decimals() {
        assert_eq!(area_text(12.8), "12.80 m²");
        assert_eq!(area_text(9.0 / 7.0), "1.29 m²");
    }

    #[test]
    fn text_height_is_clamped() {
        let config = DraftingConfig::default();
        let small = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert!((text_height(&small, &config) - config.min_text_height).abs() < 1e-12);
        let large = Rect::new(0.0, 0.0, 20.0, 20.0);
        assert!((text_height(&large, &config) - config.max_text_height).abs() < 1e-12);
        let medium = Rect::new(0.0, 0.0, 3.0, 2.5);
        assert!((text_height(&medium, &config) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn label_without_collision_stays_put() {
        let label = Rect::new(0.0, 0.0, 2.0, 1.0);
        let swings = [Rect::new(5.0, 5.0, 6.0, 6.0)];
        assert_eq!(clearance_shift(&label, &swings, true, 1e-9), 0.0);
    }

    #[test]
    fn smallest_clearing_shift_wins() {
        let label = Rect::new(0.0, 0.0, 2.0, 1.0);
        // 向左只需 0.5，向右需 2.5
        let swings = [Rect::new(1.5, 0.0, 2.5, 1.0)];
        let shift = clearance_shift(&label, &swings, true, 1e-9);
        assert!((shift + 0.5).abs() < 1e-12);

        let left_heavy = [Rect::new(-0.5, 0.0, 0.4, 1.0)];
        let shift = clearance_shift(&label, &left_heavy, true, 1e-9);
        assert!((shift - 0.4).abs() < 1e-12);
    }

    #[test]
    fn ties_prefer_positive_direction() {
        let label = Rect::new(0.0, 0.0, 2.0, 1.0);
        let swings = [Rect::new(0.0, 0.0, 2.0, 1.0)];
        let shift = clearance_shift(&label, &swings, true, 1e-9);
        assert!((shift - 2.0).abs() < 1e-12);
    }

    #[test]
    fn every_collision_must_clear() {
        let label = Rect::new(0.0, 0.0, 2.0, 1.0);
        let swings = [Rect::new(1.8, 0.0, 2.6, 1.0), Rect::new(2.5, 0.0, 3.5, 1.0)];
        let shift = clearance_shift(&label, &swings, true, 1e-9);
        assert!((shift + 0.2).abs() < 1e-12);
    }
}
