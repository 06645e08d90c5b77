use vastu_core::document::{Document, TextAlignment};
use vastu_core::geometry::{Point2, Rect};
use vastu_engine::Plot;

/// 指北针：圆、实心三角与 "N" 字样，按真北方向旋转，放在地块右侧。
pub fn emit_north_arrow(
    document: &mut Document,
    plot: &Plot,
    size: f64,
    margin: f64,
    layer: &str,
) -> Rect {
    let bounds = plot.bounds_rect();
    let radius = size * 0.5;
    let center = Point2::new(bounds.max().x() + margin + radius, bounds.max().y() - radius);
    let north = plot.direction_of(0.0);
    let across = north.perp();

    document.add_circle(center, radius, layer);

    let tip = center.translate(north.scale(radius * 0.9));
    let tail = center.translate(north.scale(-radius * 0.5));
    let left = tail.translate(across.scale(radius * 0.35));
    let right = tail.translate(across.scale(-radius * 0.35));
    document.add_solid([left, right, tip, tip], layer);

    let label = center.translate(north.scale(radius + size * 0.25));
    document.add_text(
        label,
        "N",
        size * 0.25,
        -plot.north_angle().to_radians(),
        TextAlignment::MiddleCenter,
        layer,
    );

    Rect::new(
        center.x() - radius,
        center.y() - radius,
        center.x() + radius,
        center.y() + radius,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vastu_core::document::Entity;

    #[test]
    fn arrow_points_to_true_north() {
        let plot = Plot::rectangle(10.0, 8.0).with_north_angle(90.0);
        let mut document = Document::new();
        let bounds = emit_north_arrow(&mut document, &plot, 1.5, 2.0, "A-ANNO-NRTH");
        assert!(bounds.min().x() >= 12.0 - 1e-9);

        let solid = document
            .entities_on("A-ANNO-NRTH")
            .find_map(|entity| match entity {
                Entity::Solid(solid) => Some(solid.clone()),
                _ => None,
            })
            .expect("应有实心三角");
        let center = bounds.centroid();
        let tip = solid.vertices[2];
        assert!(tip.x() > center.x() + 0.5, "真北转到 +X 后箭头应指向右侧");
        assert!((tip.y() - center.y()).abs() < 1e-9);
        assert_eq!(document.entities_on("A-ANNO-NRTH").count(), 3);
    }
}
