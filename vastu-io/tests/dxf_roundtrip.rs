use std::f64::consts::FRAC_PI_2;

use vastu_config::{AppConfig, DrawingUnits};
use vastu_core::document::{DimensionKind, Document, Entity, TextAlignment};
use vastu_core::geometry::Point2;
use vastu_core::style::{Linetype, StyleTable};
use vastu_drafting::Emitter;
use vastu_engine::model::RoomRequirement;
use vastu_engine::{CompassZone, LayoutOptimizer, Plot, RoomCategory};
use vastu_io::{DocumentLoader, DocumentSaver, DxfFacade};

fn emitted_plan() -> Document {
    let config = AppConfig::default();
    let plot = Plot::rectangle(10.0, 8.0);
    let rooms = vec![
        RoomRequirement::new("Kitchen", RoomCategory::Kitchen, 9.0).prefer(CompassZone::SouthEast),
        RoomRequirement::new("Living", RoomCategory::Living, 16.0).prefer(CompassZone::NorthEast),
        RoomRequirement::new("Bedroom", RoomCategory::Bedroom, 12.0).prefer(CompassZone::SouthWest),
    ];
    let layout = LayoutOptimizer::new(config.layout.clone())
        .optimize(&plot, &rooms)
        .expect("样例布局应可求解");
    let styles = StyleTable::aia();
    Emitter::new(&styles, &config.drafting, config.layout.wall_thickness)
        .emit(&layout)
        .into_document()
}

fn count_kinds(document: &Document) -> Vec<(&'static str, usize)> {
    let mut kinds: Vec<(&'static str, usize)> = Vec::new();
    for (_, entity) in document.entities() {
        let kind = entity.kind_name();
        match kinds.iter_mut().find(|(name, _)| *name == kind) {
            Some((_, count)) => *count += 1,
            None => kinds.push((kind, 1)),
        }
    }
    kinds.sort();
    kinds
}

#[test]
fn emitted_plan_survives_a_write_and_reload() {
    let document = emitted_plan();
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let path = dir.path().join("plan.dxf");

    let facade = DxfFacade::new().with_units(DrawingUnits::Meters);
    facade.save(&document, &path).expect("写出 DXF 失败");
    let reloaded = facade.load(&path).expect("读回 DXF 失败");

    assert_eq!(count_kinds(&reloaded), count_kinds(&document));
    for layer in document.layers() {
        let read = reloaded
            .layer(&layer.name)
            .unwrap_or_else(|| panic!("读回的文档缺少图层 {}", layer.name));
        assert_eq!(read.style, layer.style, "图层 {} 样式应一致", layer.name);
    }
    assert_eq!(reloaded.blocks().count(), document.blocks().count());

    let swing = reloaded
        .layer("A-DOOR-SWING")
        .expect("应包含门扇图层");
    assert_eq!(swing.style.linetype, Linetype::Dashed);
}

#[test]
fn area_labels_keep_their_unicode_suffix() {
    let document = emitted_plan();
    let facade = DxfFacade::new();
    let text = facade.render(&document);
    assert!(text.is_ascii(), "写出的 DXF 应只包含 ASCII 字符");

    let reloaded = facade.parse(&text).expect("解析渲染结果失败");
    let labels: Vec<String> = reloaded
        .entities_on("A-ANNO-TEXT")
        .filter_map(|entity| match entity {
            Entity::Text(text) => Some(text.content.clone()),
            _ => None,
        })
        .collect();
    assert!(labels.iter().any(|label| label.ends_with(" m²")));
    assert!(labels.iter().any(|label| label == "Kitchen"));
}

#[test]
fn text_beyond_the_basic_plane_survives_as_surrogate_escapes() {
    let mut document = Document::new();
    StyleTable::aia().apply_to(&mut document);
    document.add_text(
        Point2::new(1.0, 1.0),
        "Pooja 🪔 पूजा",
        0.25,
        0.0,
        TextAlignment::MiddleCenter,
        "A-ANNO-TEXT",
    );
    let facade = DxfFacade::new();
    let text = facade.render(&document);
    assert!(text.is_ascii(), "写出的 DXF 应只包含 ASCII 字符");
    assert!(text.contains("\\U+D83E\\U+DE94"));

    let reloaded = facade.parse(&text).expect("解析渲染结果失败");
    let content = reloaded
        .entities_on("A-ANNO-TEXT")
        .find_map(|entity| match entity {
            Entity::Text(text) => Some(text.content.clone()),
            _ => None,
        })
        .expect("应读回文字");
    assert_eq!(content, "Pooja 🪔 पूजा");
}

#[test]
fn dimensions_point_at_their_blocks() {
    let document = emitted_plan();
    let facade = DxfFacade::new();
    let reloaded = facade.parse(&facade.render(&document)).expect("解析渲染结果失败");

    let dimensions: Vec<_> = reloaded
        .entities_on("A-ANNO-DIMS")
        .filter_map(|entity| match entity {
            Entity::Dimension(dimension) => Some(dimension.clone()),
            _ => None,
        })
        .collect();
    assert!(!dimensions.is_empty());
    for dimension in dimensions {
        assert_eq!(dimension.kind, DimensionKind::Linear);
        let name = dimension.block_name.as_deref().expect("尺寸应引用块");
        assert!(name.starts_with("*D"));
        let block = reloaded.block(name).expect("引用的尺寸块应存在");
        assert!(!block.entities.is_empty());
        let rotation = dimension.rotation;
        assert!(rotation.abs() < 1e-6 || (rotation - FRAC_PI_2).abs() < 1e-6);
        let measured = dimension.measurement.expect("尺寸应带测量值");
        let span = dimension.first_point.distance_to(dimension.second_point);
        assert!((measured - span).abs() < 1e-5);
    }
}

#[test]
fn primitive_geometry_round_trips_within_six_decimals() {
    let mut document = Document::new();
    StyleTable::aia().apply_to(&mut document);
    document.add_arc(Point2::new(1.55, 0.0), 0.9, 0.0, FRAC_PI_2, "A-DOOR-SWING");
    document.add_polyline(
        [
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 0.23),
            Point2::new(0.0, 0.23),
        ],
        true,
        "A-WALL",
    );
    document.add_solid(
        [
            Point2::new(11.0, 7.0),
            Point2::new(11.5, 7.0),
            Point2::new(11.25, 7.6),
            Point2::new(11.25, 7.6),
        ],
        "A-ANNO-NRTH",
    );
    document.add_text(
        Point2::new(2.0, 2.0),
        "N",
        0.3,
        -FRAC_PI_2,
        TextAlignment::MiddleCenter,
        "A-ANNO-NRTH",
    );

    let facade = DxfFacade::new();
    let reloaded = facade.parse(&facade.render(&document)).expect("解析渲染结果失败");
    let entities: Vec<&Entity> = reloaded.entities().map(|(_, entity)| entity).collect();
    assert_eq!(entities.len(), 4);

    match entities[0] {
        Entity::Arc(arc) => {
            assert!(arc.center.approx_eq(Point2::new(1.55, 0.0), 1e-6));
            assert!((arc.sweep() - FRAC_PI_2).abs() < 1e-6);
        }
        other => panic!("期望 ARC，得到 {other:?}"),
    }
    match entities[1] {
        Entity::Polyline(polyline) => {
            assert!(polyline.is_closed);
            assert_eq!(polyline.vertices.len(), 4);
            assert!(polyline.vertices[2].approx_eq(Point2::new(4.0, 0.23), 1e-6));
        }
        other => panic!("期望 LWPOLYLINE，得到 {other:?}"),
    }
    match entities[2] {
        Entity::Solid(solid) => {
            assert!(solid.vertices[3].approx_eq(Point2::new(11.25, 7.6), 1e-6));
        }
        other => panic!("期望 SOLID，得到 {other:?}"),
    }
    match entities[3] {
        Entity::Text(text) => {
            assert_eq!(text.alignment, TextAlignment::MiddleCenter);
            assert!((text.rotation + FRAC_PI_2).abs() < 1e-6);
        }
        other => panic!("期望 TEXT，得到 {other:?}"),
    }
}

#[test]
fn wall_hatch_keeps_its_pattern() {
    let document = emitted_plan();
    let facade = DxfFacade::new();
    let reloaded = facade.parse(&facade.render(&document)).expect("解析渲染结果失败");

    let hatch = reloaded
        .entities_on("A-WALL-PATT")
        .find_map(|entity| match entity {
            Entity::Hatch(hatch) => Some(hatch.clone()),
            _ => None,
        })
        .expect("应有墙体填充");
    assert_eq!(hatch.pattern_name, "ANSI31");
    assert!(!hatch.is_solid);
    assert_eq!(hatch.loops.len(), 1);
    assert_eq!(hatch.loops[0].edges.len(), 4);
    let pattern = hatch.pattern.expect("ANSI31 应带图案线");
    assert_eq!(pattern.lines.len(), 1);
    assert!((pattern.angle.to_degrees() - 45.0).abs() < 1e-6);
}
