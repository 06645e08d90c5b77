pub mod dimensions;
pub mod doors;
pub mod labels;
pub mod north;
pub mod walls;

use tracing::info;
use vastu_config::DraftingConfig;
use vastu_core::document::{Document, TextAlignment};
use vastu_core::geometry::{Point2, Rect};
use vastu_core::style::{DraftingRole, StyleTable};
use vastu_engine::Layout;

pub use dimensions::{ChainSide, ChainSource, DimensionChain};
pub use doors::DoorSymbol;
pub use labels::RoomLabel;
pub use walls::{Axis, WallRun};

/// 图面输出：文档本身以及便于检查的中间结果。
#[derive(Debug, Clone)]
pub struct Drawing {
    pub document: Document,
    pub wall_runs: Vec<WallRun>,
    pub doors: Vec<DoorSymbol>,
    pub labels: Vec<RoomLabel>,
    pub chains: Vec<DimensionChain>,
    pub north_arrow: Rect,
}

impl Drawing {
    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

/// CAD 几何生成器：把布局转换为带图层样式的绘图实体。
pub struct Emitter<'a> {
    styles: &'a StyleTable,
    config: &'a DraftingConfig,
    wall_thickness: f64,
    title: Option<String>,
}

impl<'a> Emitter<'a> {
    pub fn new(styles: &'a StyleTable, config: &'a DraftingConfig, wall_thickness: f64) -> Self {
        Self {
            styles,
            config,
            wall_thickness,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn emit(&self, layout: &Layout) -> Drawing {
        let config = self.config;
        let styles = self.styles;
        let layer = move |role: DraftingRole| styles.layer_name(role);
        let tolerance = config.merge_tolerance;

        let mut document = Document::new();
        styles.apply_to(&mut document);

        let mut wall_runs = walls::collect_runs(layout, tolerance);
        walls::cut_at_doors(&mut wall_runs, layout, tolerance);
        let pattern = walls::ansi31(config.hatch_angle, config.hatch_spacing);
        let bands = walls::emit_walls(
            &mut document,
            &wall_runs,
            self.wall_thickness,
            &pattern,
            layer(DraftingRole::Wall),
            layer(DraftingRole::WallPattern),
        );

        let doors = doors::emit_doors(
            &mut document,
            layout,
            self.wall_thickness,
            layer(DraftingRole::Door),
            layer(DraftingRole::DoorSwing),
        );
        let swings: Vec<Rect> = doors.iter().map(|door| door.swing_bounds).collect();
        let labels = labels::emit_labels(
            &mut document,
            layout,
            &swings,
            config,
            layer(DraftingRole::Text),
        );

        let plot = layout.plot.bounds_rect();
        let chains = dimensions::plan_chains(layout, config);
        let dimension_count = dimensions::emit_dimensions(
            &mut document,
            &chains,
            &plot,
            config,
            layer(DraftingRole::Dimension),
        );

        let north_arrow = north::emit_north_arrow(
            &mut document,
            &layout.plot,
            config.north_arrow_size,
            config.north_arrow_margin + bands_clearance(&chains, ChainSide::Right, config),
            layer(DraftingRole::NorthArrow),
        );

        if config.show_title {
            if let Some(title) = &self.title {
                let height = config.max_text_height * 1.5;
                let below = bands_clearance(&chains, ChainSide::Bottom, config);
                document.add_text(
                    Point2::new(plot.centroid().x(), plot.min().y() - below - height * 2.0),
                    title.clone(),
                    height,
                    0.0,
                    TextAlignment::MiddleCenter,
                    layer(DraftingRole::Text),
                );
            }
        }

        info!(
            rooms = layout.rooms.len(),
            wall_runs = wall_runs.len(),
            wall_bands = bands,
            doors = doors.len(),
            dimensions = dimension_count,
            entities = document.entities().count(),
            "图面生成完成"
        );

        Drawing {
            document,
            wall_runs,
            doors,
            labels,
            chains,
            north_arrow,
        }
    }
}

/// 某侧最外层尺寸线到地块边的距离。
fn bands_clearance(chains: &[DimensionChain], side: ChainSide, config: &DraftingConfig) -> f64 {
    match dimensions::bands_on(chains, side) {
        0 => 0.0,
        bands => config.dimension_first_offset + bands as f64 * config.dimension_band_spacing,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use vastu_config::LayoutConfig;
    use vastu_core::geometry::Rect;
    use vastu_engine::model::{
        Compliance, ComplianceLevel, Opening, PlacedRoom, RoomCategory, RoomRequirement,
    };
    use vastu_engine::openings::build_walls;
    use vastu_engine::{CompassZone, Layout, LayoutOptimizer, Plot};

    pub fn layout_of(plot: Plot, rooms: &[(&str, Rect)]) -> Layout {
        let thickness = LayoutConfig::default().wall_thickness;
        let rooms = rooms
            .iter()
            .enumerate()
            .map(|(index, (name, rect))| PlacedRoom {
                index,
                requirement: RoomRequirement::new(*name, RoomCategory::infer(name), rect.area()),
                rect: *rect,
                compliance: Compliance {
                    zone: None,
                    level: ComplianceLevel::Unzoned,
                    score: 1.0,
                },
                walls: build_walls(&plot, rect, thickness, 1e-6),
                openings: Vec::new(),
                unsatisfied_adjacency: Vec::new(),
            })
            .collect();
        Layout {
            plot,
            rooms,
            diagnostics: Vec::new(),
            wall_thickness: thickness,
        }
    }

    /// 8×4 地块上左右并排的两个 4×4 房间。
    pub fn side_by_side() -> Layout {
        layout_of(
            Plot::rectangle(8.0, 4.0),
            &[
                ("Study", Rect::new(0.0, 0.0, 4.0, 4.0)),
                ("Store", Rect::new(4.0, 0.0, 8.0, 4.0)),
            ],
        )
    }

    pub fn unequal_pair() -> Layout {
        layout_of(
            Plot::rectangle(10.0, 4.0),
            &[
                ("Living", Rect::new(0.0, 0.0, 6.0, 4.0)),
                ("Store", Rect::new(6.0, 0.0, 8.0, 4.0)),
            ],
        )
    }

    pub fn with_door(mut layout: Layout, room: usize, opening: Opening) -> Layout {
        layout.rooms[room].openings.push(opening);
        layout
    }

    pub fn house_layout() -> Layout {
        let plot = Plot::rectangle(12.0, 15.0);
        let rooms = vec![
            RoomRequirement::new("Living", RoomCategory::Living, 16.0).prefer(CompassZone::NorthEast),
            RoomRequirement::new("Kitchen", RoomCategory::Kitchen, 9.0).prefer(CompassZone::SouthEast),
            RoomRequirement::new("Master Bedroom", RoomCategory::MasterBedroom, 14.0)
                .prefer(CompassZone::SouthWest),
            RoomRequirement::new("Dining", RoomCategory::Dining, 9.0)
                .prefer(CompassZone::West)
                .must_touch("Kitchen"),
            RoomRequirement::new("Toilet", RoomCategory::Toilet, 4.0).prefer(CompassZone::NorthWest),
            RoomRequirement::new("Pooja", RoomCategory::Pooja, 2.0).prefer(CompassZone::NorthEast),
        ];
        LayoutOptimizer::default()
            .optimize(&plot, &rooms)
            .expect("住宅样例应可布置")
    }
}
