use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use serde::Serialize;
use tracing::debug;
use vastu_config::DraftingConfig;
use vastu_core::document::{
    BlockDefinition, Dimension, DimensionKind, Document, Entity, Line, Text, TextAlignment,
};
use vastu_core::geometry::{Point2, Rect};
use vastu_engine::Layout;

/// 尺寸链位于地块的哪一侧。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainSide {
    Bottom,
    Top,
    Left,
    Right,
}

impl ChainSide {
    /// 沿 X 方向量取的尺寸链。
    #[inline]
    pub fn measures_x(self) -> bool {
        matches!(self, ChainSide::Bottom | ChainSide::Top)
    }

    /// 尺寸线相对地块向外的方向符号。
    fn outward_sign(self) -> f64 {
        match self {
            ChainSide::Bottom | ChainSide::Left => -1.0,
            ChainSide::Top | ChainSide::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "room", rename_all = "snake_case")]
pub enum ChainSource {
    Room(usize),
    PlotPartition,
    PlotOverall,
}

/// 共线的一串尺寸，`stops` 为沿量取方向的有序坐标。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionChain {
    pub source: ChainSource,
    pub side: ChainSide,
    pub stops: Vec<f64>,
    /// 尺寸界线起点所在的坐标（房间或地块的边）。
    pub base: f64,
    pub band: usize,
    pub offset: f64,
}

impl DimensionChain {
    fn new(source: ChainSource, side: ChainSide, stops: Vec<f64>, base: f64) -> Self {
        Self {
            source,
            side,
            stops,
            base,
            band: 0,
            offset: 0.0,
        }
    }

    pub fn extent(&self) -> (f64, f64) {
        let first = self.stops.first().copied().unwrap_or(0.0);
        let last = self.stops.last().copied().unwrap_or(first);
        (first.min(last), first.max(last))
    }

    pub fn spans(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.stops.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// 同侧且量取范围有重叠（端点相接不算）。
    pub fn conflicts_with(&self, other: &DimensionChain, tolerance: f64) -> bool {
        let (a0, a1) = self.extent();
        let (b0, b1) = other.extent();
        self.side == other.side && a0 < b1 - tolerance && b0 < a1 - tolerance
    }

    /// 尺寸线所在坐标。
    pub fn line_position(&self, plot: &Rect) -> f64 {
        match self.side {
            ChainSide::Bottom => plot.min().y() - self.offset,
            ChainSide::Top => plot.max().y() + self.offset,
            ChainSide::Left => plot.min().x() - self.offset,
            ChainSide::Right => plot.max().x() + self.offset,
        }
    }
}

fn sorted_stops(values: impl IntoIterator<Item = f64>, tolerance: f64) -> Vec<f64> {
    let mut stops: Vec<f64> = values.into_iter().collect();
    stops.sort_by(f64::total_cmp);
    stops.dedup_by(|a, b| (*a - *b).abs() <= tolerance);
    stops
}

/// 规划全部尺寸链：贴地块边的房间在该侧各得一条，地块分段链与总尺寸链各一条；随后分配偏移层。
///
/// 尺寸界线只从地块边界引出，不穿过其他房间。
pub fn plan_chains(layout: &Layout, config: &DraftingConfig) -> Vec<DimensionChain> {
    let tolerance = config.merge_tolerance;
    let plot = layout.plot.bounds_rect();
    let (x0, x1) = (plot.min().x(), plot.max().x());
    let (y0, y1) = (plot.min().y(), plot.max().y());
    let on_edge = |value: f64, edge: f64| (value - edge).abs() <= tolerance;
    let mut chains = Vec::with_capacity(layout.rooms.len() * 2 + 4);

    for (index, room) in layout.rooms.iter().enumerate() {
        let rect = room.rect;
        let horizontal = if on_edge(rect.min().y(), y0) {
            Some((ChainSide::Bottom, y0))
        } else if on_edge(rect.max().y(), y1) {
            Some((ChainSide::Top, y1))
        } else {
            None
        };
        if let Some((side, base)) = horizontal {
            chains.push(DimensionChain::new(
                ChainSource::Room(index),
                side,
                vec![rect.min().x(), rect.max().x()],
                base,
            ));
        }
        let vertical = if on_edge(rect.min().x(), x0) {
            Some((ChainSide::Left, x0))
        } else if on_edge(rect.max().x(), x1) {
            Some((ChainSide::Right, x1))
        } else {
            None
        };
        if let Some((side, base)) = vertical {
            chains.push(DimensionChain::new(
                ChainSource::Room(index),
                side,
                vec![rect.min().y(), rect.max().y()],
                base,
            ));
        }
    }

    let inside = |value: f64, lo: f64, hi: f64| value > lo + tolerance && value < hi - tolerance;
    let xs = sorted_stops(
        layout
            .rooms
            .iter()
            .flat_map(|room| [room.rect.min().x(), room.rect.max().x()])
            .filter(|x| inside(*x, x0, x1))
            .chain([x0, x1]),
        tolerance,
    );
    let ys = sorted_stops(
        layout
            .rooms
            .iter()
            .flat_map(|room| [room.rect.min().y(), room.rect.max().y()])
            .filter(|y| inside(*y, y0, y1))
            .chain([y0, y1]),
        tolerance,
    );
    if xs.len() > 2 {
        chains.push(DimensionChain::new(ChainSource::PlotPartition, ChainSide::Bottom, xs, y0));
    }
    if ys.len() > 2 {
        chains.push(DimensionChain::new(ChainSource::PlotPartition, ChainSide::Left, ys, x0));
    }
    chains.push(DimensionChain::new(ChainSource::PlotOverall, ChainSide::Bottom, vec![x0, x1], y0));
    chains.push(DimensionChain::new(ChainSource::PlotOverall, ChainSide::Left, vec![y0, y1], x0));

    assign_bands(&mut chains, config);
    chains
}

/// 贪心货架式分层：每条链放入同侧第一个不冲突的层。
pub fn assign_bands(chains: &mut [DimensionChain], config: &DraftingConfig) {
    let tolerance = config.merge_tolerance;
    for index in 0..chains.len() {
        let (placed, rest) = chains.split_at_mut(index);
        let chain = &mut rest[0];
        let mut band = 0;
        while placed
            .iter()
            .any(|other| other.band == band && other.conflicts_with(chain, tolerance))
        {
            band += 1;
        }
        chain.band = band;
        chain.offset = config.dimension_first_offset + band as f64 * config.dimension_band_spacing;
    }
}

/// 某侧已占用的层数。
pub fn bands_on(chains: &[DimensionChain], side: ChainSide) -> usize {
    chains
        .iter()
        .filter(|chain| chain.side == side)
        .map(|chain| chain.band + 1)
        .max()
        .unwrap_or(0)
}

/// 为每段尺寸生成 DIMENSION 实体及其 `*D` 匿名块，返回尺寸数量。
pub fn emit_dimensions(
    document: &mut Document,
    chains: &[DimensionChain],
    plot: &Rect,
    config: &DraftingConfig,
    layer: &str,
) -> usize {
    let text_height = config.dimension_text_height;
    let mut count = 0;
    for chain in chains {
        let line = chain.line_position(plot);
        let sign = chain.side.outward_sign();
        for (a, b) in chain.spans() {
            count += 1;
            let block_name = format!("*D{count}");
            let measurement = (b - a).abs();
            let at = |along: f64, across: f64| {
                if chain.side.measures_x() {
                    Point2::new(along, across)
                } else {
                    Point2::new(across, along)
                }
            };
            let rotation = if chain.side.measures_x() { 0.0 } else { FRAC_PI_2 };
            let first_point = at(a, chain.base);
            let second_point = at(b, chain.base);
            let text_midpoint = at((a + b) * 0.5, line + sign * text_height * 0.75);

            let gap = text_height * 0.5;
            let mut graphics = vec![
                dimension_line(at(a, line), at(b, line), layer),
                dimension_line(at(a, chain.base + sign * gap), at(a, line + sign * gap), layer),
                dimension_line(at(b, chain.base + sign * gap), at(b, line + sign * gap), layer),
            ];
            for end in [at(a, line), at(b, line)] {
                graphics.push(tick(end, text_height * 0.5, layer));
            }
            graphics.push(Entity::Text(Text {
                insert: text_midpoint,
                content: format!("{measurement:.2}"),
                height: text_height,
                rotation,
                alignment: TextAlignment::MiddleCenter,
                layer: layer.to_string(),
            }));
            document.add_block_definition(BlockDefinition {
                name: block_name.clone(),
                base_point: Point2::new(0.0, 0.0),
                entities: graphics,
            });

            document.add_dimension(Dimension {
                kind: DimensionKind::Linear,
                definition_point: at(b, line),
                text_midpoint,
                first_point,
                second_point,
                text: None,
                measurement: Some(measurement),
                rotation,
                block_name: Some(block_name),
                layer: layer.to_string(),
            });
        }
    }
    debug!(chains = chains.len(), dimensions = count, "尺寸标注已输出");
    count
}

fn dimension_line(start: Point2, end: Point2, layer: &str) -> Entity {
    Entity::Line(Line {
        start,
        end,
        layer: layer.to_string(),
    })
}

/// 建筑制图常用的 45° 斜短划。
fn tick(center: Point2, half: f64, layer: &str) -> Entity {
    let (dx, dy) = (half * FRAC_PI_4.cos(), half * FRAC_PI_4.sin());
    dimension_line(
        Point2::new(center.x() - dx, center.y() - dy),
        Point2::new(center.x() + dx, center.y() + dy),
        layer,
    )
}
