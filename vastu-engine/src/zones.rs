use tracing::{debug, warn};
use vastu_config::{LayoutConfig, ZoneScheme};
use vastu_core::geometry::{Point2, Polygon, Rect};

use crate::model::{CompassZone, Plot};

/// 一个方位分区的几何范围。楔形分区会扣除中心区。
#[derive(Debug, Clone)]
pub struct ZoneRegion {
    pub zone: CompassZone,
    shape: Polygon,
    hole: Option<Polygon>,
    bounds: Rect,
    rect: Option<Rect>,
}

impl ZoneRegion {
    fn from_rect(zone: CompassZone, rect: Rect) -> Self {
        Self {
            zone,
            shape: rect.to_polygon(),
            hole: None,
            bounds: rect,
            rect: Some(rect),
        }
    }

    fn from_polygon(
        zone: CompassZone,
        shape: Option<Polygon>,
        hole: Option<Polygon>,
        fallback: Point2,
    ) -> Self {
        let shape = shape.unwrap_or_else(|| Polygon::new(Vec::new()));
        let bounds = if shape.vertices().is_empty() {
            Rect::from_corners(fallback, fallback)
        } else {
            shape.bounds().to_rect()
        };
        Self {
            zone,
            shape,
            hole,
            bounds,
            rect: None,
        }
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// 分区本身是轴对齐矩形时返回该矩形。
    #[inline]
    pub fn as_rect(&self) -> Option<Rect> {
        self.rect
    }

    #[inline]
    pub fn shape(&self) -> &Polygon {
        &self.shape
    }

    pub fn area(&self) -> f64 {
        self.shape.area() - self.hole.as_ref().map_or(0.0, Polygon::area)
    }

    pub fn contains_rect(&self, rect: &Rect, tolerance: f64) -> bool {
        if let Some(region) = self.rect {
            return region.contains_rect(rect, tolerance);
        }
        self.shape.contains_rect(rect, tolerance)
            && self
                .hole
                .as_ref()
                .is_none_or(|hole| !hole.overlaps_rect_interior(rect, tolerance))
    }

    /// 矩形与分区内部是否有正面积重叠。
    pub fn overlaps_rect(&self, rect: &Rect, tolerance: f64) -> bool {
        if let Some(region) = self.rect {
            return region.overlaps_interior(rect, tolerance);
        }
        self.shape.overlaps_rect_interior(rect, tolerance)
            && self
                .hole
                .as_ref()
                .is_none_or(|hole| !hole.contains_rect(rect, tolerance))
    }

    pub fn contains_point(&self, point: Point2, tolerance: f64) -> bool {
        if let Some(region) = self.rect {
            return region.contains_point(point, tolerance);
        }
        self.shape.contains_point(point, tolerance)
            && self
                .hole
                .as_ref()
                .is_none_or(|hole| !hole.contains_point_strict(point, tolerance))
    }
}

/// 地块的九宫方位划分与各方位的参考点。
#[derive(Debug, Clone)]
pub struct ZoneMap {
    scheme: ZoneScheme,
    regions: Vec<ZoneRegion>,
    references: Vec<Point2>,
}

#[inline]
fn slot(zone: CompassZone) -> usize {
    zone.ring_index().unwrap_or(8)
}

/// 九宫格环形格子的顺时针位置（列, 行），从上中开始。
const GRID_RING_CELLS: [(usize, usize); 8] = [
    (1, 2),
    (2, 2),
    (2, 1),
    (2, 0),
    (1, 0),
    (0, 0),
    (0, 1),
    (0, 2),
];

impl ZoneMap {
    pub fn build(plot: &Plot, config: &LayoutConfig) -> Self {
        let plot_rect = plot.as_rect(config.tolerance);
        let scheme = match (config.zone_scheme, plot_rect) {
            (ZoneScheme::Auto, Some(_)) | (ZoneScheme::Grid, Some(_)) => ZoneScheme::Grid,
            (ZoneScheme::Grid, None) => {
                warn!("非矩形地块无法使用九宫格划分，改用扇形划分");
                ZoneScheme::Wedge
            }
            _ => ZoneScheme::Wedge,
        };

        let regions = match (scheme, plot_rect) {
            (ZoneScheme::Grid, Some(rect)) => {
                grid_regions(rect, plot.north_angle(), config.middle_band_ratio)
            }
            _ => wedge_regions(plot, config.middle_band_ratio),
        };
        let references = CompassZone::ALL
            .iter()
            .map(|zone| reference_point(plot, *zone))
            .collect();

        debug!(
            scheme = ?scheme,
            north_angle = plot.north_angle(),
            "方位分区完成"
        );
        Self {
            scheme,
            regions,
            references,
        }
    }

    /// 实际采用的划分方案（`Grid` 或 `Wedge`）。
    #[inline]
    pub fn scheme(&self) -> ZoneScheme {
        self.scheme
    }

    #[inline]
    pub fn region(&self, zone: CompassZone) -> &ZoneRegion {
        &self.regions[slot(zone)]
    }

    pub fn regions(&self) -> impl Iterator<Item = &ZoneRegion> {
        self.regions.iter()
    }

    /// 方位的评分参考点：斜向取该方向的最远顶点，正向取质心射线与边界交点，中心取质心。
    #[inline]
    pub fn reference_point(&self, zone: CompassZone) -> Point2 {
        self.references[slot(zone)]
    }

    /// 点所在的方位，中心区优先。
    pub fn zone_of(&self, point: Point2, tolerance: f64) -> Option<CompassZone> {
        std::iter::once(CompassZone::Center)
            .chain(CompassZone::RING)
            .find(|zone| self.region(*zone).contains_point(point, tolerance))
    }
}

fn grid_regions(rect: Rect, north_angle: f64, middle_band_ratio: f64) -> Vec<ZoneRegion> {
    let side = (1.0 - middle_band_ratio) * 0.5;
    let xs = [
        rect.min().x(),
        rect.min().x() + rect.width() * side,
        rect.max().x() - rect.width() * side,
        rect.max().x(),
    ];
    let ys = [
        rect.min().y(),
        rect.min().y() + rect.height() * side,
        rect.max().y() - rect.height() * side,
        rect.max().y(),
    ];
    let cell = |(col, row): (usize, usize)| Rect::new(xs[col], ys[row], xs[col + 1], ys[row + 1]);

    let shift = (north_angle / 45.0).round() as i64;
    let mut regions: Vec<ZoneRegion> = CompassZone::RING
        .iter()
        .enumerate()
        .map(|(index, zone)| {
            let position = (index as i64 + shift).rem_euclid(8) as usize;
            ZoneRegion::from_rect(*zone, cell(GRID_RING_CELLS[position]))
        })
        .collect();
    regions.push(ZoneRegion::from_rect(CompassZone::Center, cell((1, 1))));
    regions
}

fn wedge_regions(plot: &Plot, middle_band_ratio: f64) -> Vec<ZoneRegion> {
    let boundary = plot.boundary();
    let centroid = plot.centroid();
    let reach = 2.0 * plot.diagonal().max(1.0) / 22.5_f64.to_radians().cos();
    let center = boundary.scaled_about(centroid, middle_band_ratio);

    let mut regions: Vec<ZoneRegion> = CompassZone::RING
        .iter()
        .map(|zone| {
            let bearing = zone.bearing().unwrap_or(0.0);
            let wedge = Polygon::new(vec![
                centroid,
                centroid.translate(plot.direction_of(bearing - 22.5).scale(reach)),
                centroid.translate(plot.direction_of(bearing + 22.5).scale(reach)),
            ]);
            ZoneRegion::from_polygon(
                *zone,
                boundary.clip_convex(&wedge),
                center.clip_convex(&wedge),
                centroid,
            )
        })
        .collect();
    regions.push(ZoneRegion::from_polygon(
        CompassZone::Center,
        Some(center),
        None,
        centroid,
    ));
    regions
}

fn reference_point(plot: &Plot, zone: CompassZone) -> Point2 {
    let centroid = plot.centroid();
    let Some(bearing) = zone.bearing() else {
        return centroid;
    };
    let direction = plot.direction_of(bearing);
    let point = if zone.is_intercardinal() {
        plot.boundary().support_point(direction)
    } else {
        plot.boundary().ray_exit(centroid, direction)
    };
    point.unwrap_or(centroid)
}
