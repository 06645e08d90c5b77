use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vastu_core::geometry::{Point2, Polygon, Rect, RectSide, Segment, Vector2};

use crate::errors::{Diagnostic, LayoutError};

/// 罗盘方位分区：八个环形方位加中心（Brahmasthan）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompassZone {
    #[serde(rename = "N")]
    North,
    #[serde(rename = "NE")]
    NorthEast,
    #[serde(rename = "E")]
    East,
    #[serde(rename = "SE")]
    SouthEast,
    #[serde(rename = "S")]
    South,
    #[serde(rename = "SW")]
    SouthWest,
    #[serde(rename = "W")]
    West,
    #[serde(rename = "NW")]
    NorthWest,
    #[serde(rename = "CENTER")]
    Center,
}

impl CompassZone {
    /// 顺时针排列的环形方位，从正北开始。
    pub const RING: [CompassZone; 8] = [
        CompassZone::North,
        CompassZone::NorthEast,
        CompassZone::East,
        CompassZone::SouthEast,
        CompassZone::South,
        CompassZone::SouthWest,
        CompassZone::West,
        CompassZone::NorthWest,
    ];

    pub const ALL: [CompassZone; 9] = [
        CompassZone::North,
        CompassZone::NorthEast,
        CompassZone::East,
        CompassZone::SouthEast,
        CompassZone::South,
        CompassZone::SouthWest,
        CompassZone::West,
        CompassZone::NorthWest,
        CompassZone::Center,
    ];

    /// 环上任意两个方位之间的最大跳数。
    pub const RING_HOPS: usize = 4;

    #[inline]
    pub fn ring_index(self) -> Option<usize> {
        Self::RING.iter().position(|zone| *zone == self)
    }

    /// 方位角（度，自真北顺时针）；中心无方位角。
    pub fn bearing(self) -> Option<f64> {
        self.ring_index().map(|index| index as f64 * 45.0)
    }

    #[inline]
    pub fn is_intercardinal(self) -> bool {
        matches!(
            self,
            CompassZone::NorthEast
                | CompassZone::SouthEast
                | CompassZone::SouthWest
                | CompassZone::NorthWest
        )
    }

    /// 沿环顺时针移动 `steps` 步（负数为逆时针），中心保持不变。
    pub fn clockwise(self, steps: i32) -> Self {
        match self.ring_index() {
            Some(index) => Self::RING[(index as i32 + steps).rem_euclid(8) as usize],
            None => self,
        }
    }

    /// 两个环形方位之间的最短跳数；涉及中心时返回 None。
    pub fn ring_distance(self, other: CompassZone) -> Option<usize> {
        let a = self.ring_index()?;
        let b = other.ring_index()?;
        let diff = a.abs_diff(b);
        Some(diff.min(8 - diff))
    }

    pub fn label(self) -> &'static str {
        match self {
            CompassZone::North => "N",
            CompassZone::NorthEast => "NE",
            CompassZone::East => "E",
            CompassZone::SouthEast => "SE",
            CompassZone::South => "S",
            CompassZone::SouthWest => "SW",
            CompassZone::West => "W",
            CompassZone::NorthWest => "NW",
            CompassZone::Center => "CENTER",
        }
    }
}

impl fmt::Display for CompassZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown compass zone `{0}`")]
pub struct ParseZoneError(pub String);

impl FromStr for CompassZone {
    type Err = ParseZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_uppercase();
        let zone = match key.as_str() {
            "N" | "NORTH" => CompassZone::North,
            "NE" | "NORTHEAST" => CompassZone::NorthEast,
            "E" | "EAST" => CompassZone::East,
            "SE" | "SOUTHEAST" => CompassZone::SouthEast,
            "S" | "SOUTH" => CompassZone::South,
            "SW" | "SOUTHWEST" => CompassZone::SouthWest,
            "W" | "WEST" => CompassZone::West,
            "NW" | "NORTHWEST" => CompassZone::NorthWest,
            "C" | "CENTER" | "CENTRE" | "BRAHMASTHAN" => CompassZone::Center,
            _ => return Err(ParseZoneError(s.to_string())),
        };
        Ok(zone)
    }
}

/// 主入口所在的罗盘方向。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardinalSide {
    #[serde(rename = "N", alias = "north")]
    North,
    #[serde(rename = "E", alias = "east")]
    East,
    #[default]
    #[serde(rename = "S", alias = "south")]
    South,
    #[serde(rename = "W", alias = "west")]
    West,
}

impl CardinalSide {
    pub fn bearing(self) -> f64 {
        match self {
            CardinalSide::North => 0.0,
            CardinalSide::East => 90.0,
            CardinalSide::South => 180.0,
            CardinalSide::West => 270.0,
        }
    }
}

/// 地块：外边界、真北方向与入口方向。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    boundary: Polygon,
    /// 真北相对地块 +Y 轴的顺时针角度（度）。
    north_angle: f64,
    entry: CardinalSide,
}

impl Plot {
    pub fn new(boundary: Polygon) -> Self {
        Self {
            boundary,
            north_angle: 0.0,
            entry: CardinalSide::default(),
        }
    }

    /// 以原点为左下角的矩形地块。
    pub fn rectangle(width: f64, depth: f64) -> Self {
        Self::new(Rect::new(0.0, 0.0, width, depth).to_polygon())
    }

    pub fn with_north_angle(mut self, degrees: f64) -> Self {
        self.north_angle = degrees;
        self
    }

    pub fn with_entry(mut self, entry: CardinalSide) -> Self {
        self.entry = entry;
        self
    }

    #[inline]
    pub fn boundary(&self) -> &Polygon {
        &self.boundary
    }

    #[inline]
    pub fn north_angle(&self) -> f64 {
        self.north_angle
    }

    #[inline]
    pub fn entry(&self) -> CardinalSide {
        self.entry
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.boundary.area()
    }

    #[inline]
    pub fn centroid(&self) -> Point2 {
        self.boundary.centroid()
    }

    #[inline]
    pub fn bounds_rect(&self) -> Rect {
        self.boundary.bounds().to_rect()
    }

    #[inline]
    pub fn as_rect(&self, tolerance: f64) -> Option<Rect> {
        self.boundary.as_axis_aligned_rect(tolerance)
    }

    pub fn diagonal(&self) -> f64 {
        let rect = self.bounds_rect();
        rect.min().distance_to(rect.max())
    }

    /// 边界必须是简单多边形、面积为正且坐标有限。
    pub fn validate(&self) -> Result<(), LayoutError> {
        let invalid = |reason: &str| LayoutError::InvalidPlot {
            reason: reason.to_string(),
        };
        if !self.north_angle.is_finite() {
            return Err(invalid("north angle must be finite"));
        }
        if self.boundary.vertices().len() < 3 {
            return Err(invalid("boundary needs at least three vertices"));
        }
        if self
            .boundary
            .vertices()
            .iter()
            .any(|p| !p.x().is_finite() || !p.y().is_finite())
        {
            return Err(invalid("boundary coordinates must be finite"));
        }
        if self.boundary.area() <= f64::EPSILON {
            return Err(invalid("boundary has no area"));
        }
        if !self.boundary.is_simple() {
            return Err(invalid("boundary intersects itself"));
        }
        Ok(())
    }

    /// 罗盘方位角在地块坐标系中的单位方向。
    pub fn direction_of(&self, bearing: f64) -> Vector2 {
        Vector2::from_bearing_degrees(self.north_angle + bearing)
    }

    /// 外法线最接近入口方向的边界边。
    pub fn entry_edge(&self) -> Option<Segment> {
        let target = self.direction_of(self.entry.bearing());
        let ccw = self.boundary.signed_area() > 0.0;
        let mut best: Option<(f64, f64, Segment)> = None;
        for edge in self.boundary.edges() {
            let Some(dir) = edge.direction() else {
                continue;
            };
            let outward = if ccw {
                Vector2::new(dir.y(), -dir.x())
            } else {
                Vector2::new(-dir.y(), dir.x())
            };
            let alignment = outward.dot(target);
            let length = edge.length();
            let better = match best {
                None => true,
                Some((best_alignment, best_length, _)) => {
                    alignment > best_alignment + 1e-9
                        || ((alignment - best_alignment).abs() <= 1e-9 && length > best_length)
                }
            };
            if better {
                best = Some((alignment, length, edge));
            }
        }
        best.map(|(_, _, edge)| edge)
    }

    /// 线段与地块边界共线重叠的部分。
    pub fn boundary_overlaps(&self, segment: &Segment, tolerance: f64) -> Vec<Segment> {
        self.boundary
            .edges()
            .filter_map(|edge| segment.collinear_overlap(&edge, tolerance))
            .collect()
    }
}

/// 房间类别，用于套用默认方位规则。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomCategory {
    Kitchen,
    MasterBedroom,
    Bedroom,
    Living,
    Dining,
    Toilet,
    Bathroom,
    Pooja,
    Study,
    Staircase,
    Store,
    Entrance,
    Garage,
    Utility,
    #[default]
    Other,
}

static CATEGORY_PATTERNS: Lazy<Vec<(Regex, RoomCategory)>> = Lazy::new(|| {
    [
        (r"(?i)\b(toilet|wc|powder|lavatory)", RoomCategory::Toilet),
        (r"(?i)\bbath", RoomCategory::Bathroom),
        (r"(?i)\bmaster", RoomCategory::MasterBedroom),
        (r"(?i)\b(kitchen|pantry)", RoomCategory::Kitchen),
        (r"(?i)\b(bed|guest|kids)", RoomCategory::Bedroom),
        (r"(?i)\b(living|lounge|drawing|family|hall)", RoomCategory::Living),
        (r"(?i)\bdining", RoomCategory::Dining),
        (r"(?i)\b(pooja|puja|prayer|mandir|temple)", RoomCategory::Pooja),
        (r"(?i)\b(study|office|library)", RoomCategory::Study),
        (r"(?i)\bstair", RoomCategory::Staircase),
        (r"(?i)\b(store|storage)", RoomCategory::Store),
        (r"(?i)\b(foyer|entrance|entry|lobby)", RoomCategory::Entrance),
        (r"(?i)\b(garage|parking|porch)", RoomCategory::Garage),
        (r"(?i)\b(utility|laundry|wash)", RoomCategory::Utility),
    ]
    .into_iter()
    .filter_map(|(pattern, category)| Regex::new(pattern).ok().map(|re| (re, category)))
    .collect()
});

impl RoomCategory {
    /// 按房间名关键字推断类别，无法识别时为 `Other`。
    pub fn infer(name: &str) -> Self {
        CATEGORY_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.is_match(name))
            .map(|(_, category)| *category)
            .unwrap_or_default()
    }

    /// 解析类别名（不区分大小写，允许空格/连字符）。
    pub fn parse(name: &str) -> Option<Self> {
        let key: String = name
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        let category = match key.as_str() {
            "kitchen" => RoomCategory::Kitchen,
            "masterbedroom" | "master" => RoomCategory::MasterBedroom,
            "bedroom" => RoomCategory::Bedroom,
            "living" | "livingroom" => RoomCategory::Living,
            "dining" => RoomCategory::Dining,
            "toilet" => RoomCategory::Toilet,
            "bathroom" | "bath" => RoomCategory::Bathroom,
            "pooja" | "puja" => RoomCategory::Pooja,
            "study" => RoomCategory::Study,
            "staircase" | "stairs" => RoomCategory::Staircase,
            "store" | "storage" => RoomCategory::Store,
            "entrance" | "foyer" => RoomCategory::Entrance,
            "garage" | "parking" => RoomCategory::Garage,
            "utility" => RoomCategory::Utility,
            "other" => RoomCategory::Other,
            _ => return None,
        };
        Some(category)
    }

    /// Vastu 默认首选方位（按优先顺序）。
    pub fn default_zones(self) -> &'static [CompassZone] {
        use CompassZone::*;
        match self {
            RoomCategory::Kitchen => &[SouthEast, NorthWest],
            RoomCategory::MasterBedroom => &[SouthWest],
            RoomCategory::Bedroom => &[SouthWest, South, West, NorthWest],
            RoomCategory::Living => &[NorthEast, North, East],
            RoomCategory::Dining => &[West, East],
            RoomCategory::Toilet => &[NorthWest, West],
            RoomCategory::Bathroom => &[East, NorthWest],
            RoomCategory::Pooja => &[NorthEast, East],
            RoomCategory::Study => &[West, North],
            RoomCategory::Staircase => &[South, West, SouthWest],
            RoomCategory::Store => &[SouthWest, South],
            RoomCategory::Entrance => &[North, East, NorthEast],
            RoomCategory::Garage => &[SouthEast, NorthWest],
            RoomCategory::Utility => &[NorthWest],
            RoomCategory::Other => &[],
        }
    }

    /// Vastu 默认禁止方位。
    pub fn default_exclusions(self) -> &'static [CompassZone] {
        use CompassZone::*;
        match self {
            RoomCategory::Kitchen => &[NorthEast],
            RoomCategory::Toilet | RoomCategory::Bathroom => &[NorthEast, Center],
            RoomCategory::Staircase | RoomCategory::Store => &[NorthEast, Center],
            RoomCategory::Pooja => &[South, SouthWest],
            _ => &[],
        }
    }
}

/// 首选方位及其合规权重，未指定权重时按排名衰减。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZonePreference {
    pub zone: CompassZone,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// 单个房间的布局约束，布局开始后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRequirement {
    pub name: String,
    pub category: RoomCategory,
    pub preferred_zones: Vec<ZonePreference>,
    pub excluded_zones: Vec<CompassZone>,
    pub min_area: f64,
    pub max_area: Option<f64>,
    pub min_aspect: f64,
    pub max_aspect: Option<f64>,
    pub adjacent_to: Vec<String>,
    /// 1 最关键，5 可选。
    pub priority: u8,
    pub is_entrance: bool,
}

impl RoomRequirement {
    pub const DEFAULT_PRIORITY: u8 = 3;

    pub fn new(name: impl Into<String>, category: RoomCategory, min_area: f64) -> Self {
        Self {
            name: name.into(),
            category,
            preferred_zones: Vec::new(),
            excluded_zones: Vec::new(),
            min_area,
            max_area: None,
            min_aspect: 1.0,
            max_aspect: None,
            adjacent_to: Vec::new(),
            priority: Self::DEFAULT_PRIORITY,
            is_entrance: false,
        }
    }

    pub fn prefer(mut self, zone: CompassZone) -> Self {
        self.preferred_zones.push(ZonePreference { zone, weight: None });
        self
    }

    pub fn prefer_weighted(mut self, zone: CompassZone, weight: f64) -> Self {
        self.preferred_zones.push(ZonePreference {
            zone,
            weight: Some(weight),
        });
        self
    }

    pub fn exclude(mut self, zone: CompassZone) -> Self {
        self.excluded_zones.push(zone);
        self
    }

    pub fn with_max_area(mut self, max_area: f64) -> Self {
        self.max_area = Some(max_area);
        self
    }

    pub fn with_aspect(mut self, min: f64, max: f64) -> Self {
        self.min_aspect = min;
        self.max_aspect = Some(max);
        self
    }

    pub fn must_touch(mut self, room: impl Into<String>) -> Self {
        self.adjacent_to.push(room.into());
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn entrance(mut self) -> Self {
        self.is_entrance = true;
        self
    }

    #[inline]
    pub fn is_zoned(&self) -> bool {
        !self.preferred_zones.is_empty()
    }

    /// 实际使用的最大面积：显式值或 `min_area × growth`。
    pub fn resolved_max_area(&self, growth: f64) -> f64 {
        self.max_area.unwrap_or(self.min_area * growth)
    }

    pub fn resolved_max_aspect(&self, default: f64) -> f64 {
        self.max_aspect.unwrap_or(default.max(self.min_aspect))
    }

    pub fn rank_of(&self, zone: CompassZone) -> Option<usize> {
        self.preferred_zones.iter().position(|pref| pref.zone == zone)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        let fail = |reason: String| Err(LayoutError::invalid_requirement(&self.name, reason));
        if self.name.trim().is_empty() {
            return fail("room name is empty".to_string());
        }
        if !self.min_area.is_finite() || self.min_area <= 0.0 {
            return fail(format!("min_area must be positive, got {}", self.min_area));
        }
        if let Some(max_area) = self.max_area {
            if !max_area.is_finite() || max_area < self.min_area {
                return fail(format!(
                    "max_area {max_area} is below min_area {}",
                    self.min_area
                ));
            }
        }
        if !self.min_aspect.is_finite() || self.min_aspect < 1.0 {
            return fail(format!("min aspect must be at least 1, got {}", self.min_aspect));
        }
        if let Some(max_aspect) = self.max_aspect {
            if !max_aspect.is_finite() || max_aspect < self.min_aspect {
                return fail(format!(
                    "aspect range [{}, {max_aspect}] is empty",
                    self.min_aspect
                ));
            }
        }
        if !(1..=5).contains(&self.priority) {
            return fail(format!("priority must be within 1..=5, got {}", self.priority));
        }
        for (index, pref) in self.preferred_zones.iter().enumerate() {
            if let Some(weight) = pref.weight {
                if !weight.is_finite() || weight <= 0.0 || weight > 1.0 {
                    return fail(format!("weight for zone {} must be in (0, 1]", pref.zone));
                }
            }
            if self.preferred_zones[..index]
                .iter()
                .any(|earlier| earlier.zone == pref.zone)
            {
                return fail(format!("zone {} is listed twice", pref.zone));
            }
            if self.excluded_zones.contains(&pref.zone) {
                return fail(format!("zone {} is both preferred and excluded", pref.zone));
            }
        }
        if self
            .adjacent_to
            .iter()
            .any(|target| target.eq_ignore_ascii_case(&self.name))
        {
            return fail("room cannot be adjacent to itself".to_string());
        }
        Ok(())
    }
}

/// 校验整组需求：逐项校验、名称唯一、相邻目标存在。
pub fn validate_requirements(requirements: &[RoomRequirement]) -> Result<(), LayoutError> {
    for (index, requirement) in requirements.iter().enumerate() {
        requirement.validate()?;
        if requirements[..index]
            .iter()
            .any(|other| other.name.eq_ignore_ascii_case(&requirement.name))
        {
            return Err(LayoutError::invalid_requirement(
                &requirement.name,
                "duplicate room name",
            ));
        }
    }
    for requirement in requirements {
        for target in &requirement.adjacent_to {
            if !requirements
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(target))
            {
                return Err(LayoutError::invalid_requirement(
                    &requirement.name,
                    format!("adjacency target `{target}` is not a listed room"),
                ));
            }
        }
    }
    Ok(())
}

/// 房间放置的合规等级。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum ComplianceLevel {
    /// 位于第 `rank` 个首选方位（0 为最优）。
    Preferred { rank: usize },
    /// 放宽 `hops` 级后的方位。
    Relaxed { hops: usize },
    /// 放宽到整个地块。
    OpenPlot,
    /// 无方位要求。
    Unzoned,
}

impl ComplianceLevel {
    #[inline]
    pub fn is_degraded(self) -> bool {
        matches!(self, ComplianceLevel::Relaxed { .. } | ComplianceLevel::OpenPlot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Compliance {
    pub zone: Option<CompassZone>,
    pub level: ComplianceLevel,
    pub score: f64,
}

/// 房间四周的墙体中心线（已向内偏移半个墙厚）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WallSegment {
    pub side: RectSide,
    pub centerline: Segment,
    pub thickness: f64,
    pub is_exterior: bool,
}

/// 门洞另一侧的空间。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "room", rename_all = "snake_case")]
pub enum Adjoining {
    Room(usize),
    Circulation,
    Exterior,
}

/// 房间边上的门洞，`offset` 为门洞中心沿边（逆时针方向）距起点的距离。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Opening {
    pub side: RectSide,
    pub offset: f64,
    pub width: f64,
    pub adjoining: Adjoining,
}

impl Opening {
    pub fn segment(&self, rect: &Rect) -> Segment {
        let side = rect.side(self.side);
        let length = side.length();
        let half = self.width * 0.5;
        let t0 = ((self.offset - half) / length).clamp(0.0, 1.0);
        let t1 = ((self.offset + half) / length).clamp(0.0, 1.0);
        Segment::new(side.point_at(t0), side.point_at(t1))
    }

    pub fn center(&self, rect: &Rect) -> Point2 {
        self.segment(rect).midpoint()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedRoom {
    /// 在需求列表中的下标。
    pub index: usize,
    pub requirement: RoomRequirement,
    pub rect: Rect,
    pub compliance: Compliance,
    pub walls: Vec<WallSegment>,
    pub openings: Vec<Opening>,
    pub unsatisfied_adjacency: Vec<String>,
}

impl PlacedRoom {
    #[inline]
    pub fn name(&self) -> &str {
        &self.requirement.name
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.rect.area()
    }

    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.compliance.level.is_degraded()
    }
}

/// 优化结果：按需求顺序排列的房间与诊断信息。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub plot: Plot,
    pub rooms: Vec<PlacedRoom>,
    pub diagnostics: Vec<Diagnostic>,
    pub wall_thickness: f64,
}

impl Layout {
    pub fn room(&self, name: &str) -> Option<&PlacedRoom> {
        self.rooms
            .iter()
            .find(|room| room.name().eq_ignore_ascii_case(name))
    }

    pub fn is_degraded(&self) -> bool {
        self.rooms.iter().any(PlacedRoom::is_degraded)
    }

    /// 各房间合规分数的平均值。
    pub fn mean_score(&self) -> f64 {
        if self.rooms.is_empty() {
            return 0.0;
        }
        self.rooms.iter().map(|room| room.compliance.score).sum::<f64>() / self.rooms.len() as f64
    }

    /// 未分配给房间的面积，作为交通空间。
    pub fn circulation_area(&self) -> f64 {
        let used: f64 = self.rooms.iter().map(PlacedRoom::area).sum();
        (self.plot.area() - used).max(0.0)
    }
}
