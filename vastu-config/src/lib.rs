use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV_VAR: &str = "VASTU_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub drafting: DraftingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// 从显式路径加载配置，并校验数值范围。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `VASTU_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 检查会让布局或出图失去意义的取值。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        check_range("layout.strictness", layout.strictness, 0.0, 1.0)?;
        check_positive("layout.wall_thickness", layout.wall_thickness)?;
        check_positive("layout.door_width", layout.door_width)?;
        check_range("layout.door_clearance", layout.door_clearance, 0.0, f64::MAX)?;
        check_positive("layout.min_touch_length", layout.min_touch_length)?;
        check_range("layout.distance_weight", layout.distance_weight, 0.0, 1.0)?;
        check_range("layout.rank_decay", layout.rank_decay, 0.0, 1.0)?;
        check_range("layout.relaxed_weight", layout.relaxed_weight, 0.0, 1.0)?;
        check_range("layout.middle_band_ratio", layout.middle_band_ratio, 0.05, 0.9)?;
        check_range("layout.default_max_aspect", layout.default_max_aspect, 1.0, f64::MAX)?;
        check_range("layout.area_growth", layout.area_growth, 1.0, f64::MAX)?;
        check_positive("layout.tolerance", layout.tolerance)?;
        if layout.search_resolution == 0 {
            return Err(ConfigError::Invalid {
                key: "layout.search_resolution",
                message: "必须至少为 1".to_string(),
            });
        }

        let drafting = &self.drafting;
        check_positive("drafting.hatch_spacing", drafting.hatch_spacing)?;
        check_positive("drafting.text_height_ratio", drafting.text_height_ratio)?;
        check_positive("drafting.min_text_height", drafting.min_text_height)?;
        check_range(
            "drafting.max_text_height",
            drafting.max_text_height,
            drafting.min_text_height,
            f64::MAX,
        )?;
        check_positive("drafting.dimension_first_offset", drafting.dimension_first_offset)?;
        check_positive("drafting.dimension_band_spacing", drafting.dimension_band_spacing)?;
        check_positive("drafting.dimension_text_height", drafting.dimension_text_height)?;
        check_positive("drafting.north_arrow_size", drafting.north_arrow_size)?;
        check_positive("drafting.merge_tolerance", drafting.merge_tolerance)?;
        Ok(())
    }
}

fn check_positive(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key,
            message: format!("必须为正数，实际为 {value}"),
        })
    }
}

fn check_range(key: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key,
            message: format!("取值 {value} 超出范围 [{min}, {max}]"),
        })
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 方位分区方案。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneScheme {
    /// 矩形地块用九宫格，其余用扇形。
    #[default]
    Auto,
    Grid,
    Wedge,
}

/// 布局优化参数。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayoutConfig {
    /// 方位规则的严格程度，1.0 表示不允许放宽。
    #[serde(default = "LayoutConfig::default_strictness")]
    pub strictness: f64,
    #[serde(default = "LayoutConfig::default_wall_thickness")]
    pub wall_thickness: f64,
    #[serde(default = "LayoutConfig::default_door_width")]
    pub door_width: f64,
    /// 门洞两侧至少保留的墙段长度之和。
    #[serde(default = "LayoutConfig::default_door_clearance")]
    pub door_clearance: f64,
    /// 判定"相邻"所需的最短共享边长度。
    #[serde(default = "LayoutConfig::default_min_touch_length")]
    pub min_touch_length: f64,
    #[serde(default = "LayoutConfig::default_distance_weight")]
    pub distance_weight: f64,
    #[serde(default = "LayoutConfig::default_rank_decay")]
    pub rank_decay: f64,
    #[serde(default = "LayoutConfig::default_relaxed_weight")]
    pub relaxed_weight: f64,
    #[serde(default = "LayoutConfig::default_search_resolution")]
    pub search_resolution: u32,
    #[serde(default = "LayoutConfig::default_middle_band_ratio")]
    pub middle_band_ratio: f64,
    #[serde(default = "LayoutConfig::default_max_aspect")]
    pub default_max_aspect: f64,
    #[serde(default = "LayoutConfig::default_area_growth")]
    pub area_growth: f64,
    #[serde(default)]
    pub zone_scheme: ZoneScheme,
    #[serde(default = "LayoutConfig::default_tolerance")]
    pub tolerance: f64,
}

impl LayoutConfig {
    fn default_strictness() -> f64 {
        0.5
    }

    fn default_wall_thickness() -> f64 {
        0.23
    }

    fn default_door_width() -> f64 {
        0.9
    }

    fn default_door_clearance() -> f64 {
        0.2
    }

    fn default_min_touch_length() -> f64 {
        1.0
    }

    fn default_distance_weight() -> f64 {
        0.25
    }

    fn default_rank_decay() -> f64 {
        0.15
    }

    fn default_relaxed_weight() -> f64 {
        0.5
    }

    fn default_search_resolution() -> u32 {
        8
    }

    fn default_middle_band_ratio() -> f64 {
        0.2
    }

    fn default_max_aspect() -> f64 {
        2.5
    }

    fn default_area_growth() -> f64 {
        1.5
    }

    fn default_tolerance() -> f64 {
        1e-6
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            strictness: Self::default_strictness(),
            wall_thickness: Self::default_wall_thickness(),
            door_width: Self::default_door_width(),
            door_clearance: Self::default_door_clearance(),
            min_touch_length: Self::default_min_touch_length(),
            distance_weight: Self::default_distance_weight(),
            rank_decay: Self::default_rank_decay(),
            relaxed_weight: Self::default_relaxed_weight(),
            search_resolution: Self::default_search_resolution(),
            middle_band_ratio: Self::default_middle_band_ratio(),
            default_max_aspect: Self::default_max_aspect(),
            area_growth: Self::default_area_growth(),
            zone_scheme: ZoneScheme::default(),
            tolerance: Self::default_tolerance(),
        }
    }
}

/// 出图参数：填充、文字、尺寸链与指北针。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DraftingConfig {
    /// 填充线角度（度）。
    #[serde(default = "DraftingConfig::default_hatch_angle")]
    pub hatch_angle: f64,
    #[serde(default = "DraftingConfig::default_hatch_spacing")]
    pub hatch_spacing: f64,
    #[serde(default = "DraftingConfig::default_text_height_ratio")]
    pub text_height_ratio: f64,
    #[serde(default = "DraftingConfig::default_min_text_height")]
    pub min_text_height: f64,
    #[serde(default = "DraftingConfig::default_max_text_height")]
    pub max_text_height: f64,
    #[serde(default = "DraftingConfig::default_dimension_first_offset")]
    pub dimension_first_offset: f64,
    #[serde(default = "DraftingConfig::default_dimension_band_spacing")]
    pub dimension_band_spacing: f64,
    #[serde(default = "DraftingConfig::default_dimension_text_height")]
    pub dimension_text_height: f64,
    #[serde(default = "DraftingConfig::default_north_arrow_size")]
    pub north_arrow_size: f64,
    /// 指北针中心到地块右边界的距离。
    #[serde(default = "DraftingConfig::default_north_arrow_margin")]
    pub north_arrow_margin: f64,
    #[serde(default = "DraftingConfig::default_merge_tolerance")]
    pub merge_tolerance: f64,
    #[serde(default = "DraftingConfig::default_show_title")]
    pub show_title: bool,
}

impl DraftingConfig {
    fn default_hatch_angle() -> f64 {
        45.0
    }

    fn default_hatch_spacing() -> f64 {
        0.05
    }

    fn default_text_height_ratio() -> f64 {
        0.08
    }

    fn default_min_text_height() -> f64 {
        0.15
    }

    fn default_max_text_height() -> f64 {
        0.35
    }

    fn default_dimension_first_offset() -> f64 {
        1.0
    }

    fn default_dimension_band_spacing() -> f64 {
        0.6
    }

    fn default_dimension_text_height() -> f64 {
        0.2
    }

    fn default_north_arrow_size() -> f64 {
        1.5
    }

    fn default_north_arrow_margin() -> f64 {
        2.0
    }

    fn default_merge_tolerance() -> f64 {
        1e-6
    }

    fn default_show_title() -> bool {
        true
    }
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            hatch_angle: Self::default_hatch_angle(),
            hatch_spacing: Self::default_hatch_spacing(),
            text_height_ratio: Self::default_text_height_ratio(),
            min_text_height: Self::default_min_text_height(),
            max_text_height: Self::default_max_text_height(),
            dimension_first_offset: Self::default_dimension_first_offset(),
            dimension_band_spacing: Self::default_dimension_band_spacing(),
            dimension_text_height: Self::default_dimension_text_height(),
            north_arrow_size: Self::default_north_arrow_size(),
            north_arrow_margin: Self::default_north_arrow_margin(),
            merge_tolerance: Self::default_merge_tolerance(),
            show_title: Self::default_show_title(),
        }
    }
}

/// 图纸单位，对应 DXF `$INSUNITS`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingUnits {
    Inches,
    Feet,
    Millimeters,
    Centimeters,
    #[default]
    Meters,
}

impl DrawingUnits {
    /// DXF `$INSUNITS` 代码。
    pub fn insunits(self) -> i16 {
        match self {
            DrawingUnits::Inches => 1,
            DrawingUnits::Feet => 2,
            DrawingUnits::Millimeters => 4,
            DrawingUnits::Centimeters => 5,
            DrawingUnits::Meters => 6,
        }
    }

    /// DXF `$MEASUREMENT`：0 英制，1 公制。
    pub fn measurement(self) -> i16 {
        match self {
            DrawingUnits::Inches | DrawingUnits::Feet => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub units: DrawingUnits,
    /// 未显式指定输出路径时使用的文件。
    #[serde(default = "OutputConfig::default_path")]
    pub default_path: PathBuf,
}

impl OutputConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("floor_plan.dxf")
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            units: DrawingUnits::default(),
            default_path: Self::default_path(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置项 {key} 无效: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
