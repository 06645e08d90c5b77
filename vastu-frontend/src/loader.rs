use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vastu_core::geometry::{Point2, Polygon};
use vastu_engine::model::CardinalSide;
use vastu_engine::rules::RoomRule;
use vastu_engine::{LayoutError, Plot, RoomRequirement, RuleSet};

use crate::errors::FrontendError;

/// 指定项目文件路径的环境变量。
pub const PROJECT_ENV_VAR: &str = "VASTU_PROJECT";

/// 地块描述：给出 `width`/`depth` 的矩形，或按顺序排列的 `polygon` 顶点。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlotSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Vec<[f64; 2]>>,
    /// 真北相对 +Y 的顺时针角度（度）。
    #[serde(default)]
    pub north_angle: f64,
    #[serde(default)]
    pub entry: CardinalSide,
}

impl PlotSpec {
    pub fn rectangle(width: f64, depth: f64) -> Self {
        Self {
            width: Some(width),
            depth: Some(depth),
            ..Self::default()
        }
    }

    /// 构造地块；数值合法性留给布局阶段校验。
    pub fn to_plot(&self) -> Result<Plot, String> {
        let plot = match (&self.polygon, self.width, self.depth) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err("`polygon` 不能与 `width`/`depth` 同时给出".to_string());
            }
            (Some(points), None, None) => {
                if points.len() < 3 {
                    return Err(format!("`polygon` 至少需要 3 个顶点，实际 {}", points.len()));
                }
                let vertices = points.iter().map(|[x, y]| Point2::new(*x, *y)).collect();
                Plot::new(Polygon::new(vertices))
            }
            (None, Some(width), Some(depth)) => Plot::rectangle(width, depth),
            (None, _, _) => return Err("需要同时给出 `width` 与 `depth`，或给出 `polygon`".to_string()),
        };
        Ok(plot
            .with_north_angle(self.north_angle)
            .with_entry(self.entry))
    }
}

/// 项目文件：名称、地块与规则集。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    pub name: String,
    pub plot: PlotSpec,
    #[serde(default)]
    pub rules: RuleSet,
}

/// 项目文件格式，按扩展名识别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFormat {
    Json,
    Toml,
}

impl ProjectFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(ProjectFormat::Json),
            "toml" => Some(ProjectFormat::Toml),
            _ => None,
        }
    }
}

impl Project {
    pub fn parse(text: &str, format: ProjectFormat) -> Result<Self, String> {
        let project: Self = match format {
            ProjectFormat::Json => serde_json::from_str(text).map_err(|err| err.to_string())?,
            ProjectFormat::Toml => toml::from_str(text).map_err(|err| err.to_string())?,
        };
        if project.name.trim().is_empty() {
            return Err("项目名称不能为空".to_string());
        }
        Ok(project)
    }

    pub fn from_path(path: &Path) -> Result<Self, FrontendError> {
        let origin = path.display().to_string();
        let format = ProjectFormat::from_path(path)
            .ok_or_else(|| FrontendError::project(&origin, "仅支持 .json 或 .toml 项目文件"))?;
        let text = fs::read_to_string(path).map_err(|source| FrontendError::ProjectRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, format).map_err(|reason| FrontendError::project(origin, reason))
    }

    pub fn plot(&self) -> Result<Plot, FrontendError> {
        self.plot
            .to_plot()
            .map_err(|reason| FrontendError::project(&self.name, reason))
    }

    /// 规则集转换为布局需求；无效规则属于布局阶段的输入错误。
    pub fn requirements(&self) -> Result<Vec<RoomRequirement>, LayoutError> {
        self.rules.clone().into_requirements()
    }

    /// 内置示例：12×15 m 东向入口住宅。
    pub fn demo() -> Self {
        let room = |name: &str, zone: &str, min_area: f64| RoomRule {
            room: name.to_string(),
            allowed_quadrants: vec![zone.to_string()],
            min_area: Some(min_area),
            ..RoomRule::default()
        };
        let mut dining = room("Dining", "W", 9.0);
        dining.must_touch = vec!["Kitchen".to_string()];

        Self {
            name: "Demo Residence".to_string(),
            plot: PlotSpec {
                entry: CardinalSide::East,
                ..PlotSpec::rectangle(12.0, 15.0)
            },
            rules: RuleSet {
                strictness: None,
                rooms: vec![
                    room("Living", "NE", 16.0),
                    room("Kitchen", "SE", 9.0),
                    room("Master Bedroom", "SW", 14.0),
                    dining,
                    room("Toilet", "NW", 4.0),
                    room("Pooja", "NE", 2.0),
                ],
            },
        }
    }
}

/// 项目来源，便于报告中呈现加载信息。
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectSource {
    File(PathBuf),
    Demo,
}

#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub project: Project,
    pub source: ProjectSource,
}

/// 加载显式指定的项目文件，失败直接返回错误。
pub fn load_project(path: &Path) -> Result<LoadedProject, FrontendError> {
    let project = Project::from_path(path)?;
    info!(path = %path.display(), name = %project.name, rooms = project.rules.rooms.len(), "加载项目成功");
    Ok(LoadedProject {
        project,
        source: ProjectSource::File(path.to_path_buf()),
    })
}

/// 从环境变量 `VASTU_PROJECT` 指定的路径加载项目，
/// 若失败则回退到内置示例。
pub fn load_project_from_env_or_demo() -> LoadedProject {
    if let Some(path) = env::var_os(PROJECT_ENV_VAR) {
        let path = PathBuf::from(path);
        match load_project(&path) {
            Ok(loaded) => return loaded,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载项目失败，回退到内置示例");
            }
        }
    }

    LoadedProject {
        project: Project::demo(),
        source: ProjectSource::Demo,
    }
}
