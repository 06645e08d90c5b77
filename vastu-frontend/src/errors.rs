use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use vastu_engine::LayoutError;
use vastu_io::IoError;

/// 流水线阶段，用于在报告中指出失败位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Project,
    Layout,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Project => "project",
            Stage::Layout => "layout",
            Stage::Write => "write",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("读取项目文件 {path:?} 失败: {source}")]
    ProjectRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("项目 {origin} 无效: {reason}")]
    Project { origin: String, reason: String },
    #[error("布局失败: {0}")]
    Layout(#[from] LayoutError),
    #[error("序列化布局失败: {0}")]
    Snapshot(#[source] serde_json::Error),
    #[error("写出图纸失败: {0}")]
    Write(#[from] IoError),
}

impl FrontendError {
    pub(crate) fn project(origin: impl Into<String>, reason: impl fmt::Display) -> Self {
        FrontendError::Project {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            FrontendError::ProjectRead { .. } | FrontendError::Project { .. } => Stage::Project,
            FrontendError::Layout(_) | FrontendError::Snapshot(_) => Stage::Layout,
            FrontendError::Write(_) => Stage::Write,
        }
    }
}
