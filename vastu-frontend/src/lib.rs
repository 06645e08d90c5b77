pub mod cli;
pub mod errors;
pub mod loader;
pub mod pipeline;

pub use errors::{FrontendError, Stage};
pub use loader::{LoadedProject, PlotSpec, Project, ProjectSource};
pub use pipeline::{PipelineOptions, PipelineOutcome, run_pipeline};

use std::path::Path;

use tracing::info;
use vastu_config::AppConfig;

/// 运行项目流程并打印报告。
pub fn run_project(
    config: &AppConfig,
    project: Option<&Path>,
    options: &PipelineOptions,
) -> Result<PipelineOutcome, FrontendError> {
    info!(project = ?project, dry_run = options.dry_run, "启动 CLI 前端");
    cli::run(config, project, options)
}
