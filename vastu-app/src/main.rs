use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use vastu_config::{AppConfig, ConfigError};
use vastu_frontend::PipelineOptions;

/// Vastu 平面布局与 DXF 出图。
#[derive(Debug, Parser)]
#[command(name = "vastu-app", version)]
struct Cli {
    /// 配置文件（TOML）；缺省时读取 `VASTU_CONFIG` 或 `./config/default.toml`。
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// 项目文件（.json / .toml）；缺省时读取 `VASTU_PROJECT`，再回退到内置示例。
    #[arg(long, value_name = "FILE")]
    project: Option<PathBuf>,
    /// 输出 DXF 路径，覆盖 `output.default_path`。
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// 方位规则严格度 [0, 1]，覆盖规则集与配置。
    #[arg(long, value_parser = parse_strictness)]
    strictness: Option<f64>,
    /// 只布局并打印报告，不写文件。
    #[arg(long)]
    dry_run: bool,
}

fn parse_strictness(value: &str) -> Result<f64, String> {
    let strictness: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` 不是数字"))?;
    if (0.0..=1.0).contains(&strictness) {
        Ok(strictness)
    } else {
        Err(format!("严格度必须位于 [0, 1]，实际为 {strictness}"))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "运行失败");
            eprintln!("错误：{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_configuration(cli.config.as_deref())?;
    init_logging(&config);
    info!("启动 Vastu 平面布局");

    let options = PipelineOptions {
        strictness: cli.strictness,
        output: cli.output,
        dry_run: cli.dry_run,
    };
    vastu_frontend::run_project(&config, cli.project.as_deref(), &options).map_err(|err| {
        let stage = err.stage();
        anyhow::Error::new(err).context(format!("{stage} 阶段失败"))
    })?;
    Ok(())
}

/// 显式指定的配置必须可用；自动发现失败时回退到内建默认值。
fn load_configuration(override_path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = override_path {
        return AppConfig::from_file(path)
            .with_context(|| format!("加载配置 {} 失败", path.display()));
    }
    match AppConfig::discover() {
        Ok(cfg) => Ok(cfg),
        Err(err) => {
            match &err {
                ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                    warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                }
                ConfigError::Invalid { .. } | ConfigError::Context { .. } => {
                    warn!(error = %err, "加载默认配置失败，使用内建默认值");
                }
            }
            Ok(AppConfig::default())
        }
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    // 标准输出留给报告。
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
