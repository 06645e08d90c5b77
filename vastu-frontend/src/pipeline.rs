//! 布局 → 出图 → 写出 DXF 的完整流程。

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tracing::{info, warn};
use vastu_config::AppConfig;
use vastu_core::style::StyleTable;
use vastu_drafting::{Drawing, Emitter};
use vastu_engine::{Layout, LayoutOptimizer};
use vastu_io::{DocumentSaver, DxfFacade};

use crate::errors::FrontendError;
use crate::loader::Project;

/// 单次运行的覆盖参数。
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// 覆盖规则集与配置中的严格度。
    pub strictness: Option<f64>,
    /// 未给出时写到 `output.default_path`。
    pub output: Option<PathBuf>,
    /// 只布局和出图，不写文件。
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub layout: Layout,
    pub drawing: Drawing,
    pub strictness: f64,
    /// 序列化布局的 SHA-256，十六进制小写。
    pub fingerprint: String,
    pub written: Option<PathBuf>,
}

/// 严格度优先级：命令行覆盖 > 规则集 > 配置。规则集中的越界值即使被覆盖也视为项目错误。
fn resolve_strictness(
    project: &Project,
    config: &AppConfig,
    options: &PipelineOptions,
) -> Result<f64, FrontendError> {
    let from_rules = project
        .rules
        .strictness()
        .map_err(|err| FrontendError::project(&project.name, err.to_string()))?;
    if let Some(value) = options.strictness {
        if !(0.0..=1.0).contains(&value) {
            return Err(FrontendError::project(
                &project.name,
                format!("strictness override must be within [0, 1], got {value}"),
            ));
        }
        return Ok(value);
    }
    Ok(from_rules.unwrap_or(config.layout.strictness))
}

pub fn run_pipeline(
    project: &Project,
    config: &AppConfig,
    options: &PipelineOptions,
) -> Result<PipelineOutcome, FrontendError> {
    let plot = project.plot()?;
    let strictness = resolve_strictness(project, config, options)?;
    let requirements = project.requirements()?;

    let optimizer = LayoutOptimizer::new(config.layout.clone()).with_strictness(strictness);
    let layout = optimizer.optimize(&plot, &requirements)?;
    for diagnostic in &layout.diagnostics {
        warn!(room = diagnostic.room(), %diagnostic, "布局约束未完全满足");
    }
    let fingerprint = fingerprint(&layout)?;

    let styles = StyleTable::aia();
    let drawing = Emitter::new(&styles, &config.drafting, layout.wall_thickness)
        .with_title(project.name.as_str())
        .emit(&layout);

    let written = if options.dry_run {
        None
    } else {
        let path = options
            .output
            .clone()
            .unwrap_or_else(|| config.output.default_path.clone());
        DxfFacade::new()
            .with_units(config.output.units)
            .save(drawing.document(), &path)?;
        info!(path = %path.display(), "图纸已写出");
        Some(path)
    };

    info!(
        project = %project.name,
        rooms = layout.rooms.len(),
        diagnostics = layout.diagnostics.len(),
        fingerprint = %fingerprint,
        "流程完成"
    );

    Ok(PipelineOutcome {
        layout,
        drawing,
        strictness,
        fingerprint,
        written,
    })
}

/// 布局指纹：相同输入必须得到相同的指纹。
pub fn fingerprint(layout: &Layout) -> Result<String, FrontendError> {
    let bytes = serde_json::to_vec(layout).map_err(FrontendError::Snapshot)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Stage;
    use crate::loader::PlotSpec;
    use vastu_engine::rules::RoomRule;
    use vastu_engine::{LayoutError, RuleSet};
    use vastu_io::DocumentLoader;

    fn dry_run() -> PipelineOptions {
        PipelineOptions {
            dry_run: true,
            ..PipelineOptions::default()
        }
    }

    #[test]
    fn identical_input_gives_identical_fingerprint() {
        let project = Project::demo();
        let config = AppConfig::default();
        let first = run_pipeline(&project, &config, &dry_run()).expect("示例流程应成功");
        let second = run_pipeline(&project, &config, &dry_run()).expect("示例流程应成功");
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.fingerprint.len(), 64);
        assert_eq!(first.layout, second.layout);
        assert!(first.written.is_none());
    }

    #[test]
    fn strictness_override_wins_over_rules() {
        let mut project = Project::demo();
        project.rules.strictness = Some(0.3);
        let options = PipelineOptions {
            strictness: Some(0.2),
            ..dry_run()
        };
        let outcome = run_pipeline(&project, &AppConfig::default(), &options).expect("流程应成功");
        assert!((outcome.strictness - 0.2).abs() < 1e-12);

        let outcome = run_pipeline(&project, &AppConfig::default(), &dry_run()).expect("流程应成功");
        assert!((outcome.strictness - 0.3).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_override_fails_in_project_stage() {
        let options = PipelineOptions {
            strictness: Some(1.5),
            ..dry_run()
        };
        let err = run_pipeline(&Project::demo(), &AppConfig::default(), &options)
            .expect_err("严格度越界应失败");
        assert_eq!(err.stage(), Stage::Project);
    }

    #[test]
    fn out_of_range_rule_strictness_fails_in_project_stage() {
        let mut project = Project::demo();
        project.rules.strictness = Some(1.2);
        let err = run_pipeline(&project, &AppConfig::default(), &dry_run())
            .expect_err("规则集严格度越界应失败");
        assert_eq!(err.stage(), Stage::Project);
        assert!(matches!(err, FrontendError::Project { .. }));

        let options = PipelineOptions {
            strictness: Some(0.4),
            ..dry_run()
        };
        let err = run_pipeline(&project, &AppConfig::default(), &options)
            .expect_err("覆盖严格度不掩盖规则集错误");
        assert_eq!(err.stage(), Stage::Project);
    }

    #[test]
    fn oversized_rooms_fail_in_layout_stage() {
        let project = Project {
            name: "Tiny".to_string(),
            plot: PlotSpec::rectangle(3.0, 3.0),
            rules: RuleSet {
                strictness: None,
                rooms: vec![RoomRule {
                    room: "Hall".to_string(),
                    min_area: Some(20.0),
                    ..RoomRule::default()
                }],
            },
        };
        let err = run_pipeline(&project, &AppConfig::default(), &dry_run())
            .expect_err("房间面积超过地块时应失败");
        assert_eq!(err.stage(), Stage::Layout);
        assert!(matches!(
            err,
            FrontendError::Layout(LayoutError::PlotTooSmall { .. })
        ));
    }

    #[test]
    fn written_plan_reloads() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("demo.dxf");
        let options = PipelineOptions {
            output: Some(path.clone()),
            ..PipelineOptions::default()
        };
        let outcome = run_pipeline(&Project::demo(), &AppConfig::default(), &options)
            .expect("示例流程应成功");
        assert_eq!(outcome.written.as_deref(), Some(path.as_path()));

        let reloaded = DxfFacade::new().load(&path).expect("写出的 DXF 应可读回");
        assert_eq!(
            reloaded.entities().count(),
            outcome.drawing.document().entities().count()
        );
    }

    #[test]
    fn unwritable_output_fails_in_write_stage() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let options = PipelineOptions {
            output: Some(dir.path().join("missing").join("plan.dxf")),
            ..PipelineOptions::default()
        };
        let err = run_pipeline(&Project::demo(), &AppConfig::default(), &options)
            .expect_err("父目录不存在时应失败");
        assert_eq!(err.stage(), Stage::Write);
    }
}
