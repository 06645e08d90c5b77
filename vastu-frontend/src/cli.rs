use std::fmt::Write as _;
use std::path::Path;

use tracing::info;
use vastu_config::AppConfig;
use vastu_engine::model::{ComplianceLevel, PlacedRoom};

use crate::errors::FrontendError;
use crate::loader::{LoadedProject, ProjectSource, load_project, load_project_from_env_or_demo};
use crate::pipeline::{PipelineOptions, PipelineOutcome, run_pipeline};

/// 加载项目并运行完整流程，把文本报告打印到标准输出。
/// 未指定项目文件时读取 `VASTU_PROJECT`，再回退到内置示例。
pub fn run(
    config: &AppConfig,
    project: Option<&Path>,
    options: &PipelineOptions,
) -> Result<PipelineOutcome, FrontendError> {
    let loaded = match project {
        Some(path) => load_project(path)?,
        None => load_project_from_env_or_demo(),
    };
    let outcome = run_pipeline(&loaded.project, config, options)?;

    let document = outcome.drawing.document();
    info!(
        layer_count = document.layers().count(),
        entity_count = document.entities().count(),
        block_count = document.blocks().count(),
        "图纸统计"
    );
    print!("{}", render_report(&loaded, &outcome));
    Ok(outcome)
}

/// 生成项目报告：地块、房间方位与合规、诊断、指纹与输出文件。
pub fn render_report(loaded: &LoadedProject, outcome: &PipelineOutcome) -> String {
    let mut out = String::new();
    let layout = &outcome.layout;
    let plot = &layout.plot;
    let bounds = plot.bounds_rect();

    let _ = writeln!(out, "Vastu 平面布局：{}", loaded.project.name);
    match &loaded.source {
        ProjectSource::File(path) => {
            let _ = writeln!(out, "项目文件：{}", path.display());
        }
        ProjectSource::Demo => {
            let _ = writeln!(out, "项目文件：内置示例");
        }
    }
    let _ = writeln!(
        out,
        "地块：{:.2} × {:.2} m，面积 {:.2} m²，真北偏角 {:.1}°，入口 {:?}",
        bounds.width(),
        bounds.height(),
        plot.area(),
        plot.north_angle(),
        plot.entry()
    );
    let _ = writeln!(out, "严格度：{:.2}", outcome.strictness);

    let _ = writeln!(out, "房间：");
    for room in &layout.rooms {
        let _ = writeln!(out, "  - {}", describe_room(room));
    }
    let _ = writeln!(out, "平均合规分数：{:.3}", layout.mean_score());
    let _ = writeln!(out, "交通面积：{:.2} m²", layout.circulation_area());

    if layout.diagnostics.is_empty() {
        let _ = writeln!(out, "诊断：无");
    } else {
        let _ = writeln!(out, "诊断：");
        for diagnostic in &layout.diagnostics {
            let _ = writeln!(out, "  - {diagnostic}");
        }
    }

    let _ = writeln!(out, "布局指纹 (SHA-256)：{}", outcome.fingerprint);
    let document = outcome.drawing.document();
    match &outcome.written {
        Some(path) => {
            let _ = writeln!(
                out,
                "图纸：{}（{} 个图层，{} 个实体）",
                path.display(),
                document.layers().count(),
                document.entities().count()
            );
        }
        None => {
            let _ = writeln!(out, "图纸：未写出（dry run）");
        }
    }
    out
}

fn describe_room(room: &PlacedRoom) -> String {
    let rect = room.rect;
    let zone = room
        .compliance
        .zone
        .map(|zone| zone.label())
        .unwrap_or("-");
    format!(
        "{} [{:?}] {} ({:.2}, {:.2}) {:.2}×{:.2} = {:.2} m², {}，分数 {:.2}",
        room.name(),
        room.requirement.category,
        zone,
        rect.min().x(),
        rect.min().y(),
        rect.width(),
        rect.height(),
        room.area(),
        compliance_label(room.compliance.level),
        room.compliance.score
    )
}

fn compliance_label(level: ComplianceLevel) -> String {
    match level {
        ComplianceLevel::Preferred { rank: 0 } => "首选方位".to_string(),
        ComplianceLevel::Preferred { rank } => format!("第 {} 首选方位", rank + 1),
        ComplianceLevel::Relaxed { hops } => format!("放宽 {hops} 级"),
        ComplianceLevel::OpenPlot => "放宽至整块地".to_string(),
        ComplianceLevel::Unzoned => "无方位要求".to_string(),
    }
}
