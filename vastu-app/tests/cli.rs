use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn app(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("vastu-app").expect("应能找到 vastu-app 可执行文件");
    cmd.current_dir(workdir)
        .env_remove("VASTU_CONFIG")
        .env_remove("VASTU_PROJECT")
        .env_remove("RUST_LOG");
    cmd
}

const SMALL_PROJECT: &str = r#"
name = "Corner Plot"

[plot]
width = 10.0
depth = 8.0

[[rules.rooms]]
room = "Kitchen"
allowed_quadrants = ["SE"]
min_area = 9.0
"#;

#[test]
fn demo_dry_run_prints_report() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    app(dir.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo Residence"))
        .stdout(predicate::str::contains("Kitchen"))
        .stdout(predicate::str::contains("SHA-256"));
    assert!(!dir.path().join("floor_plan.dxf").exists());
}

#[test]
fn project_file_is_written_to_output() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let project = dir.path().join("corner.toml");
    fs::write(&project, SMALL_PROJECT).expect("写入项目文件失败");
    let output = dir.path().join("corner.dxf");

    app(dir.path())
        .arg("--project")
        .arg(&project)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Corner Plot"))
        .stdout(predicate::str::contains("SE"));

    let text = fs::read_to_string(&output).expect("应写出 DXF 文件");
    assert!(text.starts_with("  0\nSECTION\n  2\nHEADER\n"));
    assert!(text.ends_with("  0\nEOF\n"));
    assert!(text.contains("A-WALL"));
}

#[test]
fn default_output_path_comes_from_config() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[output]\ndefault_path = \"from-config.dxf\"\nunits = \"millimeters\"\n")
        .expect("写入配置文件失败");

    app(dir.path()).arg("--config").arg(&config).assert().success();

    let text = fs::read_to_string(dir.path().join("from-config.dxf")).expect("应按配置路径写出");
    assert!(text.contains("$INSUNITS\n 70\n4\n"));
}

#[test]
fn oversized_rooms_report_the_layout_stage() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let project = dir.path().join("tiny.json");
    fs::write(
        &project,
        r#"{ "name": "Tiny", "plot": { "width": 3.0, "depth": 3.0 },
             "rules": { "rooms": [ { "room": "Hall", "min_area": 20.0 } ] } }"#,
    )
    .expect("写入项目文件失败");

    app(dir.path())
        .arg("--project")
        .arg(&project)
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("layout"))
        .stderr(predicate::str::contains("plot too small"));
}

#[test]
fn strictness_outside_unit_range_is_rejected() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    app(dir.path())
        .args(["--strictness", "1.5", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[0, 1]"));
}

#[test]
fn missing_explicit_config_is_fatal() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    app(dir.path())
        .args(["--config", "absent.toml", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}
