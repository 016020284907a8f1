use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn promptgpu(config_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_promptgpu"));
    command
        .env("PROMPTGPU_CONFIG_DIR", config_dir)
        .env_remove("PROMPTGPU_CONFIG")
        .env_remove("PROMPTGPU_ENDPOINT")
        .env("RUST_LOG", "warn");
    command
}

#[test]
fn config_path_honours_config_dir_override() {
    let root = TempDir::new().unwrap();
    let output = promptgpu(root.path())
        .args(["config", "path"])
        .output()
        .expect("failed to run promptgpu config path");

    assert!(output.status.success());
    let printed = String::from_utf8(output.stdout).unwrap();
    assert_eq!(printed.trim(), root.path().join("config.toml").display().to_string());
}

#[test]
fn config_check_accepts_valid_file() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("studio.toml");
    fs::write(
        &path,
        r#"
version = 1

[generation]
endpoint = "http://127.0.0.1:3000/api/generate"
model = "gpt4o"
timeout = "30s"

[heal]
max_attempts = 5
"#,
    )
    .unwrap();

    let output = promptgpu(root.path())
        .arg("config")
        .arg("check")
        .arg(&path)
        .output()
        .expect("failed to run promptgpu config check");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let printed = String::from_utf8(output.stdout).unwrap();
    assert!(printed.starts_with("config ok:"));
    assert!(printed.contains("model = \"gpt4o\""));
    assert!(printed.contains("max_attempts = 5"));
}

#[test]
fn config_check_rejects_unknown_keys() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("studio.toml");
    fs::write(&path, "[render]\nwidht = 640\n").unwrap();

    let status = promptgpu(root.path())
        .arg("config")
        .arg("check")
        .arg(&path)
        .status()
        .expect("failed to run promptgpu config check");

    assert!(!status.success());
}

#[test]
fn config_check_without_file_reports_defaults() {
    let root = TempDir::new().unwrap();
    let output = promptgpu(root.path())
        .args(["config", "check"])
        .output()
        .expect("failed to run promptgpu config check");

    assert!(output.status.success());
    let printed = String::from_utf8(output.stdout).unwrap();
    assert!(printed.contains("defaults apply"));
    assert!(printed.contains("width = 1280"));
}
