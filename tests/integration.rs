use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn claimsight_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("claimsight");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // A stand-in image; the pipeline never inspects pixel data.
    fs::write(root.join("crash.png"), b"\x89PNG\r\n\x1a\nfake image bytes").unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/claimsight.sqlite"

[uploads]
dir = "{}/uploads"

[model]
provider = "disabled"

[server]
bind = "127.0.0.1:7431"
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("claimsight.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_claimsight(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = claimsight_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run claimsight binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_claimsight(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("claimsight.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_claimsight(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_claimsight(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_history_empty_on_fresh_database() {
    let (_tmp, config_path) = setup_test_env();

    run_claimsight(&config_path, &["init"]);
    let (stdout, stderr, success) = run_claimsight(&config_path, &["history"]);
    assert!(
        success,
        "history failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("No analyses recorded."));
}

#[test]
fn test_unknown_provider_rejected() {
    let (tmp, config_path) = setup_test_env();

    let config_content = format!(
        r#"[db]
path = "{}/data/claimsight.sqlite"

[model]
provider = "watson"
model = "watson-v1"

[server]
bind = "127.0.0.1:7431"
"#,
        tmp.path().display()
    );
    fs::write(&config_path, config_content).unwrap();

    let (_, stderr, success) = run_claimsight(&config_path, &["init"]);
    assert!(!success, "init should reject an unknown provider");
    assert!(stderr.contains("Unknown model provider"));
}

#[test]
fn test_enabled_provider_requires_model_name() {
    let (tmp, config_path) = setup_test_env();

    let config_content = format!(
        r#"[db]
path = "{}/data/claimsight.sqlite"

[model]
provider = "gemini"

[server]
bind = "127.0.0.1:7431"
"#,
        tmp.path().display()
    );
    fs::write(&config_path, config_content).unwrap();

    let (_, stderr, success) = run_claimsight(&config_path, &["init"]);
    assert!(!success, "init should require model.model for gemini");
    assert!(stderr.contains("model.model must be specified"));
}

#[test]
fn test_analyze_with_disabled_provider_fails_without_record() {
    let (tmp, config_path) = setup_test_env();

    run_claimsight(&config_path, &["init"]);

    let image = tmp.path().join("crash.png");
    let (_, stderr, success) =
        run_claimsight(&config_path, &["analyze", image.to_str().unwrap()]);
    assert!(!success, "analyze should fail when the provider is disabled");
    assert!(stderr.contains("disabled"), "stderr was: {}", stderr);

    // The failed attempt must not leave a persisted record behind.
    let (stdout, _, _) = run_claimsight(&config_path, &["history"]);
    assert!(stdout.contains("No analyses recorded."));
}
