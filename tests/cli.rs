use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn trk_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("trk");
    path
}

fn setup_test_env(location: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[storage]
location = "{}"
local_path = "{}/data/progress.json"
timeout_secs = 2

[server]
bind = "127.0.0.1:0"
"#,
        location,
        root.display()
    );

    let config_path = config_dir.join("trk.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn progress_file(tmp: &TempDir) -> PathBuf {
    tmp.path().join("data/progress.json")
}

fn run_trk(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = trk_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--notices")
        .arg("json")
        .args(args)
        .env_remove("SKILLTRACK_LOCATION")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run trk binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_status_on_fresh_install() {
    let (tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_trk(&config_path, &["status"]);
    assert!(success, "status failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Overall:     0.0%"), "{}", stdout);
    assert!(stdout.contains("Completed:   0/189 tasks"), "{}", stdout);
    assert!(stdout.contains("Cloud & Infrastructure") || stdout.contains("Cloud"));
    assert!(stderr.is_empty(), "unexpected notices: {}", stderr);
    assert!(!progress_file(&tmp).exists(), "status must not write");
}

#[test]
fn test_check_updates_status() {
    let (tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_trk(&config_path, &["check", "linux_basic_commands"]);
    assert!(success, "check failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Checked 1 task(s)"));

    // linux: 1/10 → foundations: 0.1 / 6 subsections → overall: / 5 sections
    let (stdout, _, _) = run_trk(&config_path, &["status"]);
    assert!(stdout.contains("Overall:     0.3%"), "{}", stdout);
    assert!(stdout.contains("Completed:   1/189 tasks"), "{}", stdout);
    assert!(stdout.contains("1.7%"), "{}", stdout);

    let saved: serde_json::Value =
        serde_json::from_slice(&fs::read(progress_file(&tmp)).unwrap()).unwrap();
    assert_eq!(saved["linux_basic_commands"], serde_json::json!(true));
}

#[test]
fn test_uncheck_keeps_key_as_false() {
    let (tmp, config_path) = setup_test_env("");

    run_trk(&config_path, &["check", "docker_dockerfile", "docker_docker_compose"]);
    let (_, stderr, success) = run_trk(&config_path, &["uncheck", "docker_dockerfile"]);
    assert!(success, "uncheck failed: {}", stderr);

    let saved: serde_json::Value =
        serde_json::from_slice(&fs::read(progress_file(&tmp)).unwrap()).unwrap();
    assert_eq!(saved["docker_dockerfile"], serde_json::json!(false));
    assert_eq!(saved["docker_docker_compose"], serde_json::json!(true));

    let (stdout, _, _) = run_trk(&config_path, &["show", "docker"]);
    assert!(stdout.contains("[ ] "));
    assert!(stdout.contains("[x] "));
    assert!(!stdout.contains("Linux Fundamentals"));
}

#[test]
fn test_check_unknown_key_fails_without_writing() {
    let (tmp, config_path) = setup_test_env("");

    let (_, stderr, success) = run_trk(&config_path, &["check", "linux_not_a_task"]);
    assert!(!success);
    assert!(stderr.contains("unknown task"), "{}", stderr);
    assert!(!progress_file(&tmp).exists());
}

#[test]
fn test_notes_round_trip() {
    let (_tmp, config_path) = setup_test_env("");

    let (_, stderr, success) = run_trk(&config_path, &["notes", "set", "in_progress", "Kubernetes operators"]);
    assert!(success, "notes set failed: {}", stderr);

    let (stdout, _, _) = run_trk(&config_path, &["notes"]);
    assert!(stdout.contains("in_progress:\n  Kubernetes operators"), "{}", stdout);
    assert!(stdout.contains("to_learn:\n  (empty)"));

    let (_, stderr, success) = run_trk(&config_path, &["notes", "set", "someday", "x"]);
    assert!(!success);
    assert!(stderr.contains("unknown note field"));
}

#[test]
fn test_reset_requires_confirm() {
    let (tmp, config_path) = setup_test_env("");
    run_trk(&config_path, &["check", "k8s_pods"]);
    assert!(progress_file(&tmp).exists());

    let (stdout, _, success) = run_trk(&config_path, &["reset"]);
    assert!(success);
    assert!(stdout.contains("--confirm"));
    assert!(progress_file(&tmp).exists());

    let (stdout, stderr, success) = run_trk(&config_path, &["reset", "--confirm"]);
    assert!(success, "reset failed: {}", stderr);
    assert!(stdout.contains("Progress reset."));
    assert!(!progress_file(&tmp).exists());

    let (stdout, _, _) = run_trk(&config_path, &["status"]);
    assert!(stdout.contains("Completed:   0/189 tasks"));
}

#[test]
fn test_export_to_file() {
    let (tmp, config_path) = setup_test_env("");
    run_trk(&config_path, &["check", "helm_helm_basics"]);

    let out = tmp.path().join("backup/export.json");
    let (_, stderr, success) = run_trk(&config_path, &["export", "--output", out.to_str().unwrap()]);
    assert!(success, "export failed: {}", stderr);
    assert_eq!(fs::read(&out).unwrap(), fs::read(progress_file(&tmp)).unwrap());
}

#[test]
fn test_location_reports_local() {
    let (_tmp, config_path) = setup_test_env("");
    let (stdout, _, success) = run_trk(&config_path, &["location"]);
    assert!(success);
    assert!(stdout.contains("(local)"), "{}", stdout);
    assert!(stdout.contains("(missing)"));
}

#[test]
fn test_invalid_location_is_a_config_error() {
    let (_tmp, config_path) = setup_test_env("ftp://example.com/progress.json");
    let (_, stderr, success) = run_trk(&config_path, &["status"]);
    assert!(!success);
    assert!(stderr.contains("storage.location"), "{}", stderr);
}

#[test]
fn test_env_overrides_location() {
    let (_tmp, config_path) = setup_test_env("");
    let output = Command::new(trk_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("location")
        .env("SKILLTRACK_LOCATION", "s3://my-bucket/journey/progress.json")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("s3://my-bucket/journey/progress.json (s3)"), "{}", stdout);
}

#[test]
fn test_unreachable_remote_emits_json_notices() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9/progress.json");

    let (stdout, stderr, success) = run_trk(&config_path, &["status"]);
    assert!(success, "status should survive a dead remote: {}", stderr);
    assert!(stdout.contains("Overall:     0.0%"));

    let notices: Vec<serde_json::Value> = stderr
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .filter(|v: &serde_json::Value| v["event"] == "notice")
        .collect();
    let codes: Vec<&str> = notices.iter().filter_map(|n| n["code"].as_str()).collect();
    assert!(codes.contains(&"remote_unavailable"), "{}", stderr);
    assert!(codes.contains(&"using_local_copy"), "{}", stderr);
}

#[test]
fn test_completions_do_not_need_config() {
    let output = Command::new(trk_binary())
        .args(["--config", "/nonexistent/trk.toml", "completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("trk"));
}

#[test]
fn test_check_help_explains_read_only_remote() {
    let output = Command::new(trk_binary()).args(["check", "--help"]).output().unwrap();
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("read-only remote"), "{}", help);
    assert!(help.contains("s3://"), "{}", help);
}
