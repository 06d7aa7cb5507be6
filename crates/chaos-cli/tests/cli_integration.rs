use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Helper to create a test config file.
fn create_test_config(temp_dir: &TempDir) -> String {
    let config_content = r#"controller:
  port: 8181
  agents:
    - http://agent-1:9090/inject
    - http://agent-2:9090/inject
  request_timeout: 5s
agent:
  interface: ens5
log:
  level: WARN
"#;

    let config_path = temp_dir.path().join("chaoslab.yaml");
    fs::write(&config_path, config_content).unwrap();

    config_path.to_str().unwrap().to_string()
}

/// Get path to the chaoslab binary.
fn chaoslab_binary() -> String {
    env!("CARGO_BIN_EXE_chaoslab").to_string()
}

#[test]
fn test_cli_help_lists_subcommands() {
    let output = Command::new(chaoslab_binary())
        .arg("--help")
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for sub in ["controller", "agent", "start", "experiments", "stop", "config"] {
        assert!(stdout.contains(sub), "missing subcommand {} in help", sub);
    }
}

#[test]
fn test_cli_config_shows_effective_values() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = create_test_config(&temp_dir);

    let output = Command::new(chaoslab_binary())
        .args(["--config", &config_path, "config"])
        .env_remove("AGENT_ENDPOINTS")
        .output()
        .expect("Failed to execute command");
    assert!(
        output.status.success(),
        "config failed: {:?}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port: 8181"));
    assert!(stdout.contains("http://agent-2:9090/inject"));
    assert!(stdout.contains("interface: ens5"));
    assert!(stdout.contains("level: warn"));
}

#[test]
fn test_cli_agent_endpoints_env_override() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = create_test_config(&temp_dir);

    let output = Command::new(chaoslab_binary())
        .args(["--config", &config_path, "config"])
        .env("AGENT_ENDPOINTS", " http://a:9090/inject , ,http://b:9090/inject")
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("http://a:9090/inject"));
    assert!(stdout.contains("http://b:9090/inject"));
    assert!(!stdout.contains("agent-1"));
}

#[test]
fn test_cli_rejects_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bad.yaml");
    fs::write(&config_path, "agent:\n  interface: \"\"\n").unwrap();

    let output = Command::new(chaoslab_binary())
        .args(["--config", config_path.to_str().unwrap(), "config"])
        .output()
        .expect("Failed to execute command");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("interface"));
}

#[test]
fn test_cli_start_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = create_test_config(&temp_dir);
    let missing = temp_dir.path().join("missing.json");

    let output = Command::new(chaoslab_binary())
        .args([
            "--config",
            &config_path,
            "start",
            missing.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.json"));
}
