use std::process::{Command, Output};

fn chatbridge(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chatbridge"))
        .arg("--config-dir")
        .arg(dir)
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("PORT")
        .env_remove("BASE_URL")
        .env_remove("BOT_NAMES")
        .output()
        .expect("Failed to run chatbridge")
}

#[test]
fn test_onboard_writes_default_config() {
    let dir = tempfile::tempdir().unwrap();

    let output = chatbridge(dir.path(), &["onboard", "--api-key", "sk-test"]);
    assert!(output.status.success());

    let content = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["providers"]["openai"]["api_key"], "sk-test");
    assert_eq!(json["sessions"]["names"].as_array().unwrap().len(), 5);
}

#[test]
fn test_onboard_keeps_existing_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"sessions":{"names":["alpha"]}}"#).unwrap();

    let output = chatbridge(dir.path(), &["onboard"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--force"));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        r#"{"sessions":{"names":["alpha"]}}"#
    );
}

#[test]
fn test_status_lists_sessions() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"sessions":{"names":["alpha","beta"]},"gateway":{"port":4100}}"#,
    )
    .unwrap();

    let output = chatbridge(dir.path(), &["status"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    println!("STDOUT:\n{}", stdout);

    assert!(output.status.success());
    assert!(stdout.contains("alpha"));
    assert!(stdout.contains("beta"));
    assert!(stdout.contains("http://localhost:4100"));
}

#[test]
fn test_status_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"sessions":{"names":["dup","dup"]}}"#,
    )
    .unwrap();

    let output = chatbridge(dir.path(), &["status"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("duplicate session name"));
}
