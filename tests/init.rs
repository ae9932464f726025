use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_relboard"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "relboard init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".relboard.toml");
    assert!(config_path.exists(), ".relboard.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[github]"));
    assert!(content.contains("[[repositories]]"));

    let config: relboard_core::RelboardConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.github.page_size, 10);
    assert_eq!(config.server.bind, "127.0.0.1:5000");
    assert!(config.repositories.is_empty());
    config.validate().unwrap();
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".relboard.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_relboard"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let existing = std::fs::read_to_string(dir.path().join(".relboard.toml")).unwrap();
    assert_eq!(existing, "# existing");
}
