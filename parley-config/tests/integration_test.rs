//! Integration tests for parley-config

use parley_config::*;
use std::io::Write;

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn test_precedence_file_then_env_then_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "parley.toml",
        r#"
            port = 4000
            queue_name = "from_file"
            priority_threshold = 6
            host = "127.0.0.1"
        "#,
    );

    let config = AppConfig::builder()
        .file(&path)
        .vars([("PARLEY_PORT", "5000"), ("PARLEY_QUEUE_NAME", "from_env")])
        .set("port", 6000u16)
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.port, 6000);
    assert_eq!(config.queue_name, "from_env");
    assert_eq!(config.priority_threshold, 6);
    assert_eq!(config.host, "127.0.0.1");
}

#[test]
fn test_json_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "parley.json",
        r#"{"environment": "production", "api_secret_key": "k", "history_path": "/tmp/h.jsonl"}"#,
    );

    let config = AppConfig::builder()
        .file(&path)
        .vars(Vec::<(String, String)>::new())
        .load()
        .unwrap();

    assert!(config.is_production());
    assert_eq!(config.api_secret_key.as_deref(), Some("k"));
    assert_eq!(config.history_path.as_deref(), Some("/tmp/h.jsonl"));
}

#[test]
fn test_missing_file_is_a_load_error() {
    let err = AppConfig::builder()
        .file("/definitely/not/here/parley.toml")
        .vars(Vec::<(String, String)>::new())
        .load()
        .unwrap_err();

    assert!(matches!(err, ConfigError::LoadError(_)));
}

#[test]
fn test_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "parley.yaml", "port: 1");

    assert!(matches!(
        ConfigManager::new().load_file_auto(&path),
        Err(ConfigError::LoadError(_))
    ));
}

#[test]
fn test_env_file_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "parley.env", "PORT=7000\nLOG_FORMAT=compact\n");

    let manager = ConfigManager::new();
    manager.load_file(&path, FileFormat::Env).unwrap();

    assert_eq!(manager.get_string("port").unwrap(), "7000");
    assert_eq!(manager.get_string("log_format").unwrap(), "compact");
}
