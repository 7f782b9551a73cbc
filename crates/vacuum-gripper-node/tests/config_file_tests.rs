//! 配置文件加载测试

use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use vacuum_gripper_node::{ConfigError, NodeConfig};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
robot_ip = "172.16.0.2:1338"
publish_rate = 25.0
poll_rate = 5.0
stop_at_shutdown = true
action_threads = 4
queue_capacity = 8
stale_after_ms = 500
"#,
    );

    let settings = NodeConfig::load_from_file(file.path())
        .unwrap()
        .validate()
        .unwrap();
    assert_eq!(settings.robot_ip, "172.16.0.2:1338");
    assert_eq!(settings.publish_rate, 25.0);
    assert_eq!(settings.poll_rate, 5.0);
    assert!(settings.stop_at_shutdown);
    assert_eq!(settings.dispatcher.workers, 4);
    assert_eq!(settings.dispatcher.queue_capacity, 8);
    assert_eq!(settings.stale_after, Duration::from_millis(500));
}

/// 文件里没有 robot_ip，由命令行补上
#[test]
fn test_file_without_robot_ip_completed_by_override() {
    let file = write_config("publish_rate = 10.0\n");
    let from_file = NodeConfig::load_from_file(file.path()).unwrap();
    assert!(matches!(
        from_file.validate(),
        Err(ConfigError::MissingParameter("robot_ip"))
    ));

    let cli = NodeConfig {
        robot_ip: Some("10.1.1.5".to_string()),
        ..NodeConfig::default()
    };
    let settings = from_file.merge(cli).validate().unwrap();
    assert_eq!(settings.robot_ip, "10.1.1.5");
}

#[test]
fn test_empty_file_is_valid_toml() {
    let file = write_config("");
    assert_eq!(
        NodeConfig::load_from_file(file.path()).unwrap(),
        NodeConfig::default()
    );
}

#[test]
fn test_malformed_file_is_parse_error() {
    let file = write_config("robot_ip = \n");
    assert!(matches!(
        NodeConfig::load_from_file(file.path()),
        Err(ConfigError::Parse(_))
    ));

    let file = write_config("publish_rate = \"fast\"\n");
    assert!(matches!(
        NodeConfig::load_from_file(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = NodeConfig::load_from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
    assert!(err.to_string().starts_with("Failed to read config file"));
}
