//! # 节点配置
//!
//! 配置来源（后者覆盖前者）：
//! 1. 内置默认值
//! 2. TOML 配置文件
//! 3. 命令行参数（由宿主程序写入 [`NodeConfig`]）
//!
//! ```toml
//! robot_ip = "172.16.0.2"
//! publish_rate = 10.0
//! poll_rate = 5.0
//! stop_at_shutdown = true
//! ```
//!
//! 除 `robot_ip` 外所有参数均可省略。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::dispatcher::DispatcherConfig;
use crate::rate::Rate;

/// 默认发布频率（Hz）
pub const DEFAULT_PUBLISH_RATE: f64 = 10.0;
/// 默认轮询频率（Hz）
pub const DEFAULT_POLL_RATE: f64 = 5.0;
/// 默认动作工作线程数
pub const DEFAULT_ACTION_THREADS: usize = 2;
/// 动作工作线程数下限：一个目标阻塞时其他端点仍能被分发
pub const MIN_ACTION_THREADS: usize = 2;
/// 默认目标队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;
/// 默认状态过期时间（毫秒）
pub const DEFAULT_STALE_AFTER_MS: u64 = 1000;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("Invalid rate for '{name}': {value} (must be > 0 with a representable period)")]
    InvalidRate { name: &'static str, value: f64 },

    #[error("Invalid action_threads: {0} (minimum 2)")]
    InvalidThreads(usize),

    #[error("Invalid queue_capacity: {0} (must be > 0)")]
    InvalidCapacity(usize),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// 原始配置（所有字段可选）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// 设备地址（必填）
    pub robot_ip: Option<String>,
    /// 状态发布频率（Hz）
    pub publish_rate: Option<f64>,
    /// 设备状态轮询频率（Hz）
    pub poll_rate: Option<f64>,
    /// 停机时是否向设备发送最后一次 stop
    pub stop_at_shutdown: Option<bool>,
    /// 动作工作线程数
    pub action_threads: Option<usize>,
    /// 目标队列容量
    pub queue_capacity: Option<usize>,
    /// 超过该时长没有成功读取时，状态消息标记为离线（毫秒）
    pub stale_after_ms: Option<u64>,
}

impl NodeConfig {
    /// 从 TOML 文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// 用 `other` 中已设置的字段覆盖当前值
    pub fn merge(self, other: NodeConfig) -> NodeConfig {
        NodeConfig {
            robot_ip: other.robot_ip.or(self.robot_ip),
            publish_rate: other.publish_rate.or(self.publish_rate),
            poll_rate: other.poll_rate.or(self.poll_rate),
            stop_at_shutdown: other.stop_at_shutdown.or(self.stop_at_shutdown),
            action_threads: other.action_threads.or(self.action_threads),
            queue_capacity: other.queue_capacity.or(self.queue_capacity),
            stale_after_ms: other.stale_after_ms.or(self.stale_after_ms),
        }
    }

    /// 校验并填充默认值
    ///
    /// 省略的可选参数会以 info 级别记录所使用的默认值。
    pub fn validate(&self) -> Result<NodeSettings, ConfigError> {
        let robot_ip = self
            .robot_ip
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .ok_or(ConfigError::MissingParameter("robot_ip"))?
            .to_string();

        let publish_rate = rate_or_default("publish_rate", self.publish_rate, DEFAULT_PUBLISH_RATE)?;
        let poll_rate = rate_or_default("poll_rate", self.poll_rate, DEFAULT_POLL_RATE)?;

        let stop_at_shutdown = self.stop_at_shutdown.unwrap_or_else(|| {
            info!("Parameter stop_at_shutdown not set, using default: false");
            false
        });

        let workers = self.action_threads.unwrap_or(DEFAULT_ACTION_THREADS);
        if workers < MIN_ACTION_THREADS {
            return Err(ConfigError::InvalidThreads(workers));
        }

        let queue_capacity = self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY);
        if queue_capacity == 0 {
            return Err(ConfigError::InvalidCapacity(queue_capacity));
        }

        let stale_after =
            Duration::from_millis(self.stale_after_ms.unwrap_or(DEFAULT_STALE_AFTER_MS));

        Ok(NodeSettings {
            robot_ip,
            publish_rate,
            poll_rate,
            stop_at_shutdown,
            dispatcher: DispatcherConfig {
                workers,
                queue_capacity,
            },
            stale_after,
        })
    }
}

fn rate_or_default(name: &'static str, value: Option<f64>, default: f64) -> Result<f64, ConfigError> {
    match value {
        Some(hz) if Rate::period_for(hz).is_some() => Ok(hz),
        Some(hz) => Err(ConfigError::InvalidRate { name, value: hz }),
        None => {
            info!("Parameter {} not set, using default: {} Hz", name, default);
            Ok(default)
        },
    }
}

/// 校验后的节点参数
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSettings {
    pub robot_ip: String,
    pub publish_rate: f64,
    pub poll_rate: f64,
    pub stop_at_shutdown: bool,
    pub dispatcher: DispatcherConfig,
    pub stale_after: Duration,
}

impl NodeSettings {
    /// 以默认值构造（仅需设备地址）
    pub fn with_robot_ip(robot_ip: impl Into<String>) -> Self {
        Self {
            robot_ip: robot_ip.into(),
            publish_rate: DEFAULT_PUBLISH_RATE,
            poll_rate: DEFAULT_POLL_RATE,
            stop_at_shutdown: false,
            dispatcher: DispatcherConfig::default(),
            stale_after: Duration::from_millis(DEFAULT_STALE_AFTER_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = NodeConfig {
            robot_ip: Some("172.16.0.2".to_string()),
            ..NodeConfig::default()
        };
        let settings = config.validate().unwrap();
        assert_eq!(settings, NodeSettings::with_robot_ip("172.16.0.2"));
        assert_eq!(settings.publish_rate, 10.0);
        assert_eq!(settings.poll_rate, 5.0);
        assert!(!settings.stop_at_shutdown);
        assert_eq!(settings.dispatcher.workers, 2);
    }

    #[test]
    fn test_missing_robot_ip() {
        let err = NodeConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter("robot_ip")));
        assert_eq!(err.to_string(), "Missing required parameter 'robot_ip'");

        let blank = NodeConfig {
            robot_ip: Some("  ".to_string()),
            ..NodeConfig::default()
        };
        assert!(matches!(
            blank.validate(),
            Err(ConfigError::MissingParameter("robot_ip"))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = NodeConfig {
            robot_ip: Some("10.0.0.1".to_string()),
            ..NodeConfig::default()
        };

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e-20] {
            let config = NodeConfig {
                publish_rate: Some(bad),
                ..base.clone()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidRate {
                    name: "publish_rate",
                    ..
                })
            ));
        }

        let config = NodeConfig {
            poll_rate: Some(1e-20),
            ..base.clone()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRate { name: "poll_rate", .. }));

        let config = NodeConfig {
            action_threads: Some(1),
            ..base.clone()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThreads(1))));

        let config = NodeConfig {
            queue_capacity: Some(0),
            ..base
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCapacity(0))));
    }

    #[test]
    fn test_parse_toml() {
        let config = NodeConfig::from_toml_str(
            r#"
            robot_ip = "192.168.1.20"
            publish_rate = 20.0
            stop_at_shutdown = true
            action_threads = 3
            "#,
        )
        .unwrap();
        let settings = config.validate().unwrap();
        assert_eq!(settings.robot_ip, "192.168.1.20");
        assert_eq!(settings.publish_rate, 20.0);
        assert_eq!(settings.poll_rate, DEFAULT_POLL_RATE);
        assert!(settings.stop_at_shutdown);
        assert_eq!(settings.dispatcher.workers, 3);
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let err = NodeConfig::from_toml_str("robot_ipp = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_merge_prefers_override() {
        let file = NodeConfig {
            robot_ip: Some("10.0.0.1".to_string()),
            publish_rate: Some(20.0),
            ..NodeConfig::default()
        };
        let cli = NodeConfig {
            publish_rate: Some(50.0),
            stop_at_shutdown: Some(true),
            ..NodeConfig::default()
        };
        let merged = file.merge(cli);
        assert_eq!(merged.robot_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(merged.publish_rate, Some(50.0));
        assert_eq!(merged.stop_at_shutdown, Some(true));
        assert_eq!(merged.poll_rate, None);
    }
}
