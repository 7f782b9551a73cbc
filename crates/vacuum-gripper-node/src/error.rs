//! 节点错误类型

use thiserror::Error;

use crate::config::ConfigError;

/// 节点启动错误
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to spawn {thread} thread: {source}")]
    Spawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },
}
