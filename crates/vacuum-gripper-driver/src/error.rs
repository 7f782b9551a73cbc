//! 设备层错误类型定义

use num_enum::TryFromPrimitiveError;
use thiserror::Error;

use crate::state::DeviceStatus;

/// 设备层错误类型
///
/// 任何一次设备调用都可能返回此错误。
/// 上层统一通过 `Result` 消费，不使用 panic 传播。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// 设备拒绝或执行命令失败
    #[error("Device command failed: {0}")]
    CommandFailed(String),

    /// 设备操作超时（超时由设备自身判定）
    #[error("Device operation timed out after {timeout_ms}ms")]
    Timeout {
        /// 超时时间（毫秒）
        timeout_ms: u64,
    },

    /// 与设备的连接已断开
    #[error("Device connection lost: {0}")]
    Disconnected(String),

    /// 命令参数不合法
    #[error("Invalid parameter {field}: {value}")]
    InvalidParameter {
        /// 参数名
        field: &'static str,
        /// 参数值（已格式化）
        value: String,
    },

    /// 设备上报了未知的状态码
    #[error("Unknown device status code: {0}")]
    UnknownDeviceStatus(u8),

    /// 设备地址无法解析
    #[error("Invalid device address: {0:?}")]
    InvalidAddress(String),
}

impl From<TryFromPrimitiveError<DeviceStatus>> for DeviceError {
    fn from(err: TryFromPrimitiveError<DeviceStatus>) -> Self {
        DeviceError::UnknownDeviceStatus(err.number)
    }
}
