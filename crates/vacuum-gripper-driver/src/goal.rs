//! 命令参数类型
//!
//! 真空与放件命令的参数。超时在内存中用 `Duration` 表示，
//! 序列化时以毫秒整数（`timeout_ms`）传输。

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::DeviceError;

/// 默认命令超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// 默认真空设定值（单位：10 mbar）
pub const DEFAULT_VACUUM: u8 = 100;

/// 真空控制器的生产设置档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProductionSetupProfile {
    #[default]
    P0 = 0,
    P1 = 1,
    P2 = 2,
    P3 = 3,
}

/// 吸取（建立真空）命令参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacuumGoal {
    /// 目标真空值（单位：10 mbar）
    #[serde(default = "default_vacuum")]
    pub vacuum: u8,
    /// 超时时间，超时后设备返回失败
    #[serde(rename = "timeout_ms", with = "duration_ms", default = "default_timeout")]
    pub timeout: Duration,
    /// 生产设置档位
    #[serde(default)]
    pub profile: ProductionSetupProfile,
}

impl Default for VacuumGoal {
    fn default() -> Self {
        Self {
            vacuum: DEFAULT_VACUUM,
            timeout: DEFAULT_TIMEOUT,
            profile: ProductionSetupProfile::P0,
        }
    }
}

impl VacuumGoal {
    /// 检查参数范围
    ///
    /// 真空设定值为 0 或超时为 0 的命令在设备上没有意义，直接拒绝。
    pub fn validate(&self) -> Result<(), DeviceError> {
        if self.vacuum == 0 {
            return Err(DeviceError::InvalidParameter {
                field: "vacuum",
                value: self.vacuum.to_string(),
            });
        }
        validate_timeout(self.timeout)
    }
}

/// 放件（释放真空）命令参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropOffGoal {
    /// 超时时间
    #[serde(rename = "timeout_ms", with = "duration_ms", default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for DropOffGoal {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DropOffGoal {
    /// 检查参数范围
    pub fn validate(&self) -> Result<(), DeviceError> {
        validate_timeout(self.timeout)
    }
}

fn validate_timeout(timeout: Duration) -> Result<(), DeviceError> {
    if timeout.is_zero() {
        return Err(DeviceError::InvalidParameter {
            field: "timeout",
            value: format!("{:?}", timeout),
        });
    }
    Ok(())
}

fn default_vacuum() -> u8 {
    DEFAULT_VACUUM
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
