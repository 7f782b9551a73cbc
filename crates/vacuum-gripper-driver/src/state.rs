//! 设备状态类型
//!
//! `GripperState` 是设备一次读取的完整快照，始终整体替换，从不逐字段修改。

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 设备健康状态（设备端的交通灯指示）
///
/// 原始状态码为 `u8`，通过 `DeviceStatus::try_from(code)` 转换，
/// 未知状态码会返回错误而不是被静默映射。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum DeviceStatus {
    /// 正常
    #[default]
    Green = 0,
    /// 警告
    Yellow = 1,
    /// 严重警告
    Orange = 2,
    /// 故障
    Red = 3,
}

impl DeviceStatus {
    /// 全部状态（按严重程度递增）
    pub const ALL: [DeviceStatus; 4] = [
        DeviceStatus::Green,
        DeviceStatus::Yellow,
        DeviceStatus::Orange,
        DeviceStatus::Red,
    ];

    /// 对外显示名称
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Green => "Green",
            DeviceStatus::Yellow => "Yellow",
            DeviceStatus::Orange => "Orange",
            DeviceStatus::Red => "Red",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 真空夹爪状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GripperState {
    /// 真空值是否处于控制区间内
    pub in_control_range: bool,
    /// 工件是否已脱离
    pub part_detached: bool,
    /// 是否检测到工件
    pub part_present: bool,
    /// 设备健康状态
    pub device_status: DeviceStatus,
    /// 当前功率（%）
    pub actual_power: u16,
    /// 当前真空值（mbar）
    pub vacuum: u16,
}
