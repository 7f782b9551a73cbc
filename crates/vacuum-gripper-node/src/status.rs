//! 状态消息
//!
//! 发布线程每个周期从状态单元的拷贝构造一条消息。
//! 字段与设备状态一一对应，状态码以名称形式输出。

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::state_cell::Snapshot;

/// 设备状态消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacuumStateMsg {
    /// 消息构造时的系统时间（微秒，Unix 纪元）
    pub stamp_us: u64,
    pub in_control_range: bool,
    pub part_detached: bool,
    pub part_present: bool,
    /// "Green" / "Yellow" / "Orange" / "Red"
    pub device_status: String,
    /// 实际功率（%）
    pub actual_power: u16,
    /// 实际真空度（mbar）
    pub vacuum: u16,
    /// 最近一次成功读取距今不超过 `stale_after`
    ///
    /// 从未成功读取时为 false，此时其余字段为初始默认值。
    pub device_online: bool,
}

impl VacuumStateMsg {
    /// 由状态单元拷贝构造
    pub fn from_snapshot(snapshot: &Snapshot, stale_after: Duration) -> Self {
        let state = &snapshot.state;
        let device_online = snapshot.age().is_some_and(|age| age <= stale_after);

        Self {
            stamp_us: system_timestamp_us(),
            in_control_range: state.in_control_range,
            part_detached: state.part_detached,
            part_present: state.part_present,
            device_status: state.device_status.as_str().to_string(),
            actual_power: state.actual_power,
            vacuum: state.vacuum,
            device_online,
        }
    }
}

fn system_timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}
