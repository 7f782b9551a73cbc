//! 设备句柄抽象
//!
//! 真实设备的通信协议不在本 crate 范围内，这里只定义节点所依赖的阻塞调用接口。
//! 驱动实现此 trait，节点层通过 [`SharedGripper`](crate::SharedGripper) 串行化访问。

use crate::error::DeviceError;
use crate::goal::{DropOffGoal, VacuumGoal};
use crate::state::GripperState;

/// 真空夹爪设备句柄
///
/// 所有方法都是阻塞调用：直到设备应答、超时或出错才返回。
/// 方法使用 `&mut self`，同一时刻只能有一个调用在进行。
///
/// 返回 `Ok(bool)` 的命令：`true` 表示设备确认执行成功，
/// `false` 表示设备正常应答但未达到目标（例如真空未在超时内建立）。
pub trait VacuumGripper: Send {
    /// 停止当前动作
    fn stop(&mut self) -> Result<bool, DeviceError>;

    /// 建立真空（吸取工件）
    fn vacuum(&mut self, goal: &VacuumGoal) -> Result<bool, DeviceError>;

    /// 释放真空（放下工件）
    fn drop_off(&mut self, goal: &DropOffGoal) -> Result<bool, DeviceError>;

    /// 读取当前设备状态
    fn read_state(&mut self) -> Result<GripperState, DeviceError>;
}

/// 设备调用类型（用于日志与故障注入）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCall {
    Stop,
    Vacuum,
    DropOff,
    ReadState,
}

impl DeviceCall {
    /// 全部调用类型
    pub const ALL: [DeviceCall; 4] = [
        DeviceCall::Stop,
        DeviceCall::Vacuum,
        DeviceCall::DropOff,
        DeviceCall::ReadState,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DeviceCall::Stop => "stop",
            DeviceCall::Vacuum => "vacuum",
            DeviceCall::DropOff => "drop_off",
            DeviceCall::ReadState => "read_state",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            DeviceCall::Stop => 0,
            DeviceCall::Vacuum => 1,
            DeviceCall::DropOff => 2,
            DeviceCall::ReadState => 3,
        }
    }
}
