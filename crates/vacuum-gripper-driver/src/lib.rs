//! 真空夹爪设备层
//!
//! 本 crate 定义节点所依赖的设备句柄接口及其数据类型，包括：
//! - 设备句柄 trait（阻塞调用：停止、吸取、放件、读取状态）
//! - 设备状态快照与健康状态码
//! - 串行化的共享句柄（所有调用经过同一把设备锁）
//! - 模拟设备（无硬件依赖，支持故障注入）
//!
//! 真实设备的二进制通信协议由外部驱动实现，不在本 crate 范围内。

mod device;
mod error;
pub mod goal;
mod shared;
pub mod sim;
pub mod state;

pub use device::{DeviceCall, VacuumGripper};
pub use error::DeviceError;
pub use goal::{DropOffGoal, ProductionSetupProfile, VacuumGoal};
pub use shared::SharedGripper;
pub use sim::{SimControl, SimulatedGripper};
pub use state::{DeviceStatus, GripperState};
