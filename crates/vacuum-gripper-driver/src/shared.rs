//! SharedGripper - 串行化的共享设备句柄
//!
//! 动作线程池、状态轮询线程以及关闭时的最终停止命令都通过同一个设备连接发出调用。
//! 设备连接不保证并发安全，因此所有调用都经过同一把设备锁：
//! 任意时刻进程内最多只有一个设备调用在进行，不会出现命令交错。
//!
//! # 架构
//!
//! ```text
//! action-worker-0 ─┐
//! action-worker-1 ─┼──► device_lock ──► VacuumGripper
//! state-poller    ─┤
//! final stop      ─┘
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

use crate::device::{DeviceCall, VacuumGripper};
use crate::error::DeviceError;
use crate::goal::{DropOffGoal, VacuumGoal};
use crate::state::GripperState;

/// 共享设备句柄（可克隆，克隆体指向同一设备）
#[derive(Clone)]
pub struct SharedGripper {
    /// 设备锁（保证调用不交错）
    device: Arc<Mutex<dyn VacuumGripper>>,
}

impl SharedGripper {
    /// 接管设备句柄
    pub fn new<G: VacuumGripper + 'static>(device: G) -> Self {
        SharedGripper {
            device: Arc::new(Mutex::new(device)),
        }
    }

    pub fn stop(&self) -> Result<bool, DeviceError> {
        self.call(DeviceCall::Stop, |device| device.stop())
    }

    pub fn vacuum(&self, goal: &VacuumGoal) -> Result<bool, DeviceError> {
        self.call(DeviceCall::Vacuum, |device| device.vacuum(goal))
    }

    pub fn drop_off(&self, goal: &DropOffGoal) -> Result<bool, DeviceError> {
        self.call(DeviceCall::DropOff, |device| device.drop_off(goal))
    }

    pub fn read_state(&self) -> Result<GripperState, DeviceError> {
        self.call(DeviceCall::ReadState, |device| device.read_state())
    }

    /// 在设备锁内执行一次调用
    ///
    /// 锁在调用返回（或出错）后立即释放，调用期间其它调用方阻塞等待。
    fn call<R>(
        &self,
        call: DeviceCall,
        f: impl FnOnce(&mut dyn VacuumGripper) -> Result<R, DeviceError>,
    ) -> Result<R, DeviceError> {
        let wait_start = Instant::now();
        let mut device = self.device.lock();
        let waited = wait_start.elapsed();

        trace!(
            call = call.name(),
            lock_wait_us = waited.as_micros() as u64,
            "device call"
        );

        let started = Instant::now();
        let result = f(&mut *device);
        trace!(
            call = call.name(),
            elapsed_us = started.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "device call finished"
        );
        result
    }
}
