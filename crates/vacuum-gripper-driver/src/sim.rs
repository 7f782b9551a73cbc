//! Simulated vacuum gripper
//!
//! 无硬件依赖的设备实现，用于测试以及在没有真实设备时运行节点。
//! 通过 [`SimControl`] 可以在运行时注入故障、设置调用延迟、读取调用计数，
//! 并检测是否有两个设备调用发生过重叠。

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tracing::debug;

use crate::device::{DeviceCall, VacuumGripper};
use crate::error::DeviceError;
use crate::goal::{DropOffGoal, VacuumGoal};
use crate::state::{DeviceStatus, GripperState};

/// 吸附成功时的功率（%）
const HOLD_POWER: u16 = 100;

/// 故障注入模式
#[derive(Debug, Clone, Default)]
enum FaultMode {
    #[default]
    None,
    /// 下一次调用失败，之后恢复
    Once(DeviceError),
    /// 每次调用都失败，直到清除
    Always(DeviceError),
}

struct SimShared {
    faults: Mutex<[FaultMode; 4]>,
    latency: Mutex<Duration>,
    calls: [AtomicU64; 4],
    in_call: AtomicBool,
    overlapped: AtomicBool,
    part_available: AtomicBool,
    status_code: AtomicU8,
}

impl Default for SimShared {
    fn default() -> Self {
        Self {
            faults: Mutex::new(Default::default()),
            latency: Mutex::new(Duration::ZERO),
            calls: Default::default(),
            in_call: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            part_available: AtomicBool::new(true),
            status_code: AtomicU8::new(DeviceStatus::Green.into()),
        }
    }
}

/// 模拟设备的控制句柄（可克隆，跨线程共享）
#[derive(Clone, Default)]
pub struct SimControl {
    shared: Arc<SimShared>,
}

impl SimControl {
    /// 下一次 `call` 调用返回 `error`
    pub fn fail_once(&self, call: DeviceCall, error: DeviceError) {
        self.shared.faults.lock()[call.index()] = FaultMode::Once(error);
    }

    /// 之后每次 `call` 调用都返回 `error`，直到 [`clear_fault`](Self::clear_fault)
    pub fn fail_always(&self, call: DeviceCall, error: DeviceError) {
        self.shared.faults.lock()[call.index()] = FaultMode::Always(error);
    }

    pub fn clear_fault(&self, call: DeviceCall) {
        self.shared.faults.lock()[call.index()] = FaultMode::None;
    }

    /// 设置每次设备调用的阻塞时长
    pub fn set_latency(&self, latency: Duration) {
        *self.shared.latency.lock() = latency;
    }

    /// 吸盘下方是否有可吸取的工件
    pub fn set_part_available(&self, available: bool) {
        self.shared.part_available.store(available, Ordering::SeqCst);
    }

    /// 设置设备上报的原始状态码（可以是未知值）
    pub fn set_status_code(&self, code: u8) {
        self.shared.status_code.store(code, Ordering::SeqCst);
    }

    pub fn set_device_status(&self, status: DeviceStatus) {
        self.set_status_code(status.into());
    }

    /// 已发生的 `call` 调用次数（包括失败的调用）
    pub fn call_count(&self, call: DeviceCall) -> u64 {
        self.shared.calls[call.index()].load(Ordering::SeqCst)
    }

    /// 是否检测到两个设备调用同时进行
    pub fn overlap_detected(&self) -> bool {
        self.shared.overlapped.load(Ordering::SeqCst)
    }

    fn take_fault(&self, call: DeviceCall) -> Option<DeviceError> {
        let mut faults = self.shared.faults.lock();
        let slot = &mut faults[call.index()];
        match std::mem::take(slot) {
            FaultMode::None => None,
            FaultMode::Once(error) => Some(error),
            FaultMode::Always(error) => {
                *slot = FaultMode::Always(error.clone());
                Some(error)
            },
        }
    }
}

/// 调用期间的重叠检测标记，Drop 时清除
struct CallGuard {
    shared: Arc<SimShared>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.shared.in_call.store(false, Ordering::SeqCst);
    }
}

/// 模拟真空夹爪
pub struct SimulatedGripper {
    address: String,
    state: GripperState,
    control: SimControl,
}

impl SimulatedGripper {
    /// "连接"到指定地址的模拟设备
    ///
    /// 地址格式为 `host` 或 `host:port`，与真实设备一致。
    pub fn connect(address: &str) -> Result<Self, DeviceError> {
        validate_address(address)?;
        debug!(address, "simulated gripper connected");
        Ok(Self {
            address: address.to_string(),
            state: GripperState::default(),
            control: SimControl::default(),
        })
    }

    /// 获取控制句柄
    pub fn control(&self) -> SimControl {
        self.control.clone()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn begin(&self, call: DeviceCall) -> Result<CallGuard, DeviceError> {
        let shared = self.control.shared.clone();
        if shared.in_call.swap(true, Ordering::SeqCst) {
            shared.overlapped.store(true, Ordering::SeqCst);
        }
        shared.calls[call.index()].fetch_add(1, Ordering::SeqCst);
        let latency = *shared.latency.lock();
        let guard = CallGuard { shared };

        if !latency.is_zero() {
            thread::sleep(latency);
        }

        match self.control.take_fault(call) {
            Some(error) => Err(error),
            None => Ok(guard),
        }
    }
}

impl VacuumGripper for SimulatedGripper {
    fn stop(&mut self) -> Result<bool, DeviceError> {
        let _guard = self.begin(DeviceCall::Stop)?;
        self.state = GripperState {
            in_control_range: false,
            actual_power: 0,
            ..self.state
        };
        Ok(true)
    }

    fn vacuum(&mut self, goal: &VacuumGoal) -> Result<bool, DeviceError> {
        let _guard = self.begin(DeviceCall::Vacuum)?;
        goal.validate()?;

        if !self.control.shared.part_available.load(Ordering::SeqCst) {
            // 没有工件，真空无法在超时内建立
            self.state = GripperState {
                in_control_range: false,
                part_detached: false,
                part_present: false,
                actual_power: HOLD_POWER,
                vacuum: 0,
                ..self.state
            };
            return Ok(false);
        }

        self.state = GripperState {
            in_control_range: true,
            part_detached: false,
            part_present: true,
            actual_power: HOLD_POWER,
            vacuum: u16::from(goal.vacuum) * 10,
            ..self.state
        };
        Ok(true)
    }

    fn drop_off(&mut self, goal: &DropOffGoal) -> Result<bool, DeviceError> {
        let _guard = self.begin(DeviceCall::DropOff)?;
        goal.validate()?;

        self.state = GripperState {
            in_control_range: false,
            part_detached: self.state.part_present,
            part_present: false,
            actual_power: 0,
            vacuum: 0,
            ..self.state
        };
        Ok(true)
    }

    fn read_state(&mut self) -> Result<GripperState, DeviceError> {
        let _guard = self.begin(DeviceCall::ReadState)?;
        let code = self.control.shared.status_code.load(Ordering::SeqCst);
        let device_status = DeviceStatus::try_from(code)?;
        Ok(GripperState {
            device_status,
            ..self.state
        })
    }
}

fn validate_address(address: &str) -> Result<(), DeviceError> {
    let invalid = || DeviceError::InvalidAddress(address.to_string());

    if address.trim().is_empty() || address.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    match address.rsplit_once(':') {
        // IPv6 地址不带端口时包含多个冒号
        Some((host, port)) if !host.contains(':') => {
            if host.is_empty() || port.parse::<u16>().is_err() {
                return Err(invalid());
            }
        },
        _ => {},
    }
    Ok(())
}
