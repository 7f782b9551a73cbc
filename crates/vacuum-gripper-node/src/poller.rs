//! 状态轮询线程
//!
//! 按固定频率读取设备状态并整体替换状态单元。设备读取在单元锁之外进行，
//! 读取失败时单元保持上一次的内容，下一个周期照常重试。

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};
use vacuum_gripper_driver::{DeviceError, SharedGripper};

use crate::rate::Rate;
use crate::shutdown::ShutdownSignal;
use crate::state_cell::StateCell;

/// 连续失败时每隔多少次再记录一次 warn
const FAILURE_LOG_INTERVAL: u64 = 25;

/// 轮询统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollerStats {
    /// 成功读取次数
    pub successes: u64,
    /// 失败读取次数
    pub failures: u64,
    /// 当前连续失败次数（成功后清零）
    pub consecutive_failures: u64,
    /// 最近一次失败的描述
    pub last_error: Option<String>,
}

/// 读取一次设备状态并替换状态单元，返回新的序号
pub fn poll_once(gripper: &SharedGripper, cell: &StateCell) -> Result<u64, DeviceError> {
    let state = gripper.read_state()?;
    Ok(cell.replace(state))
}

/// 轮询线程句柄
///
/// 析构时触发停机信号并等待线程退出。
pub struct StatePoller {
    handle: Option<JoinHandle<()>>,
    stats: Arc<Mutex<PollerStats>>,
    shutdown: ShutdownSignal,
}

impl StatePoller {
    /// 启动轮询线程，直到 `shutdown` 触发
    ///
    /// `hz` 无法换算为有效周期时返回 `InvalidInput`，不启动线程。
    pub fn spawn(
        gripper: SharedGripper,
        cell: StateCell,
        hz: f64,
        shutdown: ShutdownSignal,
    ) -> io::Result<Self> {
        let rate = Rate::new(hz).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid poll rate: {} Hz", hz))
        })?;
        let stats = Arc::new(Mutex::new(PollerStats::default()));
        let stats_clone = stats.clone();
        let signal = shutdown.clone();

        let handle = thread::Builder::new()
            .name("state-poller".into())
            .spawn(move || poll_loop(gripper, cell, rate, signal, stats_clone))?;

        Ok(Self {
            handle: Some(handle),
            stats,
            shutdown,
        })
    }

    pub fn stats(&self) -> PollerStats {
        self.stats.lock().clone()
    }

    /// 等待线程退出（需先触发停机信号）
    pub fn join(mut self) -> PollerStats {
        self.join_thread();
        self.stats()
    }

    fn join_thread(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("state poller thread panicked");
            }
        }
    }
}

impl Drop for StatePoller {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown.trigger();
            self.join_thread();
        }
    }
}

fn poll_loop(
    gripper: SharedGripper,
    cell: StateCell,
    mut rate: Rate,
    shutdown: ShutdownSignal,
    stats: Arc<Mutex<PollerStats>>,
) {
    info!(period_ms = rate.period().as_millis() as u64, "state poller started");

    while !shutdown.is_triggered() {
        match poll_once(&gripper, &cell) {
            Ok(sequence) => {
                let mut stats = stats.lock();
                if stats.consecutive_failures > 0 {
                    info!(
                        failures = stats.consecutive_failures,
                        "device state readable again"
                    );
                }
                stats.successes += 1;
                stats.consecutive_failures = 0;
                debug!(sequence, "device state updated");
            },
            Err(e) => {
                let mut stats = stats.lock();
                stats.failures += 1;
                stats.consecutive_failures += 1;
                stats.last_error = Some(e.to_string());
                let streak = stats.consecutive_failures;
                if streak == 1 || streak % FAILURE_LOG_INTERVAL == 0 {
                    warn!(error = %e, consecutive = streak, "failed to read device state");
                } else {
                    debug!(error = %e, consecutive = streak, "failed to read device state");
                }
            },
        }

        if !rate.sleep(&shutdown) {
            break;
        }
    }

    let stats = stats.lock();
    info!(
        successes = stats.successes,
        failures = stats.failures,
        "state poller stopped"
    );
}
