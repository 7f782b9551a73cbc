//! 状态发布线程
//!
//! 以固定频率拷贝状态单元并输出状态消息。每条消息都带新的时间戳，
//! 即使底层状态自上一次发布以来没有变化。发布频率与轮询频率相互独立。

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::rate::Rate;
use crate::shutdown::ShutdownSignal;
use crate::sink::{SinkError, StatusSink};
use crate::state_cell::StateCell;
use crate::status::VacuumStateMsg;

/// 发布统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    /// 成功输出的消息数
    pub published: u64,
    /// 输出失败（被丢弃）的消息数
    pub dropped: u64,
}

/// 发布线程句柄
///
/// 析构时触发停机信号并等待线程退出。
pub struct StatePublisher {
    handle: Option<JoinHandle<()>>,
    stats: Arc<Mutex<PublisherStats>>,
    shutdown: ShutdownSignal,
}

impl StatePublisher {
    /// 启动发布线程，直到 `shutdown` 触发
    ///
    /// `stale_after` 决定消息中的 `device_online` 标志。
    /// `hz` 无法换算为有效周期时返回 `InvalidInput`，不启动线程。
    pub fn spawn<S>(
        cell: StateCell,
        sink: S,
        hz: f64,
        stale_after: Duration,
        shutdown: ShutdownSignal,
    ) -> io::Result<Self>
    where
        S: StatusSink + 'static,
    {
        let rate = Rate::new(hz).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid publish rate: {} Hz", hz))
        })?;
        let stats = Arc::new(Mutex::new(PublisherStats::default()));
        let stats_clone = stats.clone();
        let signal = shutdown.clone();

        let handle = thread::Builder::new()
            .name("state-publisher".into())
            .spawn(move || publish_loop(cell, sink, rate, stale_after, signal, stats_clone))?;

        Ok(Self {
            handle: Some(handle),
            stats,
            shutdown,
        })
    }

    pub fn stats(&self) -> PublisherStats {
        *self.stats.lock()
    }

    /// 等待线程退出（需先触发停机信号）
    pub fn join(mut self) -> PublisherStats {
        self.join_thread();
        self.stats()
    }

    fn join_thread(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("state publisher thread panicked");
            }
        }
    }
}

impl Drop for StatePublisher {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown.trigger();
            self.join_thread();
        }
    }
}

fn publish_loop<S: StatusSink>(
    cell: StateCell,
    mut sink: S,
    mut rate: Rate,
    stale_after: Duration,
    shutdown: ShutdownSignal,
    stats: Arc<Mutex<PublisherStats>>,
) {
    let mut was_online = false;
    info!(period_ms = rate.period().as_millis() as u64, "state publisher started");

    while !shutdown.is_triggered() {
        let snapshot = cell.snapshot();
        let msg = VacuumStateMsg::from_snapshot(&snapshot, stale_after);

        if msg.device_online != was_online {
            if msg.device_online {
                info!("device state available");
            } else if snapshot.sequence > 0 {
                warn!(stale_after_ms = stale_after.as_millis() as u64, "device state is stale");
            }
            was_online = msg.device_online;
        }

        match sink.publish(msg) {
            Ok(()) => stats.lock().published += 1,
            Err(SinkError::Full) => {
                stats.lock().dropped += 1;
                debug!("status receiver is full, message dropped");
            },
            Err(e) => {
                stats.lock().dropped += 1;
                warn!(error = %e, "failed to publish device state");
            },
        }

        if !rate.sleep(&shutdown) {
            break;
        }
    }

    let stats = stats.lock();
    info!(
        published = stats.published,
        dropped = stats.dropped,
        "state publisher stopped"
    );
}
