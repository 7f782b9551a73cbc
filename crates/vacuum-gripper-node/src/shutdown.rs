//! 停机信号
//!
//! 一次性触发的广播信号。轮询线程与发布线程在周期睡眠中等待该信号，
//! 触发后立即醒来退出，不必等满一个周期。

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Inner {
    triggered: Mutex<bool>,
    cvar: Condvar,
}

/// 停机信号（可克隆，所有克隆共享同一状态）
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发信号并唤醒所有等待者（重复触发无副作用）
    pub fn trigger(&self) {
        let mut triggered = self.inner.triggered.lock();
        if !*triggered {
            *triggered = true;
            self.inner.cvar.notify_all();
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.triggered.lock()
    }

    /// 阻塞直到信号触发
    pub fn wait(&self) {
        let mut triggered = self.inner.triggered.lock();
        while !*triggered {
            self.inner.cvar.wait(&mut triggered);
        }
    }

    /// 最多等待 `timeout`；返回 `true` 表示信号已触发
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => {
                self.wait();
                return true;
            },
        };
        let mut triggered = self.inner.triggered.lock();
        while !*triggered {
            if self
                .inner
                .cvar
                .wait_until(&mut triggered, deadline)
                .timed_out()
            {
                break;
            }
        }
        *triggered
    }
}

impl std::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_wait_timeout_expires() {
        let signal = ShutdownSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_trigger_wakes_sleepers() {
        let signal = ShutdownSignal::new();
        let sleepers: Vec<_> = (0..3)
            .map(|_| {
                let signal = signal.clone();
                thread::spawn(move || {
                    let start = Instant::now();
                    let woke = signal.wait_timeout(Duration::from_secs(10));
                    (woke, start.elapsed())
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        signal.trigger();

        for sleeper in sleepers {
            let (woke, elapsed) = sleeper.join().unwrap();
            assert!(woke);
            assert!(elapsed < Duration::from_secs(5));
        }
    }

    #[test]
    fn test_trigger_is_sticky() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        signal.trigger();
        assert!(signal.is_triggered());
        assert!(signal.wait_timeout(Duration::ZERO));
        signal.wait();
    }
}
