//! 固定频率循环的节拍器
//!
//! 按绝对截止时间推进，循环体的耗时不会累积成漂移；
//! 若某次循环超时，下一个截止时间从当前时刻重新计算，不补发。

use std::time::{Duration, Instant};

use crate::shutdown::ShutdownSignal;

/// 频率节拍器
#[derive(Debug)]
pub struct Rate {
    period: Duration,
    next: Instant,
}

impl Rate {
    /// `hz` 对应的周期
    ///
    /// `hz` 不是有限正数，或周期超出 `Duration`/`Instant` 的表示范围时返回 `None`。
    pub fn period_for(hz: f64) -> Option<Duration> {
        if !(hz.is_finite() && hz > 0.0) {
            return None;
        }
        let period = Duration::try_from_secs_f64(1.0 / hz).ok()?;
        Instant::now().checked_add(period).map(|_| period)
    }

    pub fn new(hz: f64) -> Option<Self> {
        let period = Self::period_for(hz)?;
        let next = Instant::now().checked_add(period)?;
        Some(Self { period, next })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 睡眠到下一个截止时间
    ///
    /// 返回 `false` 表示睡眠期间停机信号已触发，调用方应退出循环。
    pub fn sleep(&mut self, shutdown: &ShutdownSignal) -> bool {
        let now = Instant::now();
        if let Some(remaining) = self.next.checked_duration_since(now) {
            if shutdown.wait_timeout(remaining) {
                return false;
            }
            self.next = self.next.checked_add(self.period).unwrap_or(self.next);
        } else {
            // 落后超过一个周期：重新对齐
            self.next = now.checked_add(self.period).unwrap_or(now);
            if shutdown.is_triggered() {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_from_hz() {
        assert_eq!(Rate::new(10.0).unwrap().period(), Duration::from_millis(100));
        assert_eq!(Rate::new(5.0).unwrap().period(), Duration::from_millis(200));
        assert_eq!(Rate::new(0.5).unwrap().period(), Duration::from_secs(2));
    }

    #[test]
    fn test_unrepresentable_period_rejected() {
        for hz in [0.0, -5.0, f64::NAN, f64::INFINITY, 1e-20, f64::MIN_POSITIVE] {
            assert!(Rate::period_for(hz).is_none(), "hz = {}", hz);
            assert!(Rate::new(hz).is_none(), "hz = {}", hz);
        }
        assert!(Rate::period_for(1e-3).is_some());
    }

    #[test]
    fn test_sleep_keeps_cadence() {
        let shutdown = ShutdownSignal::new();
        let mut rate = Rate::new(50.0).unwrap();
        let start = Instant::now();
        for _ in 0..5 {
            assert!(rate.sleep(&shutdown));
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(500), "elapsed {:?}", elapsed);
    }

    #[test]
    fn test_sleep_returns_false_after_shutdown() {
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        let mut rate = Rate::new(0.1).unwrap();
        let start = Instant::now();
        assert!(!rate.sleep(&shutdown));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
