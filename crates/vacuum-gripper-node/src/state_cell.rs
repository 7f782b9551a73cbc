//! 共享状态单元
//!
//! 保存最近一次成功读取的设备状态。轮询线程整体替换，发布线程整体拷贝，
//! 二者在同一把锁下进行，读者不会看到新旧字段混合的状态。
//! 设备 I/O 不在锁内进行，临界区只有一次结构体拷贝。

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use vacuum_gripper_driver::GripperState;

/// 状态单元的一次拷贝
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub state: GripperState,
    /// 替换次数；0 表示尚未有成功读取，`state` 为初始默认值
    pub sequence: u64,
    /// 最近一次替换的时间
    pub updated_at: Option<Instant>,
}

impl Snapshot {
    /// 距最近一次替换的时长；从未替换过则返回 `None`
    pub fn age(&self) -> Option<std::time::Duration> {
        self.updated_at.map(|at| at.elapsed())
    }
}

/// 单槽状态单元（可克隆，所有克隆共享同一槽位）
#[derive(Clone)]
pub struct StateCell {
    slot: Arc<Mutex<Snapshot>>,
}

impl StateCell {
    /// 以默认状态初始化（全部标志为 false，状态码 Green，数值为 0）
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Snapshot {
                state: GripperState::default(),
                sequence: 0,
                updated_at: None,
            })),
        }
    }

    /// 整体替换为新状态，返回新的序号
    pub fn replace(&self, state: GripperState) -> u64 {
        let mut slot = self.slot.lock();
        slot.state = state;
        slot.sequence += 1;
        slot.updated_at = Some(Instant::now());
        slot.sequence
    }

    /// 拷贝当前内容
    pub fn snapshot(&self) -> Snapshot {
        *self.slot.lock()
    }

    pub fn state(&self) -> GripperState {
        self.slot.lock().state
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
