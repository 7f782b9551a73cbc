//! ActionDispatcher - 动作目标分发
//!
//! 三个动作端点共用一个固定大小的工作线程池。目标进入有界队列，
//! 由空闲的工作线程取出并同步执行设备调用，执行期间该线程阻塞。
//!
//! # 架构
//!
//! ```text
//! submit(goal) ──► [endpoint check] ──► bounded queue ──► action-worker-N
//!                                                            │
//!                                          dispatch() ◄──────┘
//!                                             │
//!                               normalize(SharedGripper call)
//!                                             │
//!                                   GoalOutcome ──► reply channel
//! ```
//!
//! 设备调用经 [`SharedGripper`] 串行化，因此不同类型的动作目标同时到达时，
//! 对设备的调用也不会交错。

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use vacuum_gripper_driver::SharedGripper;

use crate::action::{ActionGoal, ActionKind, ActionResult, GoalId, GoalOutcome, GoalStatus};
use crate::config::{DEFAULT_ACTION_THREADS, DEFAULT_QUEUE_CAPACITY, MIN_ACTION_THREADS};
use crate::normalize::normalize;

/// 分发器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// 工作线程数（少于 [`MIN_ACTION_THREADS`] 时按下限启动）
    pub workers: usize,
    /// 等待执行的目标队列容量
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_ACTION_THREADS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// 目标提交错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// 端点尚未启动（或已停止接收）
    #[error("Action endpoint '{0}' is not accepting goals")]
    EndpointNotStarted(ActionKind),

    /// 等待队列已满
    #[error("Goal queue full (capacity: {capacity})")]
    QueueFull {
        /// 队列容量
        capacity: usize,
    },

    /// 分发器正在关闭
    #[error("Dispatcher is shutting down")]
    ShuttingDown,
}

struct QueuedGoal {
    id: GoalId,
    goal: ActionGoal,
    reply: Sender<GoalOutcome>,
}

/// 单个目标的句柄，用于查询状态或等待结果
pub struct GoalHandle {
    id: GoalId,
    kind: ActionKind,
    rx: Receiver<GoalOutcome>,
    outcome: Option<GoalOutcome>,
}

impl GoalHandle {
    pub fn id(&self) -> GoalId {
        self.id
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// 当前状态（不阻塞）
    pub fn status(&mut self) -> GoalStatus {
        if self.outcome.is_none() {
            self.outcome = self.rx.try_recv().ok();
        }
        self.outcome
            .as_ref()
            .map_or(GoalStatus::Pending, |outcome| outcome.status)
    }

    /// 阻塞等待终态
    pub fn wait(mut self) -> GoalOutcome {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        match self.rx.recv() {
            Ok(outcome) => outcome,
            // 工作线程不会在未回复的情况下丢弃目标；这里只做兜底
            Err(_) => GoalOutcome {
                id: self.id,
                kind: self.kind,
                status: GoalStatus::Aborted,
                result: ActionResult::failure("dispatcher stopped before the goal completed"),
            },
        }
    }

    /// 最多等待 `timeout`，超时返回 `None`（目标仍在执行）
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<GoalOutcome> {
        if self.outcome.is_none() {
            match self.rx.recv_timeout(timeout) {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {},
            }
        }
        self.outcome.clone()
    }
}

/// 动作分发器
pub struct ActionDispatcher {
    /// 目标队列发送端（关闭时取走，工作线程随之退出）
    queue_tx: Mutex<Option<Sender<QueuedGoal>>>,
    /// 工作线程句柄（关闭时 join）
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// 各端点是否接收目标（按 `ActionKind::index` 排列）
    accepting: [AtomicBool; 3],
    next_id: AtomicU64,
    worker_count: usize,
    queue_capacity: usize,
}

impl ActionDispatcher {
    /// 创建分发器并启动工作线程
    ///
    /// 创建后所有端点均未启动，需调用 [`start`](Self::start) 或
    /// [`start_all`](Self::start_all) 后才接收目标。
    pub fn new(gripper: SharedGripper, config: DispatcherConfig) -> std::io::Result<Self> {
        let worker_count = if config.workers < MIN_ACTION_THREADS {
            warn!(
                requested = config.workers,
                "Dispatcher needs at least {} workers, using {}",
                MIN_ACTION_THREADS,
                MIN_ACTION_THREADS
            );
            MIN_ACTION_THREADS
        } else {
            config.workers
        };
        let queue_capacity = config.queue_capacity.max(1);
        let (queue_tx, queue_rx) = crossbeam_channel::bounded::<QueuedGoal>(queue_capacity);

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let gripper = gripper.clone();
            let queue_rx = queue_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("action-worker-{}", index))
                .spawn(move || worker_loop(index, gripper, queue_rx))?;
            workers.push(handle);
        }

        debug!(workers = worker_count, queue_capacity, "action dispatcher created");

        Ok(Self {
            queue_tx: Mutex::new(Some(queue_tx)),
            workers: Mutex::new(workers),
            accepting: Default::default(),
            next_id: AtomicU64::new(1),
            worker_count,
            queue_capacity,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// 启动单个端点
    pub fn start(&self, kind: ActionKind) {
        if self.queue_tx.lock().is_none() {
            warn!(action = %kind, "cannot start endpoint after shutdown");
            return;
        }
        self.accepting[kind.index()].store(true, Ordering::SeqCst);
        info!(action = %kind, "action endpoint started");
    }

    pub fn start_all(&self) {
        for kind in ActionKind::ALL {
            self.start(kind);
        }
    }

    /// 端点是否接收目标
    pub fn is_accepting(&self, kind: ActionKind) -> bool {
        self.accepting[kind.index()].load(Ordering::SeqCst)
    }

    /// 三个端点都已启动
    pub fn is_ready(&self) -> bool {
        ActionKind::ALL.iter().all(|kind| self.is_accepting(*kind))
    }

    /// 队列中等待执行的目标数量
    pub fn queued_goals(&self) -> usize {
        self.queue_tx.lock().as_ref().map_or(0, Sender::len)
    }

    /// 提交目标，返回句柄
    pub fn submit(&self, goal: ActionGoal) -> Result<GoalHandle, DispatchError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let id = self.submit_to(goal, &reply_tx)?;
        Ok(GoalHandle {
            id,
            kind: goal.kind(),
            rx: reply_rx,
            outcome: None,
        })
    }

    /// 提交目标，终态发送到 `reply`
    ///
    /// 多个目标可以共用同一个 `reply` 通道，按完成顺序收到结果。
    pub fn submit_to(
        &self,
        goal: ActionGoal,
        reply: &Sender<GoalOutcome>,
    ) -> Result<GoalId, DispatchError> {
        let kind = goal.kind();
        if !self.is_accepting(kind) {
            return Err(DispatchError::EndpointNotStarted(kind));
        }

        let queue = self.queue_tx.lock();
        let queue = queue.as_ref().ok_or(DispatchError::ShuttingDown)?;

        let id = GoalId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let queued = QueuedGoal {
            id,
            goal,
            reply: reply.clone(),
        };
        match queue.try_send(queued) {
            Ok(()) => {
                debug!(goal = %id, action = %kind, "goal accepted");
                Ok(id)
            },
            Err(TrySendError::Full(_)) => Err(DispatchError::QueueFull {
                capacity: self.queue_capacity,
            }),
            Err(TrySendError::Disconnected(_)) => Err(DispatchError::ShuttingDown),
        }
    }

    /// 停止接收目标，等待已接收的目标执行完毕并回收工作线程
    ///
    /// 可重复调用。
    pub fn shutdown(&self) {
        for flag in &self.accepting {
            flag.store(false, Ordering::SeqCst);
        }

        // 关闭队列：工作线程处理完剩余目标后退出
        let queue = self.queue_tx.lock().take();
        if queue.is_none() {
            return;
        }
        drop(queue);

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            let name = handle.thread().name().unwrap_or("action-worker").to_string();
            if handle.join().is_err() {
                warn!(worker = %name, "action worker panicked");
            }
        }
        info!("action dispatcher stopped");
    }
}

impl Drop for ActionDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 执行一个目标：单一的分发函数，按目标类型选择设备调用，统一归一化结果
pub fn dispatch(gripper: &SharedGripper, id: GoalId, goal: ActionGoal) -> GoalOutcome {
    let kind = goal.kind();
    let (status, result) = match goal {
        ActionGoal::Stop => normalize(kind, || gripper.stop()),
        ActionGoal::Vacuum(params) => normalize(kind, || gripper.vacuum(&params)),
        ActionGoal::DropOff(params) => normalize(kind, || gripper.drop_off(&params)),
    };
    GoalOutcome {
        id,
        kind,
        status,
        result,
    }
}

fn worker_loop(index: usize, gripper: SharedGripper, queue_rx: Receiver<QueuedGoal>) {
    for queued in queue_rx.iter() {
        let kind = queued.goal.kind();
        debug!(worker = index, goal = %queued.id, action = %kind, "goal started");

        let outcome = dispatch(&gripper, queued.id, queued.goal);
        info!(
            goal = %outcome.id,
            action = %kind,
            status = ?outcome.status,
            success = outcome.result.success,
            "goal finished"
        );

        if queued.reply.send(outcome).is_err() {
            debug!(goal = %queued.id, "goal requester is gone, result dropped");
        }
    }
    debug!(worker = index, "action worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use vacuum_gripper_driver::{DeviceCall, DeviceError, SimulatedGripper, VacuumGoal};

    fn dispatcher() -> (ActionDispatcher, vacuum_gripper_driver::SimControl) {
        let sim = SimulatedGripper::connect("127.0.0.1").unwrap();
        let control = sim.control();
        let dispatcher =
            ActionDispatcher::new(SharedGripper::new(sim), DispatcherConfig::default()).unwrap();
        (dispatcher, control)
    }

    #[test]
    fn test_endpoints_start_closed() {
        let (dispatcher, control) = dispatcher();
        assert!(!dispatcher.is_ready());

        let err = dispatcher.submit(ActionGoal::Stop).err().unwrap();
        assert_eq!(err, DispatchError::EndpointNotStarted(ActionKind::Stop));
        assert_eq!(control.call_count(DeviceCall::Stop), 0);
    }

    #[test]
    fn test_single_endpoint_start() {
        let (dispatcher, _control) = dispatcher();
        dispatcher.start(ActionKind::Vacuum);

        assert!(dispatcher.is_accepting(ActionKind::Vacuum));
        assert!(!dispatcher.is_ready());
        assert!(dispatcher.submit(ActionGoal::Vacuum(VacuumGoal::default())).is_ok());
        assert!(matches!(
            dispatcher.submit(ActionGoal::Stop),
            Err(DispatchError::EndpointNotStarted(ActionKind::Stop))
        ));
    }

    #[test]
    fn test_dispatch_maps_goal_to_device_call() {
        let sim = SimulatedGripper::connect("127.0.0.1").unwrap();
        let control = sim.control();
        let gripper = SharedGripper::new(sim);

        let outcome = dispatch(&gripper, GoalId(1), ActionGoal::Vacuum(VacuumGoal::default()));
        assert_eq!(outcome.kind, ActionKind::Vacuum);
        assert_eq!(outcome.status, GoalStatus::Succeeded);
        assert_eq!(control.call_count(DeviceCall::Vacuum), 1);
        assert_eq!(control.call_count(DeviceCall::Stop), 0);

        control.fail_once(DeviceCall::Stop, DeviceError::Timeout { timeout_ms: 100 });
        let outcome = dispatch(&gripper, GoalId(2), ActionGoal::Stop);
        assert_eq!(outcome.id, GoalId(2));
        assert_eq!(outcome.status, GoalStatus::Aborted);
        assert_eq!(
            outcome.result.error.as_deref(),
            Some("Device operation timed out after 100ms")
        );
    }

    #[test]
    fn test_goal_ids_increase() {
        let (dispatcher, _control) = dispatcher();
        dispatcher.start_all();

        let a = dispatcher.submit(ActionGoal::Stop).unwrap();
        let b = dispatcher.submit(ActionGoal::Stop).unwrap();
        assert!(b.id() > a.id());
        assert_eq!(a.wait().status, GoalStatus::Succeeded);
        assert_eq!(b.wait().status, GoalStatus::Succeeded);
    }

    #[test]
    fn test_queue_full_is_reported() {
        let sim = SimulatedGripper::connect("127.0.0.1").unwrap();
        let control = sim.control();
        control.set_latency(Duration::from_millis(100));
        let dispatcher = ActionDispatcher::new(
            SharedGripper::new(sim),
            DispatcherConfig {
                workers: 2,
                queue_capacity: 1,
            },
        )
        .unwrap();
        dispatcher.start_all();

        // 前两个目标被两个工作线程取走，第三个占满队列
        let first = dispatcher.submit(ActionGoal::Stop).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let second = dispatcher.submit(ActionGoal::Stop).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let third = dispatcher.submit(ActionGoal::Stop).unwrap();
        let fourth = dispatcher.submit(ActionGoal::Stop);
        assert_eq!(fourth.err(), Some(DispatchError::QueueFull { capacity: 1 }));

        assert_eq!(first.wait().status, GoalStatus::Succeeded);
        assert_eq!(second.wait().status, GoalStatus::Succeeded);
        assert_eq!(third.wait().status, GoalStatus::Succeeded);
    }

    #[test]
    fn test_worker_count_has_floor() {
        for requested in [0, 1] {
            let sim = SimulatedGripper::connect("127.0.0.1").unwrap();
            let dispatcher = ActionDispatcher::new(
                SharedGripper::new(sim),
                DispatcherConfig {
                    workers: requested,
                    queue_capacity: 4,
                },
            )
            .unwrap();
            assert_eq!(dispatcher.worker_count(), MIN_ACTION_THREADS);
        }

        let (dispatcher, _control) = dispatcher();
        assert_eq!(dispatcher.worker_count(), DEFAULT_ACTION_THREADS);
    }

    /// 一个目标阻塞在设备上时，另一个端点的目标仍被取走执行
    #[test]
    fn test_blocked_goal_does_not_starve_other_endpoint() {
        let sim = SimulatedGripper::connect("127.0.0.1").unwrap();
        let control = sim.control();
        let dispatcher = ActionDispatcher::new(
            SharedGripper::new(sim),
            DispatcherConfig {
                workers: 1,
                queue_capacity: 4,
            },
        )
        .unwrap();
        dispatcher.start_all();

        control.set_latency(Duration::from_millis(100));
        let vacuum = dispatcher.submit(ActionGoal::Vacuum(VacuumGoal::default())).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let stop = dispatcher.submit(ActionGoal::Stop).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        // 两个目标都已离开队列
        assert_eq!(dispatcher.queued_goals(), 0);

        assert_eq!(vacuum.wait().status, GoalStatus::Succeeded);
        assert_eq!(stop.wait().status, GoalStatus::Succeeded);
        assert!(!control.overlap_detected());
    }

    /// 关闭时已接收的目标仍会完成，之后的提交被拒绝
    #[test]
    fn test_shutdown_drains_accepted_goals() {
        let (dispatcher, control) = dispatcher();
        control.set_latency(Duration::from_millis(10));
        dispatcher.start_all();

        let handles: Vec<_> = (0..4)
            .map(|_| dispatcher.submit(ActionGoal::Stop).unwrap())
            .collect();
        dispatcher.shutdown();

        for handle in handles {
            assert_eq!(handle.wait().status, GoalStatus::Succeeded);
        }
        assert_eq!(control.call_count(DeviceCall::Stop), 4);
        assert!(matches!(
            dispatcher.submit(ActionGoal::Stop),
            Err(DispatchError::EndpointNotStarted(_))
        ));

        // 关闭后不能重新启动端点
        dispatcher.start_all();
        assert!(!dispatcher.is_ready());
        dispatcher.shutdown();
    }

    #[test]
    fn test_goal_handle_status_transitions() {
        let (dispatcher, control) = dispatcher();
        control.set_latency(Duration::from_millis(50));
        dispatcher.start_all();

        let mut handle = dispatcher.submit(ActionGoal::Stop).unwrap();
        assert_eq!(handle.status(), GoalStatus::Pending);
        assert!(handle.wait_timeout(Duration::from_millis(1)).is_none());

        let outcome = handle.wait_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(outcome.status, GoalStatus::Succeeded);
        assert_eq!(handle.status(), GoalStatus::Succeeded);
        assert_eq!(handle.wait(), outcome);
    }
}
