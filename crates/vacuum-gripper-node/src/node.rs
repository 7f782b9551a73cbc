//! # GripperNode
//!
//! 节点组装与停机时序。
//!
//! ```text
//!               ┌──────────────┐  read_state   ┌────────────────┐
//!   poll_rate → │ state-poller │ ────────────► │                │
//!               └──────┬───────┘               │                │
//!                      │ replace               │ SharedGripper  │
//!               ┌──────▼───────┐               │ (device lock)  │
//!               │  StateCell   │               │                │
//!               └──────┬───────┘               │                │
//!                      │ snapshot              │                │
//!               ┌──────▼──────────┐            │                │
//! publish_rate→ │ state-publisher │ → sink     │                │
//!               └─────────────────┘            │                │
//!               ┌──────────────────┐  stop /   │                │
//!     goals  →  │ ActionDispatcher │ ────────► │                │
//!               └──────────────────┘  vacuum / └────────────────┘
//!                                     drop_off
//! ```
//!
//! 停机顺序：触发信号 → 等待轮询、发布线程退出 → 关闭分发器（已接收的目标执行完毕）
//! → 按配置发送最后一次 stop。

use std::sync::Arc;
use tracing::{info, warn};
use vacuum_gripper_driver::SharedGripper;

use crate::action::{ActionKind, ActionResult, GoalStatus};
use crate::config::{NodeConfig, NodeSettings};
use crate::dispatcher::ActionDispatcher;
use crate::error::NodeError;
use crate::normalize::normalize;
use crate::poller::{PollerStats, StatePoller};
use crate::publisher::{PublisherStats, StatePublisher};
use crate::shutdown::ShutdownSignal;
use crate::sink::StatusSink;
use crate::state_cell::StateCell;

/// 停机时最后一次 stop 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalStop {
    /// 未配置 `stop_at_shutdown`
    NotRequested,
    /// 已发送，附带归一化后的结果（失败只记录日志）
    Issued {
        status: GoalStatus,
        result: ActionResult,
    },
}

/// 停机报告
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    pub poller: PollerStats,
    pub publisher: PublisherStats,
    pub final_stop: FinalStop,
}

impl ShutdownReport {
    /// 正常停机的进程退出码
    ///
    /// 始终为 0，最后一次 stop 的失败不影响退出码。
    pub fn exit_code(&self) -> i32 {
        0
    }
}

/// 真空夹爪节点
///
/// 未经 [`GripperNode::shutdown`] / [`GripperNode::wait_for_shutdown`] 直接析构时，
/// 触发停机信号、等待轮询与发布线程退出并关闭分发器，不发送最后一次 stop。
pub struct GripperNode {
    settings: NodeSettings,
    gripper: SharedGripper,
    dispatcher: Arc<ActionDispatcher>,
    cell: StateCell,
    shutdown: ShutdownSignal,
    poller: Option<StatePoller>,
    publisher: Option<StatePublisher>,
}

impl GripperNode {
    /// 校验配置后启动
    pub fn from_config<S>(
        config: &NodeConfig,
        gripper: SharedGripper,
        sink: S,
    ) -> Result<Self, NodeError>
    where
        S: StatusSink + 'static,
    {
        let settings = config.validate()?;
        Self::start(settings, gripper, sink)
    }

    /// 启动节点：动作端点、轮询线程、发布线程
    pub fn start<S>(settings: NodeSettings, gripper: SharedGripper, sink: S) -> Result<Self, NodeError>
    where
        S: StatusSink + 'static,
    {
        let dispatcher = ActionDispatcher::new(gripper.clone(), settings.dispatcher.clone())
            .map_err(|source| NodeError::Spawn {
                thread: "action-worker",
                source,
            })?;
        dispatcher.start_all();
        let dispatcher = Arc::new(dispatcher);

        let cell = StateCell::new();
        let shutdown = ShutdownSignal::new();

        let poller = StatePoller::spawn(
            gripper.clone(),
            cell.clone(),
            settings.poll_rate,
            shutdown.clone(),
        )
        .map_err(|source| NodeError::Spawn {
            thread: "state-poller",
            source,
        })?;

        let publisher = match StatePublisher::spawn(
            cell.clone(),
            sink,
            settings.publish_rate,
            settings.stale_after,
            shutdown.clone(),
        ) {
            Ok(publisher) => publisher,
            Err(source) => {
                shutdown.trigger();
                poller.join();
                dispatcher.shutdown();
                return Err(NodeError::Spawn {
                    thread: "state-publisher",
                    source,
                });
            },
        };

        info!(
            robot_ip = %settings.robot_ip,
            publish_rate = settings.publish_rate,
            poll_rate = settings.poll_rate,
            stop_at_shutdown = settings.stop_at_shutdown,
            "vacuum gripper node ready"
        );

        Ok(Self {
            settings,
            gripper,
            dispatcher,
            cell,
            shutdown,
            poller: Some(poller),
            publisher: Some(publisher),
        })
    }

    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }

    /// 动作分发器（可在其他线程提交目标）
    pub fn dispatcher(&self) -> Arc<ActionDispatcher> {
        self.dispatcher.clone()
    }

    pub fn state_cell(&self) -> StateCell {
        self.cell.clone()
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// 触发停机并等待完成
    pub fn shutdown(self) -> ShutdownReport {
        self.shutdown.trigger();
        self.wait_for_shutdown()
    }

    /// 阻塞直到停机信号触发，然后按顺序停机
    pub fn wait_for_shutdown(mut self) -> ShutdownReport {
        self.shutdown.wait();
        info!("shutdown requested");

        let poller = self.poller.take().map(StatePoller::join).unwrap_or_default();
        let publisher = self
            .publisher
            .take()
            .map(StatePublisher::join)
            .unwrap_or_default();
        self.dispatcher.shutdown();

        let final_stop = if self.settings.stop_at_shutdown {
            info!("sending final stop to device");
            let (status, result) = normalize(ActionKind::Stop, || self.gripper.stop());
            if !result.success {
                warn!(
                    error = result.error.as_deref().unwrap_or_default(),
                    "final stop failed"
                );
            }
            FinalStop::Issued { status, result }
        } else {
            FinalStop::NotRequested
        };

        info!("vacuum gripper node stopped");
        ShutdownReport {
            poller,
            publisher,
            final_stop,
        }
    }
}

impl Drop for GripperNode {
    fn drop(&mut self) {
        if self.poller.is_none() && self.publisher.is_none() {
            return;
        }
        warn!("vacuum gripper node dropped without shutdown, stopping background threads");
        self.shutdown.trigger();
        if let Some(poller) = self.poller.take() {
            poller.join();
        }
        if let Some(publisher) = self.publisher.take() {
            publisher.join();
        }
        self.dispatcher.shutdown();
    }
}
