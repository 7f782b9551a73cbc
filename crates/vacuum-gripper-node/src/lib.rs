//! 真空夹爪控制节点
//!
//! 把一个阻塞式的设备句柄暴露为三个动作端点（stop / vacuum / dropoff）
//! 和一个周期状态流：
//!
//! - [`ActionDispatcher`]：动作目标分发，设备错误统一归一化为结果
//! - [`StatePoller`]：按轮询频率读取设备状态，写入 [`StateCell`]
//! - [`StatePublisher`]：按发布频率拷贝状态并输出 [`VacuumStateMsg`]
//! - [`GripperNode`]：组装以上组件并负责停机时序
//!
//! # 示例
//!
//! ```no_run
//! use vacuum_gripper_driver::{SharedGripper, SimulatedGripper};
//! use vacuum_gripper_node::{ActionGoal, GripperNode, NodeSettings, VacuumStateMsg};
//!
//! let gripper = SharedGripper::new(SimulatedGripper::connect("172.16.0.2").unwrap());
//! let node = GripperNode::start(
//!     NodeSettings::with_robot_ip("172.16.0.2"),
//!     gripper,
//!     |msg: VacuumStateMsg| println!("{:?}", msg),
//! )
//! .unwrap();
//!
//! let outcome = node.dispatcher().submit(ActionGoal::Stop).unwrap().wait();
//! assert!(outcome.result.success);
//!
//! let report = node.shutdown();
//! std::process::exit(report.exit_code());
//! ```

mod action;
pub mod config;
mod dispatcher;
mod error;
mod node;
mod normalize;
mod poller;
mod publisher;
mod rate;
mod shutdown;
mod sink;
mod state_cell;
mod status;

pub use action::{ActionGoal, ActionKind, ActionResult, GoalId, GoalOutcome, GoalStatus};
pub use config::{ConfigError, NodeConfig, NodeSettings};
pub use dispatcher::{
    ActionDispatcher, DispatchError, DispatcherConfig, GoalHandle, dispatch,
};
pub use error::NodeError;
pub use node::{FinalStop, GripperNode, ShutdownReport};
pub use normalize::normalize;
pub use poller::{PollerStats, StatePoller, poll_once};
pub use publisher::{PublisherStats, StatePublisher};
pub use rate::Rate;
pub use shutdown::ShutdownSignal;
pub use sink::{ChannelSink, SinkError, StatusSink};
pub use state_cell::{Snapshot, StateCell};
pub use status::VacuumStateMsg;

pub use vacuum_gripper_driver as driver;
