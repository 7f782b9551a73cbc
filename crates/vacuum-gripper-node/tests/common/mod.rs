//! 集成测试公共工具

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use std::time::{Duration, Instant};
use vacuum_gripper_driver::{SharedGripper, SimControl, SimulatedGripper};
use vacuum_gripper_node::{ChannelSink, GripperNode, NodeSettings, VacuumStateMsg};

pub const ROBOT_IP: &str = "172.16.0.2";

/// 连接一个模拟设备
pub fn sim_gripper() -> (SharedGripper, SimControl) {
    let sim = SimulatedGripper::connect(ROBOT_IP).expect("valid address");
    let control = sim.control();
    (SharedGripper::new(sim), control)
}

/// 以给定参数启动节点，状态消息进入返回的 channel
pub fn start_node(settings: NodeSettings) -> (GripperNode, SimControl, Receiver<VacuumStateMsg>) {
    let (gripper, control) = sim_gripper();
    let (tx, rx) = crossbeam_channel::unbounded();
    let node = GripperNode::start(settings, gripper, ChannelSink::new(tx)).expect("node starts");
    (node, control, rx)
}

pub fn default_settings() -> NodeSettings {
    NodeSettings::with_robot_ip(ROBOT_IP)
}

/// 收集 `window` 时长内的所有状态消息
pub fn collect_for(rx: &Receiver<VacuumStateMsg>, window: Duration) -> Vec<VacuumStateMsg> {
    let deadline = Instant::now() + window;
    let mut msgs = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(msg) => msgs.push(msg),
            Err(_) => break,
        }
    }
    msgs
}

/// 等待直到条件成立或超时
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
