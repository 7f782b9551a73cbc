//! 动作类型定义
//!
//! 三种动作（停止、吸取、放件）共用同一套目标/结果约定：
//! 每个被接受的目标恰好产生一个终态结果。

use serde::{Deserialize, Serialize};
use std::fmt;
use vacuum_gripper_driver::{DropOffGoal, VacuumGoal};

/// 动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Stop,
    Vacuum,
    DropOff,
}

impl ActionKind {
    /// 全部动作类型
    pub const ALL: [ActionKind; 3] = [ActionKind::Stop, ActionKind::Vacuum, ActionKind::DropOff];

    /// 端点名称
    pub fn endpoint(&self) -> &'static str {
        match self {
            ActionKind::Stop => "stop",
            ActionKind::Vacuum => "vacuum",
            ActionKind::DropOff => "dropoff",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            ActionKind::Stop => 0,
            ActionKind::Vacuum => 1,
            ActionKind::DropOff => 2,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// 动作目标
///
/// JSON 形式以 `action` 字段区分类型，例如：
///
/// ```
/// use vacuum_gripper_node::ActionGoal;
///
/// let goal: ActionGoal =
///     serde_json::from_str(r#"{"action":"vacuum","vacuum":100,"timeout_ms":1000}"#).unwrap();
/// assert!(matches!(goal, ActionGoal::Vacuum(_)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionGoal {
    Stop,
    Vacuum(VacuumGoal),
    #[serde(alias = "dropoff")]
    DropOff(DropOffGoal),
}

impl ActionGoal {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionGoal::Stop => ActionKind::Stop,
            ActionGoal::Vacuum(_) => ActionKind::Vacuum,
            ActionGoal::DropOff(_) => ActionKind::DropOff,
        }
    }
}

/// 目标编号（按接收顺序单调递增）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalId(pub u64);

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 目标状态机：`Pending → {Succeeded | Aborted}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// 已接收，尚未完成
    Pending,
    /// 设备调用正常返回（`success` 为设备返回值）
    Succeeded,
    /// 设备调用出错
    Aborted,
}

impl GoalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GoalStatus::Pending)
    }
}

/// 动作结果
///
/// `error` 当且仅当 `success == false` 时存在。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn success() -> Self {
        ActionResult {
            success: true,
            error: None,
        }
    }

    /// 失败结果；空错误描述会被替换为通用描述，保证错误文本非空
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            "unspecified device failure".to_string()
        } else {
            error
        };
        ActionResult {
            success: false,
            error: Some(error),
        }
    }
}

/// 一个目标的终态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalOutcome {
    pub id: GoalId,
    pub kind: ActionKind,
    pub status: GoalStatus,
    #[serde(flatten)]
    pub result: ActionResult,
}
