//! stdout JSON-lines 输出
//!
//! 每行一个 JSON 对象，以 `type` 字段区分：`status`、`result`、`rejected`。
//! 日志写 stderr，stdout 只包含这些记录。

use serde::Serialize;
use std::io::{self, Write};
use vacuum_gripper_node::{
    ActionKind, GoalOutcome, SinkError, StatusSink, VacuumStateMsg,
};

/// 一行输出记录
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope<'a> {
    Status(&'a VacuumStateMsg),
    Result(&'a GoalOutcome),
    /// 目标未被接收（输入无法解析或端点拒绝）
    Rejected {
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<ActionKind>,
        error: String,
    },
}

impl Envelope<'_> {
    /// 写一行到 stdout（整行在 stdout 锁内写出，不同线程的记录不会交错）
    pub fn emit(&self) -> io::Result<()> {
        let line = serde_json::to_string(self).map_err(io::Error::other)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        stdout.flush()
    }
}

/// 把状态消息写到 stdout 的输出端
pub struct StdoutSink;

impl StatusSink for StdoutSink {
    fn publish(&mut self, msg: VacuumStateMsg) -> Result<(), SinkError> {
        Envelope::Status(&msg)
            .emit()
            .map_err(|e| SinkError::Other(e.to_string()))
    }
}
