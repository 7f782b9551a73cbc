//! stdin 目标输入
//!
//! 每行一个命令：
//! - `v`：以默认参数吸取
//! - `d`：以默认参数放件
//! - `s`：停止
//! - `q`：退出节点
//! - JSON 目标，例如 `{"action":"vacuum","vacuum":100,"timeout_ms":1000,"profile":"P0"}`

use anyhow::{Context, Result};
use vacuum_gripper_driver::{DropOffGoal, VacuumGoal};
use vacuum_gripper_node::ActionGoal;

/// 一行输入对应的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Goal(ActionGoal),
    Quit,
}

/// 解析一行输入；空行返回 `None`
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    let command = match line {
        "" => return Ok(None),
        "v" => Command::Goal(ActionGoal::Vacuum(VacuumGoal::default())),
        "d" => Command::Goal(ActionGoal::DropOff(DropOffGoal::default())),
        "s" => Command::Goal(ActionGoal::Stop),
        "q" => Command::Quit,
        json if json.starts_with('{') => {
            let goal: ActionGoal = serde_json::from_str(json)
                .with_context(|| format!("Invalid goal JSON: {}", json))?;
            Command::Goal(goal)
        },
        other => anyhow::bail!("Unknown command: {:?} (expected v, d, s, q or a JSON goal)", other),
    };
    Ok(Some(command))
}
