//! 错误归一化
//!
//! 设备层与动作层之间唯一的错误转换点：设备调用返回的 `Result<bool, DeviceError>`
//! 在这里转换为目标终态与结果，三种动作共用同一转换逻辑。
//!
//! | 设备调用 | 目标状态 | 结果 |
//! |----------|----------|------|
//! | `Ok(true)` | Succeeded | `success = true` |
//! | `Ok(false)` | Succeeded | `success = false`，附带未确认描述 |
//! | `Err(e)` | Aborted | `success = false`，`error = e.to_string()` |
//! | panic | Aborted | `success = false`，附带 panic 描述 |

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, warn};
use vacuum_gripper_driver::DeviceError;

use crate::action::{ActionKind, ActionResult, GoalStatus};

/// 执行一次设备调用并归一化为 `(终态, 结果)`
///
/// 设备故障只在本地记录日志，不会向调用方传播。
pub fn normalize<F>(kind: ActionKind, op: F) -> (GoalStatus, ActionResult)
where
    F: FnOnce() -> Result<bool, DeviceError>,
{
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(true)) => (GoalStatus::Succeeded, ActionResult::success()),
        Ok(Ok(false)) => {
            warn!(action = %kind, "device did not confirm the command");
            (
                GoalStatus::Succeeded,
                ActionResult::failure(format!("{} was not confirmed by the device", kind)),
            )
        },
        Ok(Err(fault)) => {
            error!(action = %kind, error = %fault, "device fault");
            (GoalStatus::Aborted, ActionResult::failure(fault.to_string()))
        },
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(action = %kind, panic = %message, "device call panicked");
            (
                GoalStatus::Aborted,
                ActionResult::failure(format!("device call panicked: {}", message)),
            )
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
