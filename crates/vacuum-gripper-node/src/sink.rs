//! 状态消息输出端

use crossbeam_channel::{Sender, TrySendError};
use thiserror::Error;

use crate::status::VacuumStateMsg;

/// 输出失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// 接收方已关闭
    #[error("Status receiver disconnected")]
    Disconnected,

    /// 接收方处理不过来，本条消息被丢弃
    #[error("Status receiver is full, message dropped")]
    Full,

    #[error("Status output failed: {0}")]
    Other(String),
}

/// 状态消息输出端
///
/// 在发布线程上调用，不应长时间阻塞。
pub trait StatusSink: Send {
    fn publish(&mut self, msg: VacuumStateMsg) -> Result<(), SinkError>;
}

impl<F> StatusSink for F
where
    F: FnMut(VacuumStateMsg) + Send,
{
    fn publish(&mut self, msg: VacuumStateMsg) -> Result<(), SinkError> {
        self(msg);
        Ok(())
    }
}

/// 把消息转发到 channel 的输出端（不阻塞，满时丢弃）
pub struct ChannelSink {
    tx: Sender<VacuumStateMsg>,
}

impl ChannelSink {
    pub fn new(tx: Sender<VacuumStateMsg>) -> Self {
        Self { tx }
    }
}

impl StatusSink for ChannelSink {
    fn publish(&mut self, msg: VacuumStateMsg) -> Result<(), SinkError> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Disconnected(_) => SinkError::Disconnected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_cell::StateCell;
    use std::time::Duration;

    fn msg() -> VacuumStateMsg {
        VacuumStateMsg::from_snapshot(&StateCell::new().snapshot(), Duration::from_secs(1))
    }

    #[test]
    fn test_closure_sink() {
        let mut received = Vec::new();
        {
            let mut sink = |m: VacuumStateMsg| received.push(m);
            sink.publish(msg()).unwrap();
            sink.publish(msg()).unwrap();
        }
        assert_eq!(received.len(), 2);
    }

    #[test]
    fn test_channel_sink_errors() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut sink = ChannelSink::new(tx);

        sink.publish(msg()).unwrap();
        assert_eq!(sink.publish(msg()), Err(SinkError::Full));

        assert!(rx.try_recv().is_ok());
        drop(rx);
        assert_eq!(sink.publish(msg()), Err(SinkError::Disconnected));
    }
}
