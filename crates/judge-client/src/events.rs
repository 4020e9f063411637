use anyhow::Result;
use realtime_core::domain::{Feedback, JudgeStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::api::ExecutionResult;
use crate::session::FlowId;

/// 执行会话对外广播的事件类型。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// 提交已被评测服务接收。
    Started {
        flow_id: FlowId,
        token: String,
    },
    /// 评测仍在排队或运行中。
    Progress {
        flow_id: FlowId,
        status: JudgeStatus,
    },
    /// 面向用户的通知。
    Feedback {
        flow_id: FlowId,
        feedback: Feedback,
    },
    /// 评测结束，携带解码后的结果。
    Finished {
        flow_id: FlowId,
        result: ExecutionResult,
    },
    /// 提交或轮询失败，流程终止。
    Failed {
        flow_id: FlowId,
        error: String,
    },
    /// 用户主动停止。
    Stopped {
        flow_id: FlowId,
    },
}

impl ExecutionEvent {
    pub fn flow_id(&self) -> FlowId {
        match self {
            ExecutionEvent::Started { flow_id, .. }
            | ExecutionEvent::Progress { flow_id, .. }
            | ExecutionEvent::Feedback { flow_id, .. }
            | ExecutionEvent::Finished { flow_id, .. }
            | ExecutionEvent::Failed { flow_id, .. }
            | ExecutionEvent::Stopped { flow_id } => *flow_id,
        }
    }
}

/// 基于 `tokio::broadcast` 的事件广播器。
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBroadcaster {
    /// 创建事件广播器。
    ///
    /// `capacity` 表示内部广播队列容量。
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 广播一个事件，没有订阅者时直接丢弃。
    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }

    /// 订阅事件流。
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }
}

/// 事件接收流包装器。
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<ExecutionEvent>,
}

impl EventStream {
    /// 异步接收下一条事件。
    pub async fn recv(&mut self) -> Result<ExecutionEvent> {
        Ok(self.receiver.recv().await?)
    }

    /// 非阻塞尝试接收一条事件。
    pub fn try_recv(&mut self) -> Result<ExecutionEvent> {
        Ok(self.receiver.try_recv()?)
    }
}
