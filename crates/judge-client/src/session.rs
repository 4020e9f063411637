//! 执行会话。
//!
//! 每个编辑器面板持有一个 `ExecutionSession`，驱动
//! 提交 → 轮询 → 解码 → 通知 的完整流程。会话内部只跟踪一个当前流程：
//! 新的提交或 `stop()` 都会递增流程 ID，旧流程的后续回调在检查 ID 后
//! 静默退出，不会再修改面板状态或广播事件。

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use realtime_core::domain::Feedback;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::{ExecutionResult, JudgeApi, SubmissionRequest, SubmissionToken};
use crate::config::JudgeConfig;
use crate::error::{JudgeError, Result};
use crate::events::{EventBroadcaster, EventStream, ExecutionEvent};

/// 单调递增的流程标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(u64);

impl FlowId {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 面板可见状态快照。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PanelState {
    pub flow_id: FlowId,
    pub is_executing: bool,
    pub result: Option<ExecutionResult>,
}

/// 一次运行的结局。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// 得到终态结果。
    Completed(ExecutionResult),
    /// 流程已被新的提交或停止操作取代，结果被丢弃。
    Superseded,
}

/// 面板级执行会话，克隆后共享同一状态。
#[derive(Clone)]
pub struct ExecutionSession {
    api: Arc<dyn JudgeApi>,
    poll_interval: Duration,
    state: Arc<Mutex<PanelState>>,
    events: EventBroadcaster,
}

impl ExecutionSession {
    pub fn new(api: Arc<dyn JudgeApi>, config: &JudgeConfig) -> Self {
        Self::with_poll_interval(api, config.poll_interval(), config.event_buffer_size)
    }

    pub fn with_poll_interval(
        api: Arc<dyn JudgeApi>,
        poll_interval: Duration,
        event_buffer_size: usize,
    ) -> Self {
        Self {
            api,
            poll_interval,
            state: Arc::new(Mutex::new(PanelState::default())),
            events: EventBroadcaster::new(event_buffer_size),
        }
    }

    /// 订阅本会话的事件流。
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// 当前面板状态。
    pub fn snapshot(&self) -> PanelState {
        self.lock_state().clone()
    }

    /// 提交源代码并轮询直到终态。
    ///
    /// 等价于先 [`begin`](Self::begin) 再 [`drive`](Self::drive)。
    pub async fn run(&self, request: SubmissionRequest) -> Result<RunOutcome> {
        let flow_id = self.begin(&request)?;
        self.drive(flow_id, request).await
    }

    /// 同步开启新流程并返回其 ID，之前的流程随即失效。
    ///
    /// 调用方按消息到达顺序调用本方法，再把 `drive` 放到后台任务中，
    /// 这样后续的 `stop()` 或新提交总能取代这里开启的流程。
    pub fn begin(&self, request: &SubmissionRequest) -> Result<FlowId> {
        if request.source_code.trim().is_empty() {
            return Err(JudgeError::EmptySource);
        }
        Ok(self.begin_flow())
    }

    /// 驱动 `begin` 开启的流程：提交、轮询、解码、通知。
    ///
    /// 非终态时按固定间隔重复查询，不设次数上限。提交与轮询失败均不重试。
    /// 流程在开始提交前已被取代时直接返回，不会向评测服务发送请求。
    #[tracing::instrument(skip(self, request), fields(language = ?request.language))]
    pub async fn drive(&self, flow_id: FlowId, request: SubmissionRequest) -> Result<RunOutcome> {
        if !self.is_current(flow_id) {
            debug!(%flow_id, "flow superseded before submission");
            return Ok(RunOutcome::Superseded);
        }

        let token = match self.api.submit(&request).await {
            Ok(token) => token,
            Err(err) => return self.fail(flow_id, err),
        };

        if !self.emit_if_current(
            flow_id,
            ExecutionEvent::Started {
                flow_id,
                token: token.to_string(),
            },
        ) {
            return Ok(self.superseded(flow_id, &token));
        }
        info!(%flow_id, %token, "submission accepted, polling for result");

        loop {
            let raw = match self.api.fetch(&token).await {
                Ok(raw) => raw,
                Err(err) => return self.fail(flow_id, err),
            };

            if !raw.status.is_terminal() {
                let progress = ExecutionEvent::Progress {
                    flow_id,
                    status: raw.status,
                };
                if !self.emit_if_current(flow_id, progress) {
                    return Ok(self.superseded(flow_id, &token));
                }

                tokio::time::sleep(self.poll_interval).await;

                if !self.is_current(flow_id) {
                    return Ok(self.superseded(flow_id, &token));
                }
                continue;
            }

            let result = ExecutionResult::from(raw);
            if !self.complete(flow_id, &result) {
                return Ok(self.superseded(flow_id, &token));
            }

            info!(
                %flow_id,
                %token,
                status = result.status.id,
                description = %result.status.description,
                "execution finished"
            );
            return Ok(RunOutcome::Completed(result));
        }
    }

    /// 停止当前流程。
    ///
    /// 只清理本地状态，不取消已发出的网络请求；仍在进行的轮询会在下一次
    /// 检查流程 ID 时静默退出。
    pub fn stop(&self) {
        let mut state = self.lock_state();
        let stopped = state.flow_id;
        state.flow_id = stopped.next();
        state.is_executing = false;
        state.result = None;

        info!(flow_id = %stopped, "execution stopped");
        self.events.emit(ExecutionEvent::Stopped { flow_id: stopped });
        self.events.emit(ExecutionEvent::Feedback {
            flow_id: stopped,
            feedback: Feedback::info("Execution stopped"),
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, PanelState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin_flow(&self) -> FlowId {
        let mut state = self.lock_state();
        let flow_id = state.flow_id.next();
        state.flow_id = flow_id;
        state.is_executing = true;
        state.result = None;
        flow_id
    }

    fn is_current(&self, flow_id: FlowId) -> bool {
        self.lock_state().flow_id == flow_id
    }

    fn emit_if_current(&self, flow_id: FlowId, event: ExecutionEvent) -> bool {
        let state = self.lock_state();
        if state.flow_id != flow_id {
            return false;
        }
        self.events.emit(event);
        true
    }

    fn complete(&self, flow_id: FlowId, result: &ExecutionResult) -> bool {
        let mut state = self.lock_state();
        if state.flow_id != flow_id {
            return false;
        }

        state.is_executing = false;
        state.result = Some(result.clone());

        if let Some(feedback) = Feedback::for_status(&result.status) {
            self.events.emit(ExecutionEvent::Feedback { flow_id, feedback });
        }
        self.events.emit(ExecutionEvent::Finished {
            flow_id,
            result: result.clone(),
        });
        true
    }

    fn fail(&self, flow_id: FlowId, err: JudgeError) -> Result<RunOutcome> {
        let mut state = self.lock_state();
        if state.flow_id != flow_id {
            debug!(%flow_id, error = %err, "discarding failure of superseded flow");
            return Ok(RunOutcome::Superseded);
        }

        state.is_executing = false;
        warn!(%flow_id, error = %err, "execution flow failed");
        self.events.emit(ExecutionEvent::Failed {
            flow_id,
            error: err.to_string(),
        });
        Err(err)
    }

    fn superseded(&self, flow_id: FlowId, token: &SubmissionToken) -> RunOutcome {
        debug!(%flow_id, %token, "flow superseded, ignoring late poll result");
        RunOutcome::Superseded
    }
}
