//! 代码执行 API。
//!
//! 每条 WebSocket 连接对应一个编辑器面板，并独占一个 `ExecutionSession`；
//! 面板状态不在连接之间共享。

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::{Json, Router, routing::get};
use futures_util::{SinkExt, StreamExt};
use judge_client::{
    EventStream, ExecutionEvent, ExecutionResult, ExecutionSession, SubmissionRequest,
};
use realtime_api_types::{
    ExecutionClientMessage, ExecutionInfoResponse, ExecutionOutput, ExecutionServerMessage,
    LanguageInfo,
};
use realtime_core::domain::{EXECUTING_MESSAGE, FeedbackLevel, Language};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::state::AppState;

const DISABLED_MESSAGE: &str = "Code execution is unavailable: no judge API key is configured.";

/// 创建代码执行 API 路由。
pub fn create_execution_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/execution", get(execution_info))
        .route("/api/execution/ws", get(websocket_handler))
}

/// 返回执行能力与可选语言。
async fn execution_info(State(state): State<Arc<AppState>>) -> Json<ExecutionInfoResponse> {
    Json(ExecutionInfoResponse {
        enabled: state.judge.is_some(),
        languages: Language::ALL
            .into_iter()
            .map(|language| LanguageInfo {
                id: language.judge_id(),
                name: language.name().to_string(),
            })
            .collect(),
    })
}

/// Axum WebSocket 升级 handler。
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("new execution WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ExecutionServerMessage>(64);

    let writer_task = tokio::spawn(async move {
        while let Some(server_msg) = out_rx.recv().await {
            match serde_json::to_string(&server_msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    error!(error = %err, "failed to serialize WebSocket message");
                    break;
                }
            }
        }
    });

    let session = state
        .judge
        .clone()
        .map(|api| ExecutionSession::new(api, &state.judge_config));

    let event_task = session
        .as_ref()
        .map(|session| tokio::spawn(forward_events(session.subscribe(), out_tx.clone())));

    if session.is_none() {
        let _ = out_tx
            .send(ExecutionServerMessage::Unavailable {
                message: DISABLED_MESSAGE.to_string(),
            })
            .await;
    }
    info!(enabled = session.is_some(), "execution WebSocket connection established");

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<ExecutionClientMessage>(&text) {
                    Ok(client_msg) => handle_client_message(session.as_ref(), client_msg),
                    Err(err) => Some(ExecutionServerMessage::Error {
                        message: format!("invalid message: {err}"),
                    }),
                };
                if let Some(reply) = reply
                    && out_tx.send(reply).await.is_err()
                {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "WebSocket receive error");
                break;
            }
        }
    }

    // 仍在运行的轮询会在下一次检查时发现流程 ID 已变化并退出。
    if let Some(session) = &session
        && session.snapshot().is_executing
    {
        session.stop();
    }
    if let Some(event_task) = event_task {
        event_task.abort();
    }
    drop(out_tx);
    if let Err(err) = writer_task.await {
        warn!(error = %err, "WebSocket writer task exited with join error");
    }

    info!("execution WebSocket connection closed");
}

/// 转发会话事件，落后时跳过丢失的事件继续转发，事件流关闭后退出。
async fn forward_events(mut events: EventStream, out_tx: mpsc::Sender<ExecutionServerMessage>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if out_tx.send(event_to_server_message(event)).await.is_err() {
                    break;
                }
            }
            Err(err) => match err.downcast_ref::<RecvError>() {
                Some(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "execution event stream lagged, skipping missed events");
                }
                _ => {
                    debug!(error = %err, "execution event stream closed");
                    break;
                }
            },
        }
    }
}

fn handle_client_message(
    session: Option<&ExecutionSession>,
    msg: ExecutionClientMessage,
) -> Option<ExecutionServerMessage> {
    let Some(session) = session else {
        return Some(ExecutionServerMessage::Unavailable {
            message: DISABLED_MESSAGE.to_string(),
        });
    };

    match msg {
        ExecutionClientMessage::Run {
            source_code,
            language_id,
            stdin,
        } => {
            let language = match Language::try_from(language_id) {
                Ok(language) => language,
                Err(err) => {
                    return Some(ExecutionServerMessage::Error {
                        message: err.to_string(),
                    });
                }
            };

            let mut request = SubmissionRequest::new(source_code, language);
            if let Some(stdin) = stdin {
                request = request.with_stdin(stdin);
            }

            // 流程 ID 按消息到达顺序同步分配，后台任务只负责驱动。
            let flow_id = match session.begin(&request) {
                Ok(flow_id) => flow_id,
                Err(err) => {
                    return Some(ExecutionServerMessage::Error {
                        message: err.to_string(),
                    });
                }
            };

            let session = session.clone();
            tokio::spawn(async move {
                match session.drive(flow_id, request).await {
                    Ok(outcome) => debug!(?outcome, "execution flow ended"),
                    // 提交与轮询失败已通过 `Failed` 事件广播。
                    Err(err) => debug!(error = %err, "execution flow failed"),
                }
            });
            None
        }
        ExecutionClientMessage::Stop => {
            session.stop();
            None
        }
    }
}

/// 将执行事件转换为 WebSocket 消息。
fn event_to_server_message(event: ExecutionEvent) -> ExecutionServerMessage {
    match event {
        ExecutionEvent::Started { flow_id, token } => ExecutionServerMessage::Started {
            flow_id: flow_id.value(),
            token,
        },
        ExecutionEvent::Progress { flow_id, .. } => ExecutionServerMessage::Progress {
            flow_id: flow_id.value(),
            message: EXECUTING_MESSAGE.to_string(),
        },
        ExecutionEvent::Feedback { flow_id, feedback } => ExecutionServerMessage::Feedback {
            flow_id: flow_id.value(),
            level: level_name(feedback.level).to_string(),
            message: feedback.message,
        },
        ExecutionEvent::Finished { flow_id, result } => ExecutionServerMessage::Finished {
            flow_id: flow_id.value(),
            output: to_output(result),
        },
        ExecutionEvent::Failed { error, .. } => ExecutionServerMessage::Error { message: error },
        ExecutionEvent::Stopped { flow_id } => ExecutionServerMessage::Stopped {
            flow_id: flow_id.value(),
        },
    }
}

fn level_name(level: FeedbackLevel) -> &'static str {
    match level {
        FeedbackLevel::Info => "info",
        FeedbackLevel::Success => "success",
        FeedbackLevel::Error => "error",
    }
}

fn to_output(result: ExecutionResult) -> ExecutionOutput {
    ExecutionOutput {
        status_id: result.status.id,
        status: result.status.description,
        stdout: result.stdout,
        stderr: result.stderr,
        compile_output: result.compile_output,
        message: result.message,
        time: result.time,
        memory: result.memory,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use judge_client::{
        EventBroadcaster, ExecutionEvent, ExecutionResult, ExecutionSession, FlowId, JudgeApi,
        JudgeError, RawExecution, SubmissionRequest, SubmissionToken,
    };
    use realtime_api_types::{
        ExecutionClientMessage, ExecutionInfoResponse, ExecutionServerMessage,
    };
    use realtime_core::domain::{Feedback, JudgeStatus};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use super::{event_to_server_message, forward_events, handle_client_message};
    use crate::api::{router, test_state};

    /// 按脚本返回状态的评测服务，脚本耗尽后重复最后一个状态。
    #[derive(Default)]
    struct ScriptedJudge {
        script: Mutex<VecDeque<RawExecution>>,
        submissions: Mutex<Vec<SubmissionRequest>>,
        fetches: AtomicUsize,
    }

    impl ScriptedJudge {
        fn new(script: Vec<RawExecution>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                ..Self::default()
            })
        }

        fn submissions(&self) -> Vec<SubmissionRequest> {
            self.submissions.lock().unwrap().clone()
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JudgeApi for ScriptedJudge {
        async fn submit(&self, request: &SubmissionRequest) -> judge_client::Result<SubmissionToken> {
            let mut submissions = self.submissions.lock().unwrap();
            submissions.push(request.clone());
            Ok(SubmissionToken::new(format!("tok{}", submissions.len())))
        }

        async fn fetch(&self, _token: &SubmissionToken) -> judge_client::Result<RawExecution> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let next = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            };
            next.ok_or_else(|| JudgeError::PollFailed("empty script".to_string()))
        }
    }

    fn queued() -> RawExecution {
        RawExecution::new(JudgeStatus::new(1, "In Queue"))
    }

    fn accepted(stdout: &str) -> RawExecution {
        let mut raw = RawExecution::new(JudgeStatus::new(3, "Accepted"));
        raw.stdout = Some(stdout.to_string());
        raw
    }

    fn session_for(judge: &Arc<ScriptedJudge>) -> ExecutionSession {
        let api: Arc<dyn JudgeApi> = judge.clone();
        ExecutionSession::with_poll_interval(api, Duration::from_secs(1), 64)
    }

    fn run_message(source: &str, language_id: i32) -> ExecutionClientMessage {
        ExecutionClientMessage::Run {
            source_code: source.to_string(),
            language_id,
            stdin: None,
        }
    }

    async fn collect_until_finished(
        rx: &mut mpsc::Receiver<ExecutionServerMessage>,
    ) -> Vec<ExecutionServerMessage> {
        let mut messages = Vec::new();
        while let Some(message) = rx.recv().await {
            let finished = matches!(message, ExecutionServerMessage::Finished { .. });
            messages.push(message);
            if finished {
                break;
            }
        }
        messages
    }

    #[tokio::test]
    async fn execution_is_disabled_without_judge() {
        let app = router(test_state(None).await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/execution")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let info: ExecutionInfoResponse =
            serde_json::from_slice(&bytes).expect("body should be valid json");
        assert!(!info.enabled);
        assert!(info.languages.iter().any(|l| l.id == 71 && l.name == "Python"));
    }

    #[test]
    fn progress_events_show_executing_message() {
        let event = ExecutionEvent::Progress {
            flow_id: FlowId::default(),
            status: JudgeStatus::new(2, "Processing"),
        };

        assert_eq!(
            event_to_server_message(event),
            ExecutionServerMessage::Progress {
                flow_id: 0,
                message: "Executing code…".to_string(),
            }
        );
    }

    #[test]
    fn feedback_and_results_are_flattened() {
        let feedback = event_to_server_message(ExecutionEvent::Feedback {
            flow_id: FlowId::default(),
            feedback: Feedback::success("Code executed successfully!"),
        });
        assert_eq!(
            feedback,
            ExecutionServerMessage::Feedback {
                flow_id: 0,
                level: "success".to_string(),
                message: "Code executed successfully!".to_string(),
            }
        );

        let finished = event_to_server_message(ExecutionEvent::Finished {
            flow_id: FlowId::default(),
            result: ExecutionResult {
                status: JudgeStatus::new(3, "Accepted"),
                stdout: Some("42\n".to_string()),
                stderr: None,
                compile_output: None,
                message: Some("Exited with error status 1".to_string()),
                time: Some("0.01".to_string()),
                memory: Some(1024),
            },
        });
        let ExecutionServerMessage::Finished { output, .. } = finished else {
            panic!("expected finished message");
        };
        assert_eq!(output.status_id, 3);
        assert_eq!(output.stdout.as_deref(), Some("42\n"));
        assert_eq!(output.memory, Some(1024));
        assert_eq!(output.message.as_deref(), Some("Exited with error status 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_message_streams_progress_until_finished() {
        let judge = ScriptedJudge::new(vec![queued(), accepted("42\n")]);
        let session = session_for(&judge);
        let (out_tx, mut out_rx) = mpsc::channel(64);
        let forwarder = tokio::spawn(forward_events(session.subscribe(), out_tx));

        let reply = handle_client_message(Some(&session), run_message("print(42)", 71));
        assert_eq!(reply, None);

        let messages = collect_until_finished(&mut out_rx).await;
        assert!(matches!(
            &messages[0],
            ExecutionServerMessage::Started { flow_id: 1, token } if token == "tok1"
        ));
        assert!(matches!(
            &messages[1],
            ExecutionServerMessage::Progress { flow_id: 1, .. }
        ));
        assert!(matches!(
            &messages[2],
            ExecutionServerMessage::Feedback { flow_id: 1, level, .. } if level == "success"
        ));
        let ExecutionServerMessage::Finished { flow_id, output } = &messages[3] else {
            panic!("expected finished message, got {:?}", messages[3]);
        };
        assert_eq!(*flow_id, 1);
        assert_eq!(output.stdout.as_deref(), Some("42\n"));
        assert!(!session.snapshot().is_executing);

        forwarder.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_right_after_run_leaves_panel_idle() {
        let judge = ScriptedJudge::new(vec![queued()]);
        let session = session_for(&judge);

        assert_eq!(
            handle_client_message(Some(&session), run_message("print(1)", 71)),
            None
        );
        assert_eq!(
            handle_client_message(Some(&session), ExecutionClientMessage::Stop),
            None
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        let fetches = judge.fetch_count();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!session.snapshot().is_executing);
        assert_eq!(judge.fetch_count(), fetches);
        assert!(judge.submissions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_runs_keep_the_latest() {
        let judge = ScriptedJudge::new(vec![accepted("B\n")]);
        let session = session_for(&judge);
        let (out_tx, mut out_rx) = mpsc::channel(64);
        let forwarder = tokio::spawn(forward_events(session.subscribe(), out_tx));

        handle_client_message(Some(&session), run_message("print('A')", 71));
        handle_client_message(Some(&session), run_message("print('B')", 71));

        let messages = collect_until_finished(&mut out_rx).await;
        let Some(ExecutionServerMessage::Finished { flow_id, output }) = messages.last() else {
            panic!("expected finished message");
        };
        assert_eq!(*flow_id, 2);
        assert_eq!(output.stdout.as_deref(), Some("B\n"));

        let submissions = judge.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].source_code, "print('B')");

        forwarder.abort();
    }

    #[tokio::test]
    async fn invalid_run_requests_are_answered_directly() {
        let judge = ScriptedJudge::new(vec![queued()]);
        let session = session_for(&judge);

        let unknown = handle_client_message(Some(&session), run_message("print(1)", 9999));
        assert!(matches!(unknown, Some(ExecutionServerMessage::Error { .. })));

        let blank = handle_client_message(Some(&session), run_message("  \n", 71));
        assert_eq!(
            blank,
            Some(ExecutionServerMessage::Error {
                message: JudgeError::EmptySource.to_string(),
            })
        );

        assert!(!session.snapshot().is_executing);
        assert!(judge.submissions().is_empty());
    }

    #[tokio::test]
    async fn messages_without_judge_are_unavailable() {
        let reply = handle_client_message(None, ExecutionClientMessage::Stop);
        assert!(matches!(
            reply,
            Some(ExecutionServerMessage::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn forwarding_survives_lagged_receiver() {
        let events = EventBroadcaster::new(1);
        let stream = events.subscribe();
        for message in ["one", "two", "three"] {
            events.emit(ExecutionEvent::Feedback {
                flow_id: FlowId::default(),
                feedback: Feedback::info(message),
            });
        }
        drop(events);

        let (out_tx, mut out_rx) = mpsc::channel(8);
        forward_events(stream, out_tx).await;

        assert_eq!(
            out_rx.recv().await,
            Some(ExecutionServerMessage::Feedback {
                flow_id: 0,
                level: "info".to_string(),
                message: "three".to_string(),
            })
        );
        assert_eq!(out_rx.recv().await, None);
    }
}
