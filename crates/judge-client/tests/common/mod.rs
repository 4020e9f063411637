use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use judge_client::{
    JudgeApi, JudgeError, RawExecution, Result, SubmissionRequest, SubmissionToken,
};
use realtime_core::domain::JudgeStatus;
use tokio::sync::Notify;
use tokio::time::Instant;

pub fn status(id: i32, description: &str) -> RawExecution {
    RawExecution::new(JudgeStatus::new(id, description))
}

pub fn accepted(stdout: &str) -> RawExecution {
    let mut raw = status(3, "Accepted");
    raw.stdout = Some(stdout.to_string());
    raw.time = Some("0.010".to_string());
    raw.memory = Some(2048);
    raw
}

#[derive(Default)]
struct StubState {
    tokens: VecDeque<String>,
    responses: HashMap<String, VecDeque<RawExecution>>,
    gates: HashMap<String, Arc<Notify>>,
    submissions: Vec<SubmissionRequest>,
    fetches: Vec<(String, Instant)>,
}

/// Scripted judge: hands out tokens in order and replays per-token status
/// sequences, repeating the last one once the script runs out.
#[derive(Clone, Default)]
pub struct StubJudge {
    state: Arc<Mutex<StubState>>,
    fetch_started: Arc<Notify>,
    fail_submit: Arc<AtomicBool>,
    fail_fetch: Arc<AtomicBool>,
}

impl StubJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, token: &str, responses: Vec<RawExecution>) {
        let mut state = self.state.lock().unwrap();
        state.tokens.push_back(token.to_string());
        state.responses.insert(token.to_string(), responses.into());
    }

    /// Holds every fetch of `token` until the returned gate is notified.
    pub fn gate(&self, token: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .lock()
            .unwrap()
            .gates
            .insert(token.to_string(), gate.clone());
        gate
    }

    pub async fn wait_for_fetch(&self) {
        self.fetch_started.notified().await;
    }

    pub fn fail_submissions(&self) {
        self.fail_submit.store(true, Ordering::SeqCst);
    }

    pub fn fail_fetches(&self) {
        self.fail_fetch.store(true, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<SubmissionRequest> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn fetch_times(&self, token: &str) -> Vec<Instant> {
        self.state
            .lock()
            .unwrap()
            .fetches
            .iter()
            .filter(|(t, _)| t == token)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl JudgeApi for StubJudge {
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionToken> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(JudgeError::SubmissionFailed("HTTP status 401".to_string()));
        }

        let mut state = self.state.lock().unwrap();
        state.submissions.push(request.clone());
        let token = state
            .tokens
            .pop_front()
            .ok_or_else(|| JudgeError::SubmissionFailed("no scripted token".to_string()))?;
        Ok(SubmissionToken::new(token))
    }

    async fn fetch(&self, token: &SubmissionToken) -> Result<RawExecution> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state
                .fetches
                .push((token.as_str().to_string(), Instant::now()));
            state.gates.get(token.as_str()).cloned()
        };
        self.fetch_started.notify_one();

        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(JudgeError::PollFailed("HTTP status 500".to_string()));
        }

        let mut state = self.state.lock().unwrap();
        let queue = state
            .responses
            .get_mut(token.as_str())
            .ok_or_else(|| JudgeError::PollFailed(format!("unknown token {token}")))?;
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        next.ok_or_else(|| JudgeError::PollFailed("empty script".to_string()))
    }
}
