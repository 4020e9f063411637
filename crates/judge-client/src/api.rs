//! 评测服务抽象层。
//!
//! `JudgeApi` 屏蔽评测服务的传输细节，会话只依赖提交与查询两个操作。

use std::fmt;

use async_trait::async_trait;
use realtime_core::domain::{JudgeStatus, Language};
use serde::{Deserialize, Serialize};

use crate::decode::decode_output;
use crate::error::Result;

/// 一次运行请求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub source_code: String,
    pub language: Language,
    pub stdin: Option<String>,
}

impl SubmissionRequest {
    pub fn new(source_code: impl Into<String>, language: Language) -> Self {
        Self {
            source_code: source_code.into(),
            language,
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        let stdin = stdin.into();
        self.stdin = (!stdin.is_empty()).then_some(stdin);
        self
    }
}

/// 评测服务返回的不透明提交凭据。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionToken(String);

impl SubmissionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 评测服务返回的原始状态，输出字段可能是明文也可能是编码后的文本。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawExecution {
    pub status: JudgeStatus,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub memory: Option<u64>,
}

impl RawExecution {
    pub fn new(status: JudgeStatus) -> Self {
        Self {
            status,
            stdout: None,
            stderr: None,
            compile_output: None,
            message: None,
            time: None,
            memory: None,
        }
    }
}

/// 解码后的运行结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: JudgeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
}

impl From<RawExecution> for ExecutionResult {
    fn from(raw: RawExecution) -> Self {
        Self {
            stdout: decode_output(raw.stdout.as_deref()),
            stderr: decode_output(raw.stderr.as_deref()),
            compile_output: decode_output(raw.compile_output.as_deref()),
            message: decode_output(raw.message.as_deref()),
            status: raw.status,
            time: raw.time.filter(|time| !time.trim().is_empty()),
            memory: raw.memory,
        }
    }
}

/// 评测服务接口。
#[async_trait]
pub trait JudgeApi: Send + Sync {
    /// 提交源代码，返回用于轮询的凭据。
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionToken>;

    /// 查询提交的当前状态。
    async fn fetch(&self, token: &SubmissionToken) -> Result<RawExecution>;
}
