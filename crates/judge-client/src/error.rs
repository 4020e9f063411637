use thiserror::Error;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("code execution is disabled: no judge API key is configured")]
    NotConfigured,

    #[error("source code must not be empty")]
    EmptySource,

    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    #[error("polling failed: {0}")]
    PollFailed(String),
}

pub type Result<T> = std::result::Result<T, JudgeError>;
