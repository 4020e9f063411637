use serde::{Deserialize, Serialize};

pub const EXECUTING_MESSAGE: &str = "Executing code…";

pub const LAST_PENDING_STATUS: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeStatus {
    pub id: i32,
    #[serde(default)]
    pub description: String,
}

impl JudgeStatus {
    pub fn new(id: i32, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.id > LAST_PENDING_STATUS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub level: FeedbackLevel,
    pub message: String,
}

impl Feedback {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FeedbackLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FeedbackLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FeedbackLevel::Error,
            message: message.into(),
        }
    }

    pub fn for_status(status: &JudgeStatus) -> Option<Self> {
        if !status.is_terminal() {
            return None;
        }

        let feedback = match status.id {
            3 => Self::success("Code executed successfully!"),
            4 => Self::error(
                "Runtime error: the program crashed or exited with a non-zero code. \
                 Check for unhandled exceptions and make sure it handles missing input.",
            ),
            5 => Self::error(
                "Time limit exceeded: check for infinite loops or an algorithm that is too slow.",
            ),
            6 => Self::error(
                "Memory limit exceeded: reduce memory use, e.g. large arrays or deep recursion.",
            ),
            _ => Self::error(format!("Execution failed: {}", status.description)),
        };

        Some(feedback)
    }
}
