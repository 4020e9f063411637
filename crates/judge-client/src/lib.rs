pub mod api;
pub mod config;
pub mod decode;
pub mod error;
pub mod events;
pub mod http;
pub mod session;

pub use api::{ExecutionResult, JudgeApi, RawExecution, SubmissionRequest, SubmissionToken};
pub use config::JudgeConfig;
pub use decode::decode_output;
pub use error::{JudgeError, Result};
pub use events::{EventBroadcaster, EventStream, ExecutionEvent};
pub use http::HttpJudgeApi;
pub use session::{ExecutionSession, FlowId, PanelState, RunOutcome};
