mod access;
mod error;
mod ids;
mod judge_status;
mod language;

pub use access::{AccessError, Visibility, authorize_owner, authorize_read, require_identity};
pub use error::DomainError;
pub use ids::{DocumentId, UserId};
pub use judge_status::{EXECUTING_MESSAGE, Feedback, FeedbackLevel, JudgeStatus, LAST_PENDING_STATUS};
pub use language::Language;
