use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("identity subject must not be empty")]
    EmptySubject,
    #[error("invalid identity subject length: {0}. max length is 255")]
    InvalidSubjectLength(usize),
    #[error("invalid document title length: {0}. max length is 200")]
    InvalidTitleLength(usize),
    #[error("unknown language id: {0}")]
    UnknownLanguage(i32),
}
