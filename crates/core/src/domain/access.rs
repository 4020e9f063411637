use thiserror::Error;

use super::UserId;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("not authorized to access this document")]
    AuthorizationDenied,
    #[error("document not found")]
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Visibility {
    pub is_published: bool,
    pub is_archived: bool,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        self.is_published && !self.is_archived
    }
}

pub fn require_identity(caller: Option<&UserId>) -> Result<&UserId, AccessError> {
    caller.ok_or(AccessError::AuthenticationRequired)
}

pub fn authorize_owner(owner: &UserId, caller: &UserId) -> Result<(), AccessError> {
    if owner == caller {
        Ok(())
    } else {
        Err(AccessError::AuthorizationDenied)
    }
}

pub fn authorize_read(
    owner: &UserId,
    visibility: Visibility,
    caller: Option<&UserId>,
) -> Result<(), AccessError> {
    if visibility.is_public() {
        return Ok(());
    }

    let caller = require_identity(caller)?;
    authorize_owner(owner, caller)
}
