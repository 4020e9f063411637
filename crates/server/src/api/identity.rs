//! 调用者身份提取。
//!
//! 认证由外部身份提供方完成，认证代理把用户标识写入配置的请求头。
//! 缺失或为空时视为匿名调用。

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use realtime_core::domain::UserId;

use super::state::AppState;

/// 当前请求的调用者。
#[derive(Debug, Clone)]
pub struct Caller(pub Option<UserId>);

impl Caller {
    pub fn user_id(&self) -> Option<&UserId> {
        self.0.as_ref()
    }
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(&state.identity_header)
            .and_then(|value| value.to_str().ok())
            .and_then(|subject| UserId::new(subject).ok());

        Ok(Self(user_id))
    }
}
