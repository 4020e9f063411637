//! API 错误响应。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use realtime_api_types::ErrorResponse;
use realtime_core::domain::AccessError;
use tracing::error;

use crate::service::ServiceError;

/// API 错误类型。
#[derive(Debug)]
pub struct ApiError {
    message: String,
    code: String,
    status: StatusCode,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: "INVALID_REQUEST".to_string(),
            status: StatusCode::BAD_REQUEST,
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        let (code, status) = match err {
            AccessError::AuthenticationRequired => ("UNAUTHENTICATED", StatusCode::UNAUTHORIZED),
            AccessError::AuthorizationDenied => ("FORBIDDEN", StatusCode::FORBIDDEN),
            AccessError::NotFound => ("NOT_FOUND", StatusCode::NOT_FOUND),
        };
        ApiError {
            message: err.to_string(),
            code: code.to_string(),
            status,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Access(access) => access.into(),
            ServiceError::Domain(domain) => ApiError::bad_request(domain.to_string()),
            ServiceError::Repository(e) => {
                error!(error = %e, "document storage failure");
                ApiError {
                    message: "internal error".to_string(),
                    code: "INTERNAL_ERROR".to_string(),
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            code: self.code,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}
