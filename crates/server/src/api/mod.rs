//! API 路由模块。
//!
//! 提供文档（space）CRUD 与代码执行所需的 HTTP / WebSocket 接口。

pub mod documents;
pub mod error;
pub mod execution;
pub mod identity;
pub mod state;

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use realtime_api_types::HealthCheckResponse;
use tower_http::cors::CorsLayer;

pub use documents::create_documents_router;
pub use execution::create_execution_router;
pub use state::AppState;

/// 组装全部路由。
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(create_documents_router())
        .merge(create_execution_router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse::ok())
}

#[cfg(test)]
pub(crate) async fn test_state(
    judge: Option<Arc<dyn judge_client::JudgeApi>>,
) -> Arc<AppState> {
    use axum::http::HeaderName;

    use crate::db::connect_and_migrate;
    use crate::repository::SeaOrmDocumentRepository;
    use crate::service::DocumentService;

    let db = connect_and_migrate("sqlite::memory:")
        .await
        .expect("in-memory database should migrate");
    let documents = DocumentService::new(Arc::new(SeaOrmDocumentRepository::new(db)));

    Arc::new(AppState::new(
        documents,
        judge,
        judge_client::JudgeConfig::default(),
        HeaderName::from_static("x-user-subject"),
    ))
}
