//! 文档 API 路由。
//!
//! 提供 space 的增删改查、归档/恢复以及侧边栏、搜索、回收站列表。

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use realtime_api_types::{CreateDocumentRequest, DocumentResponse, UpdateDocumentRequest};
use realtime_core::domain::DocumentId;
use serde::Deserialize;

use super::error::ApiError;
use super::identity::Caller;
use super::state::AppState;
use crate::repository::DocumentRecord;
use crate::service::DocumentChanges;

/// 创建文档 API 路由。
pub fn create_documents_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/documents", post(create_document))
        // 侧边栏层级列表
        .route("/api/documents/sidebar", get(list_sidebar))
        // 搜索候选
        .route("/api/documents/search", get(list_search))
        // 回收站
        .route("/api/documents/trash", get(list_trash))
        .route(
            "/api/documents/{id}",
            get(get_document)
                .patch(update_document)
                .delete(remove_document),
        )
        .route("/api/documents/{id}/archive", post(archive_document))
        .route("/api/documents/{id}/restore", post(restore_document))
}

/// 侧边栏查询参数。
#[derive(Debug, Deserialize)]
struct SidebarQuery {
    /// 父文档 ID，缺省时列出顶层文档。
    #[serde(default)]
    parent: Option<String>,
}

fn parse_document_id(raw: &str) -> Result<DocumentId, ApiError> {
    DocumentId::from_str(raw).map_err(|e| ApiError::bad_request(format!("invalid document id: {e}")))
}

fn to_response(record: DocumentRecord) -> DocumentResponse {
    DocumentResponse {
        id: record.id.to_string(),
        user_id: record.user_id.to_string(),
        title: record.title,
        content: record.content,
        notes: record.notes,
        parent_document: record.parent_document.map(|parent| parent.to_string()),
        is_archived: record.is_archived,
        is_published: record.is_published,
        created_at: record.created_at.and_utc().to_rfc3339(),
        updated_at: record.updated_at.and_utc().to_rfc3339(),
    }
}

fn to_responses(records: Vec<DocumentRecord>) -> Json<Vec<DocumentResponse>> {
    Json(records.into_iter().map(to_response).collect())
}

/// 读取单个文档。
async fn get_document(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let id = parse_document_id(&id)?;
    let document = state.documents.get(caller.user_id(), id).await?;
    Ok(Json(to_response(document)))
}

/// 创建文档。
async fn create_document(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let parent = request
        .parent_document
        .as_deref()
        .map(parse_document_id)
        .transpose()?;
    let document = state
        .documents
        .create(caller.user_id(), request.title, parent)
        .await?;
    Ok((StatusCode::CREATED, Json(to_response(document))))
}

/// 部分更新文档。
async fn update_document(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(request): Json<UpdateDocumentRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let id = parse_document_id(&id)?;
    let changes = DocumentChanges {
        title: request.title,
        content: request.content,
        notes: request.notes,
        is_published: request.is_published,
    };
    let document = state.documents.update(caller.user_id(), id, changes).await?;
    Ok(Json(to_response(document)))
}

/// 归档文档。
async fn archive_document(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let id = parse_document_id(&id)?;
    let document = state.documents.archive(caller.user_id(), id).await?;
    Ok(Json(to_response(document)))
}

/// 恢复文档。
async fn restore_document(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let id = parse_document_id(&id)?;
    let document = state.documents.restore(caller.user_id(), id).await?;
    Ok(Json(to_response(document)))
}

/// 永久删除文档。
async fn remove_document(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_document_id(&id)?;
    state.documents.remove(caller.user_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_sidebar(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<SidebarQuery>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let parent = query.parent.as_deref().map(parse_document_id).transpose()?;
    let documents = state
        .documents
        .list_sidebar(caller.user_id(), parent)
        .await?;
    Ok(to_responses(documents))
}

async fn list_search(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let documents = state.documents.list_search(caller.user_id()).await?;
    Ok(to_responses(documents))
}

async fn list_trash(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let documents = state.documents.list_trash(caller.user_id()).await?;
    Ok(to_responses(documents))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use realtime_api_types::{DocumentResponse, ErrorResponse};
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    use crate::api::{router, test_state};

    async fn send(
        app: &axum::Router,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<&str>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-subject", user);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        (status, bytes.to_vec())
    }

    fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
        serde_json::from_slice(bytes).expect("body should be valid json")
    }

    #[tokio::test]
    async fn create_and_read_own_document() {
        let app = router(test_state(None).await);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/documents",
            Some("user_a"),
            Some(r#"{"title":"Binary Search"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created: DocumentResponse = parse(&body);
        assert_eq!(created.title, "Binary Search");
        assert_eq!(created.user_id, "user_a");

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/documents/{}", created.id),
            Some("user_a"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parse::<DocumentResponse>(&body), created);
    }

    #[tokio::test]
    async fn foreign_update_is_forbidden() {
        let app = router(test_state(None).await);
        let (_, body) = send(
            &app,
            Method::POST,
            "/api/documents",
            Some("user_a"),
            Some(r#"{"title":"Mine"}"#),
        )
        .await;
        let created: DocumentResponse = parse(&body);

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/documents/{}", created.id),
            Some("user_b"),
            Some(r#"{"title":"Theirs"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(parse::<ErrorResponse>(&body).code, "FORBIDDEN");

        let (_, body) = send(
            &app,
            Method::GET,
            &format!("/api/documents/{}", created.id),
            Some("user_a"),
            None,
        )
        .await;
        assert_eq!(parse::<DocumentResponse>(&body).title, "Mine");
    }

    #[tokio::test]
    async fn anonymous_listing_is_unauthenticated() {
        let app = router(test_state(None).await);

        let (status, body) = send(&app, Method::GET, "/api/documents/sidebar", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(parse::<ErrorResponse>(&body).code, "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn published_document_is_readable_anonymously() {
        let app = router(test_state(None).await);
        let (_, body) = send(
            &app,
            Method::POST,
            "/api/documents",
            Some("user_a"),
            Some(r#"{"title":"Public"}"#),
        )
        .await;
        let created: DocumentResponse = parse(&body);
        let uri = format!("/api/documents/{}", created.id);

        let (status, _) = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        send(
            &app,
            Method::PATCH,
            &uri,
            Some("user_a"),
            Some(r#"{"is_published":true}"#),
        )
        .await;
        let (status, _) = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);

        send(
            &app,
            Method::POST,
            &format!("{uri}/archive"),
            Some("user_a"),
            None,
        )
        .await;
        let (status, _) = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn trash_lifecycle_over_http() {
        let app = router(test_state(None).await);
        let (_, body) = send(
            &app,
            Method::POST,
            "/api/documents",
            Some("user_a"),
            Some(r#"{}"#),
        )
        .await;
        let created: DocumentResponse = parse(&body);
        assert_eq!(created.title, "Untitled");
        let uri = format!("/api/documents/{}", created.id);

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("{uri}/archive"),
            Some("user_a"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, Method::GET, "/api/documents/trash", Some("user_a"), None).await;
        assert_eq!(parse::<Vec<DocumentResponse>>(&body).len(), 1);

        let (status, _) = send(&app, Method::DELETE, &uri, Some("user_a"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, Method::GET, &uri, Some("user_a"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(parse::<ErrorResponse>(&body).code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let app = router(test_state(None).await);

        let (status, body) = send(
            &app,
            Method::GET,
            "/api/documents/not-a-uuid",
            Some("user_a"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(parse::<ErrorResponse>(&body).code, "INVALID_REQUEST");
    }
}
