//! 文档（space）业务逻辑。
//!
//! 所有读写操作在访问存储前完成身份与归属校验：
//! 未登录返回 `AuthenticationRequired`，文档不存在返回 `NotFound`，
//! 非所有者返回 `AuthorizationDenied`。已发布且未归档的文档允许任何人读取。

use std::sync::Arc;

use realtime_core::domain::{
    AccessError, DocumentId, DomainError, UserId, authorize_owner, authorize_read,
    require_identity,
};
use thiserror::Error;
use tracing::info;

use crate::repository::{DocumentPatch, DocumentRecord, DocumentRepository, NewDocument};

const DEFAULT_TITLE: &str = "Untitled";
const MAX_TITLE_LEN: usize = 200;

/// 文档服务错误。
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage error: {0}")]
    Repository(#[from] anyhow::Error),
}

/// 用户可修改的文档字段。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub notes: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Clone)]
pub struct DocumentService {
    repository: Arc<dyn DocumentRepository>,
}

impl DocumentService {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self { repository }
    }

    /// 按 ID 读取文档。
    #[tracing::instrument(skip(self, caller))]
    pub async fn get(
        &self,
        caller: Option<&UserId>,
        document_id: DocumentId,
    ) -> Result<DocumentRecord, ServiceError> {
        let document = self
            .repository
            .find_by_id(document_id)
            .await?
            .ok_or(AccessError::NotFound)?;

        authorize_read(&document.user_id, document.visibility(), caller)?;
        Ok(document)
    }

    /// 创建文档；指定父文档时父文档必须属于调用者。
    #[tracing::instrument(skip(self, caller, title))]
    pub async fn create(
        &self,
        caller: Option<&UserId>,
        title: Option<String>,
        parent_document: Option<DocumentId>,
    ) -> Result<DocumentRecord, ServiceError> {
        let user_id = require_identity(caller)?;
        let title = normalize_title(title.as_deref().unwrap_or_default())?;

        if let Some(parent_id) = parent_document {
            self.load_owned(user_id, parent_id).await?;
        }

        let document = self
            .repository
            .create(NewDocument {
                user_id: user_id.clone(),
                title,
                parent_document,
            })
            .await?;

        info!(document_id = %document.id, user_id = %user_id, "document created");
        Ok(document)
    }

    /// 部分更新标题、代码、笔记或发布状态。
    #[tracing::instrument(skip(self, caller, changes))]
    pub async fn update(
        &self,
        caller: Option<&UserId>,
        document_id: DocumentId,
        changes: DocumentChanges,
    ) -> Result<DocumentRecord, ServiceError> {
        let user_id = require_identity(caller)?;
        let title = changes.title.as_deref().map(normalize_title).transpose()?;
        self.load_owned(user_id, document_id).await?;

        self.patch(
            document_id,
            DocumentPatch {
                title,
                content: changes.content,
                notes: changes.notes,
                is_archived: None,
                is_published: changes.is_published,
            },
        )
        .await
    }

    /// 移入回收站。
    #[tracing::instrument(skip(self, caller))]
    pub async fn archive(
        &self,
        caller: Option<&UserId>,
        document_id: DocumentId,
    ) -> Result<DocumentRecord, ServiceError> {
        self.set_archived(caller, document_id, true).await
    }

    /// 从回收站恢复。
    #[tracing::instrument(skip(self, caller))]
    pub async fn restore(
        &self,
        caller: Option<&UserId>,
        document_id: DocumentId,
    ) -> Result<DocumentRecord, ServiceError> {
        self.set_archived(caller, document_id, false).await
    }

    /// 永久删除，返回被删除的文档。
    #[tracing::instrument(skip(self, caller))]
    pub async fn remove(
        &self,
        caller: Option<&UserId>,
        document_id: DocumentId,
    ) -> Result<DocumentRecord, ServiceError> {
        let user_id = require_identity(caller)?;
        let document = self.load_owned(user_id, document_id).await?;

        if !self.repository.delete(document_id).await? {
            return Err(AccessError::NotFound.into());
        }

        info!(document_id = %document_id, "document removed");
        Ok(document)
    }

    /// 侧边栏：某一层级下未归档的文档。
    pub async fn list_sidebar(
        &self,
        caller: Option<&UserId>,
        parent_document: Option<DocumentId>,
    ) -> Result<Vec<DocumentRecord>, ServiceError> {
        let user_id = require_identity(caller)?;
        Ok(self
            .repository
            .list_by_parent(user_id, parent_document, false)
            .await?)
    }

    /// 搜索候选：调用者所有未归档的文档。
    pub async fn list_search(
        &self,
        caller: Option<&UserId>,
    ) -> Result<Vec<DocumentRecord>, ServiceError> {
        let user_id = require_identity(caller)?;
        Ok(self.repository.list_by_user(user_id, false).await?)
    }

    /// 回收站：调用者所有已归档的文档。
    pub async fn list_trash(
        &self,
        caller: Option<&UserId>,
    ) -> Result<Vec<DocumentRecord>, ServiceError> {
        let user_id = require_identity(caller)?;
        Ok(self.repository.list_by_user(user_id, true).await?)
    }

    async fn set_archived(
        &self,
        caller: Option<&UserId>,
        document_id: DocumentId,
        archived: bool,
    ) -> Result<DocumentRecord, ServiceError> {
        let user_id = require_identity(caller)?;
        self.load_owned(user_id, document_id).await?;

        let document = self
            .patch(
                document_id,
                DocumentPatch {
                    is_archived: Some(archived),
                    ..DocumentPatch::default()
                },
            )
            .await?;

        info!(document_id = %document_id, archived, "document archive state changed");
        Ok(document)
    }

    async fn load_owned(
        &self,
        user_id: &UserId,
        document_id: DocumentId,
    ) -> Result<DocumentRecord, ServiceError> {
        let document = self
            .repository
            .find_by_id(document_id)
            .await?
            .ok_or(AccessError::NotFound)?;

        authorize_owner(&document.user_id, user_id)?;
        Ok(document)
    }

    async fn patch(
        &self,
        document_id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<DocumentRecord, ServiceError> {
        Ok(self
            .repository
            .update(document_id, patch)
            .await?
            .ok_or(AccessError::NotFound)?)
    }
}

fn normalize_title(title: &str) -> Result<String, DomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_TITLE.to_string());
    }

    let len = trimmed.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(DomainError::InvalidTitleLength(len));
    }

    Ok(trimmed.to_string())
}
