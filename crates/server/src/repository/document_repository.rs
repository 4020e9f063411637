use crate::entity::document;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use realtime_core::domain::{DocumentId, UserId, Visibility};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder,
};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub user_id: UserId,
    pub title: String,
    pub content: Option<String>,
    pub notes: Option<String>,
    pub parent_document: Option<DocumentId>,
    pub is_archived: bool,
    pub is_published: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl DocumentRecord {
    pub fn visibility(&self) -> Visibility {
        Visibility {
            is_published: self.is_published,
            is_archived: self.is_archived,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: UserId,
    pub title: String,
    pub parent_document: Option<DocumentId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub notes: Option<String>,
    pub is_archived: Option<bool>,
    pub is_published: Option<bool>,
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn create(&self, new_document: NewDocument) -> Result<DocumentRecord>;
    async fn find_by_id(&self, document_id: DocumentId) -> Result<Option<DocumentRecord>>;
    async fn update(
        &self,
        document_id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<Option<DocumentRecord>>;
    async fn delete(&self, document_id: DocumentId) -> Result<bool>;
    async fn list_by_parent(
        &self,
        user_id: &UserId,
        parent: Option<DocumentId>,
        archived: bool,
    ) -> Result<Vec<DocumentRecord>>;
    async fn list_by_user(&self, user_id: &UserId, archived: bool) -> Result<Vec<DocumentRecord>>;
}

#[derive(Clone)]
pub struct SeaOrmDocumentRepository {
    db: DatabaseConnection,
}

impl SeaOrmDocumentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn map_model(model: document::Model) -> Result<DocumentRecord> {
        let id = DocumentId::from_str(&model.id)
            .map_err(|e| anyhow!("invalid documents.id '{}' from database: {e}", model.id))?;
        let user_id = UserId::new(model.user_id.as_str()).map_err(|e| {
            anyhow!(
                "invalid documents.user_id '{}' from database: {e}",
                model.user_id
            )
        })?;
        let parent_document = model
            .parent_document
            .as_deref()
            .map(DocumentId::from_str)
            .transpose()
            .map_err(|e| anyhow!("invalid documents.parent_document from database: {e}"))?;

        Ok(DocumentRecord {
            id,
            user_id,
            title: model.title,
            content: model.content,
            notes: model.notes,
            parent_document,
            is_archived: model.is_archived,
            is_published: model.is_published,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[async_trait]
impl DocumentRepository for SeaOrmDocumentRepository {
    async fn create(&self, new_document: NewDocument) -> Result<DocumentRecord> {
        let id = DocumentId::new();
        let now = Utc::now().naive_utc();

        let active_model = document::ActiveModel {
            id: Set(id.to_string()),
            user_id: Set(new_document.user_id.to_string()),
            title: Set(new_document.title),
            content: Set(None),
            notes: Set(None),
            parent_document: Set(new_document.parent_document.map(|parent| parent.to_string())),
            is_archived: Set(false),
            is_published: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await?;
        Self::map_model(model)
    }

    async fn find_by_id(&self, document_id: DocumentId) -> Result<Option<DocumentRecord>> {
        let model = document::Entity::find_by_id(document_id.to_string())
            .one(&self.db)
            .await?;

        model.map(Self::map_model).transpose()
    }

    async fn update(
        &self,
        document_id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<Option<DocumentRecord>> {
        let Some(model) = document::Entity::find_by_id(document_id.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut active_model: document::ActiveModel = model.into();
        if let Some(title) = patch.title {
            active_model.title = Set(title);
        }
        if let Some(content) = patch.content {
            active_model.content = Set(Some(content));
        }
        if let Some(notes) = patch.notes {
            active_model.notes = Set(Some(notes));
        }
        if let Some(is_archived) = patch.is_archived {
            active_model.is_archived = Set(is_archived);
        }
        if let Some(is_published) = patch.is_published {
            active_model.is_published = Set(is_published);
        }
        active_model.updated_at = Set(Utc::now().naive_utc());

        let updated = active_model.update(&self.db).await?;
        Self::map_model(updated).map(Some)
    }

    async fn delete(&self, document_id: DocumentId) -> Result<bool> {
        let Some(model) = document::Entity::find_by_id(document_id.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(false);
        };

        let result = model.delete(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn list_by_parent(
        &self,
        user_id: &UserId,
        parent: Option<DocumentId>,
        archived: bool,
    ) -> Result<Vec<DocumentRecord>> {
        let parent_filter = match parent {
            Some(parent) => document::Column::ParentDocument.eq(parent.to_string()),
            None => document::Column::ParentDocument.is_null(),
        };

        let models = document::Entity::find()
            .filter(document::Column::UserId.eq(user_id.as_str()))
            .filter(parent_filter)
            .filter(document::Column::IsArchived.eq(archived))
            .order_by_desc(document::Column::CreatedAt)
            .all(&self.db)
            .await?;

        models.into_iter().map(Self::map_model).collect()
    }

    async fn list_by_user(&self, user_id: &UserId, archived: bool) -> Result<Vec<DocumentRecord>> {
        let models = document::Entity::find()
            .filter(document::Column::UserId.eq(user_id.as_str()))
            .filter(document::Column::IsArchived.eq(archived))
            .order_by_desc(document::Column::CreatedAt)
            .all(&self.db)
            .await?;

        models.into_iter().map(Self::map_model).collect()
    }
}
