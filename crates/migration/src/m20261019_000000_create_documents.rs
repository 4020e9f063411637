use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Documents::Table)
                    .if_not_exists()
                    .col(string_len(Documents::Id, 36).primary_key())
                    // 身份提供方签发的 subject，按原样比较。
                    .col(string_len(Documents::UserId, 255))
                    .col(string_len(Documents::Title, 200))
                    .col(text_null(Documents::Content))
                    .col(text_null(Documents::Notes))
                    .col(string_len_null(Documents::ParentDocument, 36))
                    .col(boolean(Documents::IsArchived).default(false))
                    .col(boolean(Documents::IsPublished).default(false))
                    .col(timestamp(Documents::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp(Documents::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_documents_user_id")
                    .table(Documents::Table)
                    .col(Documents::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_documents_user_parent")
                    .table(Documents::Table)
                    .col(Documents::UserId)
                    .col(Documents::ParentDocument)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Documents::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Documents {
    Table,
    Id,
    UserId,
    Title,
    Content,
    Notes,
    ParentDocument,
    IsArchived,
    IsPublished,
    CreatedAt,
    UpdatedAt,
}
