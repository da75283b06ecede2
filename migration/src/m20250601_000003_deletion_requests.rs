use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum DeletionRequest {
    Table,
    Id,
    TargetKind,
    TargetId,
    TargetLabel,
    Reason,
    Status,
    RequestedBy,
    ReviewedBy,
    CreatedAt,
    ReviewedAt,
}

#[derive(DeriveIden)]
enum AppUser {
    Table,
    Id,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeletionRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeletionRequest::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DeletionRequest::TargetKind)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeletionRequest::TargetId).uuid().not_null())
                    .col(
                        ColumnDef::new(DeletionRequest::TargetLabel)
                            .string_len(512)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeletionRequest::Reason).text().null())
                    .col(
                        ColumnDef::new(DeletionRequest::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(DeletionRequest::RequestedBy).uuid().null())
                    .col(ColumnDef::new(DeletionRequest::ReviewedBy).uuid().null())
                    .col(
                        ColumnDef::new(DeletionRequest::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeletionRequest::ReviewedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deletion_request_requested_by")
                            .from(DeletionRequest::Table, DeletionRequest::RequestedBy)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deletion_request_reviewed_by")
                            .from(DeletionRequest::Table, DeletionRequest::ReviewedBy)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deletion_request_target")
                    .table(DeletionRequest::Table)
                    .col(DeletionRequest::TargetKind)
                    .col(DeletionRequest::TargetId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deletion_request_status")
                    .table(DeletionRequest::Table)
                    .col(DeletionRequest::Status)
                    .col(DeletionRequest::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // At most one open request per target. Partial indexes read the same on
        // Postgres and SQLite.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_deletion_request_pending \
                 ON deletion_request (target_kind, target_id) WHERE status = 'PENDING'",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(DeletionRequest::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}
