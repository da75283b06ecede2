use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Instruction {
    Table,
    Id,
    Title,
    Content,
    Category,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Instruction::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Instruction::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Instruction::Title)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Instruction::Content).text().not_null())
                    .col(
                        ColumnDef::new(Instruction::Category)
                            .string_len(100)
                            .not_null()
                            .default("General"),
                    )
                    .col(
                        ColumnDef::new(Instruction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Instruction::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_instruction_category")
                    .table(Instruction::Table)
                    .col(Instruction::Category)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Instruction::Table).if_exists().to_owned())
            .await
    }
}
