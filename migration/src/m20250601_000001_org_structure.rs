use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Department {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Position {
    Table,
    Id,
    Name,
    IsManager,
    IsTeacher,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TrainingProgram {
    Table,
    Id,
    Name,
    RecurrenceYears,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Employee {
    Table,
    Id,
    LastName,
    FirstName,
    MiddleName,
    BirthDate,
    PositionId,
    DepartmentId,
    HireDate,
    IsDismissed,
    DismissalDate,
    IsOnMaternityLeave,
    IsExternalPartTime,
    IsSafetyCommissionMember,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TrainingRecord {
    Table,
    Id,
    EmployeeId,
    TrainingProgramId,
    CompletionDate,
    Details,
    IsVerified,
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
                    .table(Department::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Department::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Department::Name)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Department::Description).text().null())
                    .col(&mut timestamp(Department::CreatedAt))
                    .col(&mut timestamp(Department::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Position::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Position::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Position::Name)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(&mut flag(Position::IsManager))
                    .col(&mut flag(Position::IsTeacher))
                    .col(&mut timestamp(Position::CreatedAt))
                    .col(&mut timestamp(Position::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TrainingProgram::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrainingProgram::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TrainingProgram::Name)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(TrainingProgram::RecurrenceYears).integer().null())
                    .col(&mut timestamp(TrainingProgram::CreatedAt))
                    .col(&mut timestamp(TrainingProgram::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Employee::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Employee::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Employee::LastName).string_len(255).not_null())
                    .col(ColumnDef::new(Employee::FirstName).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Employee::MiddleName)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Employee::BirthDate).date().null())
                    .col(ColumnDef::new(Employee::PositionId).uuid().null())
                    .col(ColumnDef::new(Employee::DepartmentId).uuid().null())
                    .col(ColumnDef::new(Employee::HireDate).date().null())
                    .col(&mut flag(Employee::IsDismissed))
                    .col(ColumnDef::new(Employee::DismissalDate).date().null())
                    .col(&mut flag(Employee::IsOnMaternityLeave))
                    .col(&mut flag(Employee::IsExternalPartTime))
                    .col(&mut flag(Employee::IsSafetyCommissionMember))
                    .col(&mut timestamp(Employee::CreatedAt))
                    .col(&mut timestamp(Employee::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employee_position")
                            .from(Employee::Table, Employee::PositionId)
                            .to(Position::Table, Position::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employee_department")
                            .from(Employee::Table, Employee::DepartmentId)
                            .to(Department::Table, Department::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_employee_last_name")
                    .table(Employee::Table)
                    .col(Employee::LastName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_employee_identity")
                    .table(Employee::Table)
                    .col(Employee::LastName)
                    .col(Employee::FirstName)
                    .col(Employee::MiddleName)
                    .col(Employee::BirthDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TrainingRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrainingRecord::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrainingRecord::EmployeeId).uuid().not_null())
                    .col(
                        ColumnDef::new(TrainingRecord::TrainingProgramId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrainingRecord::CompletionDate).date().not_null())
                    .col(ColumnDef::new(TrainingRecord::Details).text().null())
                    .col(&mut flag(TrainingRecord::IsVerified))
                    .col(&mut timestamp(TrainingRecord::CreatedAt))
                    .col(&mut timestamp(TrainingRecord::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_training_record_employee")
                            .from(TrainingRecord::Table, TrainingRecord::EmployeeId)
                            .to(Employee::Table, Employee::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_training_record_program")
                            .from(TrainingRecord::Table, TrainingRecord::TrainingProgramId)
                            .to(TrainingProgram::Table, TrainingProgram::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_training_record_completion")
                    .table(TrainingRecord::Table)
                    .col(TrainingRecord::EmployeeId)
                    .col(TrainingRecord::TrainingProgramId)
                    .col(TrainingRecord::CompletionDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_training_record_program")
                    .table(TrainingRecord::Table)
                    .col(TrainingRecord::TrainingProgramId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrainingRecord::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Employee::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TrainingProgram::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Position::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Department::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn timestamp(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

fn flag(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .boolean()
        .not_null()
        .default(false)
        .to_owned()
}
