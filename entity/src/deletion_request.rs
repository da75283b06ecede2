use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "deletion_request")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub target_kind: TargetKind,
    #[sea_orm(indexed)]
    pub target_id: Uuid,
    /// Display label captured when the request was filed, kept after the target is gone.
    pub target_label: String,
    pub reason: Option<String>,
    #[sea_orm(indexed)]
    pub status: Status,
    pub requested_by: Option<Uuid>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub reviewed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::app_user::Entity",
        from = "Column::RequestedBy",
        to = "super::app_user::Column::Id",
        on_delete = "SetNull"
    )]
    Requester,
    #[sea_orm(
        belongs_to = "super::app_user::Entity",
        from = "Column::ReviewedBy",
        to = "super::app_user::Column::Id",
        on_delete = "SetNull"
    )]
    Reviewer,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum TargetKind {
    #[sea_orm(string_value = "EMPLOYEE")]
    Employee,
    #[sea_orm(string_value = "DEPARTMENT")]
    Department,
    #[sea_orm(string_value = "POSITION")]
    Position,
    #[sea_orm(string_value = "TRAINING_PROGRAM")]
    TrainingProgram,
    #[sea_orm(string_value = "TRAINING_RECORD")]
    TrainingRecord,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum Status {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl ActiveModelBehavior for ActiveModel {}
