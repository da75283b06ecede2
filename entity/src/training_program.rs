use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "training_program")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    /// Years until the training must be repeated. `None` never expires.
    pub recurrence_years: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::training_record::Entity")]
    TrainingRecord,
}

impl Related<super::training_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrainingRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
