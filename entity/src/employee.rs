use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "employee")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub birth_date: Option<Date>,
    #[sea_orm(indexed)]
    pub position_id: Option<Uuid>,
    #[sea_orm(indexed)]
    pub department_id: Option<Uuid>,
    pub hire_date: Option<Date>,
    pub is_dismissed: bool,
    pub dismissal_date: Option<Date>,
    pub is_on_maternity_leave: bool,
    pub is_external_part_time: bool,
    pub is_safety_commission_member: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// "Last First Middle", skipping an empty middle name.
    pub fn full_name(&self) -> String {
        [&self.last_name, &self.first_name, &self.middle_name]
            .into_iter()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::position::Entity",
        from = "Column::PositionId",
        to = "super::position::Column::Id",
        on_delete = "SetNull"
    )]
    Position,
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id",
        on_delete = "SetNull"
    )]
    Department,
    #[sea_orm(has_many = "super::training_record::Entity")]
    TrainingRecord,
}

impl Related<super::position::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Position.def()
    }
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::training_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrainingRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
