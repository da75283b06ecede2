use async_graphql::{ComplexObject, Context, Enum, ID, SimpleObject};
use chrono::{DateTime, NaiveDate, Utc};
use entity::{
    app_user, deletion_request, department, employee, instruction, position, training_program,
    training_record,
};
use platform_api::GraphqlResultExt;
use platform_authz::Role;
use uuid::Uuid;

use super::{database, principal};
use crate::compliance::TrainingStatus;
use crate::report::short_name;
use crate::service::{
    self,
    deletions::DeletionOutcome,
    records::EmployeeTraining,
    today,
    users::UserWithRoles,
};

fn id(value: Uuid) -> ID {
    ID::from(value.to_string())
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Department")]
pub struct DepartmentNode {
    pub id: ID,
    pub name: String,
    pub description: Option<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<department::Model> for DepartmentNode {
    fn from(model: department::Model) -> Self {
        Self {
            id: id(model.id),
            name: model.name,
            description: model.description,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Position")]
pub struct PositionNode {
    pub id: ID,
    pub name: String,
    #[graphql(name = "isManager")]
    pub is_manager: bool,
    #[graphql(name = "isTeacher")]
    pub is_teacher: bool,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<position::Model> for PositionNode {
    fn from(model: position::Model) -> Self {
        Self {
            id: id(model.id),
            name: model.name,
            is_manager: model.is_manager,
            is_teacher: model.is_teacher,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "TrainingProgram")]
pub struct TrainingProgramNode {
    pub id: ID,
    pub name: String,
    /// Years between mandatory repetitions; null means the training never expires.
    #[graphql(name = "recurrenceYears")]
    pub recurrence_years: Option<i32>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<training_program::Model> for TrainingProgramNode {
    fn from(model: training_program::Model) -> Self {
        Self {
            id: id(model.id),
            name: model.name,
            recurrence_years: model.recurrence_years,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Employee", complex)]
pub struct EmployeeNode {
    pub id: ID,
    #[graphql(name = "lastName")]
    pub last_name: String,
    #[graphql(name = "firstName")]
    pub first_name: String,
    #[graphql(name = "middleName")]
    pub middle_name: String,
    #[graphql(name = "fullName")]
    pub full_name: String,
    #[graphql(name = "shortName")]
    pub short_name: String,
    #[graphql(name = "birthDate")]
    pub birth_date: Option<NaiveDate>,
    #[graphql(name = "hireDate")]
    pub hire_date: Option<NaiveDate>,
    #[graphql(name = "isDismissed")]
    pub is_dismissed: bool,
    #[graphql(name = "dismissalDate")]
    pub dismissal_date: Option<NaiveDate>,
    #[graphql(name = "isOnMaternityLeave")]
    pub is_on_maternity_leave: bool,
    #[graphql(name = "isExternalPartTime")]
    pub is_external_part_time: bool,
    #[graphql(name = "isSafetyCommissionMember")]
    pub is_safety_commission_member: bool,
    #[graphql(name = "positionId")]
    pub position_id: Option<ID>,
    #[graphql(name = "departmentId")]
    pub department_id: Option<ID>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[graphql(skip)]
    pub uuid: Uuid,
    #[graphql(skip)]
    pub position_uuid: Option<Uuid>,
    #[graphql(skip)]
    pub department_uuid: Option<Uuid>,
}

impl From<employee::Model> for EmployeeNode {
    fn from(model: employee::Model) -> Self {
        Self {
            id: id(model.id),
            full_name: model.full_name(),
            short_name: short_name(&model.last_name, &model.first_name, &model.middle_name),
            last_name: model.last_name,
            first_name: model.first_name,
            middle_name: model.middle_name,
            birth_date: model.birth_date,
            hire_date: model.hire_date,
            is_dismissed: model.is_dismissed,
            dismissal_date: model.dismissal_date,
            is_on_maternity_leave: model.is_on_maternity_leave,
            is_external_part_time: model.is_external_part_time,
            is_safety_commission_member: model.is_safety_commission_member,
            position_id: model.position_id.map(id),
            department_id: model.department_id.map(id),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
            uuid: model.id,
            position_uuid: model.position_id,
            department_uuid: model.department_id,
        }
    }
}

#[ComplexObject]
impl EmployeeNode {
    async fn position(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<PositionNode>> {
        let Some(position_id) = self.position_uuid else {
            return Ok(None);
        };
        let db = database(ctx)?;
        let actor = principal(ctx)?;
        let model = service::positions::get(db.as_ref(), &actor, position_id)
            .await
            .gql()?;
        Ok(Some(model.into()))
    }

    async fn department(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<DepartmentNode>> {
        let Some(department_id) = self.department_uuid else {
            return Ok(None);
        };
        let db = database(ctx)?;
        let actor = principal(ctx)?;
        let model = service::departments::get(db.as_ref(), &actor, department_id)
            .await
            .gql()?;
        Ok(Some(model.into()))
    }

    /// Completion records newest first, classified as of `asOf` (default today).
    async fn trainings(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "asOf")] as_of: Option<NaiveDate>,
    ) -> async_graphql::Result<Vec<EmployeeTrainingNode>> {
        let db = database(ctx)?;
        let actor = principal(ctx)?;
        let rows = service::records::employee_trainings(
            db.as_ref(),
            &actor,
            self.uuid,
            as_of.unwrap_or_else(today),
        )
        .await
        .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "TrainingRecord")]
pub struct TrainingRecordNode {
    pub id: ID,
    #[graphql(name = "employeeId")]
    pub employee_id: ID,
    #[graphql(name = "trainingProgramId")]
    pub training_program_id: ID,
    #[graphql(name = "completionDate")]
    pub completion_date: NaiveDate,
    pub details: Option<String>,
    #[graphql(name = "isVerified")]
    pub is_verified: bool,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<training_record::Model> for TrainingRecordNode {
    fn from(model: training_record::Model) -> Self {
        Self {
            id: id(model.id),
            employee_id: id(model.employee_id),
            training_program_id: id(model.training_program_id),
            completion_date: model.completion_date,
            details: model.details,
            is_verified: model.is_verified,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "EmployeeTraining")]
pub struct EmployeeTrainingNode {
    pub record: TrainingRecordNode,
    pub program: TrainingProgramNode,
    pub status: TrainingStatus,
    #[graphql(name = "expiryDate")]
    pub expiry_date: Option<NaiveDate>,
    #[graphql(name = "daysUntilExpiry")]
    pub days_until_expiry: Option<i64>,
    /// A newer completion of the same program exists.
    pub superseded: bool,
}

impl From<EmployeeTraining> for EmployeeTrainingNode {
    fn from(value: EmployeeTraining) -> Self {
        Self {
            record: value.record.into(),
            program: value.program.into(),
            status: value.assessment.status,
            expiry_date: value.assessment.expiry_date,
            days_until_expiry: value.assessment.days_until_expiry,
            superseded: value.superseded,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum DeletionTarget {
    #[graphql(name = "EMPLOYEE")]
    Employee,
    #[graphql(name = "DEPARTMENT")]
    Department,
    #[graphql(name = "POSITION")]
    Position,
    #[graphql(name = "TRAINING_PROGRAM")]
    TrainingProgram,
    #[graphql(name = "TRAINING_RECORD")]
    TrainingRecord,
}

impl From<deletion_request::TargetKind> for DeletionTarget {
    fn from(value: deletion_request::TargetKind) -> Self {
        use deletion_request::TargetKind as K;
        match value {
            K::Employee => Self::Employee,
            K::Department => Self::Department,
            K::Position => Self::Position,
            K::TrainingProgram => Self::TrainingProgram,
            K::TrainingRecord => Self::TrainingRecord,
        }
    }
}

impl From<DeletionTarget> for deletion_request::TargetKind {
    fn from(value: DeletionTarget) -> Self {
        match value {
            DeletionTarget::Employee => Self::Employee,
            DeletionTarget::Department => Self::Department,
            DeletionTarget::Position => Self::Position,
            DeletionTarget::TrainingProgram => Self::TrainingProgram,
            DeletionTarget::TrainingRecord => Self::TrainingRecord,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum DeletionStatus {
    #[graphql(name = "PENDING")]
    Pending,
    #[graphql(name = "APPROVED")]
    Approved,
    #[graphql(name = "REJECTED")]
    Rejected,
}

impl From<deletion_request::Status> for DeletionStatus {
    fn from(value: deletion_request::Status) -> Self {
        match value {
            deletion_request::Status::Pending => Self::Pending,
            deletion_request::Status::Approved => Self::Approved,
            deletion_request::Status::Rejected => Self::Rejected,
        }
    }
}

impl From<DeletionStatus> for deletion_request::Status {
    fn from(value: DeletionStatus) -> Self {
        match value {
            DeletionStatus::Pending => Self::Pending,
            DeletionStatus::Approved => Self::Approved,
            DeletionStatus::Rejected => Self::Rejected,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "DeletionRequest")]
pub struct DeletionRequestNode {
    pub id: ID,
    #[graphql(name = "targetKind")]
    pub target_kind: DeletionTarget,
    #[graphql(name = "targetId")]
    pub target_id: ID,
    #[graphql(name = "targetLabel")]
    pub target_label: String,
    pub reason: Option<String>,
    pub status: DeletionStatus,
    #[graphql(name = "requestedBy")]
    pub requested_by: Option<ID>,
    #[graphql(name = "reviewedBy")]
    pub reviewed_by: Option<ID>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "reviewedAt")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl From<deletion_request::Model> for DeletionRequestNode {
    fn from(model: deletion_request::Model) -> Self {
        Self {
            id: id(model.id),
            target_kind: model.target_kind.into(),
            target_id: id(model.target_id),
            target_label: model.target_label,
            reason: model.reason,
            status: model.status.into(),
            requested_by: model.requested_by.map(id),
            reviewed_by: model.reviewed_by.map(id),
            created_at: model.created_at.into(),
            reviewed_at: model.reviewed_at.map(Into::into),
        }
    }
}

/// `deleted` is true when the row is gone; otherwise `request` awaits a moderator.
#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "DeletionOutcome")]
pub struct DeletionOutcomeNode {
    pub deleted: bool,
    pub request: Option<DeletionRequestNode>,
}

impl From<DeletionOutcome> for DeletionOutcomeNode {
    fn from(value: DeletionOutcome) -> Self {
        Self {
            deleted: value.deleted,
            request: value.request.map(Into::into),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Instruction")]
pub struct InstructionNode {
    pub id: ID,
    pub title: String,
    pub content: String,
    pub category: String,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<instruction::Model> for InstructionNode {
    fn from(model: instruction::Model) -> Self {
        Self {
            id: id(model.id),
            title: model.title,
            content: model.content,
            category: model.category,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "User")]
pub struct UserNode {
    pub id: ID,
    pub username: String,
    #[graphql(name = "displayName")]
    pub display_name: String,
    #[graphql(name = "isActive")]
    pub is_active: bool,
    pub roles: Vec<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl UserNode {
    pub fn from_model(model: app_user::Model, roles: &[Role]) -> Self {
        Self {
            id: id(model.id),
            username: model.username,
            display_name: model.display_name,
            is_active: model.is_active,
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<UserWithRoles> for UserNode {
    fn from((model, roles): UserWithRoles) -> Self {
        Self::from_model(model, &roles)
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct MePayload {
    pub user: UserNode,
    pub roles: Vec<String>,
    /// Deletes take effect immediately instead of filing a request.
    #[graphql(name = "canDeleteDirectly")]
    pub can_delete_directly: bool,
    #[graphql(name = "canReviewDeletions")]
    pub can_review_deletions: bool,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AuthPayload {
    pub ok: bool,
    pub token: Option<String>,
    pub user: Option<UserNode>,
    pub error: Option<String>,
}

impl AuthPayload {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            token: None,
            user: None,
            error: Some(message.into()),
        }
    }
}
