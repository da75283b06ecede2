use async_graphql::{ID, InputObject, MaybeUndefined};
use chrono::NaiveDate;
use platform_api::ApiError;
use platform_authz::Role;
use uuid::Uuid;

use super::parse_uuid;
use crate::report::{ReportFilter, ReportSort, SortDirection};
use crate::service::{
    departments::{DepartmentInput, DepartmentPatch},
    employees::{EmployeeFilter, EmployeePatch},
    instructions::{InstructionInput, InstructionPatch},
    positions::{PositionFilter, PositionInput, PositionPatch},
    programs::{ProgramInput, ProgramPatch},
    records::{RecordFilter, RecordInput, RecordPatch},
    users::{NewUser, UserPatch},
};
use crate::validation::EmployeeDraft;

/// Absent keeps the stored value, `null` clears it.
fn patch<T>(value: MaybeUndefined<T>) -> Option<Option<T>> {
    match value {
        MaybeUndefined::Undefined => None,
        MaybeUndefined::Null => Some(None),
        MaybeUndefined::Value(v) => Some(Some(v)),
    }
}

fn patch_id(value: MaybeUndefined<ID>) -> async_graphql::Result<Option<Option<Uuid>>> {
    patch(value)
        .map(|inner| inner.as_ref().map(parse_uuid).transpose())
        .transpose()
}

fn optional_id(value: Option<&ID>) -> async_graphql::Result<Option<Uuid>> {
    value.map(parse_uuid).transpose()
}

pub(crate) fn parse_roles(values: &[String]) -> async_graphql::Result<Vec<Role>> {
    values
        .iter()
        .map(|value| {
            Role::parse(value)
                .ok_or_else(|| ApiError::validation(format!("unknown role {value}")).into_graphql())
        })
        .collect()
}

#[derive(InputObject, Clone)]
pub struct NewDepartmentInput {
    pub name: String,
    pub description: Option<String>,
}

impl From<NewDepartmentInput> for DepartmentInput {
    fn from(value: NewDepartmentInput) -> Self {
        Self {
            name: value.name,
            description: value.description,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct UpdateDepartmentInput {
    pub id: ID,
    pub name: Option<String>,
    pub description: MaybeUndefined<String>,
}

impl From<UpdateDepartmentInput> for DepartmentPatch {
    fn from(value: UpdateDepartmentInput) -> Self {
        Self {
            name: value.name,
            description: patch(value.description),
        }
    }
}

#[derive(InputObject, Clone, Default)]
pub struct PositionFilterInput {
    pub q: Option<String>,
    #[graphql(name = "isManager")]
    pub is_manager: Option<bool>,
    #[graphql(name = "isTeacher")]
    pub is_teacher: Option<bool>,
}

impl From<PositionFilterInput> for PositionFilter {
    fn from(value: PositionFilterInput) -> Self {
        Self {
            q: value.q,
            is_manager: value.is_manager,
            is_teacher: value.is_teacher,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct NewPositionInput {
    pub name: String,
    #[graphql(name = "isManager", default)]
    pub is_manager: bool,
    #[graphql(name = "isTeacher", default)]
    pub is_teacher: bool,
}

impl From<NewPositionInput> for PositionInput {
    fn from(value: NewPositionInput) -> Self {
        Self {
            name: value.name,
            is_manager: value.is_manager,
            is_teacher: value.is_teacher,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct UpdatePositionInput {
    pub id: ID,
    pub name: Option<String>,
    #[graphql(name = "isManager")]
    pub is_manager: Option<bool>,
    #[graphql(name = "isTeacher")]
    pub is_teacher: Option<bool>,
}

impl From<UpdatePositionInput> for PositionPatch {
    fn from(value: UpdatePositionInput) -> Self {
        Self {
            name: value.name,
            is_manager: value.is_manager,
            is_teacher: value.is_teacher,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct NewTrainingProgramInput {
    pub name: String,
    #[graphql(name = "recurrenceYears")]
    pub recurrence_years: Option<i32>,
}

impl From<NewTrainingProgramInput> for ProgramInput {
    fn from(value: NewTrainingProgramInput) -> Self {
        Self {
            name: value.name,
            recurrence_years: value.recurrence_years,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct UpdateTrainingProgramInput {
    pub id: ID,
    pub name: Option<String>,
    #[graphql(name = "recurrenceYears")]
    pub recurrence_years: MaybeUndefined<i32>,
}

impl From<UpdateTrainingProgramInput> for ProgramPatch {
    fn from(value: UpdateTrainingProgramInput) -> Self {
        Self {
            name: value.name,
            recurrence_years: patch(value.recurrence_years),
        }
    }
}

#[derive(InputObject, Clone, Default)]
pub struct EmployeeFilterInput {
    pub q: Option<String>,
    #[graphql(name = "departmentId")]
    pub department_id: Option<ID>,
    #[graphql(name = "positionId")]
    pub position_id: Option<ID>,
    #[graphql(name = "includeDismissed", default)]
    pub include_dismissed: bool,
    #[graphql(name = "safetyCommissionOnly", default)]
    pub safety_commission_only: bool,
}

impl EmployeeFilterInput {
    pub fn into_filter(self) -> async_graphql::Result<EmployeeFilter> {
        Ok(EmployeeFilter {
            department_id: optional_id(self.department_id.as_ref())?,
            position_id: optional_id(self.position_id.as_ref())?,
            q: self.q,
            include_dismissed: self.include_dismissed,
            safety_commission_only: self.safety_commission_only,
        })
    }
}

#[derive(InputObject, Clone)]
pub struct NewEmployeeInput {
    #[graphql(name = "lastName")]
    pub last_name: String,
    #[graphql(name = "firstName")]
    pub first_name: String,
    #[graphql(name = "middleName", default)]
    pub middle_name: String,
    #[graphql(name = "birthDate")]
    pub birth_date: Option<NaiveDate>,
    #[graphql(name = "positionId")]
    pub position_id: Option<ID>,
    #[graphql(name = "departmentId")]
    pub department_id: Option<ID>,
    #[graphql(name = "hireDate")]
    pub hire_date: Option<NaiveDate>,
    #[graphql(name = "isDismissed", default)]
    pub is_dismissed: bool,
    #[graphql(name = "dismissalDate")]
    pub dismissal_date: Option<NaiveDate>,
    #[graphql(name = "isOnMaternityLeave", default)]
    pub is_on_maternity_leave: bool,
    #[graphql(name = "isExternalPartTime", default)]
    pub is_external_part_time: bool,
    #[graphql(name = "isSafetyCommissionMember", default)]
    pub is_safety_commission_member: bool,
}

impl NewEmployeeInput {
    pub fn into_draft(self) -> async_graphql::Result<EmployeeDraft> {
        Ok(EmployeeDraft {
            position_id: optional_id(self.position_id.as_ref())?,
            department_id: optional_id(self.department_id.as_ref())?,
            last_name: self.last_name,
            first_name: self.first_name,
            middle_name: self.middle_name,
            birth_date: self.birth_date,
            hire_date: self.hire_date,
            is_dismissed: self.is_dismissed,
            dismissal_date: self.dismissal_date,
            is_on_maternity_leave: self.is_on_maternity_leave,
            is_external_part_time: self.is_external_part_time,
            is_safety_commission_member: self.is_safety_commission_member,
        })
    }
}

#[derive(InputObject, Clone)]
pub struct UpdateEmployeeInput {
    pub id: ID,
    #[graphql(name = "lastName")]
    pub last_name: Option<String>,
    #[graphql(name = "firstName")]
    pub first_name: Option<String>,
    #[graphql(name = "middleName")]
    pub middle_name: Option<String>,
    #[graphql(name = "birthDate")]
    pub birth_date: MaybeUndefined<NaiveDate>,
    #[graphql(name = "positionId")]
    pub position_id: MaybeUndefined<ID>,
    #[graphql(name = "departmentId")]
    pub department_id: MaybeUndefined<ID>,
    #[graphql(name = "hireDate")]
    pub hire_date: MaybeUndefined<NaiveDate>,
    #[graphql(name = "isDismissed")]
    pub is_dismissed: Option<bool>,
    #[graphql(name = "dismissalDate")]
    pub dismissal_date: MaybeUndefined<NaiveDate>,
    #[graphql(name = "isOnMaternityLeave")]
    pub is_on_maternity_leave: Option<bool>,
    #[graphql(name = "isExternalPartTime")]
    pub is_external_part_time: Option<bool>,
    #[graphql(name = "isSafetyCommissionMember")]
    pub is_safety_commission_member: Option<bool>,
}

impl UpdateEmployeeInput {
    pub fn into_patch(self) -> async_graphql::Result<(Uuid, EmployeePatch)> {
        let id = parse_uuid(&self.id)?;
        Ok((
            id,
            EmployeePatch {
                last_name: self.last_name,
                first_name: self.first_name,
                middle_name: self.middle_name,
                birth_date: patch(self.birth_date),
                position_id: patch_id(self.position_id)?,
                department_id: patch_id(self.department_id)?,
                hire_date: patch(self.hire_date),
                is_dismissed: self.is_dismissed,
                dismissal_date: patch(self.dismissal_date),
                is_on_maternity_leave: self.is_on_maternity_leave,
                is_external_part_time: self.is_external_part_time,
                is_safety_commission_member: self.is_safety_commission_member,
            },
        ))
    }
}

#[derive(InputObject, Clone, Default)]
pub struct TrainingRecordFilterInput {
    #[graphql(name = "employeeId")]
    pub employee_id: Option<ID>,
    #[graphql(name = "trainingProgramId")]
    pub training_program_id: Option<ID>,
    pub verified: Option<bool>,
}

impl TrainingRecordFilterInput {
    pub fn into_filter(self) -> async_graphql::Result<RecordFilter> {
        Ok(RecordFilter {
            employee_id: optional_id(self.employee_id.as_ref())?,
            training_program_id: optional_id(self.training_program_id.as_ref())?,
            verified: self.verified,
        })
    }
}

#[derive(InputObject, Clone)]
pub struct NewTrainingRecordInput {
    #[graphql(name = "employeeId")]
    pub employee_id: ID,
    #[graphql(name = "trainingProgramId")]
    pub training_program_id: ID,
    #[graphql(name = "completionDate")]
    pub completion_date: NaiveDate,
    pub details: Option<String>,
    #[graphql(name = "isVerified", default)]
    pub is_verified: bool,
}

impl NewTrainingRecordInput {
    pub fn into_input(self) -> async_graphql::Result<RecordInput> {
        Ok(RecordInput {
            employee_id: parse_uuid(&self.employee_id)?,
            training_program_id: parse_uuid(&self.training_program_id)?,
            completion_date: self.completion_date,
            details: self.details,
            is_verified: self.is_verified,
        })
    }
}

#[derive(InputObject, Clone)]
pub struct UpdateTrainingRecordInput {
    pub id: ID,
    #[graphql(name = "completionDate")]
    pub completion_date: Option<NaiveDate>,
    pub details: MaybeUndefined<String>,
    #[graphql(name = "isVerified")]
    pub is_verified: Option<bool>,
}

impl From<UpdateTrainingRecordInput> for RecordPatch {
    fn from(value: UpdateTrainingRecordInput) -> Self {
        Self {
            completion_date: value.completion_date,
            details: patch(value.details),
            is_verified: value.is_verified,
        }
    }
}

#[derive(InputObject, Clone, Default)]
pub struct ReportFilterInput {
    #[graphql(name = "employeeIds", default)]
    pub employee_ids: Vec<ID>,
    #[graphql(name = "programId")]
    pub program_id: Option<ID>,
    #[graphql(name = "includeDismissed", default)]
    pub include_dismissed: bool,
    /// Program column to order rows by.
    #[graphql(name = "sortBy")]
    pub sort_by: Option<ID>,
    #[graphql(name = "sortDirection", default)]
    pub sort_direction: SortDirection,
    #[graphql(name = "asOf")]
    pub as_of: Option<NaiveDate>,
}

impl ReportFilterInput {
    pub fn into_filter(self) -> async_graphql::Result<ReportFilter> {
        let employee_ids = self
            .employee_ids
            .iter()
            .map(parse_uuid)
            .collect::<async_graphql::Result<Vec<_>>>()?;
        let sort = optional_id(self.sort_by.as_ref())?.map(|program_id| ReportSort {
            program_id,
            direction: self.sort_direction,
        });
        Ok(ReportFilter {
            employee_ids,
            program_id: optional_id(self.program_id.as_ref())?,
            include_dismissed: self.include_dismissed,
            sort,
            as_of: self.as_of,
        })
    }
}

#[derive(InputObject, Clone)]
pub struct NewInstructionInput {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
}

impl From<NewInstructionInput> for InstructionInput {
    fn from(value: NewInstructionInput) -> Self {
        Self {
            title: value.title,
            content: value.content,
            category: value.category,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct UpdateInstructionInput {
    pub id: ID,
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

impl From<UpdateInstructionInput> for InstructionPatch {
    fn from(value: UpdateInstructionInput) -> Self {
        Self {
            title: value.title,
            content: value.content,
            category: value.category,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct NewUserInput {
    pub username: String,
    #[graphql(name = "displayName")]
    pub display_name: String,
    pub password: String,
    pub roles: Vec<String>,
}

impl NewUserInput {
    pub fn into_new_user(self) -> async_graphql::Result<NewUser> {
        Ok(NewUser {
            roles: parse_roles(&self.roles)?,
            username: self.username,
            display_name: self.display_name,
            password: self.password,
        })
    }
}

#[derive(InputObject, Clone)]
pub struct UpdateUserInput {
    pub id: ID,
    #[graphql(name = "displayName")]
    pub display_name: Option<String>,
    pub roles: Option<Vec<String>>,
    #[graphql(name = "isActive")]
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

impl UpdateUserInput {
    pub fn into_patch(self) -> async_graphql::Result<(Uuid, UserPatch)> {
        let id = parse_uuid(&self.id)?;
        let roles = self.roles.as_deref().map(parse_roles).transpose()?;
        Ok((
            id,
            UserPatch {
                display_name: self.display_name,
                roles,
                is_active: self.is_active,
                password: self.password,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maybe_undefined_maps_to_double_option() {
        assert_eq!(patch::<i32>(MaybeUndefined::Undefined), None);
        assert_eq!(patch::<i32>(MaybeUndefined::Null), Some(None));
        assert_eq!(patch(MaybeUndefined::Value(3)), Some(Some(3)));
    }

    #[test]
    fn role_names_are_parsed_case_insensitively() {
        let roles = parse_roles(&["editor".into(), "VIEWER".into()]).unwrap();
        assert_eq!(roles, vec![Role::Editor, Role::Viewer]);
        assert!(parse_roles(&["owner".into()]).is_err());
    }

    #[test]
    fn report_sort_requires_a_column() {
        let filter = ReportFilterInput {
            sort_direction: SortDirection::Desc,
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.sort, None);
        assert!(!filter.include_dismissed);
    }
}
