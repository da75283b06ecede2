use chrono::NaiveDate;
use entity::{department, employee, position};
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, PolicyEngine, Principal, Resource};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{Page, lower, now, search_pattern, today};
use crate::validation::EmployeeDraft;

#[derive(Clone, Debug, Default)]
pub struct EmployeeFilter {
    pub q: Option<String>,
    pub department_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    pub include_dismissed: bool,
    pub safety_commission_only: bool,
}

/// Partial update. `Some(None)` clears a nullable field.
#[derive(Clone, Debug, Default)]
pub struct EmployeePatch {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub birth_date: Option<Option<NaiveDate>>,
    pub position_id: Option<Option<Uuid>>,
    pub department_id: Option<Option<Uuid>>,
    pub hire_date: Option<Option<NaiveDate>>,
    pub is_dismissed: Option<bool>,
    pub dismissal_date: Option<Option<NaiveDate>>,
    pub is_on_maternity_leave: Option<bool>,
    pub is_external_part_time: Option<bool>,
    pub is_safety_commission_member: Option<bool>,
}

impl EmployeePatch {
    fn apply(self, base: &employee::Model) -> EmployeeDraft {
        EmployeeDraft {
            last_name: self.last_name.unwrap_or_else(|| base.last_name.clone()),
            first_name: self.first_name.unwrap_or_else(|| base.first_name.clone()),
            middle_name: self.middle_name.unwrap_or_else(|| base.middle_name.clone()),
            birth_date: self.birth_date.unwrap_or(base.birth_date),
            position_id: self.position_id.unwrap_or(base.position_id),
            department_id: self.department_id.unwrap_or(base.department_id),
            hire_date: self.hire_date.unwrap_or(base.hire_date),
            is_dismissed: self.is_dismissed.unwrap_or(base.is_dismissed),
            dismissal_date: self.dismissal_date.unwrap_or(base.dismissal_date),
            is_on_maternity_leave: self
                .is_on_maternity_leave
                .unwrap_or(base.is_on_maternity_leave),
            is_external_part_time: self
                .is_external_part_time
                .unwrap_or(base.is_external_part_time),
            is_safety_commission_member: self
                .is_safety_commission_member
                .unwrap_or(base.is_safety_commission_member),
        }
    }
}

#[instrument(
    name = "hr.employees.list",
    skip_all,
    fields(has_q = filter.q.is_some(), include_dismissed = filter.include_dismissed)
)]
pub async fn list(
    db: &DatabaseConnection,
    actor: &Principal,
    filter: EmployeeFilter,
    page: Page,
) -> ApiResult<Vec<employee::Model>> {
    PolicyEngine.check(actor, Action::View, Resource::Employee)?;
    let mut query = employee::Entity::find();
    if let Some(pattern) = search_pattern(filter.q.as_deref()) {
        query = query.filter(
            Condition::any()
                .add(lower(employee::Column::LastName).like(pattern.clone()))
                .add(lower(employee::Column::FirstName).like(pattern.clone()))
                .add(lower(employee::Column::MiddleName).like(pattern)),
        );
    }
    if let Some(department_id) = filter.department_id {
        query = query.filter(employee::Column::DepartmentId.eq(department_id));
    }
    if let Some(position_id) = filter.position_id {
        query = query.filter(employee::Column::PositionId.eq(position_id));
    }
    if !filter.include_dismissed {
        query = query.filter(employee::Column::IsDismissed.eq(false));
    }
    if filter.safety_commission_only {
        query = query.filter(employee::Column::IsSafetyCommissionMember.eq(true));
    }
    Ok(order_by_name(query)
        .limit(page.limit)
        .offset(page.offset)
        .all(db)
        .await?)
}

pub(crate) fn order_by_name(
    query: sea_orm::Select<employee::Entity>,
) -> sea_orm::Select<employee::Entity> {
    query
        .order_by_asc(employee::Column::LastName)
        .order_by_asc(employee::Column::FirstName)
        .order_by_asc(employee::Column::MiddleName)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
) -> ApiResult<employee::Model> {
    PolicyEngine.check(actor, Action::View, Resource::Employee)?;
    find(db, id).await
}

pub(crate) async fn find(db: &DatabaseConnection, id: Uuid) -> ApiResult<employee::Model> {
    employee::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("employee"))
}

#[instrument(name = "hr.employees.create", skip_all, fields(user = %actor.username))]
pub async fn create(
    db: &DatabaseConnection,
    actor: &Principal,
    draft: EmployeeDraft,
) -> ApiResult<employee::Model> {
    PolicyEngine.check(actor, Action::Add, Resource::Employee)?;
    let draft = checked(db, draft, None).await?;
    let now = now();
    let model = employee::ActiveModel {
        id: Set(Uuid::new_v4()),
        last_name: Set(draft.last_name),
        first_name: Set(draft.first_name),
        middle_name: Set(draft.middle_name),
        birth_date: Set(draft.birth_date),
        position_id: Set(draft.position_id),
        department_id: Set(draft.department_id),
        hire_date: Set(draft.hire_date),
        is_dismissed: Set(draft.is_dismissed),
        dismissal_date: Set(draft.dismissal_date),
        is_on_maternity_leave: Set(draft.is_on_maternity_leave),
        is_external_part_time: Set(draft.is_external_part_time),
        is_safety_commission_member: Set(draft.is_safety_commission_member),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(employee_id = %model.id, name = %model.full_name(), "employee created");
    Ok(model)
}

#[instrument(name = "hr.employees.update", skip_all, fields(user = %actor.username, %id))]
pub async fn update(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
    patch: EmployeePatch,
) -> ApiResult<employee::Model> {
    PolicyEngine.check(actor, Action::Change, Resource::Employee)?;
    let existing = find(db, id).await?;
    let draft = checked(db, patch.apply(&existing), Some(id)).await?;
    let mut model: employee::ActiveModel = existing.into();
    model.last_name = Set(draft.last_name);
    model.first_name = Set(draft.first_name);
    model.middle_name = Set(draft.middle_name);
    model.birth_date = Set(draft.birth_date);
    model.position_id = Set(draft.position_id);
    model.department_id = Set(draft.department_id);
    model.hire_date = Set(draft.hire_date);
    model.is_dismissed = Set(draft.is_dismissed);
    model.dismissal_date = Set(draft.dismissal_date);
    model.is_on_maternity_leave = Set(draft.is_on_maternity_leave);
    model.is_external_part_time = Set(draft.is_external_part_time);
    model.is_safety_commission_member = Set(draft.is_safety_commission_member);
    model.updated_at = Set(now());
    let updated = model.update(db).await?;
    info!(employee_id = %updated.id, dismissed = updated.is_dismissed, "employee updated");
    Ok(updated)
}

/// Validate the draft, then check references and identity uniqueness.
async fn checked(
    db: &DatabaseConnection,
    draft: EmployeeDraft,
    exclude: Option<Uuid>,
) -> ApiResult<EmployeeDraft> {
    let draft = draft.validate(today()).map_err(|err| {
        warn!(error = %err, "employee validation failed");
        ApiError::from(err)
    })?;
    if let Some(department_id) = draft.department_id {
        if department::Entity::find_by_id(department_id).one(db).await?.is_none() {
            return Err(ApiError::validation("unknown departmentId"));
        }
    }
    if let Some(position_id) = draft.position_id {
        if position::Entity::find_by_id(position_id).one(db).await?.is_none() {
            return Err(ApiError::validation("unknown positionId"));
        }
    }

    let mut duplicate = employee::Entity::find()
        .filter(employee::Column::LastName.eq(draft.last_name.clone()))
        .filter(employee::Column::FirstName.eq(draft.first_name.clone()))
        .filter(employee::Column::MiddleName.eq(draft.middle_name.clone()));
    duplicate = match draft.birth_date {
        Some(born) => duplicate.filter(employee::Column::BirthDate.eq(born)),
        None => duplicate.filter(employee::Column::BirthDate.is_null()),
    };
    if let Some(id) = exclude {
        duplicate = duplicate.filter(employee::Column::Id.ne(id));
    }
    if duplicate.count(db).await? > 0 {
        return Err(ApiError::conflict(
            "an employee with the same name and birth date already exists",
        ));
    }
    Ok(draft)
}
