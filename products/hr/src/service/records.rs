use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use entity::{training_program, training_record};
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, PolicyEngine, Principal, Resource};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Page, now, today};
use crate::compliance::{Assessment, assess};
use crate::validation::{completion_date, optional_text};

#[derive(Clone, Debug)]
pub struct RecordInput {
    pub employee_id: Uuid,
    pub training_program_id: Uuid,
    pub completion_date: NaiveDate,
    pub details: Option<String>,
    pub is_verified: bool,
}

#[derive(Clone, Debug, Default)]
pub struct RecordPatch {
    pub completion_date: Option<NaiveDate>,
    pub details: Option<Option<String>>,
    pub is_verified: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct RecordFilter {
    pub employee_id: Option<Uuid>,
    pub training_program_id: Option<Uuid>,
    pub verified: Option<bool>,
}

/// A completion record with its program and classification.
#[derive(Clone, Debug)]
pub struct EmployeeTraining {
    pub record: training_record::Model,
    pub program: training_program::Model,
    pub assessment: Assessment,
    /// A later completion of the same program exists.
    pub superseded: bool,
}

#[instrument(name = "hr.records.list", skip_all)]
pub async fn list(
    db: &DatabaseConnection,
    actor: &Principal,
    filter: RecordFilter,
    page: Page,
) -> ApiResult<Vec<training_record::Model>> {
    PolicyEngine.check(actor, Action::View, Resource::TrainingRecord)?;
    let mut query = training_record::Entity::find();
    if let Some(employee_id) = filter.employee_id {
        query = query.filter(training_record::Column::EmployeeId.eq(employee_id));
    }
    if let Some(program_id) = filter.training_program_id {
        query = query.filter(training_record::Column::TrainingProgramId.eq(program_id));
    }
    if let Some(verified) = filter.verified {
        query = query.filter(training_record::Column::IsVerified.eq(verified));
    }
    Ok(query
        .order_by_desc(training_record::Column::CompletionDate)
        .order_by_asc(training_record::Column::Id)
        .limit(page.limit)
        .offset(page.offset)
        .all(db)
        .await?)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
) -> ApiResult<training_record::Model> {
    PolicyEngine.check(actor, Action::View, Resource::TrainingRecord)?;
    find(db, id).await
}

pub(crate) async fn find(db: &DatabaseConnection, id: Uuid) -> ApiResult<training_record::Model> {
    training_record::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("training record"))
}

/// A dangling reference in the input is the caller's mistake; anything else propagates.
fn unknown_reference(err: ApiError, field: &str) -> ApiError {
    match err {
        ApiError::NotFound(_) => ApiError::validation(format!("unknown {field}")),
        other => other,
    }
}

#[instrument(name = "hr.records.create", skip_all, fields(user = %actor.username))]
pub async fn create(
    db: &DatabaseConnection,
    actor: &Principal,
    input: RecordInput,
) -> ApiResult<training_record::Model> {
    PolicyEngine.check(actor, Action::Add, Resource::TrainingRecord)?;
    let completed = completion_date(input.completion_date, today())?;
    let details = optional_text("details", input.details.as_deref(), None)?;
    super::employees::find(db, input.employee_id)
        .await
        .map_err(|err| unknown_reference(err, "employeeId"))?;
    super::programs::find(db, input.training_program_id)
        .await
        .map_err(|err| unknown_reference(err, "trainingProgramId"))?;
    ensure_unique(db, input.employee_id, input.training_program_id, completed, None).await?;

    let now = now();
    let model = training_record::ActiveModel {
        id: Set(Uuid::new_v4()),
        employee_id: Set(input.employee_id),
        training_program_id: Set(input.training_program_id),
        completion_date: Set(completed),
        details: Set(details),
        is_verified: Set(input.is_verified),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(
        record_id = %model.id,
        employee_id = %model.employee_id,
        program_id = %model.training_program_id,
        completed = %model.completion_date,
        "training record created"
    );
    Ok(model)
}

#[instrument(name = "hr.records.update", skip_all, fields(user = %actor.username, %id))]
pub async fn update(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
    patch: RecordPatch,
) -> ApiResult<training_record::Model> {
    PolicyEngine.check(actor, Action::Change, Resource::TrainingRecord)?;
    let existing = find(db, id).await?;
    let (employee_id, program_id) = (existing.employee_id, existing.training_program_id);
    let mut model: training_record::ActiveModel = existing.into();
    if let Some(date) = patch.completion_date {
        let completed = completion_date(date, today())?;
        ensure_unique(db, employee_id, program_id, completed, Some(id)).await?;
        model.completion_date = Set(completed);
    }
    if let Some(details) = patch.details {
        model.details = Set(optional_text("details", details.as_deref(), None)?);
    }
    if let Some(verified) = patch.is_verified {
        model.is_verified = Set(verified);
    }
    model.updated_at = Set(now());
    let updated = model.update(db).await?;
    info!(record_id = %updated.id, verified = updated.is_verified, "training record updated");
    Ok(updated)
}

/// All records of one employee, newest first, each classified as of `as_of`.
#[instrument(name = "hr.records.employee_trainings", skip_all, fields(%employee_id))]
pub async fn employee_trainings(
    db: &DatabaseConnection,
    actor: &Principal,
    employee_id: Uuid,
    as_of: NaiveDate,
) -> ApiResult<Vec<EmployeeTraining>> {
    PolicyEngine.check(actor, Action::View, Resource::TrainingRecord)?;
    super::employees::find(db, employee_id).await?;
    let rows = training_record::Entity::find()
        .filter(training_record::Column::EmployeeId.eq(employee_id))
        .find_also_related(training_program::Entity)
        .order_by_desc(training_record::Column::CompletionDate)
        .all(db)
        .await?;

    let mut newest: HashMap<Uuid, NaiveDate> = HashMap::new();
    for (record, _) in &rows {
        newest
            .entry(record.training_program_id)
            .and_modify(|date| *date = (*date).max(record.completion_date))
            .or_insert(record.completion_date);
    }
    let mut seen_latest = HashSet::new();
    let mut trainings = Vec::with_capacity(rows.len());
    for (record, program) in rows {
        let Some(program) = program else {
            continue;
        };
        let is_newest = newest.get(&program.id) == Some(&record.completion_date)
            && seen_latest.insert(program.id);
        trainings.push(EmployeeTraining {
            assessment: assess(Some(record.completion_date), program.recurrence_years, as_of),
            superseded: !is_newest,
            record,
            program,
        });
    }
    Ok(trainings)
}

async fn ensure_unique(
    db: &DatabaseConnection,
    employee_id: Uuid,
    program_id: Uuid,
    completed: NaiveDate,
    exclude: Option<Uuid>,
) -> ApiResult<()> {
    let mut query = training_record::Entity::find()
        .filter(training_record::Column::EmployeeId.eq(employee_id))
        .filter(training_record::Column::TrainingProgramId.eq(program_id))
        .filter(training_record::Column::CompletionDate.eq(completed));
    if let Some(id) = exclude {
        query = query.filter(training_record::Column::Id.ne(id));
    }
    if query.count(db).await? > 0 {
        return Err(ApiError::conflict(
            "this training is already recorded for that date",
        ));
    }
    Ok(())
}
