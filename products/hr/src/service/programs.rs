use entity::training_program;
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, PolicyEngine, Principal, Resource};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Page, lower, name_taken, now, search_pattern};
use crate::validation::{PROGRAM_NAME_MAX, recurrence_years, required_text};

#[derive(Clone, Debug, Default)]
pub struct ProgramInput {
    pub name: String,
    pub recurrence_years: Option<i32>,
}

#[derive(Clone, Debug, Default)]
pub struct ProgramPatch {
    pub name: Option<String>,
    pub recurrence_years: Option<Option<i32>>,
}

#[instrument(name = "hr.programs.list", skip_all)]
pub async fn list(
    db: &DatabaseConnection,
    actor: &Principal,
    q: Option<&str>,
    page: Page,
) -> ApiResult<Vec<training_program::Model>> {
    PolicyEngine.check(actor, Action::View, Resource::TrainingProgram)?;
    let mut query = training_program::Entity::find();
    if let Some(pattern) = search_pattern(q) {
        query = query.filter(lower(training_program::Column::Name).like(pattern));
    }
    Ok(query
        .order_by_asc(training_program::Column::Name)
        .limit(page.limit)
        .offset(page.offset)
        .all(db)
        .await?)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
) -> ApiResult<training_program::Model> {
    PolicyEngine.check(actor, Action::View, Resource::TrainingProgram)?;
    find(db, id).await
}

pub(crate) async fn find(db: &DatabaseConnection, id: Uuid) -> ApiResult<training_program::Model> {
    training_program::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("training program"))
}

#[instrument(name = "hr.programs.create", skip_all, fields(user = %actor.username))]
pub async fn create(
    db: &DatabaseConnection,
    actor: &Principal,
    input: ProgramInput,
) -> ApiResult<training_program::Model> {
    PolicyEngine.check(actor, Action::Add, Resource::TrainingProgram)?;
    let name = required_text("name", &input.name, PROGRAM_NAME_MAX)?;
    let recurrence = recurrence_years(input.recurrence_years)?;
    ensure_unique(db, &name, None).await?;
    let now = now();
    let model = training_program::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        recurrence_years: Set(recurrence),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(
        program_id = %model.id,
        name = %model.name,
        recurrence = ?model.recurrence_years,
        "training program created"
    );
    Ok(model)
}

#[instrument(name = "hr.programs.update", skip_all, fields(user = %actor.username, %id))]
pub async fn update(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
    patch: ProgramPatch,
) -> ApiResult<training_program::Model> {
    PolicyEngine.check(actor, Action::Change, Resource::TrainingProgram)?;
    let mut model: training_program::ActiveModel = find(db, id).await?.into();
    if let Some(name) = patch.name {
        let name = required_text("name", &name, PROGRAM_NAME_MAX)?;
        ensure_unique(db, &name, Some(id)).await?;
        model.name = Set(name);
    }
    if let Some(recurrence) = patch.recurrence_years {
        model.recurrence_years = Set(recurrence_years(recurrence)?);
    }
    model.updated_at = Set(now());
    let updated = model.update(db).await?;
    info!(program_id = %updated.id, "training program updated");
    Ok(updated)
}

async fn ensure_unique(
    db: &DatabaseConnection,
    name: &str,
    exclude: Option<Uuid>,
) -> ApiResult<()> {
    if name_taken::<training_program::Entity, _>(
        db,
        training_program::Column::Name,
        training_program::Column::Id,
        name,
        exclude,
    )
    .await?
    {
        return Err(ApiError::conflict(format!(
            "training program \"{name}\" already exists"
        )));
    }
    Ok(())
}
