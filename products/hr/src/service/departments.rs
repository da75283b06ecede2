use entity::department;
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, PolicyEngine, Principal, Resource};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Page, lower, name_taken, now, search_pattern};
use crate::validation::{DEPARTMENT_NAME_MAX, optional_text, required_text};

#[derive(Clone, Debug, Default)]
pub struct DepartmentInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct DepartmentPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

#[instrument(name = "hr.departments.list", skip_all, fields(has_q = q.is_some()))]
pub async fn list(
    db: &DatabaseConnection,
    actor: &Principal,
    q: Option<&str>,
    page: Page,
) -> ApiResult<Vec<department::Model>> {
    PolicyEngine.check(actor, Action::View, Resource::Department)?;
    let mut query = department::Entity::find();
    if let Some(pattern) = search_pattern(q) {
        query = query.filter(lower(department::Column::Name).like(pattern));
    }
    Ok(query
        .order_by_asc(department::Column::Name)
        .limit(page.limit)
        .offset(page.offset)
        .all(db)
        .await?)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
) -> ApiResult<department::Model> {
    PolicyEngine.check(actor, Action::View, Resource::Department)?;
    find(db, id).await
}

pub(crate) async fn find(db: &DatabaseConnection, id: Uuid) -> ApiResult<department::Model> {
    department::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("department"))
}

#[instrument(name = "hr.departments.create", skip_all, fields(user = %actor.username))]
pub async fn create(
    db: &DatabaseConnection,
    actor: &Principal,
    input: DepartmentInput,
) -> ApiResult<department::Model> {
    PolicyEngine.check(actor, Action::Add, Resource::Department)?;
    let name = required_text("name", &input.name, DEPARTMENT_NAME_MAX)?;
    let description = optional_text("description", input.description.as_deref(), None)?;
    ensure_unique(db, &name, None).await?;
    let now = now();
    let model = department::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(description),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(department_id = %model.id, name = %model.name, "department created");
    Ok(model)
}

#[instrument(name = "hr.departments.update", skip_all, fields(user = %actor.username, %id))]
pub async fn update(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
    patch: DepartmentPatch,
) -> ApiResult<department::Model> {
    PolicyEngine.check(actor, Action::Change, Resource::Department)?;
    let existing = find(db, id).await?;
    let mut model: department::ActiveModel = existing.into();
    if let Some(name) = patch.name {
        let name = required_text("name", &name, DEPARTMENT_NAME_MAX)?;
        ensure_unique(db, &name, Some(id)).await?;
        model.name = Set(name);
    }
    if let Some(description) = patch.description {
        model.description = Set(optional_text("description", description.as_deref(), None)?);
    }
    model.updated_at = Set(now());
    let updated = model.update(db).await?;
    info!(department_id = %updated.id, "department updated");
    Ok(updated)
}

async fn ensure_unique(
    db: &DatabaseConnection,
    name: &str,
    exclude: Option<Uuid>,
) -> ApiResult<()> {
    if name_taken::<department::Entity, _>(
        db,
        department::Column::Name,
        department::Column::Id,
        name,
        exclude,
    )
    .await?
    {
        return Err(ApiError::conflict(format!(
            "department \"{name}\" already exists"
        )));
    }
    Ok(())
}
