use entity::position;
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, PolicyEngine, Principal, Resource};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Page, lower, name_taken, now, search_pattern};
use crate::validation::{POSITION_NAME_MAX, required_text};

#[derive(Clone, Debug, Default)]
pub struct PositionInput {
    pub name: String,
    pub is_manager: bool,
    pub is_teacher: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PositionPatch {
    pub name: Option<String>,
    pub is_manager: Option<bool>,
    pub is_teacher: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct PositionFilter {
    pub q: Option<String>,
    pub is_manager: Option<bool>,
    pub is_teacher: Option<bool>,
}

#[instrument(name = "hr.positions.list", skip_all)]
pub async fn list(
    db: &DatabaseConnection,
    actor: &Principal,
    filter: PositionFilter,
    page: Page,
) -> ApiResult<Vec<position::Model>> {
    PolicyEngine.check(actor, Action::View, Resource::Position)?;
    let mut query = position::Entity::find();
    if let Some(pattern) = search_pattern(filter.q.as_deref()) {
        query = query.filter(lower(position::Column::Name).like(pattern));
    }
    if let Some(flag) = filter.is_manager {
        query = query.filter(position::Column::IsManager.eq(flag));
    }
    if let Some(flag) = filter.is_teacher {
        query = query.filter(position::Column::IsTeacher.eq(flag));
    }
    Ok(query
        .order_by_asc(position::Column::Name)
        .limit(page.limit)
        .offset(page.offset)
        .all(db)
        .await?)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
) -> ApiResult<position::Model> {
    PolicyEngine.check(actor, Action::View, Resource::Position)?;
    find(db, id).await
}

pub(crate) async fn find(db: &DatabaseConnection, id: Uuid) -> ApiResult<position::Model> {
    position::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("position"))
}

#[instrument(name = "hr.positions.create", skip_all, fields(user = %actor.username))]
pub async fn create(
    db: &DatabaseConnection,
    actor: &Principal,
    input: PositionInput,
) -> ApiResult<position::Model> {
    PolicyEngine.check(actor, Action::Add, Resource::Position)?;
    let name = required_text("name", &input.name, POSITION_NAME_MAX)?;
    ensure_unique(db, &name, None).await?;
    let now = now();
    let model = position::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        is_manager: Set(input.is_manager),
        is_teacher: Set(input.is_teacher),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(position_id = %model.id, name = %model.name, "position created");
    Ok(model)
}

#[instrument(name = "hr.positions.update", skip_all, fields(user = %actor.username, %id))]
pub async fn update(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
    patch: PositionPatch,
) -> ApiResult<position::Model> {
    PolicyEngine.check(actor, Action::Change, Resource::Position)?;
    let mut model: position::ActiveModel = find(db, id).await?.into();
    if let Some(name) = patch.name {
        let name = required_text("name", &name, POSITION_NAME_MAX)?;
        ensure_unique(db, &name, Some(id)).await?;
        model.name = Set(name);
    }
    if let Some(flag) = patch.is_manager {
        model.is_manager = Set(flag);
    }
    if let Some(flag) = patch.is_teacher {
        model.is_teacher = Set(flag);
    }
    model.updated_at = Set(now());
    let updated = model.update(db).await?;
    info!(position_id = %updated.id, "position updated");
    Ok(updated)
}

async fn ensure_unique(
    db: &DatabaseConnection,
    name: &str,
    exclude: Option<Uuid>,
) -> ApiResult<()> {
    if name_taken::<position::Entity, _>(
        db,
        position::Column::Name,
        position::Column::Id,
        name,
        exclude,
    )
    .await?
    {
        return Err(ApiError::conflict(format!("position \"{name}\" already exists")));
    }
    Ok(())
}
