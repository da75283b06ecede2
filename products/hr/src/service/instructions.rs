use async_graphql::Enum;
use entity::instruction;
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, PolicyEngine, Principal, Resource};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Page, lower, name_taken, now, search_pattern};
use crate::validation::{CATEGORY_MAX, INSTRUCTION_TITLE_MAX, optional_text, required_text};

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Enum, Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum InstructionOrder {
    #[default]
    TitleAsc,
    TitleDesc,
    CategoryAsc,
    CategoryDesc,
}

impl InstructionOrder {
    fn apply(self, query: Select<instruction::Entity>) -> Select<instruction::Entity> {
        match self {
            InstructionOrder::TitleAsc => query.order_by_asc(instruction::Column::Title),
            InstructionOrder::TitleDesc => query.order_by_desc(instruction::Column::Title),
            InstructionOrder::CategoryAsc => query
                .order_by_asc(instruction::Column::Category)
                .order_by_asc(instruction::Column::Title),
            InstructionOrder::CategoryDesc => query
                .order_by_desc(instruction::Column::Category)
                .order_by_asc(instruction::Column::Title),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct InstructionInput {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct InstructionPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

#[instrument(name = "hr.instructions.list", skip_all)]
pub async fn list(
    db: &DatabaseConnection,
    actor: &Principal,
    q: Option<&str>,
    category: Option<&str>,
    order: InstructionOrder,
    page: Page,
) -> ApiResult<Vec<instruction::Model>> {
    PolicyEngine.check(actor, Action::View, Resource::Instruction)?;
    let mut query = instruction::Entity::find();
    if let Some(pattern) = search_pattern(q) {
        query = query.filter(lower(instruction::Column::Title).like(pattern));
    }
    if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
        query = query.filter(instruction::Column::Category.eq(category));
    }
    Ok(order
        .apply(query)
        .limit(page.limit)
        .offset(page.offset)
        .all(db)
        .await?)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
) -> ApiResult<instruction::Model> {
    PolicyEngine.check(actor, Action::View, Resource::Instruction)?;
    instruction::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("instruction"))
}

#[instrument(name = "hr.instructions.create", skip_all, fields(user = %actor.username))]
pub async fn create(
    db: &DatabaseConnection,
    actor: &Principal,
    input: InstructionInput,
) -> ApiResult<instruction::Model> {
    PolicyEngine.check(actor, Action::Add, Resource::Instruction)?;
    let title = required_text("title", &input.title, INSTRUCTION_TITLE_MAX)?;
    let content = required_text("content", &input.content, usize::MAX)?;
    let category = optional_text("category", input.category.as_deref(), Some(CATEGORY_MAX))?
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    ensure_unique(db, &title, None).await?;
    let now = now();
    let model = instruction::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        content: Set(content),
        category: Set(category),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(instruction_id = %model.id, title = %model.title, "instruction created");
    Ok(model)
}

#[instrument(name = "hr.instructions.update", skip_all, fields(user = %actor.username, %id))]
pub async fn update(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
    patch: InstructionPatch,
) -> ApiResult<instruction::Model> {
    PolicyEngine.check(actor, Action::Change, Resource::Instruction)?;
    let existing = get(db, actor, id).await?;
    let mut model: instruction::ActiveModel = existing.into();
    if let Some(title) = patch.title {
        let title = required_text("title", &title, INSTRUCTION_TITLE_MAX)?;
        ensure_unique(db, &title, Some(id)).await?;
        model.title = Set(title);
    }
    if let Some(content) = patch.content {
        model.content = Set(required_text("content", &content, usize::MAX)?);
    }
    if let Some(category) = patch.category {
        let category = optional_text("category", Some(category.as_str()), Some(CATEGORY_MAX))?
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        model.category = Set(category);
    }
    model.updated_at = Set(now());
    let updated = model.update(db).await?;
    info!(instruction_id = %updated.id, "instruction updated");
    Ok(updated)
}

#[instrument(name = "hr.instructions.delete", skip_all, fields(user = %actor.username, %id))]
pub async fn delete(db: &DatabaseConnection, actor: &Principal, id: Uuid) -> ApiResult<bool> {
    PolicyEngine.check(actor, Action::Delete, Resource::Instruction)?;
    let result = instruction::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("instruction"));
    }
    info!(instruction_id = %id, "instruction deleted");
    Ok(true)
}

async fn ensure_unique(
    db: &DatabaseConnection,
    title: &str,
    exclude: Option<Uuid>,
) -> ApiResult<()> {
    if name_taken::<instruction::Entity, _>(
        db,
        instruction::Column::Title,
        instruction::Column::Id,
        title,
        exclude,
    )
    .await?
    {
        return Err(ApiError::conflict(format!(
            "instruction \"{title}\" already exists"
        )));
    }
    Ok(())
}
