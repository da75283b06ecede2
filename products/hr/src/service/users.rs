use std::collections::HashMap;

use entity::{app_user, user_role, user_secret};
use platform_api::{ApiError, ApiResult};
use platform_authn::{hash_password, verify_password};
use platform_authz::{Action, PolicyEngine, Principal, Resource, Role};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{Page, now};
use crate::validation::{self, DISPLAY_NAME_MAX, USERNAME_MAX, required_text};

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub roles: Vec<Role>,
}

#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub display_name: Option<String>,
    pub roles: Option<Vec<Role>>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

pub type UserWithRoles = (app_user::Model, Vec<Role>);

#[derive(Clone, Debug)]
pub enum LoginOutcome {
    Success(UserWithRoles),
    InvalidCredentials,
    Disabled,
}

pub fn to_entity_role(role: Role) -> user_role::Role {
    match role {
        Role::Admin => user_role::Role::Admin,
        Role::Moderator => user_role::Role::Moderator,
        Role::Editor => user_role::Role::Editor,
        Role::Viewer => user_role::Role::Viewer,
    }
}

pub fn from_entity_role(role: user_role::Role) -> Role {
    match role {
        user_role::Role::Admin => Role::Admin,
        user_role::Role::Moderator => Role::Moderator,
        user_role::Role::Editor => Role::Editor,
        user_role::Role::Viewer => Role::Viewer,
    }
}

pub fn normalize_username(value: &str) -> ApiResult<String> {
    let username = required_text("username", &value.to_lowercase(), USERNAME_MAX)?;
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ApiError::validation(
            "username may only contain letters, digits, '.', '_' and '-'",
        ));
    }
    Ok(username)
}

fn dedup_roles(roles: Vec<Role>) -> ApiResult<Vec<Role>> {
    let mut unique = Vec::new();
    for role in roles {
        if !unique.contains(&role) {
            unique.push(role);
        }
    }
    if unique.is_empty() {
        return Err(ApiError::validation("at least one role is required"));
    }
    Ok(unique)
}

pub async fn roles_for<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> ApiResult<Vec<Role>> {
    let rows = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|row| from_entity_role(row.role)).collect())
}

/// Resolve a session subject into a principal; inactive or missing users are rejected.
pub async fn load_principal(db: &DatabaseConnection, user_id: Uuid) -> ApiResult<Principal> {
    let user = app_user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(ApiError::Unauthenticated)?;
    if !user.is_active {
        return Err(ApiError::Unauthenticated);
    }
    Ok(Principal {
        user_id: user.id,
        username: user.username,
        roles: roles_for(db, user_id).await?,
    })
}

/// Account row of the caller.
pub async fn current(db: &DatabaseConnection, actor: &Principal) -> ApiResult<app_user::Model> {
    app_user::Entity::find_by_id(actor.user_id)
        .one(db)
        .await?
        .ok_or(ApiError::Unauthenticated)
}

#[instrument(name = "hr.users.authenticate", skip_all)]
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> ApiResult<LoginOutcome> {
    let username = username.trim().to_lowercase();
    let Some(user) = app_user::Entity::find()
        .filter(app_user::Column::Username.eq(username.clone()))
        .one(db)
        .await?
    else {
        warn!(%username, "login failed: unknown user");
        return Ok(LoginOutcome::InvalidCredentials);
    };
    let Some(secret) = user_secret::Entity::find_by_id(user.id).one(db).await? else {
        warn!(%username, "login failed: no password set");
        return Ok(LoginOutcome::InvalidCredentials);
    };
    let matches = verify_password(password, &secret.password_hash)
        .map_err(|err| ApiError::internal(err.into()))?;
    if !matches {
        warn!(%username, "login failed: wrong password");
        return Ok(LoginOutcome::InvalidCredentials);
    }
    if !user.is_active {
        warn!(%username, "login refused: account disabled");
        return Ok(LoginOutcome::Disabled);
    }
    let roles = roles_for(db, user.id).await?;
    info!(%username, "user logged in");
    Ok(LoginOutcome::Success((user, roles)))
}

#[instrument(name = "hr.users.list", skip_all)]
pub async fn list(
    db: &DatabaseConnection,
    actor: &Principal,
    page: Page,
) -> ApiResult<Vec<UserWithRoles>> {
    PolicyEngine.check(actor, Action::View, Resource::User)?;
    let users = app_user::Entity::find()
        .order_by_asc(app_user::Column::Username)
        .limit(page.limit)
        .offset(page.offset)
        .all(db)
        .await?;
    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let mut roles: HashMap<Uuid, Vec<Role>> = HashMap::new();
    if !ids.is_empty() {
        for row in user_role::Entity::find()
            .filter(user_role::Column::UserId.is_in(ids))
            .all(db)
            .await?
        {
            roles
                .entry(row.user_id)
                .or_default()
                .push(from_entity_role(row.role));
        }
    }
    Ok(users
        .into_iter()
        .map(|user| {
            let granted = roles.remove(&user.id).unwrap_or_default();
            (user, granted)
        })
        .collect())
}

/// Create an account on behalf of an administrator.
pub async fn create(
    db: &DatabaseConnection,
    actor: &Principal,
    input: NewUser,
) -> ApiResult<UserWithRoles> {
    PolicyEngine.check(actor, Action::ManageUsers, Resource::User)?;
    let created = provision(db, input).await?;
    info!(user = %created.0.username, by = %actor.username, "user created");
    Ok(created)
}

/// Create an account without an acting principal (CLI bootstrap, seeding).
pub async fn provision(db: &DatabaseConnection, input: NewUser) -> ApiResult<UserWithRoles> {
    let username = normalize_username(&input.username)?;
    let display_name = required_text("displayName", &input.display_name, DISPLAY_NAME_MAX)?;
    validation::password(&input.password)?;
    let roles = dedup_roles(input.roles)?;
    let exists = app_user::Entity::find()
        .filter(app_user::Column::Username.eq(username.clone()))
        .one(db)
        .await?
        .is_some();
    if exists {
        return Err(ApiError::conflict(format!("user {username} already exists")));
    }
    let password_hash =
        hash_password(&input.password).map_err(|err| ApiError::internal(err.into()))?;

    let now = now();
    let txn = db.begin().await?;
    let user = app_user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        display_name: Set(display_name),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    user_secret::ActiveModel {
        user_id: Set(user.id),
        password_hash: Set(password_hash),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    insert_roles(&txn, user.id, &roles).await?;
    txn.commit().await?;
    Ok((user, roles))
}

#[instrument(name = "hr.users.update", skip_all, fields(user = %actor.username, %id))]
pub async fn update(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
    patch: UserPatch,
) -> ApiResult<UserWithRoles> {
    PolicyEngine.check(actor, Action::ManageUsers, Resource::User)?;
    if id == actor.user_id {
        if patch.is_active == Some(false) {
            return Err(ApiError::validation("cannot deactivate your own account"));
        }
        if patch
            .roles
            .as_ref()
            .is_some_and(|roles| !roles.contains(&Role::Admin))
        {
            return Err(ApiError::validation("cannot remove your own admin role"));
        }
    }
    let existing = app_user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;
    let display_name = patch
        .display_name
        .map(|name| required_text("displayName", &name, DISPLAY_NAME_MAX))
        .transpose()?;
    let roles = patch.roles.map(dedup_roles).transpose()?;
    let password_hash = match patch.password {
        Some(password) => {
            validation::password(&password)?;
            Some(hash_password(&password).map_err(|err| ApiError::internal(err.into()))?)
        }
        None => None,
    };

    let now = now();
    let txn = db.begin().await?;
    let mut model: app_user::ActiveModel = existing.into();
    if let Some(name) = display_name {
        model.display_name = Set(name);
    }
    if let Some(active) = patch.is_active {
        model.is_active = Set(active);
    }
    model.updated_at = Set(now);
    let user = model.update(&txn).await?;
    if let Some(roles) = &roles {
        user_role::Entity::delete_many()
            .filter(user_role::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        insert_roles(&txn, id, roles).await?;
    }
    if let Some(hash) = password_hash {
        user_secret::Entity::delete_by_id(id).exec(&txn).await?;
        user_secret::ActiveModel {
            user_id: Set(id),
            password_hash: Set(hash),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
    }
    let granted = roles_for(&txn, id).await?;
    txn.commit().await?;
    info!(user = %user.username, active = user.is_active, "user updated");
    Ok((user, granted))
}

async fn insert_roles<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    roles: &[Role],
) -> ApiResult<()> {
    for role in roles {
        user_role::ActiveModel {
            user_id: Set(user_id),
            role: Set(to_entity_role(*role)),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}
