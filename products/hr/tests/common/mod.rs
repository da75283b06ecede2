#![allow(dead_code)]

use std::sync::Arc;

use async_graphql::{Request, Response, ServerError, Value as GqlValue, Variables};
use migration::{Migrator, MigratorTrait};
use platform_authn::AuthConfig;
use platform_authz::{Principal, Role};
use products_hr::schema::{HrSchema, build_schema};
use products_hr::service::users::{self, NewUser};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;

pub const PASSWORD: &str = "correct horse";

pub struct TestEnv {
    pub db: Arc<DatabaseConnection>,
    pub schema: HrSchema,
    pub auth: Arc<AuthConfig>,
    pub admin: Principal,
    pub moderator: Principal,
    pub editor: Principal,
    pub viewer: Principal,
}

pub async fn setup() -> TestEnv {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&conn, None).await.unwrap();
    let db = Arc::new(conn);
    let auth = Arc::new(AuthConfig::new(vec![7u8; 32], 60));
    let admin = provision(&db, "admin", Role::Admin).await;
    let moderator = provision(&db, "mto", Role::Moderator).await;
    let editor = provision(&db, "ok", Role::Editor).await;
    let viewer = provision(&db, "viewer", Role::Viewer).await;
    let schema = build_schema(db.clone(), auth.clone());
    TestEnv {
        db,
        schema,
        auth,
        admin,
        moderator,
        editor,
        viewer,
    }
}

pub async fn provision(db: &DatabaseConnection, username: &str, role: Role) -> Principal {
    let (user, roles) = users::provision(
        db,
        NewUser {
            username: username.into(),
            display_name: format!("{username} account"),
            password: PASSWORD.into(),
            roles: vec![role],
        },
    )
    .await
    .unwrap();
    Principal {
        user_id: user.id,
        username: user.username,
        roles,
    }
}

impl TestEnv {
    pub async fn exec(&self, actor: Option<&Principal>, query: &str, vars: Value) -> Response {
        let mut request = Request::new(query).variables(Variables::from_json(vars));
        if let Some(actor) = actor {
            request = request.data(actor.clone());
        }
        self.schema.execute(request).await
    }

    /// Run and return the `data` as JSON, panicking on GraphQL errors.
    pub async fn ok(&self, actor: &Principal, query: &str, vars: Value) -> Value {
        let response = self.exec(Some(actor), query, vars).await;
        assert!(response.errors.is_empty(), "unexpected errors: {:?}", response.errors);
        response.data.into_json().unwrap()
    }
}

pub fn has_error_code(errors: &[ServerError], code: &str) -> bool {
    errors.iter().any(|err| {
        err.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .is_some_and(|value| *value == GqlValue::from(code))
    })
}
