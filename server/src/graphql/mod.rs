use std::sync::Arc;

use async_graphql::{EmptySubscription, MergedObject, Object, Schema, SimpleObject};
use platform_api::ApiResult;
use platform_authn::AuthConfig;
use products_hr::schema::{MutationRoot, QueryRoot as HrRoot};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::instrument;

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

#[derive(MergedObject, Default)]
pub struct QueryRoot(SystemQuery, HrRoot);

pub fn build_schema(db: Arc<DatabaseConnection>, auth: Arc<AuthConfig>) -> SchemaType {
    Schema::build(QueryRoot::default(), MutationRoot, EmptySubscription)
        .data(db)
        .data(auth)
        .finish()
}

/// SDL of the full schema, as served.
pub fn schema_sdl() -> String {
    Schema::build(QueryRoot::default(), MutationRoot, EmptySubscription)
        .finish()
        .sdl()
}

#[derive(Default)]
pub struct SystemQuery;

#[Object]
impl SystemQuery {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> ApiResult<HealthPayload> {
        Ok(HealthPayload { ok: true })
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> ApiResult<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct HealthPayload {
    pub ok: bool,
}
