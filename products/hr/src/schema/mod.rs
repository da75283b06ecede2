//! GraphQL surface of the HR product. Resolvers only translate arguments and
//! delegate to [`crate::service`], which owns authorization and validation.

pub mod inputs;
pub mod nodes;

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, Error, ErrorExtensions, ID, Object, Schema};
use entity::deletion_request::TargetKind;
use platform_api::{ApiError, GraphqlResultExt};
use platform_authn::{AuthConfig, SESSION_COOKIE, issue_token};
use platform_authz::{Action, Principal, Resource};
use sea_orm::DatabaseConnection;
use tracing::instrument;
use uuid::Uuid;

use self::inputs::*;
use self::nodes::*;
use crate::moderation::ReviewDecision;
use crate::report::{self, TrainingReport};
use crate::service::{
    self, Page,
    deletions::DeletionRequestFilter,
    instructions::InstructionOrder,
    users::{self, LoginOutcome},
};

pub type HrSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Standalone schema with only the `hr` namespace; the server merges its own roots.
pub fn build_schema(db: Arc<DatabaseConnection>, auth: Arc<AuthConfig>) -> HrSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(db)
        .data(auth)
        .finish()
}

#[derive(Default)]
pub struct QueryRoot;

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl QueryRoot {
    async fn hr(&self) -> HrQuery {
        HrQuery
    }
}

#[Object]
impl MutationRoot {
    async fn hr(&self) -> HrMutation {
        HrMutation
    }
}

#[derive(Default)]
pub struct HrQuery;

#[derive(Default)]
pub struct HrMutation;

pub(crate) fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing database connection"))
}

fn auth_config(ctx: &Context<'_>) -> async_graphql::Result<Arc<AuthConfig>> {
    ctx.data::<Arc<AuthConfig>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing auth configuration"))
}

/// The caller attached by the HTTP layer.
pub(crate) fn principal(ctx: &Context<'_>) -> async_graphql::Result<Principal> {
    ctx.data::<Principal>()
        .cloned()
        .map_err(|_| ApiError::Unauthenticated.into_graphql())
}

pub(crate) fn parse_uuid(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| error_with_code("BAD_REQUEST", "Invalid ID"))
}

fn error_with_code(code: &'static str, message: &'static str) -> Error {
    Error::new(message).extend_with(|_, e| e.set("code", code))
}

fn page(first: Option<i32>, offset: Option<i32>) -> async_graphql::Result<Page> {
    Page::new(first, offset).gql()
}

fn session_cookie(token: &str, ttl_minutes: i64) -> String {
    if ttl_minutes <= 0 || token.is_empty() {
        format!("{SESSION_COOKIE}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax")
    } else {
        format!(
            "{SESSION_COOKIE}={token}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            ttl_minutes * 60
        )
    }
}

#[Object]
impl HrQuery {
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<MePayload> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let user = service::users::current(db.as_ref(), &actor).await.gql()?;
        Ok(MePayload {
            roles: actor.roles.iter().map(|r| r.as_str().to_string()).collect(),
            can_delete_directly: actor.can(Action::Delete, Resource::Employee),
            can_review_deletions: actor.can(Action::ReviewDeletion, Resource::DeletionRequest),
            user: UserNode::from_model(user, &actor.roles),
        })
    }

    #[instrument(name = "graphql.hr.employees", skip_all)]
    async fn employees(
        &self,
        ctx: &Context<'_>,
        filter: Option<EmployeeFilterInput>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<EmployeeNode>> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let filter = filter.unwrap_or_default().into_filter()?;
        let rows = service::employees::list(db.as_ref(), &actor, filter, page(first, offset)?)
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn employee(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<EmployeeNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::employees::get(db.as_ref(), &actor, parse_uuid(&id)?)
            .await
            .gql()?;
        Ok(model.into())
    }

    async fn departments(
        &self,
        ctx: &Context<'_>,
        q: Option<String>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<DepartmentNode>> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let rows =
            service::departments::list(db.as_ref(), &actor, q.as_deref(), page(first, offset)?)
                .await
                .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn department(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<DepartmentNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::departments::get(db.as_ref(), &actor, parse_uuid(&id)?)
            .await
            .gql()?;
        Ok(model.into())
    }

    async fn positions(
        &self,
        ctx: &Context<'_>,
        filter: Option<PositionFilterInput>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<PositionNode>> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let rows = service::positions::list(
            db.as_ref(),
            &actor,
            filter.unwrap_or_default().into(),
            page(first, offset)?,
        )
        .await
        .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn position(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<PositionNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::positions::get(db.as_ref(), &actor, parse_uuid(&id)?)
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "trainingPrograms")]
    async fn training_programs(
        &self,
        ctx: &Context<'_>,
        q: Option<String>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<TrainingProgramNode>> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let rows = service::programs::list(db.as_ref(), &actor, q.as_deref(), page(first, offset)?)
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[graphql(name = "trainingProgram")]
    async fn training_program(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<TrainingProgramNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::programs::get(db.as_ref(), &actor, parse_uuid(&id)?)
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "trainingRecords")]
    async fn training_records(
        &self,
        ctx: &Context<'_>,
        filter: Option<TrainingRecordFilterInput>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<TrainingRecordNode>> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let filter = filter.unwrap_or_default().into_filter()?;
        let rows = service::records::list(db.as_ref(), &actor, filter, page(first, offset)?)
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[graphql(name = "employeeTrainings")]
    async fn employee_trainings(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "employeeId")] employee_id: ID,
        #[graphql(name = "asOf")] as_of: Option<chrono::NaiveDate>,
    ) -> async_graphql::Result<Vec<EmployeeTrainingNode>> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let rows = service::records::employee_trainings(
            db.as_ref(),
            &actor,
            parse_uuid(&employee_id)?,
            as_of.unwrap_or_else(service::today),
        )
        .await
        .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[graphql(name = "trainingReport")]
    #[instrument(name = "graphql.hr.training_report", skip_all)]
    async fn training_report(
        &self,
        ctx: &Context<'_>,
        filter: Option<ReportFilterInput>,
    ) -> async_graphql::Result<TrainingReport> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let filter = filter.unwrap_or_default().into_filter()?;
        report::training_report(db.as_ref(), &actor, filter)
            .await
            .gql()
    }

    #[graphql(name = "deletionRequests")]
    async fn deletion_requests(
        &self,
        ctx: &Context<'_>,
        status: Option<DeletionStatus>,
        #[graphql(name = "targetKind")] target_kind: Option<DeletionTarget>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<DeletionRequestNode>> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let filter = DeletionRequestFilter {
            status: status.map(Into::into),
            target_kind: target_kind.map(Into::into),
        };
        let rows = service::deletions::list(db.as_ref(), &actor, filter, page(first, offset)?)
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[graphql(name = "deletionRequest")]
    async fn deletion_request(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<DeletionRequestNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::deletions::get(db.as_ref(), &actor, parse_uuid(&id)?)
            .await
            .gql()?;
        Ok(model.into())
    }

    async fn instructions(
        &self,
        ctx: &Context<'_>,
        q: Option<String>,
        category: Option<String>,
        #[graphql(default)] order: InstructionOrder,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<InstructionNode>> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let rows = service::instructions::list(
            db.as_ref(),
            &actor,
            q.as_deref(),
            category.as_deref(),
            order,
            page(first, offset)?,
        )
        .await
        .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn instruction(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<InstructionNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::instructions::get(db.as_ref(), &actor, parse_uuid(&id)?)
            .await
            .gql()?;
        Ok(model.into())
    }

    async fn users(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<UserNode>> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let rows = service::users::list(db.as_ref(), &actor, page(first, offset)?)
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

impl HrMutation {
    async fn delete(
        ctx: &Context<'_>,
        kind: TargetKind,
        id: &ID,
        reason: Option<String>,
    ) -> async_graphql::Result<DeletionOutcomeNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let target_id = parse_uuid(id)?;
        let outcome =
            service::deletions::delete_or_request(db.as_ref(), &actor, kind, target_id, reason)
                .await
                .gql()?;
        Ok(outcome.into())
    }
}

#[Object]
impl HrMutation {
    #[instrument(name = "graphql.hr.login", skip_all)]
    async fn login(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> async_graphql::Result<AuthPayload> {
        let db = database(ctx)?;
        let auth = auth_config(ctx)?;
        match users::authenticate(db.as_ref(), &username, &password)
            .await
            .gql()?
        {
            LoginOutcome::Success((user, roles)) => {
                let role_names: Vec<String> =
                    roles.iter().map(|r| r.as_str().to_string()).collect();
                let token = issue_token(user.id, &user.username, &role_names, auth.as_ref())
                    .map_err(|err| ApiError::internal(err.into()).into_graphql())?;
                ctx.append_http_header(
                    "Set-Cookie",
                    session_cookie(&token, auth.session_ttl_minutes),
                );
                Ok(AuthPayload {
                    ok: true,
                    token: Some(token),
                    user: Some(UserNode::from_model(user, &roles)),
                    error: None,
                })
            }
            LoginOutcome::InvalidCredentials => {
                Ok(AuthPayload::failed("invalid username or password"))
            }
            LoginOutcome::Disabled => Ok(AuthPayload::failed("account is disabled")),
        }
    }

    async fn logout(&self, ctx: &Context<'_>) -> bool {
        ctx.append_http_header("Set-Cookie", session_cookie("", 0));
        true
    }

    #[graphql(name = "createDepartment")]
    async fn create_department(
        &self,
        ctx: &Context<'_>,
        input: NewDepartmentInput,
    ) -> async_graphql::Result<DepartmentNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::departments::create(db.as_ref(), &actor, input.into())
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "updateDepartment")]
    async fn update_department(
        &self,
        ctx: &Context<'_>,
        input: UpdateDepartmentInput,
    ) -> async_graphql::Result<DepartmentNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let id = parse_uuid(&input.id)?;
        let model = service::departments::update(db.as_ref(), &actor, id, input.into())
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "deleteDepartment")]
    async fn delete_department(
        &self,
        ctx: &Context<'_>,
        id: ID,
        reason: Option<String>,
    ) -> async_graphql::Result<DeletionOutcomeNode> {
        Self::delete(ctx, TargetKind::Department, &id, reason).await
    }

    #[graphql(name = "createPosition")]
    async fn create_position(
        &self,
        ctx: &Context<'_>,
        input: NewPositionInput,
    ) -> async_graphql::Result<PositionNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::positions::create(db.as_ref(), &actor, input.into())
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "updatePosition")]
    async fn update_position(
        &self,
        ctx: &Context<'_>,
        input: UpdatePositionInput,
    ) -> async_graphql::Result<PositionNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let id = parse_uuid(&input.id)?;
        let model = service::positions::update(db.as_ref(), &actor, id, input.into())
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "deletePosition")]
    async fn delete_position(
        &self,
        ctx: &Context<'_>,
        id: ID,
        reason: Option<String>,
    ) -> async_graphql::Result<DeletionOutcomeNode> {
        Self::delete(ctx, TargetKind::Position, &id, reason).await
    }

    #[graphql(name = "createTrainingProgram")]
    async fn create_training_program(
        &self,
        ctx: &Context<'_>,
        input: NewTrainingProgramInput,
    ) -> async_graphql::Result<TrainingProgramNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::programs::create(db.as_ref(), &actor, input.into())
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "updateTrainingProgram")]
    async fn update_training_program(
        &self,
        ctx: &Context<'_>,
        input: UpdateTrainingProgramInput,
    ) -> async_graphql::Result<TrainingProgramNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let id = parse_uuid(&input.id)?;
        let model = service::programs::update(db.as_ref(), &actor, id, input.into())
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "deleteTrainingProgram")]
    async fn delete_training_program(
        &self,
        ctx: &Context<'_>,
        id: ID,
        reason: Option<String>,
    ) -> async_graphql::Result<DeletionOutcomeNode> {
        Self::delete(ctx, TargetKind::TrainingProgram, &id, reason).await
    }

    #[graphql(name = "createEmployee")]
    #[instrument(name = "graphql.hr.create_employee", skip_all)]
    async fn create_employee(
        &self,
        ctx: &Context<'_>,
        input: NewEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::employees::create(db.as_ref(), &actor, input.into_draft()?)
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "updateEmployee")]
    async fn update_employee(
        &self,
        ctx: &Context<'_>,
        input: UpdateEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let (id, patch) = input.into_patch()?;
        let model = service::employees::update(db.as_ref(), &actor, id, patch)
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "deleteEmployee")]
    async fn delete_employee(
        &self,
        ctx: &Context<'_>,
        id: ID,
        reason: Option<String>,
    ) -> async_graphql::Result<DeletionOutcomeNode> {
        Self::delete(ctx, TargetKind::Employee, &id, reason).await
    }

    #[graphql(name = "createTrainingRecord")]
    async fn create_training_record(
        &self,
        ctx: &Context<'_>,
        input: NewTrainingRecordInput,
    ) -> async_graphql::Result<TrainingRecordNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::records::create(db.as_ref(), &actor, input.into_input()?)
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "updateTrainingRecord")]
    async fn update_training_record(
        &self,
        ctx: &Context<'_>,
        input: UpdateTrainingRecordInput,
    ) -> async_graphql::Result<TrainingRecordNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let id = parse_uuid(&input.id)?;
        let model = service::records::update(db.as_ref(), &actor, id, input.into())
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "deleteTrainingRecord")]
    async fn delete_training_record(
        &self,
        ctx: &Context<'_>,
        id: ID,
        reason: Option<String>,
    ) -> async_graphql::Result<DeletionOutcomeNode> {
        Self::delete(ctx, TargetKind::TrainingRecord, &id, reason).await
    }

    #[graphql(name = "reviewDeletionRequest")]
    async fn review_deletion_request(
        &self,
        ctx: &Context<'_>,
        id: ID,
        decision: ReviewDecision,
    ) -> async_graphql::Result<DeletionRequestNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::deletions::review(db.as_ref(), &actor, parse_uuid(&id)?, decision)
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "createInstruction")]
    async fn create_instruction(
        &self,
        ctx: &Context<'_>,
        input: NewInstructionInput,
    ) -> async_graphql::Result<InstructionNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let model = service::instructions::create(db.as_ref(), &actor, input.into())
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "updateInstruction")]
    async fn update_instruction(
        &self,
        ctx: &Context<'_>,
        input: UpdateInstructionInput,
    ) -> async_graphql::Result<InstructionNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let id = parse_uuid(&input.id)?;
        let model = service::instructions::update(db.as_ref(), &actor, id, input.into())
            .await
            .gql()?;
        Ok(model.into())
    }

    #[graphql(name = "deleteInstruction")]
    async fn delete_instruction(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        service::instructions::delete(db.as_ref(), &actor, parse_uuid(&id)?)
            .await
            .gql()
    }

    #[graphql(name = "createUser")]
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        input: NewUserInput,
    ) -> async_graphql::Result<UserNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let created = service::users::create(db.as_ref(), &actor, input.into_new_user()?)
            .await
            .gql()?;
        Ok(created.into())
    }

    #[graphql(name = "updateUser")]
    async fn update_user(
        &self,
        ctx: &Context<'_>,
        input: UpdateUserInput,
    ) -> async_graphql::Result<UserNode> {
        let actor = principal(ctx)?;
        let db = database(ctx)?;
        let (id, patch) = input.into_patch()?;
        let updated = service::users::update(db.as_ref(), &actor, id, patch)
            .await
            .gql()?;
        Ok(updated.into())
    }
}
