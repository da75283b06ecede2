use entity::{
    deletion_request::{self, Status, TargetKind},
    department, employee, position, training_program, training_record,
};
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, PolicyEngine, Principal, Resource};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::DateTimeWithTimeZone,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{Page, now};
use crate::moderation::{self, DeletionPlan, ReviewDecision};
use crate::validation::optional_text;

/// Result of a delete call: either the row is gone or a request awaits review.
#[derive(Clone, Debug)]
pub struct DeletionOutcome {
    pub deleted: bool,
    pub request: Option<deletion_request::Model>,
}

#[derive(Clone, Debug, Default)]
pub struct DeletionRequestFilter {
    pub status: Option<Status>,
    pub target_kind: Option<TargetKind>,
}

/// Human-readable label of a deletion target; `NOT_FOUND` if it does not exist.
pub async fn describe_target<C: ConnectionTrait>(
    conn: &C,
    kind: TargetKind,
    id: Uuid,
) -> ApiResult<String> {
    let label = match kind {
        TargetKind::Employee => employee::Entity::find_by_id(id)
            .one(conn)
            .await?
            .map(|model| model.full_name()),
        TargetKind::Department => department::Entity::find_by_id(id)
            .one(conn)
            .await?
            .map(|model| model.name),
        TargetKind::Position => position::Entity::find_by_id(id)
            .one(conn)
            .await?
            .map(|model| model.name),
        TargetKind::TrainingProgram => training_program::Entity::find_by_id(id)
            .one(conn)
            .await?
            .map(|model| model.name),
        TargetKind::TrainingRecord => match training_record::Entity::find_by_id(id)
            .one(conn)
            .await?
        {
            Some(record) => {
                let person = employee::Entity::find_by_id(record.employee_id)
                    .one(conn)
                    .await?
                    .map(|model| model.full_name())
                    .unwrap_or_default();
                let program = training_program::Entity::find_by_id(record.training_program_id)
                    .one(conn)
                    .await?
                    .map(|model| model.name)
                    .unwrap_or_default();
                Some(format!("{person} / {program} ({})", record.completion_date))
            }
            None => None,
        },
    };
    label.ok_or_else(|| ApiError::not_found(target_name(kind)))
}

fn target_name(kind: TargetKind) -> &'static str {
    moderation::resource_for(kind).as_str()
}

/// Remove the target row; `false` when it was already gone.
pub(crate) async fn delete_target<C: ConnectionTrait>(
    conn: &C,
    kind: TargetKind,
    id: Uuid,
) -> ApiResult<bool> {
    let result = match kind {
        TargetKind::Employee => employee::Entity::delete_by_id(id).exec(conn).await?,
        TargetKind::Department => department::Entity::delete_by_id(id).exec(conn).await?,
        TargetKind::Position => position::Entity::delete_by_id(id).exec(conn).await?,
        TargetKind::TrainingProgram => {
            training_program::Entity::delete_by_id(id).exec(conn).await?
        }
        TargetKind::TrainingRecord => {
            training_record::Entity::delete_by_id(id).exec(conn).await?
        }
    };
    Ok(result.rows_affected > 0)
}

/// Delete immediately when the caller may, otherwise file (or reuse) a pending request.
#[instrument(
    name = "hr.deletions.delete_or_request",
    skip_all,
    fields(user = %actor.username, kind = ?kind, %target_id)
)]
pub async fn delete_or_request(
    db: &DatabaseConnection,
    actor: &Principal,
    kind: TargetKind,
    target_id: Uuid,
    reason: Option<String>,
) -> ApiResult<DeletionOutcome> {
    let plan = moderation::plan_deletion(actor, moderation::resource_for(kind)).inspect_err(|_| {
        warn!(user = %actor.username, kind = ?kind, %target_id, "deletion denied");
    })?;
    let reason = optional_text("reason", reason.as_deref(), None)?;

    match plan {
        DeletionPlan::DeleteNow => {
            let now = now();
            let txn = db.begin().await?;
            let label = describe_target(&txn, kind, target_id).await?;
            deletion_request::Entity::update_many()
                .set(deletion_request::ActiveModel {
                    status: Set(Status::Approved),
                    reviewed_by: Set(Some(actor.user_id)),
                    reviewed_at: Set(Some(now)),
                    ..Default::default()
                })
                .filter(deletion_request::Column::TargetKind.eq(kind))
                .filter(deletion_request::Column::TargetId.eq(target_id))
                .filter(deletion_request::Column::Status.eq(Status::Pending))
                .exec(&txn)
                .await?;
            delete_target(&txn, kind, target_id).await?;
            txn.commit().await?;
            info!(%label, "record deleted directly");
            Ok(DeletionOutcome {
                deleted: true,
                request: None,
            })
        }
        DeletionPlan::FileRequest => {
            let label = describe_target(db, kind, target_id).await?;
            if let Some(existing) = pending_for(db, kind, target_id).await? {
                info!(request_id = %existing.id, "deletion already pending");
                return Ok(DeletionOutcome {
                    deleted: false,
                    request: Some(existing),
                });
            }
            let inserted = deletion_request::ActiveModel {
                id: Set(Uuid::new_v4()),
                target_kind: Set(kind),
                target_id: Set(target_id),
                target_label: Set(label),
                reason: Set(reason),
                status: Set(Status::Pending),
                requested_by: Set(Some(actor.user_id)),
                reviewed_by: Set(None),
                created_at: Set(now()),
                reviewed_at: Set(None),
            }
            .insert(db)
            .await;
            let request = match inserted.map_err(ApiError::from) {
                Ok(request) => request,
                // uq_deletion_request_pending: another editor filed first
                Err(ApiError::Conflict(message)) => {
                    let existing = pending_for(db, kind, target_id)
                        .await?
                        .ok_or(ApiError::Conflict(message))?;
                    info!(request_id = %existing.id, "deletion filed concurrently; reusing");
                    return Ok(DeletionOutcome {
                        deleted: false,
                        request: Some(existing),
                    });
                }
                Err(err) => return Err(err),
            };
            info!(request_id = %request.id, label = %request.target_label, "deletion requested");
            Ok(DeletionOutcome {
                deleted: false,
                request: Some(request),
            })
        }
    }
}

async fn pending_for<C: ConnectionTrait>(
    conn: &C,
    kind: TargetKind,
    target_id: Uuid,
) -> ApiResult<Option<deletion_request::Model>> {
    Ok(deletion_request::Entity::find()
        .filter(deletion_request::Column::TargetKind.eq(kind))
        .filter(deletion_request::Column::TargetId.eq(target_id))
        .filter(deletion_request::Column::Status.eq(Status::Pending))
        .one(conn)
        .await?)
}

/// Move a request out of `PENDING`. The update is guarded on the current
/// status, so of two concurrent reviews only one matches a row; the other
/// gets `CONFLICT`.
pub(crate) async fn claim_pending<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
    next: Status,
    reviewer: Uuid,
    at: DateTimeWithTimeZone,
) -> ApiResult<()> {
    let result = deletion_request::Entity::update_many()
        .set(deletion_request::ActiveModel {
            status: Set(next),
            reviewed_by: Set(Some(reviewer)),
            reviewed_at: Set(Some(at)),
            ..Default::default()
        })
        .filter(deletion_request::Column::Id.eq(request_id))
        .filter(deletion_request::Column::Status.eq(Status::Pending))
        .exec(conn)
        .await?;
    if result.rows_affected != 1 {
        return Err(ApiError::conflict("deletion request already reviewed"));
    }
    Ok(())
}

/// Approve (deleting the target) or reject a pending request.
#[instrument(
    name = "hr.deletions.review",
    skip_all,
    fields(user = %actor.username, %request_id, decision = ?decision)
)]
pub async fn review(
    db: &DatabaseConnection,
    actor: &Principal,
    request_id: Uuid,
    decision: ReviewDecision,
) -> ApiResult<deletion_request::Model> {
    if let Err(err) = PolicyEngine.check(actor, Action::ReviewDeletion, Resource::DeletionRequest) {
        warn!(user = %actor.username, %request_id, "deletion review denied");
        return Err(err.into());
    }

    let txn = db.begin().await?;
    let request = deletion_request::Entity::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found("deletion request"))?;
    let next = moderation::review(request.status, decision)?;
    let reviewed_at = now();
    claim_pending(&txn, request_id, next, actor.user_id, reviewed_at).await?;
    if next == Status::Approved {
        let removed = delete_target(&txn, request.target_kind, request.target_id).await?;
        if !removed {
            warn!(
                label = %request.target_label,
                "deletion target already gone; recording approval anyway"
            );
        }
    }
    txn.commit().await?;
    let updated = deletion_request::Model {
        status: next,
        reviewed_by: Some(actor.user_id),
        reviewed_at: Some(reviewed_at),
        ..request
    };
    info!(
        request_id = %updated.id,
        label = %updated.target_label,
        status = ?updated.status,
        "deletion request reviewed"
    );
    Ok(updated)
}

pub async fn list(
    db: &DatabaseConnection,
    actor: &Principal,
    filter: DeletionRequestFilter,
    page: Page,
) -> ApiResult<Vec<deletion_request::Model>> {
    PolicyEngine.check(actor, Action::View, Resource::DeletionRequest)?;
    let mut query = deletion_request::Entity::find();
    if let Some(status) = filter.status {
        query = query.filter(deletion_request::Column::Status.eq(status));
    }
    if let Some(kind) = filter.target_kind {
        query = query.filter(deletion_request::Column::TargetKind.eq(kind));
    }
    Ok(query
        .order_by_desc(deletion_request::Column::CreatedAt)
        .order_by_asc(deletion_request::Column::Id)
        .limit(page.limit)
        .offset(page.offset)
        .all(db)
        .await?)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &Principal,
    id: Uuid,
) -> ApiResult<deletion_request::Model> {
    PolicyEngine.check(actor, Action::View, Resource::DeletionRequest)?;
    deletion_request::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("deletion request"))
}

#[cfg(test)]
mod tests {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};

    use super::*;

    async fn db_with_department() -> (DatabaseConnection, Uuid) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let department_id = Uuid::new_v4();
        department::ActiveModel {
            id: Set(department_id),
            name: Set("Library".into()),
            description: Set(None),
            created_at: Set(now()),
            updated_at: Set(now()),
        }
        .insert(&db)
        .await
        .unwrap();
        (db, department_id)
    }

    async fn reviewer(db: &DatabaseConnection, username: &str) -> Uuid {
        let user = entity::app_user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.into()),
            display_name: Set(username.into()),
            is_active: Set(true),
            created_at: Set(now()),
            updated_at: Set(now()),
        }
        .insert(db)
        .await
        .unwrap();
        user.id
    }

    async fn file_pending(db: &DatabaseConnection, target_id: Uuid) -> ApiResult<Uuid> {
        let request = deletion_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            target_kind: Set(TargetKind::Department),
            target_id: Set(target_id),
            target_label: Set("Library".into()),
            reason: Set(None),
            status: Set(Status::Pending),
            requested_by: Set(None),
            reviewed_by: Set(None),
            created_at: Set(now()),
            reviewed_at: Set(None),
        }
        .insert(db)
        .await?;
        Ok(request.id)
    }

    #[tokio::test]
    async fn a_decided_request_cannot_be_claimed_again() {
        let (db, department_id) = db_with_department().await;
        let request_id = file_pending(&db, department_id).await.unwrap();
        let first = reviewer(&db, "mto").await;
        let second = reviewer(&db, "mto2").await;

        claim_pending(&db, request_id, Status::Approved, first, now())
            .await
            .unwrap();
        let err = claim_pending(&db, request_id, Status::Rejected, second, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)), "got {err:?}");

        let stored = deletion_request::Entity::find_by_id(request_id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, Status::Approved);
        assert_eq!(stored.reviewed_by, Some(first));
    }

    #[tokio::test]
    async fn only_one_open_request_per_target() {
        let (db, department_id) = db_with_department().await;
        let open = file_pending(&db, department_id).await.unwrap();

        let duplicate = file_pending(&db, department_id).await.unwrap_err();
        assert!(matches!(duplicate, ApiError::Conflict(_)), "got {duplicate:?}");

        let moderator = reviewer(&db, "mto").await;
        claim_pending(&db, open, Status::Rejected, moderator, now())
            .await
            .unwrap();
        file_pending(&db, department_id)
            .await
            .expect("a rejected request frees the target for a new one");
    }
}
