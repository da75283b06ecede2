//! Moderated deletion: editors file requests, moderators decide.
//!
//! A request is born `PENDING` and moves exactly once, to `APPROVED` or
//! `REJECTED`. Callers allowed to delete outright skip the request entirely.

use async_graphql::Enum;
use entity::deletion_request::{Status, TargetKind};
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, Principal, Resource};

#[derive(Enum, Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// Next status for a pending request, or `CONFLICT` if it was already decided.
pub fn review(current: Status, decision: ReviewDecision) -> ApiResult<Status> {
    match (current, decision) {
        (Status::Pending, ReviewDecision::Approve) => Ok(Status::Approved),
        (Status::Pending, ReviewDecision::Reject) => Ok(Status::Rejected),
        (Status::Approved | Status::Rejected, _) => {
            Err(ApiError::conflict("deletion request already reviewed"))
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeletionPlan {
    DeleteNow,
    FileRequest,
}

pub fn plan_deletion(principal: &Principal, resource: Resource) -> ApiResult<DeletionPlan> {
    if principal.can(Action::Delete, resource) {
        Ok(DeletionPlan::DeleteNow)
    } else if principal.can(Action::RequestDeletion, resource) {
        Ok(DeletionPlan::FileRequest)
    } else {
        Err(ApiError::forbidden(format!(
            "not allowed to delete {}",
            resource.as_str()
        )))
    }
}

pub fn resource_for(kind: TargetKind) -> Resource {
    match kind {
        TargetKind::Employee => Resource::Employee,
        TargetKind::Department => Resource::Department,
        TargetKind::Position => Resource::Position,
        TargetKind::TrainingProgram => Resource::TrainingProgram,
        TargetKind::TrainingRecord => Resource::TrainingRecord,
    }
}
