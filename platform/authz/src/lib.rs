//! Role-based authorization for the HR suite.
//!
//! Roles form a ladder (viewer, editor, moderator, admin). Each rung inherits
//! the grants of the one below it. Destructive operations on HR records are
//! split between `RequestDeletion` (editors) and `Delete`/`ReviewDeletion`
//! (moderators) so a second person confirms every removal.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("action {action} denied for resource {resource}")]
    Denied { action: String, resource: String },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Moderator,
    Editor,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Moderator, Role::Editor, Role::Viewer];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Moderator => "MODERATOR",
            Role::Editor => "EDITOR",
            Role::Viewer => "VIEWER",
        }
    }

    /// Case-insensitive parse of the wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "MODERATOR" => Some(Role::Moderator),
            "EDITOR" => Some(Role::Editor),
            "VIEWER" => Some(Role::Viewer),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Role::Admin => 4,
            Role::Moderator => 3,
            Role::Editor => 2,
            Role::Viewer => 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Action {
    View,
    Add,
    Change,
    Delete,
    RequestDeletion,
    ReviewDeletion,
    ManageUsers,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Add => "add",
            Action::Change => "change",
            Action::Delete => "delete",
            Action::RequestDeletion => "request_deletion",
            Action::ReviewDeletion => "review_deletion",
            Action::ManageUsers => "manage_users",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Resource {
    Employee,
    Department,
    Position,
    TrainingProgram,
    TrainingRecord,
    DeletionRequest,
    Report,
    Instruction,
    User,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Employee => "employee",
            Resource::Department => "department",
            Resource::Position => "position",
            Resource::TrainingProgram => "training_program",
            Resource::TrainingRecord => "training_record",
            Resource::DeletionRequest => "deletion_request",
            Resource::Report => "report",
            Resource::Instruction => "instruction",
            Resource::User => "user",
        }
    }

    /// HR records that go through the moderated deletion workflow.
    pub fn is_hr_record(self) -> bool {
        matches!(
            self,
            Resource::Employee
                | Resource::Department
                | Resource::Position
                | Resource::TrainingProgram
                | Resource::TrainingRecord
        )
    }
}

/// Minimum role required for an action on a resource, `None` when no role grants it.
pub fn required_role(action: Action, resource: Resource) -> Option<Role> {
    match (action, resource) {
        (_, Resource::User) => Some(Role::Admin),
        (Action::View, _) => Some(Role::Viewer),
        (Action::Add | Action::Change | Action::Delete, Resource::Instruction) => Some(Role::Admin),
        (Action::Add | Action::Change | Action::RequestDeletion, r) if r.is_hr_record() => {
            Some(Role::Editor)
        }
        (Action::Delete, r) if r.is_hr_record() => Some(Role::Moderator),
        (Action::ReviewDeletion, Resource::DeletionRequest) => Some(Role::Moderator),
        (Action::ManageUsers, _) => Some(Role::Admin),
        _ => None,
    }
}

/// Authenticated caller as seen by resolvers.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.iter().any(|r| r.level() >= role.level())
    }

    pub fn highest_role(&self) -> Option<Role> {
        self.roles.iter().copied().max_by_key(|r| r.level())
    }

    pub fn can(&self, action: Action, resource: Resource) -> bool {
        required_role(action, resource).is_some_and(|role| self.has_role(role))
    }
}

#[derive(Default, Debug)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn check(
        &self,
        principal: &Principal,
        action: Action,
        resource: Resource,
    ) -> Result<(), AuthzError> {
        if principal.can(action, resource) {
            Ok(())
        } else {
            Err(AuthzError::Denied {
                action: action.as_str().to_string(),
                resource: resource.as_str().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(roles: &[Role]) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            username: "tester".into(),
            roles: roles.to_vec(),
        }
    }

    #[test]
    fn viewers_only_read() {
        let viewer = principal(&[Role::Viewer]);
        assert!(viewer.can(Action::View, Resource::Employee));
        assert!(viewer.can(Action::View, Resource::Report));
        assert!(!viewer.can(Action::Add, Resource::Employee));
        assert!(!viewer.can(Action::RequestDeletion, Resource::Employee));
        assert!(!viewer.can(Action::View, Resource::User));
    }

    #[test]
    fn editors_request_but_cannot_delete() {
        let editor = principal(&[Role::Editor]);
        assert!(editor.can(Action::Add, Resource::TrainingRecord));
        assert!(editor.can(Action::Change, Resource::Department));
        assert!(editor.can(Action::RequestDeletion, Resource::Position));
        assert!(!editor.can(Action::Delete, Resource::Position));
        assert!(!editor.can(Action::ReviewDeletion, Resource::DeletionRequest));
        assert!(!editor.can(Action::Add, Resource::Instruction));
    }

    #[test]
    fn moderators_delete_and_review() {
        let moderator = principal(&[Role::Moderator]);
        assert!(moderator.can(Action::Delete, Resource::Employee));
        assert!(moderator.can(Action::ReviewDeletion, Resource::DeletionRequest));
        assert!(moderator.can(Action::RequestDeletion, Resource::Employee));
        assert!(!moderator.can(Action::ManageUsers, Resource::User));
    }

    #[test]
    fn admins_manage_everything() {
        let admin = principal(&[Role::Admin]);
        assert!(admin.can(Action::ManageUsers, Resource::User));
        assert!(admin.can(Action::Delete, Resource::Instruction));
        assert!(admin.can(Action::ReviewDeletion, Resource::DeletionRequest));
    }

    #[test]
    fn highest_role_wins_with_mixed_grants() {
        let mixed = principal(&[Role::Viewer, Role::Moderator]);
        assert_eq!(mixed.highest_role(), Some(Role::Moderator));
        assert!(mixed.can(Action::Delete, Resource::TrainingProgram));
    }

    #[test]
    fn engine_reports_denied_action() {
        let err = PolicyEngine
            .check(&principal(&[]), Action::Delete, Resource::Employee)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "action delete denied for resource employee"
        );
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::parse(" moderator "), Some(Role::Moderator));
        assert_eq!(Role::parse("owner"), None);
    }
}
