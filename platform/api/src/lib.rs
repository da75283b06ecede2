use std::sync::Arc;

use async_graphql::{Error, ErrorExtensions};
use platform_authz::AuthzError;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Shared GraphQL result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("login required")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    LimitExceeded(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::LimitExceeded(_) => "LIMIT_EXCEEDED",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Consume the error and render it as a GraphQL error with its code attached.
    pub fn into_graphql(self) -> Error {
        self.extend()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

impl From<DbErr> for ApiError {
    fn from(value: DbErr) -> Self {
        match value.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                Self::conflict("a record with the same values already exists")
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                Self::conflict("the record references a missing or protected row")
            }
            _ => match value {
                DbErr::RecordNotFound(what) => Self::NotFound(what),
                other => Self::internal(anyhow::Error::new(other)),
            },
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(value: AuthzError) -> Self {
        Self::Forbidden(value.to_string())
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> Error {
        let mut err = Error::new(self.to_string());
        if let ApiError::Internal(source) = self {
            tracing::error!(error = %source, "internal error surfaced to client");
        }
        err = err.extend_with(|_err, e| {
            e.set("code", self.code());
        });
        if let ApiError::BadRequest(_) | ApiError::Validation(_) = self {
            err = err.extend_with(|_err, e| {
                e.set("type", "BAD_REQUEST");
            });
        }
        err
    }
}

/// Map a service result into a resolver result.
pub trait GraphqlResultExt<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T> GraphqlResultExt<T> for ApiResult<T> {
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(ApiError::into_graphql)
    }
}

/// Convert any error into a GraphQL error payload while hiding internals.
pub fn internal_error(err: impl Into<anyhow::Error>) -> Error {
    ApiError::internal(err.into()).extend()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::Value;

    fn code_of(err: &Error) -> Option<Value> {
        err.extensions
            .as_ref()
            .and_then(|map| map.get("code"))
            .cloned()
    }

    #[test]
    fn internal_errors_are_masked() {
        let err = internal_error(anyhow::anyhow!("boom"));
        assert_eq!(err.message, "internal server error");
        assert_eq!(code_of(&err), Some(Value::from("INTERNAL")));
    }

    #[test]
    fn validation_errors_keep_message_and_code() {
        let err = ApiError::validation("name is required").into_graphql();
        assert_eq!(err.message, "name is required");
        assert_eq!(code_of(&err), Some(Value::from("VALIDATION")));
    }

    #[test]
    fn record_not_found_maps_to_not_found() {
        let err = ApiError::from(DbErr::RecordNotFound("employee".into()));
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.to_string(), "employee not found");
    }

    #[test]
    fn other_db_errors_are_internal() {
        let err = ApiError::from(DbErr::Custom("socket closed".into()));
        assert_eq!(err.code(), "INTERNAL");
        assert_eq!(err.to_string(), "internal server error");
    }

    #[test]
    fn authz_denials_are_forbidden() {
        let err = ApiError::from(AuthzError::Denied {
            action: "delete".into(),
            resource: "employee".into(),
        });
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn gql_extension_maps_errors() {
        let result: ApiResult<()> = Err(ApiError::conflict("duplicate"));
        let err = result.gql().unwrap_err();
        assert_eq!(code_of(&err), Some(Value::from("CONFLICT")));
    }
}
