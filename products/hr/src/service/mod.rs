//! Database-backed operations. Every entry point takes the acting
//! [`Principal`](platform_authz::Principal) and checks it before touching rows.

pub mod deletions;
pub mod departments;
pub mod employees;
pub mod instructions;
pub mod positions;
pub mod programs;
pub mod records;
pub mod users;

use chrono::{Local, NaiveDate, Utc};
use platform_api::{ApiError, ApiResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, Func, IntoColumnRef},
};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i32 = 20;
pub const MAX_PAGE_SIZE: i32 = 100;

/// Validated `first`/`offset` pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    pub fn new(first: Option<i32>, offset: Option<i32>) -> ApiResult<Self> {
        let first = first.unwrap_or(DEFAULT_PAGE_SIZE);
        if first <= 0 {
            return Err(ApiError::validation("first must be positive"));
        }
        if first > MAX_PAGE_SIZE {
            return Err(ApiError::LimitExceeded(format!(
                "cannot request more than {MAX_PAGE_SIZE} rows at once"
            )));
        }
        Ok(Self {
            limit: first as u64,
            offset: offset.unwrap_or(0).max(0) as u64,
        })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE as u64,
            offset: 0,
        }
    }
}

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

/// Calendar date used for compliance decisions.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `LOWER(col)` for case-insensitive comparisons.
pub(crate) fn lower(col: impl IntoColumnRef) -> Expr {
    Expr::expr(Func::lower(Expr::col(col)))
}

/// `%q%` in lower case, `None` for a blank query.
pub(crate) fn search_pattern(q: Option<&str>) -> Option<String> {
    q.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| format!("%{}%", value.to_lowercase()))
}

/// True when another row of `E` already uses `name` (case-insensitive).
pub(crate) async fn name_taken<E, C>(
    conn: &C,
    name_col: E::Column,
    id_col: E::Column,
    name: &str,
    exclude: Option<Uuid>,
) -> ApiResult<bool>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let mut query = E::find().filter(lower(name_col).eq(name.to_lowercase()));
    if let Some(id) = exclude {
        query = query.filter(id_col.ne(id));
    }
    Ok(query.count(conn).await? > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_limits() {
        assert_eq!(Page::new(None, None).unwrap(), Page::default());
        assert_eq!(
            Page::new(Some(5), Some(-3)).unwrap(),
            Page {
                limit: 5,
                offset: 0
            }
        );
        assert_eq!(Page::new(Some(0), None).unwrap_err().code(), "VALIDATION");
        assert_eq!(
            Page::new(Some(MAX_PAGE_SIZE + 1), None).unwrap_err().code(),
            "LIMIT_EXCEEDED"
        );
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_pattern(Some("  ")), None);
        assert_eq!(search_pattern(Some(" Iva ")), Some("%iva%".into()));
        assert_eq!(search_pattern(None), None);
    }
}
