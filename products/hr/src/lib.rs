//! HR administration: organisation structure, training compliance and the
//! moderated deletion workflow.

pub mod compliance;
pub mod moderation;
pub mod report;
pub mod schema;
pub mod seed;
pub mod service;
pub mod validation;

pub use compliance::{TrainingStatus, classify};
pub use schema::{HrSchema, MutationRoot, QueryRoot, build_schema};
