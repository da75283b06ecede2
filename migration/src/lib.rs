pub use sea_orm_migration::prelude::*;

mod m20250601_000001_org_structure;
mod m20250601_000002_accounts;
mod m20250601_000003_deletion_requests;
mod m20250601_000004_instructions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_org_structure::Migration),
            Box::new(m20250601_000002_accounts::Migration),
            Box::new(m20250601_000003_deletion_requests::Migration),
            Box::new(m20250601_000004_instructions::Migration),
        ]
    }
}
