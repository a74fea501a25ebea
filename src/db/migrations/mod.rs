pub mod m000001_create_module_configs;
pub mod m000002_create_invite_tracking;
pub mod m000003_create_rank_tiers;

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m000001_create_module_configs::Migration),
            Box::new(m000002_create_invite_tracking::Migration),
            Box::new(m000003_create_rank_tiers::Migration),
        ]
    }
}
