// ABOUTME: Command implementations for the migrator CLI
// ABOUTME: Exports migrate, list_tables, scan and seed commands

pub mod migrate;
pub mod scan;
pub mod seed;
pub mod tables;

pub use migrate::{
    migrate, migrate_table, MigrateArgs, MigrationOptions, MigrationResult, MigrationRun,
    MigrationStage,
};
pub use scan::scan;
pub use seed::{seed, seed_table, SeedArgs};
pub use tables::list_tables;
