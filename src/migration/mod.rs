// ABOUTME: Migration building blocks
// ABOUTME: Schema reading, destination provisioning, paginated export and batched load

pub mod export;
pub mod load;
pub mod provision;
pub mod schema;

pub use export::{count_items, scan_all_items};
pub use load::{write_items, LoadOptions, LoadSummary};
pub use provision::{create_destination_table, on_demand_schema, wait_until_active, ActiveWait};
pub use schema::{describe_table, list_table_descriptions, read_table_schema};
