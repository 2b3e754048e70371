// ABOUTME: Seed command implementation for creating a sample table
// ABOUTME: Loads six sample employees or items from a JSON file into a table keyed by id

use crate::config::MigratorConfig;
use crate::dynamo::{
    AttributeDefinition, DynamoClient, Item, KeyElement, ScalarType, StoreError, TableSchema,
    TableStore,
};
use crate::migration::{count_items, wait_until_active, write_items, ActiveWait, LoadOptions};
use crate::utils::{json_to_item, validate_table_name};
use anyhow::{bail, Context, Result};
use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SEED_TABLE: &str = "employee";
pub const SEED_PARTITION_KEY: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    /// False when the table already existed
    pub created: bool,
    pub items_written: usize,
    /// Items in the table after seeding
    pub total_items: usize,
}

/// Schema of a seed table: partition key `id` of type string, on-demand billing
pub fn seed_schema(table: &str) -> TableSchema {
    TableSchema::new(
        table,
        vec![KeyElement::partition(SEED_PARTITION_KEY)],
        vec![AttributeDefinition::new(SEED_PARTITION_KEY, ScalarType::String)],
    )
}

fn employee(
    id: &str,
    name: &str,
    department: &str,
    position: &str,
    salary: u32,
    email: &str,
    hire_date: &str,
) -> Item {
    [
        ("id", AttributeValue::S(id.to_string())),
        ("name", AttributeValue::S(name.to_string())),
        ("department", AttributeValue::S(department.to_string())),
        ("position", AttributeValue::S(position.to_string())),
        ("salary", AttributeValue::N(salary.to_string())),
        ("email", AttributeValue::S(email.to_string())),
        ("hire_date", AttributeValue::S(hire_date.to_string())),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value))
    .collect()
}

/// The six sample employee records
pub fn sample_employees() -> Vec<Item> {
    vec![
        employee(
            "EMP001",
            "John Doe",
            "Engineering",
            "Senior Software Engineer",
            95000,
            "john.doe@company.com",
            "2020-03-15",
        ),
        employee(
            "EMP002",
            "Jane Smith",
            "Engineering",
            "Lead Developer",
            110000,
            "jane.smith@company.com",
            "2019-06-01",
        ),
        employee(
            "EMP003",
            "Michael Johnson",
            "Marketing",
            "Marketing Manager",
            85000,
            "michael.johnson@company.com",
            "2021-01-10",
        ),
        employee(
            "EMP004",
            "Emily Davis",
            "Engineering",
            "DevOps Engineer",
            92000,
            "emily.davis@company.com",
            "2020-09-20",
        ),
        employee(
            "EMP005",
            "Robert Wilson",
            "Sales",
            "Sales Director",
            105000,
            "robert.wilson@company.com",
            "2018-11-05",
        ),
        employee(
            "EMP006",
            "Sarah Brown",
            "HR",
            "HR Manager",
            78000,
            "sarah.brown@company.com",
            "2021-04-12",
        ),
    ]
}

/// Read items from a JSON file holding an array of objects
///
/// Every object must carry a string `id` attribute, the seed table's key.
pub fn load_items_from_file(path: &Path) -> Result<Vec<Item>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read items file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;

    let Value::Array(entries) = value else {
        bail!(
            "Items file {} must contain a JSON array of objects",
            path.display()
        );
    };

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| -> Result<Item> {
            let item = json_to_item(entry)
                .with_context(|| format!("Invalid item at index {}", idx))?;
            match item.get(SEED_PARTITION_KEY) {
                Some(AttributeValue::S(_)) => Ok(item),
                _ => bail!(
                    "Item at index {} needs a string '{}' attribute",
                    idx,
                    SEED_PARTITION_KEY
                ),
            }
        })
        .collect()
}

/// Create `table` if needed and write `items` into it
///
/// An existing table is reused with a warning; items with the same `id`
/// overwrite what is there.
pub async fn seed_table<S: TableStore>(
    store: &S,
    table: &str,
    items: Vec<Item>,
    wait: ActiveWait,
) -> Result<SeedSummary> {
    let created = match store.create_table(&seed_schema(table)).await {
        Ok(()) => {
            tracing::info!("✓ Created table '{}' on {}", table, store.endpoint_label());
            true
        }
        Err(StoreError::TableAlreadyExists { .. }) => {
            tracing::warn!(
                "⚠ Table '{}' already exists on {}, adding items to it",
                table,
                store.endpoint_label()
            );
            false
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to create table '{}'", table));
        }
    };

    wait_until_active(store, table, wait).await?;

    let summary = write_items(store, table, items, LoadOptions::default()).await?;
    let total_items = count_items(store, table).await?;

    Ok(SeedSummary {
        created,
        items_written: summary.items_written,
        total_items,
    })
}

/// Arguments of the `seed` CLI command
#[derive(Debug, Clone)]
pub struct SeedArgs {
    pub table: String,
    pub file: Option<PathBuf>,
    pub cloud: bool,
}

/// Run the `seed` command against DynamoDB Local, or AWS when `cloud` is set
pub async fn seed(config: &MigratorConfig, args: SeedArgs) -> Result<()> {
    validate_table_name(&args.table).context("Invalid table name")?;

    let items = match &args.file {
        Some(path) => load_items_from_file(path)?,
        None => sample_employees(),
    };

    let endpoint = config.endpoint(!args.cloud);
    tracing::info!(
        "Seeding table '{}' on {} with {} item(s)...",
        args.table,
        endpoint,
        items.len()
    );

    let client = DynamoClient::connect(&endpoint).await;
    let summary = seed_table(&client, &args.table, items, ActiveWait::default()).await?;

    tracing::info!(
        "✓ Seeded '{}': {} item(s) written, {} item(s) in table",
        args.table,
        summary.items_written,
        summary.total_items
    );

    Ok(())
}
