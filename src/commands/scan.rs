// ABOUTME: Scan command implementation for dumping a table's items
// ABOUTME: Prints every item as pretty JSON followed by a total count

use crate::config::MigratorConfig;
use crate::dynamo::{DynamoClient, Item};
use crate::migration::scan_all_items;
use crate::utils::{item_to_json, validate_table_name};
use anyhow::{Context, Result};

/// Render one item as pretty-printed JSON with sorted attribute names
pub fn render_item(item: &Item) -> Result<String> {
    serde_json::to_string_pretty(&item_to_json(item)?).context("Failed to render item as JSON")
}

/// Print every item in `table` on AWS, or on DynamoDB Local when `local` is set
pub async fn scan(config: &MigratorConfig, table: &str, local: bool) -> Result<()> {
    validate_table_name(table).context("Invalid table name")?;

    let endpoint = config.endpoint(local);
    tracing::info!("Scanning table '{}' on {}...", table, endpoint);

    let client = DynamoClient::connect(&endpoint).await;
    let items = scan_all_items(&client, table).await?;

    println!();
    for item in &items {
        println!("{}", render_item(item)?);
        println!("---");
    }
    println!();
    println!("Total items: {}", items.len());

    Ok(())
}
