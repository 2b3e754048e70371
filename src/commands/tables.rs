// ABOUTME: Tables command implementation for listing tables on an endpoint
// ABOUTME: Shows status, item count, size and billing mode of every table

use crate::config::MigratorConfig;
use crate::dynamo::{DynamoClient, TableDescription};
use crate::migration::list_table_descriptions;
use crate::utils::format_bytes;
use anyhow::Result;

/// One display line for a table
///
/// Item counts and sizes come from `DescribeTable`, which DynamoDB refreshes
/// roughly every six hours, so they may lag behind recent writes.
pub fn format_table_summary(description: &TableDescription) -> String {
    format!(
        "{:<32} {:<10} {:>10} items {:>10}  {}",
        description.schema.table_name,
        description.status.to_string(),
        description.item_count,
        format_bytes(description.size_bytes),
        description.schema.billing_mode
    )
}

/// List tables on AWS, or on DynamoDB Local when `local` is set
pub async fn list_tables(config: &MigratorConfig, local: bool) -> Result<()> {
    let endpoint = config.endpoint(local);
    tracing::info!("Listing tables on {}...", endpoint);

    let client = DynamoClient::connect(&endpoint).await;
    let descriptions = list_table_descriptions(&client).await?;

    if descriptions.is_empty() {
        tracing::warn!("⚠ No tables found on {}", endpoint);
        return Ok(());
    }

    println!();
    for description in &descriptions {
        println!("{}", format_table_summary(description));
        println!("    Keys: {}", description.schema.describe_keys());
    }
    println!();
    tracing::info!("✓ Found {} table(s)", descriptions.len());

    Ok(())
}
