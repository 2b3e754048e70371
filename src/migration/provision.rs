// ABOUTME: Destination table provisioning for migrations
// ABOUTME: Creates an on-demand copy of a source schema and waits until it is active

use crate::dynamo::{BillingMode, TableDescription, TableSchema, TableStatus, TableStore};
use anyhow::{bail, Context, Result};
use std::time::Duration;

/// How long to poll for a new table to become `ACTIVE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWait {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ActiveWait {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 120,
        }
    }
}

/// Build the destination schema for a migrated table
///
/// Key schema, attribute definitions and secondary indexes are copied
/// verbatim. Billing is forced to on-demand regardless of the source, so all
/// provisioned throughput settings are dropped.
pub fn on_demand_schema(source: &TableSchema, destination_table: &str) -> TableSchema {
    let mut schema = source.clone();
    schema.table_name = destination_table.to_string();
    schema.billing_mode = BillingMode::OnDemand;
    schema.provisioned_throughput = None;
    for index in &mut schema.global_secondary_indexes {
        index.provisioned_throughput = None;
    }
    schema
}

/// Create the destination table and wait for it to become active
///
/// # Arguments
///
/// * `store` - Destination endpoint
/// * `destination_table` - Name of the table to create
/// * `source_schema` - Schema read from the source table
/// * `wait` - Polling policy for the `ACTIVE` status
///
/// # Errors
///
/// Fails with [`StoreError::TableAlreadyExists`](crate::dynamo::StoreError)
/// in the error chain if the name is taken. The collision is surfaced, never
/// retried, and nothing is written.
pub async fn create_destination_table<S: TableStore>(
    store: &S,
    destination_table: &str,
    source_schema: &TableSchema,
    wait: ActiveWait,
) -> Result<TableSchema> {
    let schema = on_demand_schema(source_schema, destination_table);

    tracing::info!(
        "Creating table '{}' on {} ({})",
        destination_table,
        store.endpoint_label(),
        schema.billing_mode
    );

    store.create_table(&schema).await.with_context(|| {
        format!(
            "Failed to create table '{}' on {}",
            destination_table,
            store.endpoint_label()
        )
    })?;

    wait_until_active(store, destination_table, wait).await?;

    tracing::info!("✓ Table '{}' is active", destination_table);

    Ok(schema)
}

/// Poll `describe_table` until the table reports `ACTIVE`
pub async fn wait_until_active<S: TableStore>(
    store: &S,
    table: &str,
    wait: ActiveWait,
) -> Result<TableDescription> {
    let max_attempts = wait.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        let description = store
            .describe_table(table)
            .await
            .with_context(|| format!("Failed to check status of table '{}'", table))?;

        if description.status == TableStatus::Active {
            return Ok(description);
        }

        tracing::debug!(
            "Table '{}' is {} (check {}/{})",
            table,
            description.status,
            attempt,
            max_attempts
        );
        // No sleep after the final check
        if attempt < max_attempts {
            tokio::time::sleep(wait.interval).await;
        }
    }

    bail!(
        "Table '{}' did not become ACTIVE after {} checks",
        table,
        max_attempts
    )
}
