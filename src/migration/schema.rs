// ABOUTME: Schema introspection for migration planning
// ABOUTME: Reads key schema, attribute definitions, billing mode and indexes from a table

use crate::dynamo::{TableDescription, TableSchema, TableStore};
use anyhow::{Context, Result};

/// Read the schema of `table` from `store`
///
/// Fails with [`StoreError::TableNotFound`](crate::dynamo::StoreError) in the
/// error chain if the table does not exist at the store's endpoint.
///
/// # Examples
///
/// ```no_run
/// # use dynamodb_table_migrator::config::MigratorConfig;
/// # use dynamodb_table_migrator::dynamo::DynamoClient;
/// # use dynamodb_table_migrator::migration::read_table_schema;
/// # async fn example() -> anyhow::Result<()> {
/// let config = MigratorConfig::load(None)?;
/// let local = DynamoClient::connect(&config.endpoint(true)).await;
/// let schema = read_table_schema(&local, "employee").await?;
/// println!("Keys: {}", schema.describe_keys());
/// # Ok(())
/// # }
/// ```
pub async fn read_table_schema<S: TableStore>(store: &S, table: &str) -> Result<TableSchema> {
    let description = describe_table(store, table).await?;
    Ok(description.schema)
}

/// Describe `table` including status, item count and size
pub async fn describe_table<S: TableStore>(store: &S, table: &str) -> Result<TableDescription> {
    tracing::debug!(
        "Describing table '{}' on {}",
        table,
        store.endpoint_label()
    );

    store.describe_table(table).await.with_context(|| {
        format!(
            "Failed to describe table '{}' on {}",
            table,
            store.endpoint_label()
        )
    })
}

/// List every table at the store's endpoint with its description
pub async fn list_table_descriptions<S: TableStore>(store: &S) -> Result<Vec<TableDescription>> {
    let names = store
        .list_tables()
        .await
        .with_context(|| format!("Failed to list tables on {}", store.endpoint_label()))?;

    let mut descriptions = Vec::with_capacity(names.len());
    for name in names {
        descriptions.push(describe_table(store, &name).await?);
    }

    Ok(descriptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamo::{
        find_store_error, AttributeDefinition, BillingMode, KeyElement, MemoryStore,
        ProvisionedThroughput, ScalarType, StoreError,
    };

    #[tokio::test]
    async fn test_read_table_schema_returns_stored_schema() {
        let store = MemoryStore::new("local");
        let mut schema = TableSchema::new(
            "employee",
            vec![KeyElement::partition("id")],
            vec![AttributeDefinition::new("id", ScalarType::String)],
        );
        schema.billing_mode = BillingMode::Provisioned;
        schema.provisioned_throughput = Some(ProvisionedThroughput::default());
        store.create_table(&schema).await.unwrap();

        let read = read_table_schema(&store, "employee").await.unwrap();
        assert_eq!(read, schema);
    }

    #[tokio::test]
    async fn test_read_table_schema_missing_table() {
        let store = MemoryStore::new("local");
        let err = read_table_schema(&store, "missing").await.unwrap_err();

        assert!(err.to_string().contains("Failed to describe table 'missing'"));
        assert_eq!(
            find_store_error(&err),
            Some(&StoreError::TableNotFound {
                table: "missing".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_list_table_descriptions() {
        let store = MemoryStore::new("local");
        for name in ["alpha", "beta"] {
            store
                .create_table(&TableSchema::new(
                    name,
                    vec![KeyElement::partition("id")],
                    vec![AttributeDefinition::new("id", ScalarType::String)],
                ))
                .await
                .unwrap();
        }

        let tables = list_table_descriptions(&store).await.unwrap();
        let names: Vec<_> = tables.iter().map(|t| t.schema.table_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }
}
