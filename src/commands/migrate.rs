// ABOUTME: Migrate command implementation for copying a table between endpoints
// ABOUTME: Drives verify, check, create, export and load stages and reports the result

use crate::config::{Endpoint, MigratorConfig};
use crate::dynamo::{find_store_error, DynamoClient, StoreError, TableStore};
use crate::interactive;
use crate::migration::{
    count_items, create_destination_table, read_table_schema, scan_all_items, write_items,
    ActiveWait, LoadOptions, LoadSummary,
};
use crate::utils::{validate_source_destination_different, validate_table_name};
use anyhow::{Context, Result};
use std::fmt;

/// Status code carried by a successful [`MigrationResult`]
pub const STATUS_OK: u16 = 200;

/// Stages of a migration run
///
/// A run moves strictly forward through
/// `Start → VerifySource → CheckData → CreateDestination → ExportItems →
/// LoadItems → Done`. Any failure moves it to `Aborted`; there is no retry
/// stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStage {
    Start,
    VerifySource,
    CheckData,
    CreateDestination,
    ExportItems,
    LoadItems,
    Done,
    Aborted,
}

impl fmt::Display for MigrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MigrationStage::Start => "start",
            MigrationStage::VerifySource => "source verification",
            MigrationStage::CheckData => "source data check",
            MigrationStage::CreateDestination => "destination creation",
            MigrationStage::ExportItems => "item export",
            MigrationStage::LoadItems => "item load",
            MigrationStage::Done => "done",
            MigrationStage::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Outcome of a completed migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    pub status_code: u16,
    pub message: String,
    pub item_count: usize,
    pub batches_written: usize,
    pub unprocessed_retries: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationOptions {
    pub active_wait: ActiveWait,
    pub load: LoadOptions,
}

/// One migration of a table from a source store to a destination store
///
/// The run keeps track of its current stage so callers can see where a
/// failed migration stopped.
///
/// # Examples
///
/// ```no_run
/// # use dynamodb_table_migrator::commands::migrate::{MigrationOptions, MigrationRun};
/// # use dynamodb_table_migrator::config::MigratorConfig;
/// # use dynamodb_table_migrator::dynamo::DynamoClient;
/// # async fn example() -> anyhow::Result<()> {
/// let config = MigratorConfig::load(None)?;
/// let local = DynamoClient::connect(&config.endpoint(true)).await;
/// let cloud = DynamoClient::connect(&config.endpoint(false)).await;
///
/// let options = MigrationOptions::default();
/// let mut run = MigrationRun::new(&local, &cloud, "employee", Some("employee-prod"), options);
/// let result = run.run().await?;
/// println!("{}", result.message);
/// # Ok(())
/// # }
/// ```
pub struct MigrationRun<'a, S, D> {
    source: &'a S,
    destination: &'a D,
    source_table: String,
    destination_table: String,
    options: MigrationOptions,
    stage: MigrationStage,
    failed_stage: Option<MigrationStage>,
}

impl<'a, S: TableStore, D: TableStore> MigrationRun<'a, S, D> {
    /// Prepare a run; `destination_table` defaults to the source name
    pub fn new(
        source: &'a S,
        destination: &'a D,
        source_table: &str,
        destination_table: Option<&str>,
        options: MigrationOptions,
    ) -> Self {
        Self {
            source,
            destination,
            source_table: source_table.to_string(),
            destination_table: destination_table.unwrap_or(source_table).to_string(),
            options,
            stage: MigrationStage::Start,
            failed_stage: None,
        }
    }

    pub fn stage(&self) -> MigrationStage {
        self.stage
    }

    /// Stage that was running when the migration aborted
    pub fn failed_stage(&self) -> Option<MigrationStage> {
        self.failed_stage
    }

    pub fn destination_table(&self) -> &str {
        &self.destination_table
    }

    /// Execute every stage in order
    ///
    /// # Errors
    ///
    /// Returns the first stage failure with the stage name attached as
    /// context. The underlying [`StoreError`] stays reachable through
    /// [`find_store_error`].
    pub async fn run(&mut self) -> Result<MigrationResult> {
        match self.execute().await {
            Ok(result) => {
                self.enter(MigrationStage::Done);
                Ok(result)
            }
            Err(err) => Err(self.abort(err)),
        }
    }

    async fn execute(&mut self) -> Result<MigrationResult> {
        tracing::info!(
            "Starting migration of '{}' ({}) to '{}' ({})",
            self.source_table,
            self.source.endpoint_label(),
            self.destination_table,
            self.destination.endpoint_label()
        );

        // Step 1: the source table must exist
        self.enter(MigrationStage::VerifySource);
        let schema = read_table_schema(self.source, &self.source_table).await?;
        tracing::info!("✓ Found source table '{}'", self.source_table);
        tracing::info!("  Key Schema: {}", schema.describe_keys());
        tracing::info!("  Billing Mode: {}", schema.billing_mode);

        // Step 2: how much data is there
        self.enter(MigrationStage::CheckData);
        let expected = count_items(self.source, &self.source_table).await?;
        tracing::info!("✓ Found {} item(s) to migrate", expected);

        // Step 3: provision the destination
        self.enter(MigrationStage::CreateDestination);
        create_destination_table(
            self.destination,
            &self.destination_table,
            &schema,
            self.options.active_wait,
        )
        .await?;

        // Step 4: read everything from the source
        self.enter(MigrationStage::ExportItems);
        let items = scan_all_items(self.source, &self.source_table).await?;
        if items.len() != expected {
            tracing::warn!(
                "⚠ Source table '{}' changed during migration ({} item(s) counted, {} scanned)",
                self.source_table,
                expected,
                items.len()
            );
        }

        // Step 5: write it to the destination
        self.enter(MigrationStage::LoadItems);
        let item_count = items.len();
        let summary = if items.is_empty() {
            tracing::warn!("⚠ No items to migrate from '{}'", self.source_table);
            LoadSummary::default()
        } else {
            tracing::info!("Migrating {} item(s)...", item_count);
            write_items(
                self.destination,
                &self.destination_table,
                items,
                self.options.load,
            )
            .await?
        };

        let message = if item_count == 0 {
            format!(
                "TABLE {} CREATED (0 items migrated)",
                self.destination_table
            )
        } else {
            format!(
                "TABLE {} CREATED AND {} ITEMS MIGRATED",
                self.destination_table, item_count
            )
        };

        tracing::info!(
            "✓ Migration complete: {} item(s) copied to '{}'",
            item_count,
            self.destination_table
        );

        Ok(MigrationResult {
            status_code: STATUS_OK,
            message,
            item_count,
            batches_written: summary.batch_requests,
            unprocessed_retries: summary.unprocessed_retries,
        })
    }

    fn enter(&mut self, stage: MigrationStage) {
        tracing::debug!("Migration stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    fn abort(&mut self, err: anyhow::Error) -> anyhow::Error {
        let failed = self.stage;
        self.failed_stage = Some(failed);
        self.stage = MigrationStage::Aborted;

        let mut message = format!(
            "Migration of '{}' to '{}' aborted during {}",
            self.source_table, self.destination_table, failed
        );
        if matches!(
            failed,
            MigrationStage::ExportItems | MigrationStage::LoadItems
        ) {
            let note = format!(
                "table '{}' was created on {} but may be only partially loaded",
                self.destination_table,
                self.destination.endpoint_label()
            );
            tracing::warn!("⚠ {}", note);
            message = format!("{}; {}", message, note);
        }

        err.context(message)
    }
}

/// Migrate `source_table` from `source` to `destination`
///
/// Convenience wrapper around [`MigrationRun`] for callers that do not need
/// the stage after a failure.
pub async fn migrate_table<S: TableStore, D: TableStore>(
    source: &S,
    destination: &D,
    source_table: &str,
    destination_table: Option<&str>,
    options: MigrationOptions,
) -> Result<MigrationResult> {
    let mut run = MigrationRun::new(source, destination, source_table, destination_table, options);
    run.run().await
}

/// Arguments of the `migrate` CLI command
#[derive(Debug, Clone)]
pub struct MigrateArgs {
    pub source_table: String,
    pub destination_table: Option<String>,
    pub yes: bool,
    pub source_local: bool,
    pub destination_local: bool,
}

/// Run the `migrate` command against real endpoints
///
/// Validates names, asks for confirmation unless `yes` is set, connects
/// to both endpoints and runs the migration, printing a summary or
/// troubleshooting hints.
pub async fn migrate(config: &MigratorConfig, args: MigrateArgs) -> Result<()> {
    let destination_table = args
        .destination_table
        .clone()
        .unwrap_or_else(|| args.source_table.clone());

    validate_table_name(&args.source_table).context("Invalid source table name")?;
    validate_table_name(&destination_table).context("Invalid destination table name")?;

    let source_endpoint = config.endpoint(args.source_local);
    let destination_endpoint = config.endpoint(args.destination_local);
    validate_source_destination_different(
        &source_endpoint,
        &args.source_table,
        &destination_endpoint,
        &destination_table,
    )?;

    if !args.yes
        && !interactive::confirm_migration(
            &args.source_table,
            &source_endpoint,
            &destination_table,
            &destination_endpoint,
        )?
    {
        tracing::warn!("⚠ Migration cancelled by user");
        return Ok(());
    }

    let source = DynamoClient::connect(&source_endpoint).await;
    let destination = DynamoClient::connect(&destination_endpoint).await;

    let options = MigrationOptions {
        load: LoadOptions {
            show_progress: true,
            ..LoadOptions::default()
        },
        ..MigrationOptions::default()
    };

    let mut run = MigrationRun::new(
        &source,
        &destination,
        &args.source_table,
        Some(&destination_table),
        options,
    );

    match run.run().await {
        Ok(result) => {
            println!();
            println!("========================================");
            println!("Migration Complete!");
            println!("========================================");
            println!();
            println!("✓ {}", result.message);
            println!();
            println!("Summary:");
            println!("  Source:         {} ({})", args.source_table, source_endpoint);
            println!(
                "  Destination:    {} ({})",
                destination_table, destination_endpoint
            );
            println!("  Items Migrated: {}", result.item_count);
            println!("  Batch Requests: {}", result.batches_written);
            if result.unprocessed_retries > 0 {
                println!("  Throttle Retries: {}", result.unprocessed_retries);
            }
            println!();
            Ok(())
        }
        Err(err) => {
            let failed = run.failed_stage().unwrap_or(MigrationStage::Start);
            tracing::error!("Migration failed during {}", failed);
            for hint in troubleshooting_hints(&err, &source_endpoint, &destination_table) {
                tracing::error!("  - {}", hint);
            }
            Err(err)
        }
    }
}

/// Suggestions shown after a failed migration
pub fn troubleshooting_hints(
    err: &anyhow::Error,
    source: &Endpoint,
    destination_table: &str,
) -> Vec<String> {
    match find_store_error(err) {
        Some(StoreError::TableNotFound { table }) => {
            let mut hints = vec![format!("Table '{}' was not found", table)];
            if source.is_local() {
                hints.push(format!("Ensure {} is running", source));
                hints.push(
                    "Start it with: docker run -p 8000:8000 amazon/dynamodb-local".to_string(),
                );
            }
            hints
        }
        Some(StoreError::TableAlreadyExists { .. }) => vec![
            format!(
                "A table named '{}' already exists on the destination",
                destination_table
            ),
            "Pass a different destination table name or delete the existing table".to_string(),
        ],
        Some(StoreError::UnprocessedItems { .. }) => vec![
            "The destination throttled batch writes beyond the retry budget".to_string(),
            "Re-run against a fresh destination table once load has dropped".to_string(),
        ],
        _ => vec![
            "Verify AWS credentials are configured correctly".to_string(),
            "Check that you have permissions to create DynamoDB tables".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamo::{AttributeDefinition, KeyElement, MemoryStore, ScalarType, TableSchema};
    use aws_sdk_dynamodb::types::AttributeValue;

    fn schema(name: &str) -> TableSchema {
        TableSchema::new(
            name,
            vec![KeyElement::partition("id")],
            vec![AttributeDefinition::new("id", ScalarType::String)],
        )
    }

    #[tokio::test]
    async fn test_run_reaches_done() {
        let source = MemoryStore::new("local");
        let destination = MemoryStore::new("cloud");
        source.create_table(&schema("employee")).await.unwrap();
        let item = [("id".to_string(), AttributeValue::S("EMP001".to_string()))]
            .into_iter()
            .collect();
        source.put_item("employee", item).await.unwrap();

        let mut run = MigrationRun::new(
            &source,
            &destination,
            "employee",
            None,
            MigrationOptions::default(),
        );
        assert_eq!(run.stage(), MigrationStage::Start);
        assert_eq!(run.destination_table(), "employee");

        let result = run.run().await.unwrap();
        assert_eq!(run.stage(), MigrationStage::Done);
        assert_eq!(run.failed_stage(), None);
        assert_eq!(result.status_code, STATUS_OK);
        assert_eq!(result.message, "TABLE employee CREATED AND 1 ITEMS MIGRATED");
    }

    #[tokio::test]
    async fn test_missing_source_aborts_at_verify() {
        let source = MemoryStore::new("local");
        let destination = MemoryStore::new("cloud");

        let mut run = MigrationRun::new(
            &source,
            &destination,
            "employee",
            None,
            MigrationOptions::default(),
        );
        let err = run.run().await.unwrap_err();

        assert_eq!(run.stage(), MigrationStage::Aborted);
        assert_eq!(run.failed_stage(), Some(MigrationStage::VerifySource));
        assert!(err
            .to_string()
            .contains("aborted during source verification"));
        assert!(!destination.has_table("employee"));
    }

    #[test]
    fn test_hints_for_missing_local_table() {
        let err = anyhow::Error::new(StoreError::TableNotFound {
            table: "employee".to_string(),
        });
        let local = MigratorConfig::default().endpoint(true);

        let hints = troubleshooting_hints(&err, &local, "employee");
        assert!(hints.iter().any(|h| h.contains("http://localhost:8000")));
    }

    #[test]
    fn test_hints_for_collision() {
        let err = anyhow::Error::new(StoreError::TableAlreadyExists {
            table: "employee".to_string(),
        })
        .context("Migration aborted");
        let cloud = MigratorConfig::default().endpoint(false);

        let hints = troubleshooting_hints(&err, &cloud, "employee");
        assert!(hints[0].contains("already exists"));
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(MigrationStage::LoadItems.to_string(), "item load");
        assert_eq!(MigrationStage::Aborted.to_string(), "aborted");
    }
}
