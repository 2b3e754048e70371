// ABOUTME: CLI entry point for dynamodb-table-migrator
// ABOUTME: Parses commands and routes to appropriate handlers

use clap::{Parser, Subcommand};
use dynamodb_table_migrator::commands::{self, seed::DEFAULT_SEED_TABLE, MigrateArgs, SeedArgs};
use dynamodb_table_migrator::config::MigratorConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dynamodb-table-migrator")]
#[command(about = "Copy DynamoDB tables from DynamoDB Local to AWS", long_about = None)]
struct Cli {
    /// TOML config file with [local] and [cloud] endpoint settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a table's schema and items to a new on-demand table
    Migrate {
        source_table: String,
        /// Name of the table to create (defaults to the source name)
        destination_table: Option<String>,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
        /// Read the source table from AWS instead of DynamoDB Local
        #[arg(long)]
        source_cloud: bool,
        /// Create the destination table on DynamoDB Local instead of AWS
        #[arg(long)]
        destination_local: bool,
    },
    /// List tables with status, item count, size and billing mode
    Tables {
        /// List DynamoDB Local tables instead of AWS
        #[arg(long)]
        local: bool,
    },
    /// Print every item of a table as JSON
    Scan {
        table: String,
        /// Scan DynamoDB Local instead of AWS
        #[arg(long)]
        local: bool,
    },
    /// Create a table and load sample employees or items from a JSON file
    Seed {
        #[arg(long, default_value = DEFAULT_SEED_TABLE)]
        table: String,
        /// JSON file holding an array of items, each with a string "id"
        #[arg(long)]
        file: Option<PathBuf>,
        /// Seed AWS instead of DynamoDB Local
        #[arg(long)]
        cloud: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = MigratorConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Migrate {
            source_table,
            destination_table,
            yes,
            source_cloud,
            destination_local,
        } => {
            let args = MigrateArgs {
                source_table,
                destination_table,
                yes,
                source_local: !source_cloud,
                destination_local,
            };
            commands::migrate(&config, args).await
        }
        Commands::Tables { local } => commands::list_tables(&config, local).await,
        Commands::Scan { table, local } => commands::scan(&config, &table, local).await,
        Commands::Seed { table, file, cloud } => {
            commands::seed(&config, SeedArgs { table, file, cloud }).await
        }
    }
}
