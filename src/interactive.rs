// ABOUTME: Interactive confirmation before a migration touches the destination
// ABOUTME: Prints the migration plan and asks the user to proceed

use crate::config::Endpoint;
use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};

/// Lines describing what a migration is about to do
pub fn migration_plan_lines(
    source_table: &str,
    source: &Endpoint,
    destination_table: &str,
    destination: &Endpoint,
) -> Vec<String> {
    vec![
        format!("Source:      {} on {}", source_table, source),
        format!("Destination: {} on {}", destination_table, destination),
        String::new(),
        "This will:".to_string(),
        format!("  1. Read the schema and items of '{}'", source_table),
        format!(
            "  2. Create table '{}' with on-demand billing",
            destination_table
        ),
        "  3. Copy every item in batches of 25".to_string(),
    ]
}

/// Show the migration plan and ask for confirmation
///
/// # Returns
///
/// `Ok(true)` if the user accepts, `Ok(false)` if they decline. Declining
/// is not an error; the caller exits cleanly.
///
/// # Examples
///
/// ```no_run
/// # use dynamodb_table_migrator::config::MigratorConfig;
/// # use dynamodb_table_migrator::interactive::confirm_migration;
/// # fn example() -> anyhow::Result<()> {
/// let config = MigratorConfig::default();
/// let proceed = confirm_migration(
///     "employee",
///     &config.endpoint(true),
///     "employee",
///     &config.endpoint(false),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn confirm_migration(
    source_table: &str,
    source: &Endpoint,
    destination_table: &str,
    destination: &Endpoint,
) -> Result<bool> {
    println!();
    println!("========================================");
    println!("DynamoDB Table Migration");
    println!("========================================");
    println!();
    for line in migration_plan_lines(source_table, source, destination_table, destination) {
        println!("{}", line);
    }
    println!();
    println!("========================================");
    println!();

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Do you want to continue?")
        .default(false)
        .interact()
        .context("Failed to get confirmation")
}
