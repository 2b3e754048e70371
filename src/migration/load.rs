// ABOUTME: Bulk loading of items with BatchWriteItem
// ABOUTME: Chunks items by the 25-item limit and resubmits unprocessed items with backoff

use crate::dynamo::{Item, StoreError, TableStore, MAX_BATCH_WRITE_ITEMS};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Retry and progress settings for [`write_items`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Resubmissions allowed per chunk when items come back unprocessed
    pub max_retries: u32,
    /// Delay before the first resubmission (doubles each time)
    pub initial_backoff: Duration,
    pub show_progress: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub items_written: usize,
    /// Batch write requests issued, resubmissions included
    pub batch_requests: usize,
    pub unprocessed_retries: usize,
}

/// Write `items` to `table` in chunks of at most 25
///
/// Each chunk is sent as one `BatchWriteItem` request. Items the endpoint
/// returns as unprocessed (typically under throttling) are resubmitted with
/// exponential backoff, up to `options.max_retries` times per chunk.
///
/// # Errors
///
/// Fails on the first request error, or with
/// [`StoreError::UnprocessedItems`] if a chunk still has unprocessed items
/// after all retries. Items from earlier chunks stay written.
pub async fn write_items<S: TableStore>(
    store: &S,
    table: &str,
    items: Vec<Item>,
    options: LoadOptions,
) -> Result<LoadSummary> {
    let mut summary = LoadSummary::default();
    if items.is_empty() {
        return Ok(summary);
    }

    let progress = load_progress_bar(items.len(), options.show_progress);
    let total_chunks = items.len().div_ceil(MAX_BATCH_WRITE_ITEMS);

    let mut remaining = items.into_iter().peekable();
    let mut chunk_idx = 0usize;
    while remaining.peek().is_some() {
        chunk_idx += 1;
        let chunk: Vec<Item> = remaining.by_ref().take(MAX_BATCH_WRITE_ITEMS).collect();
        let chunk_len = chunk.len();

        let retries = write_chunk(store, table, chunk, options, &mut summary)
            .await
            .with_context(|| {
                format!(
                    "Failed to write batch {}/{} to table '{}'",
                    chunk_idx, total_chunks, table
                )
            })?;

        summary.items_written += chunk_len;
        summary.unprocessed_retries += retries;
        progress.inc(chunk_len as u64);
    }

    progress.finish_and_clear();

    tracing::info!(
        "✓ Batch write completed: {} item(s) added to table '{}' in {} request(s)",
        summary.items_written,
        table,
        summary.batch_requests
    );

    Ok(summary)
}

/// Send one chunk, resubmitting unprocessed items; returns the retry count
async fn write_chunk<S: TableStore>(
    store: &S,
    table: &str,
    chunk: Vec<Item>,
    options: LoadOptions,
    summary: &mut LoadSummary,
) -> Result<usize> {
    let mut pending = chunk;
    let mut delay = options.initial_backoff;
    let mut attempt = 0u32;

    loop {
        summary.batch_requests += 1;
        let unprocessed = store.batch_write(table, pending).await?;
        if unprocessed.is_empty() {
            return Ok(attempt as usize);
        }

        if attempt >= options.max_retries {
            return Err(StoreError::UnprocessedItems {
                table: table.to_string(),
                count: unprocessed.len(),
            }
            .into());
        }

        tracing::warn!(
            "⚠ {} item(s) unprocessed (attempt {}/{}), retrying in {:?}...",
            unprocessed.len(),
            attempt + 1,
            options.max_retries + 1,
            delay
        );
        tokio::time::sleep(delay).await;
        delay *= 2;
        attempt += 1;
        pending = unprocessed;
    }
}

fn load_progress_bar(total: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} items ({eta})",
    )
    .map(|style| style.progress_chars("=>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamo::{
        find_store_error, AttributeDefinition, KeyElement, MemoryStore, ScalarType, TableSchema,
    };
    use aws_sdk_dynamodb::types::AttributeValue;

    fn fast_options() -> LoadOptions {
        LoadOptions {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1),
            show_progress: false,
        }
    }

    async fn destination() -> MemoryStore {
        let store = MemoryStore::new("cloud");
        store
            .create_table(&TableSchema::new(
                "employee",
                vec![KeyElement::partition("id")],
                vec![AttributeDefinition::new("id", ScalarType::String)],
            ))
            .await
            .unwrap();
        store
    }

    fn items(count: usize) -> Vec<Item> {
        (0..count)
            .map(|i| {
                [("id".to_string(), AttributeValue::S(format!("EMP{:03}", i)))]
                    .into_iter()
                    .collect()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_thirty_items_take_two_batches() {
        let store = destination().await;
        let summary = write_items(&store, "employee", items(30), fast_options())
            .await
            .unwrap();

        assert_eq!(summary.items_written, 30);
        assert_eq!(summary.batch_requests, 2);
        assert_eq!(store.batch_write_calls(), 2);
        assert_eq!(store.items("employee").unwrap().len(), 30);
    }

    #[tokio::test]
    async fn test_exact_multiple_of_batch_size() {
        let store = destination().await;
        let summary = write_items(&store, "employee", items(50), fast_options())
            .await
            .unwrap();
        assert_eq!(summary.batch_requests, 2);
    }

    #[tokio::test]
    async fn test_empty_load_issues_no_requests() {
        let store = destination().await;
        let summary = write_items(&store, "employee", Vec::new(), fast_options())
            .await
            .unwrap();
        assert_eq!(summary, LoadSummary::default());
        assert_eq!(store.batch_write_calls(), 0);
    }

    #[tokio::test]
    async fn test_unprocessed_items_are_resubmitted() {
        let store = destination().await;
        store.throttle_batch_writes(2);

        let summary = write_items(&store, "employee", items(10), fast_options())
            .await
            .unwrap();

        assert_eq!(summary.items_written, 10);
        assert_eq!(summary.unprocessed_retries, 2);
        assert_eq!(summary.batch_requests, 3);
        assert_eq!(store.items("employee").unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_unprocessed_items_after_retries_fail() {
        let store = destination().await;
        store.throttle_batch_writes(100);

        let options = LoadOptions {
            max_retries: 2,
            ..fast_options()
        };
        let err = write_items(&store, "employee", items(3), options)
            .await
            .unwrap_err();

        assert_eq!(
            find_store_error(&err),
            Some(&StoreError::UnprocessedItems {
                table: "employee".to_string(),
                count: 1
            })
        );
        assert!(err.to_string().contains("batch 1/1"));
    }

    #[tokio::test]
    async fn test_missing_destination_table() {
        let store = MemoryStore::new("cloud");
        let err = write_items(&store, "employee", items(1), fast_options())
            .await
            .unwrap_err();
        assert!(matches!(
            find_store_error(&err),
            Some(StoreError::TableNotFound { .. })
        ));
    }
}
