// ABOUTME: Bulk export of table items via paginated scans
// ABOUTME: Follows LastEvaluatedKey cursors until the scan is exhausted

use crate::dynamo::{Item, TableStore};
use anyhow::{Context, Result};

/// Read every item in `table`
///
/// Issues scan requests, passing each page's `last_evaluated_key` as the next
/// request's start key until a page comes back without one. Items are
/// returned in scan order, which is not insertion order.
pub async fn scan_all_items<S: TableStore>(store: &S, table: &str) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    let mut cursor: Option<Item> = None;
    let mut pages = 0usize;

    loop {
        let page = store
            .scan_page(table, cursor.take())
            .await
            .with_context(|| {
                format!(
                    "Failed to scan page {} of table '{}' on {}",
                    pages + 1,
                    table,
                    store.endpoint_label()
                )
            })?;
        pages += 1;

        tracing::debug!(
            "Scanned page {} of '{}': {} item(s)",
            pages,
            table,
            page.items.len()
        );
        items.extend(page.items);

        match page.last_evaluated_key {
            Some(key) => cursor = Some(key),
            None => break,
        }
    }

    tracing::info!(
        "Scan returned {} item(s) from table '{}' in {} page(s)",
        items.len(),
        table,
        pages
    );

    Ok(items)
}

/// Count every item in `table` without transferring item data
pub async fn count_items<S: TableStore>(store: &S, table: &str) -> Result<usize> {
    let mut total = 0usize;
    let mut cursor: Option<Item> = None;

    loop {
        let page = store
            .count_page(table, cursor.take())
            .await
            .with_context(|| {
                format!(
                    "Failed to count items in table '{}' on {}",
                    table,
                    store.endpoint_label()
                )
            })?;
        total += page.count;

        match page.last_evaluated_key {
            Some(key) => cursor = Some(key),
            None => break,
        }
    }

    Ok(total)
}
