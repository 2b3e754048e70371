// ABOUTME: In-process table store with DynamoDB-like semantics
// ABOUTME: Paginates scans, enforces key shape and batch limits, can simulate throttling

use super::error::{StoreError, StoreResult};
use super::types::{CountPage, Item, ScanPage, TableDescription, TableSchema, TableStatus};
use super::{TableStore, MAX_BATCH_WRITE_ITEMS};
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default number of items returned per scan page
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug)]
struct MemoryTable {
    schema: TableSchema,
    items: Vec<Item>,
    /// Describes left that report `CREATING`
    pending_checks: u32,
}

impl MemoryTable {
    fn position_of(&self, key: &Item) -> Option<usize> {
        self.items
            .iter()
            .position(|item| self.schema.key_of(item).as_ref() == Some(key))
    }

    fn upsert(&mut self, item: Item) -> StoreResult<()> {
        let key = self.schema.key_of(&item).ok_or_else(|| {
            StoreError::validation(format!(
                "item does not match the key schema of '{}' ({})",
                self.schema.table_name,
                self.schema.describe_keys()
            ))
        })?;

        match self.position_of(&key) {
            Some(idx) => self.items[idx] = item,
            None => self.items.push(item),
        }
        Ok(())
    }

    /// Index of the first item after the cursor
    fn page_start(&self, exclusive_start_key: Option<&Item>) -> StoreResult<usize> {
        match exclusive_start_key {
            None => Ok(0),
            Some(key) => self.position_of(key).map(|idx| idx + 1).ok_or_else(|| {
                StoreError::validation("exclusive start key does not match any item")
            }),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeMap<String, MemoryTable>,
    batch_write_calls: usize,
    throttled_batches: usize,
    activation_checks: u32,
}

/// In-memory [`TableStore`]
///
/// Behaves like a DynamoDB endpoint for the operations the migrator uses:
/// scans are paginated with a key cursor, writes must carry the key schema
/// attributes with the declared types, and batch writes above 25 items are
/// rejected. Tests use [`MemoryStore::throttle_batch_writes`] to make the
/// next batch writes leave their last item unprocessed, and
/// [`MemoryStore::delay_activation`] to keep new tables in `CREATING`.
#[derive(Debug)]
pub struct MemoryStore {
    label: String,
    page_size: usize,
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryStore {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            page_size: DEFAULT_PAGE_SIZE,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Limit scan pages to `page_size` items (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Leave one item unprocessed in each of the next `batches` batch writes
    pub fn throttle_batch_writes(&self, batches: usize) {
        self.state().throttled_batches = batches;
    }

    /// Tables created from now on report `CREATING` for their first `checks` describes
    pub fn delay_activation(&self, checks: u32) {
        self.state().activation_checks = checks;
    }

    /// Number of `batch_write` calls that reached a table
    pub fn batch_write_calls(&self) -> usize {
        self.state().batch_write_calls
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.state().tables.contains_key(table)
    }

    /// Snapshot of every item in `table`, in storage order
    pub fn items(&self, table: &str) -> StoreResult<Vec<Item>> {
        let state = self.state();
        state
            .tables
            .get(table)
            .map(|t| t.items.clone())
            .ok_or_else(|| not_found(table))
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(table: &str) -> StoreError {
    StoreError::TableNotFound {
        table: table.to_string(),
    }
}

fn validate_schema(schema: &TableSchema) -> StoreResult<()> {
    if schema.partition_key().is_none() {
        return Err(StoreError::validation(format!(
            "table '{}' has no partition key",
            schema.table_name
        )));
    }
    for key in &schema.key_schema {
        if schema.attribute_type(&key.attribute_name).is_none() {
            return Err(StoreError::validation(format!(
                "key attribute '{}' has no attribute definition",
                key.attribute_name
            )));
        }
    }
    Ok(())
}

/// Rough storage size of an item: attribute names plus value payloads
fn approximate_size(item: &Item) -> i64 {
    fn value_size(value: &AttributeValue) -> usize {
        match value {
            AttributeValue::S(s) | AttributeValue::N(s) => s.len(),
            AttributeValue::B(b) => b.as_ref().len(),
            AttributeValue::Ss(values) | AttributeValue::Ns(values) => {
                values.iter().map(String::len).sum()
            }
            AttributeValue::Bs(values) => values.iter().map(|b| b.as_ref().len()).sum(),
            AttributeValue::L(values) => values.iter().map(value_size).sum(),
            AttributeValue::M(map) => map.iter().map(|(k, v)| k.len() + value_size(v)).sum(),
            _ => 1,
        }
    }

    item.iter()
        .map(|(name, value)| name.len() + value_size(value))
        .sum::<usize>() as i64
}

impl TableStore for MemoryStore {
    fn endpoint_label(&self) -> &str {
        &self.label
    }

    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        Ok(self.state().tables.keys().cloned().collect())
    }

    async fn describe_table(&self, table: &str) -> StoreResult<TableDescription> {
        let mut state = self.state();
        let stored = state.tables.get_mut(table).ok_or_else(|| not_found(table))?;
        let status = if stored.pending_checks > 0 {
            stored.pending_checks -= 1;
            TableStatus::Creating
        } else {
            TableStatus::Active
        };
        Ok(TableDescription {
            schema: stored.schema.clone(),
            status,
            item_count: stored.items.len() as i64,
            size_bytes: stored.items.iter().map(approximate_size).sum(),
        })
    }

    async fn create_table(&self, schema: &TableSchema) -> StoreResult<()> {
        validate_schema(schema)?;

        let mut state = self.state();
        if state.tables.contains_key(&schema.table_name) {
            return Err(StoreError::TableAlreadyExists {
                table: schema.table_name.clone(),
            });
        }
        let pending_checks = state.activation_checks;
        state.tables.insert(
            schema.table_name.clone(),
            MemoryTable {
                schema: schema.clone(),
                items: Vec::new(),
                pending_checks,
            },
        );
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> StoreResult<()> {
        self.state()
            .tables
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| not_found(table))
    }

    async fn scan_page(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
    ) -> StoreResult<ScanPage> {
        let state = self.state();
        let stored = state.tables.get(table).ok_or_else(|| not_found(table))?;

        let start = stored.page_start(exclusive_start_key.as_ref())?;
        let end = (start + self.page_size).min(stored.items.len());
        let items = stored.items[start..end].to_vec();

        let last_evaluated_key = if end < stored.items.len() {
            items.last().and_then(|item| stored.schema.key_of(item))
        } else {
            None
        };

        Ok(ScanPage {
            items,
            last_evaluated_key,
        })
    }

    async fn count_page(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
    ) -> StoreResult<CountPage> {
        let page = self.scan_page(table, exclusive_start_key).await?;
        Ok(CountPage {
            count: page.items.len(),
            last_evaluated_key: page.last_evaluated_key,
        })
    }

    async fn batch_write(&self, table: &str, mut items: Vec<Item>) -> StoreResult<Vec<Item>> {
        if items.is_empty() || items.len() > MAX_BATCH_WRITE_ITEMS {
            return Err(StoreError::validation(format!(
                "batch writes take 1 to {} items, got {}",
                MAX_BATCH_WRITE_ITEMS,
                items.len()
            )));
        }

        let mut state = self.state();
        let throttle = state.throttled_batches > 0;
        let stored = state.tables.get_mut(table).ok_or_else(|| not_found(table))?;

        // Validate the whole batch first; DynamoDB rejects it atomically
        if let Some(bad) = items.iter().find(|item| stored.schema.key_of(item).is_none()) {
            return Err(StoreError::validation(format!(
                "item with attributes {:?} does not match the key schema of '{}'",
                bad.keys().collect::<Vec<_>>(),
                table
            )));
        }

        let unprocessed = if throttle {
            items.pop().into_iter().collect()
        } else {
            Vec::new()
        };

        for item in items {
            stored.upsert(item)?;
        }

        state.batch_write_calls += 1;
        if throttle {
            state.throttled_batches -= 1;
        }

        Ok(unprocessed)
    }

    async fn put_item(&self, table: &str, item: Item) -> StoreResult<()> {
        let mut state = self.state();
        let stored = state.tables.get_mut(table).ok_or_else(|| not_found(table))?;
        stored.upsert(item)
    }

    async fn get_item(&self, table: &str, key: Item) -> StoreResult<Option<Item>> {
        let state = self.state();
        let stored = state.tables.get(table).ok_or_else(|| not_found(table))?;
        Ok(stored.position_of(&key).map(|idx| stored.items[idx].clone()))
    }

    async fn delete_item(&self, table: &str, key: Item) -> StoreResult<()> {
        let mut state = self.state();
        let stored = state.tables.get_mut(table).ok_or_else(|| not_found(table))?;
        if let Some(idx) = stored.position_of(&key) {
            stored.items.remove(idx);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamo::types::{AttributeDefinition, KeyElement, ScalarType};

    fn schema(name: &str) -> TableSchema {
        TableSchema::new(
            name,
            vec![KeyElement::partition("id")],
            vec![AttributeDefinition::new("id", ScalarType::String)],
        )
    }

    fn item(id: &str) -> Item {
        [("id".to_string(), AttributeValue::S(id.to_string()))]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn test_create_table_twice_fails() {
        let store = MemoryStore::default();
        store.create_table(&schema("t")).await.unwrap();
        let err = store.create_table(&schema("t")).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::TableAlreadyExists {
                table: "t".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_create_table_requires_key_definitions() {
        let store = MemoryStore::default();
        let bad = TableSchema::new("t", vec![KeyElement::partition("id")], Vec::new());
        assert!(matches!(
            store.create_table(&bad).await,
            Err(StoreError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_scan_pages_follow_cursor() {
        let store = MemoryStore::default().with_page_size(2);
        store.create_table(&schema("t")).await.unwrap();
        for id in ["a", "b", "c", "d", "e"] {
            store.put_item("t", item(id)).await.unwrap();
        }

        let first = store.scan_page("t", None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.last_evaluated_key, Some(item("b")));

        let second = store
            .scan_page("t", first.last_evaluated_key)
            .await
            .unwrap();
        assert_eq!(second.items, vec![item("c"), item("d")]);

        let last = store
            .scan_page("t", second.last_evaluated_key)
            .await
            .unwrap();
        assert_eq!(last.items, vec![item("e")]);
        assert!(last.last_evaluated_key.is_none());
    }

    #[tokio::test]
    async fn test_put_item_overwrites_existing_key() {
        let store = MemoryStore::default();
        store.create_table(&schema("t")).await.unwrap();

        let mut first = item("EMP001");
        first.insert("salary".to_string(), AttributeValue::N("1".to_string()));
        let mut second = item("EMP001");
        second.insert("salary".to_string(), AttributeValue::N("2".to_string()));

        store.put_item("t", first).await.unwrap();
        store.put_item("t", second.clone()).await.unwrap();

        assert_eq!(store.items("t").unwrap(), vec![second.clone()]);
        assert_eq!(
            store.get_item("t", item("EMP001")).await.unwrap(),
            Some(second)
        );
    }

    #[tokio::test]
    async fn test_put_item_rejects_missing_key() {
        let store = MemoryStore::default();
        store.create_table(&schema("t")).await.unwrap();
        let keyless: Item = [("name".to_string(), AttributeValue::S("x".to_string()))]
            .into_iter()
            .collect();
        assert!(matches!(
            store.put_item("t", keyless).await,
            Err(StoreError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_batch_write_limits() {
        let store = MemoryStore::default();
        store.create_table(&schema("t")).await.unwrap();

        let too_many: Vec<Item> = (0..26).map(|i| item(&format!("id-{}", i))).collect();
        assert!(store.batch_write("t", too_many).await.is_err());
        assert!(store.batch_write("t", Vec::new()).await.is_err());
        assert_eq!(store.batch_write_calls(), 0);
    }

    #[tokio::test]
    async fn test_throttled_batch_leaves_last_item_unprocessed() {
        let store = MemoryStore::default();
        store.create_table(&schema("t")).await.unwrap();
        store.throttle_batch_writes(1);

        let unprocessed = store
            .batch_write("t", vec![item("a"), item("b"), item("c")])
            .await
            .unwrap();
        assert_eq!(unprocessed, vec![item("c")]);
        assert_eq!(store.items("t").unwrap().len(), 2);

        let unprocessed = store.batch_write("t", unprocessed).await.unwrap();
        assert!(unprocessed.is_empty());
        assert_eq!(store.items("t").unwrap().len(), 3);
        assert_eq!(store.batch_write_calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_table_operations() {
        let store = MemoryStore::default();
        assert!(matches!(
            store.describe_table("nope").await,
            Err(StoreError::TableNotFound { .. })
        ));
        assert!(matches!(
            store.scan_page("nope", None).await,
            Err(StoreError::TableNotFound { .. })
        ));
        assert!(matches!(
            store.batch_write("nope", vec![item("a")]).await,
            Err(StoreError::TableNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_item_and_table() {
        let store = MemoryStore::default();
        store.create_table(&schema("t")).await.unwrap();
        store.put_item("t", item("a")).await.unwrap();

        store.delete_item("t", item("a")).await.unwrap();
        assert!(store.get_item("t", item("a")).await.unwrap().is_none());

        // Deleting an absent key is not an error
        store.delete_item("t", item("a")).await.unwrap();

        store.delete_table("t").await.unwrap();
        assert!(!store.has_table("t"));
        assert!(store.list_tables().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_describe_reports_count_and_size() {
        let store = MemoryStore::default();
        store.create_table(&schema("t")).await.unwrap();
        store.put_item("t", item("abc")).await.unwrap();

        let description = store.describe_table("t").await.unwrap();
        assert_eq!(description.item_count, 1);
        assert_eq!(description.size_bytes, 5);
        assert_eq!(description.status, TableStatus::Active);
    }

    #[tokio::test]
    async fn test_delayed_activation_reports_creating() {
        let store = MemoryStore::default();
        store.delay_activation(2);
        store.create_table(&schema("t")).await.unwrap();

        let mut statuses = Vec::new();
        for _ in 0..3 {
            statuses.push(store.describe_table("t").await.unwrap().status);
        }
        assert_eq!(
            statuses,
            vec![TableStatus::Creating, TableStatus::Creating, TableStatus::Active]
        );
    }
}
