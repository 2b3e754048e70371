// ABOUTME: Table store abstraction over DynamoDB endpoints
// ABOUTME: One trait implemented by the AWS SDK client and by an in-memory store

pub mod client;
pub mod error;
pub mod memory;
pub mod types;

pub use client::DynamoClient;
pub use error::{find_store_error, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use types::{
    AttributeDefinition, BillingMode, CountPage, Item, KeyElement, KeyRole, Projection,
    ProvisionedThroughput, ScalarType, ScanPage, SecondaryIndex, TableDescription, TableSchema,
    TableStatus,
};

/// Maximum number of put requests DynamoDB accepts in one `BatchWriteItem` call
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// The DynamoDB operations the migrator needs from an endpoint
///
/// Each method maps to a single DynamoDB API request. Pagination and batching
/// policy live in the callers (see [`crate::migration`]); implementations only
/// translate one request and its response.
#[allow(async_fn_in_trait)]
pub trait TableStore {
    /// Human-readable endpoint name used in log lines
    fn endpoint_label(&self) -> &str;

    async fn list_tables(&self) -> StoreResult<Vec<String>>;

    /// Fails with [`StoreError::TableNotFound`] if the table does not exist
    async fn describe_table(&self, table: &str) -> StoreResult<TableDescription>;

    /// Fails with [`StoreError::TableAlreadyExists`] if the name is taken
    async fn create_table(&self, schema: &TableSchema) -> StoreResult<()>;

    async fn delete_table(&self, table: &str) -> StoreResult<()>;

    /// Read one page of items starting after `exclusive_start_key`
    async fn scan_page(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
    ) -> StoreResult<ScanPage>;

    /// Count one page of items starting after `exclusive_start_key`
    async fn count_page(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
    ) -> StoreResult<CountPage>;

    /// Issue one batch write of up to 25 puts
    ///
    /// Returns the items the endpoint left unprocessed.
    async fn batch_write(&self, table: &str, items: Vec<Item>) -> StoreResult<Vec<Item>>;

    async fn put_item(&self, table: &str, item: Item) -> StoreResult<()>;

    async fn get_item(&self, table: &str, key: Item) -> StoreResult<Option<Item>>;

    async fn delete_item(&self, table: &str, key: Item) -> StoreResult<()>;
}
