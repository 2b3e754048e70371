// ABOUTME: AWS SDK backed table store for DynamoDB Local and AWS DynamoDB
// ABOUTME: Builds clients per endpoint and converts SDK shapes and errors

use super::error::{StoreError, StoreResult};
use super::types::{
    AttributeDefinition, BillingMode, CountPage, Item, KeyElement, KeyRole, Projection,
    ProvisionedThroughput, ScalarType, ScanPage, SecondaryIndex, TableDescription, TableSchema,
    TableStatus,
};
use super::{TableStore, MAX_BATCH_WRITE_ITEMS};
use crate::config::{Endpoint, DEFAULT_LOCAL_REGION};
use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_config::default_provider::region::DefaultRegionChain;
use aws_config::meta::credentials::CredentialsProviderChain;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext};
use aws_sdk_dynamodb::operation::{
    batch_write_item::BatchWriteItemError, create_table::CreateTableError,
    delete_item::DeleteItemError, delete_table::DeleteTableError,
    describe_table::DescribeTableError, get_item::GetItemError, put_item::PutItemError,
    scan::ScanError,
};
use aws_sdk_dynamodb::types as sdk;
use aws_sdk_dynamodb::Client;

/// DynamoDB client bound to one endpoint
///
/// Constructed explicitly per command run and passed by reference to each
/// migration stage.
#[derive(Debug, Clone)]
pub struct DynamoClient {
    client: Client,
    label: String,
}

impl DynamoClient {
    /// Build a client for `endpoint`
    ///
    /// Credentials and region come from the standard AWS provider chain
    /// (environment, shared config files, profiles). DynamoDB Local keeps one
    /// database per access key and region, so a local client resolves the
    /// chain like any other AWS tool would and only falls back to static
    /// placeholder credentials and `us-east-1` when the chain has none.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use dynamodb_table_migrator::config::MigratorConfig;
    /// # use dynamodb_table_migrator::dynamo::DynamoClient;
    /// # async fn example() -> anyhow::Result<()> {
    /// let config = MigratorConfig::load(None)?;
    /// let local = DynamoClient::connect(&config.endpoint(true)).await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(endpoint: &Endpoint) -> Self {
        let sdk_config = match endpoint {
            Endpoint::Local {
                url,
                region,
                profile,
            } => {
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .endpoint_url(url.as_str())
                    .region(local_region_provider(region.as_deref(), profile.as_deref()))
                    .credentials_provider(local_credentials_provider(profile.as_deref()).await);
                if let Some(profile) = profile {
                    loader = loader.profile_name(profile);
                }
                loader.load().await
            }
            Endpoint::Cloud { region, profile } => {
                let mut loader = aws_config::defaults(BehaviorVersion::latest());
                if let Some(region) = region {
                    loader = loader.region(Region::new(region.clone()));
                }
                if let Some(profile) = profile {
                    loader = loader.profile_name(profile);
                }
                loader.load().await
            }
        };

        tracing::debug!("Created DynamoDB client for {}", endpoint);

        Self {
            client: Client::new(&sdk_config),
            label: endpoint.to_string(),
        }
    }
}

/// Region for a DynamoDB Local client
///
/// A region from the config file wins, then the provider chain
/// (`AWS_REGION`, profile), then [`DEFAULT_LOCAL_REGION`].
fn local_region_provider(region: Option<&str>, profile: Option<&str>) -> RegionProviderChain {
    let mut chain = DefaultRegionChain::builder();
    if let Some(profile) = profile {
        chain = chain.profile_name(profile);
    }
    RegionProviderChain::first_try(region.map(|region| Region::new(region.to_string())))
        .or_else(chain.build())
        .or_else(Region::new(DEFAULT_LOCAL_REGION))
}

/// Credentials for a DynamoDB Local client: the provider chain first, then
/// placeholders (DynamoDB Local accepts any key)
async fn local_credentials_provider(profile: Option<&str>) -> CredentialsProviderChain {
    let mut chain = DefaultCredentialsChain::builder();
    if let Some(profile) = profile {
        chain = chain.profile_name(profile);
    }
    CredentialsProviderChain::first_try("default-chain", chain.build().await).or_else(
        "dynamodb-local",
        Credentials::new("local", "local", None, None, "dynamodb-local"),
    )
}

impl TableStore for DynamoClient {
    fn endpoint_label(&self) -> &str {
        &self.label
    }

    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        let mut tables = Vec::new();
        let mut start: Option<String> = None;

        loop {
            let output = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start.take())
                .send()
                .await
                .map_err(|err| provider_error("ListTables", err))?;

            tables.extend(output.table_names.unwrap_or_default());
            match output.last_evaluated_table_name {
                Some(name) => start = Some(name),
                None => break,
            }
        }

        Ok(tables)
    }

    async fn describe_table(&self, table: &str) -> StoreResult<TableDescription> {
        let output = self
            .client
            .describe_table()
            .table_name(table)
            .send()
            .await
            .map_err(|err| match err.into_service_error() {
                DescribeTableError::ResourceNotFoundException(_) => StoreError::TableNotFound {
                    table: table.to_string(),
                },
                other => provider_error("DescribeTable", other),
            })?;

        let description = output
            .table()
            .ok_or_else(|| StoreError::Provider {
                operation: "DescribeTable",
                message: format!("response for '{}' carried no table description", table),
            })?;

        description_from_sdk(description)
    }

    async fn create_table(&self, schema: &TableSchema) -> StoreResult<()> {
        let provisioned = schema.billing_mode == BillingMode::Provisioned;

        let mut request = self
            .client
            .create_table()
            .table_name(&schema.table_name)
            .set_key_schema(Some(key_schema_to_sdk(&schema.key_schema)?))
            .set_attribute_definitions(Some(attribute_definitions_to_sdk(
                &schema.attribute_definitions,
            )?))
            .billing_mode(billing_mode_to_sdk(schema.billing_mode));

        if provisioned {
            request = request.provisioned_throughput(throughput_to_sdk(
                schema.provisioned_throughput.unwrap_or_default(),
            )?);
        }

        if !schema.global_secondary_indexes.is_empty() {
            let indexes = schema
                .global_secondary_indexes
                .iter()
                .map(|index| global_index_to_sdk(index, provisioned))
                .collect::<StoreResult<Vec<_>>>()?;
            request = request.set_global_secondary_indexes(Some(indexes));
        }

        if !schema.local_secondary_indexes.is_empty() {
            let indexes = schema
                .local_secondary_indexes
                .iter()
                .map(local_index_to_sdk)
                .collect::<StoreResult<Vec<_>>>()?;
            request = request.set_local_secondary_indexes(Some(indexes));
        }

        request
            .send()
            .await
            .map_err(|err| match err.into_service_error() {
                CreateTableError::ResourceInUseException(_) => StoreError::TableAlreadyExists {
                    table: schema.table_name.clone(),
                },
                other => provider_error("CreateTable", other),
            })?;

        Ok(())
    }

    async fn delete_table(&self, table: &str) -> StoreResult<()> {
        self.client
            .delete_table()
            .table_name(table)
            .send()
            .await
            .map_err(|err| match err.into_service_error() {
                DeleteTableError::ResourceNotFoundException(_) => StoreError::TableNotFound {
                    table: table.to_string(),
                },
                other => provider_error("DeleteTable", other),
            })?;
        Ok(())
    }

    async fn scan_page(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
    ) -> StoreResult<ScanPage> {
        let output = self
            .client
            .scan()
            .table_name(table)
            .set_exclusive_start_key(exclusive_start_key)
            .send()
            .await
            .map_err(|err| scan_error(table, err.into_service_error()))?;

        Ok(ScanPage {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }

    async fn count_page(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
    ) -> StoreResult<CountPage> {
        let output = self
            .client
            .scan()
            .table_name(table)
            .select(sdk::Select::Count)
            .set_exclusive_start_key(exclusive_start_key)
            .send()
            .await
            .map_err(|err| scan_error(table, err.into_service_error()))?;

        Ok(CountPage {
            count: output.count().max(0) as usize,
            last_evaluated_key: output.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }

    async fn batch_write(&self, table: &str, items: Vec<Item>) -> StoreResult<Vec<Item>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        if items.len() > MAX_BATCH_WRITE_ITEMS {
            return Err(StoreError::validation(format!(
                "batch of {} items exceeds the BatchWriteItem limit of {}",
                items.len(),
                MAX_BATCH_WRITE_ITEMS
            )));
        }

        let requests = items
            .into_iter()
            .map(|item| {
                sdk::PutRequest::builder()
                    .set_item(Some(item))
                    .build()
                    .map(|put| sdk::WriteRequest::builder().put_request(put).build())
                    .map_err(build_error)
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table, requests)
            .send()
            .await
            .map_err(|err| match err.into_service_error() {
                BatchWriteItemError::ResourceNotFoundException(_) => StoreError::TableNotFound {
                    table: table.to_string(),
                },
                other => provider_error("BatchWriteItem", other),
            })?;

        let unprocessed = output
            .unprocessed_items
            .and_then(|mut pending| pending.remove(table))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|request| request.put_request.map(|put| put.item))
            .collect();

        Ok(unprocessed)
    }

    async fn put_item(&self, table: &str, item: Item) -> StoreResult<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|err| match err.into_service_error() {
                PutItemError::ResourceNotFoundException(_) => StoreError::TableNotFound {
                    table: table.to_string(),
                },
                other => provider_error("PutItem", other),
            })?;
        Ok(())
    }

    async fn get_item(&self, table: &str, key: Item) -> StoreResult<Option<Item>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|err| match err.into_service_error() {
                GetItemError::ResourceNotFoundException(_) => StoreError::TableNotFound {
                    table: table.to_string(),
                },
                other => provider_error("GetItem", other),
            })?;
        Ok(output.item)
    }

    async fn delete_item(&self, table: &str, key: Item) -> StoreResult<()> {
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|err| match err.into_service_error() {
                DeleteItemError::ResourceNotFoundException(_) => StoreError::TableNotFound {
                    table: table.to_string(),
                },
                other => provider_error("DeleteItem", other),
            })?;
        Ok(())
    }
}

fn provider_error<E: std::error::Error>(operation: &'static str, err: E) -> StoreError {
    StoreError::Provider {
        operation,
        message: DisplayErrorContext(&err).to_string(),
    }
}

fn build_error(err: BuildError) -> StoreError {
    StoreError::validation(err.to_string())
}

fn scan_error(table: &str, err: ScanError) -> StoreError {
    match err {
        ScanError::ResourceNotFoundException(_) => StoreError::TableNotFound {
            table: table.to_string(),
        },
        other => provider_error("Scan", other),
    }
}

fn key_schema_to_sdk(keys: &[KeyElement]) -> StoreResult<Vec<sdk::KeySchemaElement>> {
    keys.iter()
        .map(|key| {
            let key_type = match key.role {
                KeyRole::Partition => sdk::KeyType::Hash,
                KeyRole::Sort => sdk::KeyType::Range,
            };
            sdk::KeySchemaElement::builder()
                .attribute_name(&key.attribute_name)
                .key_type(key_type)
                .build()
                .map_err(build_error)
        })
        .collect()
}

fn key_schema_from_sdk(keys: &[sdk::KeySchemaElement]) -> StoreResult<Vec<KeyElement>> {
    keys.iter()
        .map(|key| {
            let role = match key.key_type() {
                sdk::KeyType::Hash => KeyRole::Partition,
                sdk::KeyType::Range => KeyRole::Sort,
                other => {
                    return Err(StoreError::validation(format!(
                        "unsupported key type '{}' on attribute '{}'",
                        other.as_str(),
                        key.attribute_name()
                    )))
                }
            };
            Ok(KeyElement {
                attribute_name: key.attribute_name().to_string(),
                role,
            })
        })
        .collect()
}

fn attribute_definitions_to_sdk(
    definitions: &[AttributeDefinition],
) -> StoreResult<Vec<sdk::AttributeDefinition>> {
    definitions
        .iter()
        .map(|def| {
            let attribute_type = match def.attribute_type {
                ScalarType::String => sdk::ScalarAttributeType::S,
                ScalarType::Number => sdk::ScalarAttributeType::N,
                ScalarType::Binary => sdk::ScalarAttributeType::B,
            };
            sdk::AttributeDefinition::builder()
                .attribute_name(&def.attribute_name)
                .attribute_type(attribute_type)
                .build()
                .map_err(build_error)
        })
        .collect()
}

fn attribute_definitions_from_sdk(
    definitions: &[sdk::AttributeDefinition],
) -> StoreResult<Vec<AttributeDefinition>> {
    definitions
        .iter()
        .map(|def| {
            let attribute_type = match def.attribute_type() {
                sdk::ScalarAttributeType::S => ScalarType::String,
                sdk::ScalarAttributeType::N => ScalarType::Number,
                sdk::ScalarAttributeType::B => ScalarType::Binary,
                other => {
                    return Err(StoreError::validation(format!(
                        "unsupported attribute type '{}' on attribute '{}'",
                        other.as_str(),
                        def.attribute_name()
                    )))
                }
            };
            Ok(AttributeDefinition::new(def.attribute_name(), attribute_type))
        })
        .collect()
}

fn billing_mode_to_sdk(mode: BillingMode) -> sdk::BillingMode {
    match mode {
        BillingMode::OnDemand => sdk::BillingMode::PayPerRequest,
        BillingMode::Provisioned => sdk::BillingMode::Provisioned,
    }
}

fn throughput_to_sdk(throughput: ProvisionedThroughput) -> StoreResult<sdk::ProvisionedThroughput> {
    sdk::ProvisionedThroughput::builder()
        .read_capacity_units(throughput.read_capacity_units)
        .write_capacity_units(throughput.write_capacity_units)
        .build()
        .map_err(build_error)
}

fn throughput_from_sdk(
    throughput: &sdk::ProvisionedThroughputDescription,
) -> ProvisionedThroughput {
    ProvisionedThroughput {
        read_capacity_units: throughput.read_capacity_units().unwrap_or(0),
        write_capacity_units: throughput.write_capacity_units().unwrap_or(0),
    }
}

fn projection_to_sdk(projection: &Projection) -> sdk::Projection {
    match projection {
        Projection::All => sdk::Projection::builder()
            .projection_type(sdk::ProjectionType::All)
            .build(),
        Projection::KeysOnly => sdk::Projection::builder()
            .projection_type(sdk::ProjectionType::KeysOnly)
            .build(),
        Projection::Include(attributes) => sdk::Projection::builder()
            .projection_type(sdk::ProjectionType::Include)
            .set_non_key_attributes(Some(attributes.clone()))
            .build(),
    }
}

fn projection_from_sdk(projection: Option<&sdk::Projection>) -> Projection {
    let Some(projection) = projection else {
        return Projection::All;
    };
    match projection.projection_type() {
        Some(sdk::ProjectionType::KeysOnly) => Projection::KeysOnly,
        Some(sdk::ProjectionType::Include) => {
            Projection::Include(projection.non_key_attributes().to_vec())
        }
        _ => Projection::All,
    }
}

fn global_index_to_sdk(
    index: &SecondaryIndex,
    provisioned: bool,
) -> StoreResult<sdk::GlobalSecondaryIndex> {
    let throughput = if provisioned {
        Some(throughput_to_sdk(
            index.provisioned_throughput.unwrap_or_default(),
        )?)
    } else {
        None
    };

    sdk::GlobalSecondaryIndex::builder()
        .index_name(&index.index_name)
        .set_key_schema(Some(key_schema_to_sdk(&index.key_schema)?))
        .projection(projection_to_sdk(&index.projection))
        .set_provisioned_throughput(throughput)
        .build()
        .map_err(build_error)
}

fn local_index_to_sdk(index: &SecondaryIndex) -> StoreResult<sdk::LocalSecondaryIndex> {
    sdk::LocalSecondaryIndex::builder()
        .index_name(&index.index_name)
        .set_key_schema(Some(key_schema_to_sdk(&index.key_schema)?))
        .projection(projection_to_sdk(&index.projection))
        .build()
        .map_err(build_error)
}

fn table_status_from_sdk(status: Option<&sdk::TableStatus>) -> TableStatus {
    match status {
        Some(sdk::TableStatus::Active) => TableStatus::Active,
        Some(sdk::TableStatus::Creating) => TableStatus::Creating,
        Some(sdk::TableStatus::Updating) => TableStatus::Updating,
        Some(sdk::TableStatus::Deleting) => TableStatus::Deleting,
        _ => TableStatus::Other,
    }
}

fn description_from_sdk(table: &sdk::TableDescription) -> StoreResult<TableDescription> {
    // DynamoDB omits the billing summary for tables that were always provisioned
    let billing_mode = match table
        .billing_mode_summary()
        .and_then(|summary| summary.billing_mode())
    {
        Some(sdk::BillingMode::PayPerRequest) => BillingMode::OnDemand,
        _ => BillingMode::Provisioned,
    };

    let provisioned_throughput = match billing_mode {
        BillingMode::Provisioned => table.provisioned_throughput().map(throughput_from_sdk),
        BillingMode::OnDemand => None,
    };

    let global_secondary_indexes = table
        .global_secondary_indexes()
        .iter()
        .map(|index| {
            Ok(SecondaryIndex {
                index_name: index.index_name().unwrap_or_default().to_string(),
                key_schema: key_schema_from_sdk(index.key_schema())?,
                projection: projection_from_sdk(index.projection()),
                provisioned_throughput: match billing_mode {
                    BillingMode::Provisioned => {
                        index.provisioned_throughput().map(throughput_from_sdk)
                    }
                    BillingMode::OnDemand => None,
                },
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;

    let local_secondary_indexes = table
        .local_secondary_indexes()
        .iter()
        .map(|index| {
            Ok(SecondaryIndex {
                index_name: index.index_name().unwrap_or_default().to_string(),
                key_schema: key_schema_from_sdk(index.key_schema())?,
                projection: projection_from_sdk(index.projection()),
                provisioned_throughput: None,
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(TableDescription {
        schema: TableSchema {
            table_name: table.table_name().unwrap_or_default().to_string(),
            key_schema: key_schema_from_sdk(table.key_schema())?,
            attribute_definitions: attribute_definitions_from_sdk(table.attribute_definitions())?,
            billing_mode,
            provisioned_throughput,
            global_secondary_indexes,
            local_secondary_indexes,
        },
        status: table_status_from_sdk(table.table_status()),
        item_count: table.item_count().unwrap_or(0),
        size_bytes: table.table_size_bytes().unwrap_or(0),
    })
}
