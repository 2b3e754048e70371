// ABOUTME: Table schema and item types shared by every table store
// ABOUTME: Key schema, attribute definitions, billing mode, indexes and scan pages

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use std::fmt;

/// A DynamoDB item: attribute name to value
pub type Item = HashMap<String, AttributeValue>;

/// Role an attribute plays in a key schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    /// Partition key (`HASH`)
    Partition,
    /// Sort key (`RANGE`)
    Sort,
}

impl KeyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyRole::Partition => "HASH",
            KeyRole::Sort => "RANGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyElement {
    pub attribute_name: String,
    pub role: KeyRole,
}

impl KeyElement {
    pub fn partition(name: impl Into<String>) -> Self {
        Self {
            attribute_name: name.into(),
            role: KeyRole::Partition,
        }
    }

    pub fn sort(name: impl Into<String>) -> Self {
        Self {
            attribute_name: name.into(),
            role: KeyRole::Sort,
        }
    }
}

impl fmt::Display for KeyElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.attribute_name, self.role.as_str())
    }
}

/// Scalar types allowed for key attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Number,
    Binary,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::String => "S",
            ScalarType::Number => "N",
            ScalarType::Binary => "B",
        }
    }

    /// Whether `value` has this scalar type
    pub fn matches(&self, value: &AttributeValue) -> bool {
        matches!(
            (self, value),
            (ScalarType::String, AttributeValue::S(_))
                | (ScalarType::Number, AttributeValue::N(_))
                | (ScalarType::Binary, AttributeValue::B(_))
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: ScalarType,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, attribute_type: ScalarType) -> Self {
        Self {
            attribute_name: name.into(),
            attribute_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillingMode {
    /// `PAY_PER_REQUEST`
    #[default]
    OnDemand,
    /// `PROVISIONED`
    Provisioned,
}

impl BillingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingMode::OnDemand => "PAY_PER_REQUEST",
            BillingMode::Provisioned => "PROVISIONED",
        }
    }
}

impl fmt::Display for BillingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionedThroughput {
    pub read_capacity_units: i64,
    pub write_capacity_units: i64,
}

impl Default for ProvisionedThroughput {
    fn default() -> Self {
        Self {
            read_capacity_units: 5,
            write_capacity_units: 5,
        }
    }
}

/// Which attributes a secondary index copies from the base table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    KeysOnly,
    Include(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryIndex {
    pub index_name: String,
    pub key_schema: Vec<KeyElement>,
    pub projection: Projection,
    /// Only meaningful for global indexes on provisioned tables
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

/// Everything needed to create a table with the same shape as another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table_name: String,
    pub key_schema: Vec<KeyElement>,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub billing_mode: BillingMode,
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    pub global_secondary_indexes: Vec<SecondaryIndex>,
    pub local_secondary_indexes: Vec<SecondaryIndex>,
}

impl TableSchema {
    /// Create an on-demand schema without secondary indexes
    pub fn new(
        table_name: impl Into<String>,
        key_schema: Vec<KeyElement>,
        attribute_definitions: Vec<AttributeDefinition>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            key_schema,
            attribute_definitions,
            billing_mode: BillingMode::OnDemand,
            provisioned_throughput: None,
            global_secondary_indexes: Vec::new(),
            local_secondary_indexes: Vec::new(),
        }
    }

    pub fn partition_key(&self) -> Option<&str> {
        self.key_attribute(KeyRole::Partition)
    }

    pub fn sort_key(&self) -> Option<&str> {
        self.key_attribute(KeyRole::Sort)
    }

    fn key_attribute(&self, role: KeyRole) -> Option<&str> {
        self.key_schema
            .iter()
            .find(|key| key.role == role)
            .map(|key| key.attribute_name.as_str())
    }

    pub fn attribute_type(&self, name: &str) -> Option<ScalarType> {
        self.attribute_definitions
            .iter()
            .find(|def| def.attribute_name == name)
            .map(|def| def.attribute_type)
    }

    /// Extract the primary key attributes of `item`
    ///
    /// Returns `None` if any key attribute is missing or has the wrong type.
    pub fn key_of(&self, item: &Item) -> Option<Item> {
        let mut key = Item::new();
        for element in &self.key_schema {
            let value = item.get(&element.attribute_name)?;
            let expected = self.attribute_type(&element.attribute_name)?;
            if !expected.matches(value) {
                return None;
            }
            key.insert(element.attribute_name.clone(), value.clone());
        }
        Some(key)
    }

    /// Key schema rendered as `id (HASH), created_at (RANGE)`
    pub fn describe_keys(&self) -> String {
        self.key_schema
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    Other,
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TableStatus::Creating => "CREATING",
            TableStatus::Active => "ACTIVE",
            TableStatus::Updating => "UPDATING",
            TableStatus::Deleting => "DELETING",
            TableStatus::Other => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Schema plus the live state an endpoint reports for a table
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescription {
    pub schema: TableSchema,
    pub status: TableStatus,
    pub item_count: i64,
    pub size_bytes: i64,
}

/// One page of a paginated scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Cursor for the next page; `None` once the scan is exhausted
    pub last_evaluated_key: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountPage {
    pub count: usize,
    pub last_evaluated_key: Option<Item>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composite_schema() -> TableSchema {
        TableSchema::new(
            "orders",
            vec![KeyElement::partition("pk"), KeyElement::sort("sk")],
            vec![
                AttributeDefinition::new("pk", ScalarType::String),
                AttributeDefinition::new("sk", ScalarType::Number),
            ],
        )
    }

    #[test]
    fn test_key_accessors() {
        let schema = composite_schema();
        assert_eq!(schema.partition_key(), Some("pk"));
        assert_eq!(schema.sort_key(), Some("sk"));
        assert_eq!(schema.attribute_type("sk"), Some(ScalarType::Number));
        assert_eq!(schema.attribute_type("missing"), None);
        assert_eq!(schema.describe_keys(), "pk (HASH), sk (RANGE)");
    }

    #[test]
    fn test_key_of_extracts_only_key_attributes() {
        let schema = composite_schema();
        let item: Item = [
            ("pk".to_string(), AttributeValue::S("user#1".into())),
            ("sk".to_string(), AttributeValue::N("42".into())),
            ("total".to_string(), AttributeValue::N("9.99".into())),
        ]
        .into_iter()
        .collect();

        let key = schema.key_of(&item).unwrap();
        assert_eq!(key.len(), 2);
        assert_eq!(key.get("sk"), Some(&AttributeValue::N("42".into())));
    }

    #[test]
    fn test_key_of_rejects_wrong_type() {
        let schema = composite_schema();
        let item: Item = [
            ("pk".to_string(), AttributeValue::S("user#1".into())),
            ("sk".to_string(), AttributeValue::S("not-a-number".into())),
        ]
        .into_iter()
        .collect();

        assert!(schema.key_of(&item).is_none());
    }

    #[test]
    fn test_key_of_rejects_missing_sort_key() {
        let schema = composite_schema();
        let item: Item = [("pk".to_string(), AttributeValue::S("user#1".into()))]
            .into_iter()
            .collect();

        assert!(schema.key_of(&item).is_none());
    }

    #[test]
    fn test_billing_mode_labels() {
        assert_eq!(BillingMode::default(), BillingMode::OnDemand);
        assert_eq!(BillingMode::OnDemand.to_string(), "PAY_PER_REQUEST");
        assert_eq!(BillingMode::Provisioned.to_string(), "PROVISIONED");
    }
}
