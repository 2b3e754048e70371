// ABOUTME: Utility functions for validation and item formatting
// ABOUTME: Provides table name validation, JSON conversion and display helpers

use crate::config::Endpoint;
use anyhow::{bail, Context, Result};
use aws_sdk_dynamodb::types::AttributeValue;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_item};
use serde_json::Value;

use crate::dynamo::Item;

/// Validate a DynamoDB table name
///
/// DynamoDB table names must:
/// - Be 3-255 characters long
/// - Contain only letters, digits, underscore (_), hyphen (-) and dot (.)
///
/// # Arguments
///
/// * `name` - The table name to validate
///
/// # Returns
///
/// Returns `Ok(())` if the name is valid.
///
/// # Errors
///
/// Returns an error if the name is empty, has the wrong length, or contains
/// characters DynamoDB does not accept.
///
/// # Examples
///
/// ```
/// # use dynamodb_table_migrator::utils::validate_table_name;
/// # use anyhow::Result;
/// # fn example() -> Result<()> {
/// validate_table_name("employee")?;
/// validate_table_name("employee-prod.v2")?;
///
/// assert!(validate_table_name("ab").is_err());
/// assert!(validate_table_name("employee table").is_err());
/// # Ok(())
/// # }
/// ```
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Table name cannot be empty or whitespace-only");
    }

    let length = name.chars().count();
    if !(3..=255).contains(&length) {
        bail!(
            "Table name '{}' must be between 3 and 255 characters (got {})",
            sanitize_identifier(name),
            length
        );
    }

    for (i, c) in name.chars().enumerate() {
        if !c.is_ascii_alphanumeric() && !matches!(c, '_' | '-' | '.') {
            bail!(
                "Table name '{}' contains invalid character '{}' at position {}. \
                 Only letters, digits, '_', '-' and '.' are allowed",
                sanitize_identifier(name),
                if c.is_control() {
                    format!("\\x{:02x}", c as u32)
                } else {
                    c.to_string()
                },
                i
            );
        }
    }

    Ok(())
}

/// Sanitize an identifier for display
///
/// Removes control characters and limits length to prevent log injection and
/// keep error messages readable.
///
/// # Examples
///
/// ```
/// # use dynamodb_table_migrator::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_table"), "normal_table");
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
/// assert_eq!(sanitize_identifier(&"a".repeat(200)).len(), 100);
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Refuse to copy a table onto itself
///
/// Source and destination are the same table when both use the same endpoint
/// and the same table name. The create step would fail anyway, but catching it
/// up front gives a clearer message.
pub fn validate_source_destination_different(
    source: &Endpoint,
    source_table: &str,
    destination: &Endpoint,
    destination_table: &str,
) -> Result<()> {
    if source == destination && source_table == destination_table {
        bail!(
            "Source and destination are the same table!\n\
             \n\
             Table: {} on {}\n\
             \n\
             Pass a different destination table name or endpoint.",
            sanitize_identifier(source_table),
            source
        );
    }
    Ok(())
}

/// Convert an item to a JSON object for display, attribute names sorted
///
/// Binary values cannot be represented in JSON and are shown as
/// `"<binary: N bytes>"`.
pub fn item_to_json(item: &Item) -> Result<Value> {
    from_item(summarize_binary(item)).context("Failed to convert item to JSON")
}

fn summarize_binary(item: &Item) -> Item {
    fn summarize(value: &AttributeValue) -> AttributeValue {
        match value {
            AttributeValue::B(b) => {
                AttributeValue::S(format!("<binary: {} bytes>", b.as_ref().len()))
            }
            AttributeValue::Bs(values) => AttributeValue::Ss(
                values
                    .iter()
                    .map(|b| format!("<binary: {} bytes>", b.as_ref().len()))
                    .collect(),
            ),
            AttributeValue::L(values) => AttributeValue::L(values.iter().map(summarize).collect()),
            AttributeValue::M(map) => AttributeValue::M(summarize_binary(map)),
            other => other.clone(),
        }
    }

    item.iter()
        .map(|(name, value)| (name.clone(), summarize(value)))
        .collect()
}

/// Convert a JSON object into an item
///
/// Objects become maps and arrays become lists. Numbers keep their exact
/// decimal text, so values beyond `f64` precision survive.
pub fn json_to_item(value: &Value) -> Result<Item> {
    if !value.is_object() {
        bail!("Expected a JSON object for an item, got: {}", value);
    }
    to_item(value).context("Failed to convert JSON object to an item")
}

/// Format a byte count as a human-readable string
///
/// # Examples
///
/// ```
/// # use dynamodb_table_migrator::utils::format_bytes;
/// assert_eq!(format_bytes(512), "512.0 B");
/// assert_eq!(format_bytes(2048), "2.0 KB");
/// ```
pub fn format_bytes(bytes: i64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.1} {}", size, UNITS[unit_idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_table_name_valid() {
        assert!(validate_table_name("employee").is_ok());
        assert!(validate_table_name("employee-prod").is_ok());
        assert!(validate_table_name("orders_2024.v1").is_ok());
        assert!(validate_table_name(&"a".repeat(255)).is_ok());
    }

    #[test]
    fn test_validate_table_name_invalid() {
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("   ").is_err());
        assert!(validate_table_name("ab").is_err());
        assert!(validate_table_name(&"a".repeat(256)).is_err());
        assert!(validate_table_name("employee table").is_err());
        assert!(validate_table_name("employee/prod").is_err());

        let err = validate_table_name("bad\nname").unwrap_err().to_string();
        assert!(err.contains("\\x0a"));
        assert!(err.contains("'badname'"));
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("table\x00name"), "tablename");
        assert_eq!(sanitize_identifier(&"x".repeat(150)).len(), 100);
    }

    #[test]
    fn test_same_table_rejected() {
        let local = Endpoint::Local {
            url: "http://localhost:8000".to_string(),
            region: None,
            profile: None,
        };
        let cloud = Endpoint::Cloud {
            region: None,
            profile: None,
        };

        assert!(
            validate_source_destination_different(&local, "employee", &local, "employee").is_err()
        );
        assert!(
            validate_source_destination_different(&local, "employee", &local, "employee-copy")
                .is_ok()
        );
        assert!(
            validate_source_destination_different(&local, "employee", &cloud, "employee").is_ok()
        );
    }

    #[test]
    fn test_json_to_item_attribute_types() {
        let item = json_to_item(&json!({
            "id": "EMP001",
            "salary": 95000,
            "rating": 4.5,
            "active": true,
            "manager": null,
            "skills": ["rust", "go"],
            "address": {"city": "Austin"}
        }))
        .unwrap();

        assert_eq!(item.get("id"), Some(&AttributeValue::S("EMP001".to_string())));
        assert_eq!(item.get("salary"), Some(&AttributeValue::N("95000".to_string())));
        assert_eq!(item.get("rating"), Some(&AttributeValue::N("4.5".to_string())));
        assert_eq!(item.get("active"), Some(&AttributeValue::Bool(true)));
        assert_eq!(item.get("manager"), Some(&AttributeValue::Null(true)));
        assert!(matches!(item.get("skills"), Some(AttributeValue::L(v)) if v.len() == 2));
        assert!(matches!(item.get("address"), Some(AttributeValue::M(_))));
    }

    #[test]
    fn test_json_to_item_keeps_large_numbers_exact() {
        let value: Value =
            serde_json::from_str(r#"{"id": "A", "big": 123456789012345678901}"#).unwrap();
        let item = json_to_item(&value).unwrap();

        assert_eq!(
            item.get("big"),
            Some(&AttributeValue::N("123456789012345678901".to_string()))
        );
    }

    #[test]
    fn test_json_to_item_rejects_non_objects() {
        assert!(json_to_item(&json!([1, 2])).is_err());
        assert!(json_to_item(&json!("id")).is_err());
    }

    #[test]
    fn test_item_to_json() {
        let item: Item = [
            ("id".to_string(), AttributeValue::S("EMP001".to_string())),
            ("salary".to_string(), AttributeValue::N("95000".to_string())),
            (
                "tags".to_string(),
                AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]),
            ),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            item_to_json(&item).unwrap(),
            json!({"id": "EMP001", "salary": 95000, "tags": ["a", "b"]})
        );
    }

    #[test]
    fn test_item_to_json_summarizes_binary() {
        let item: Item = [
            ("id".to_string(), AttributeValue::S("doc".to_string())),
            (
                "payload".to_string(),
                AttributeValue::B(aws_sdk_dynamodb::primitives::Blob::new(vec![0u8; 16])),
            ),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            item_to_json(&item).unwrap(),
            json!({"id": "doc", "payload": "<binary: 16 bytes>"})
        );
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
