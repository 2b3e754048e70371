// ABOUTME: Typed errors returned by DynamoDB table stores
// ABOUTME: Separates missing tables and name collisions from generic provider failures

use thiserror::Error;

/// Failure reported by a [`TableStore`](super::TableStore) operation
///
/// The migration flow distinguishes a missing source table and an occupied
/// destination name from everything else (network, credentials, throttling),
/// which lands in [`StoreError::Provider`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Table '{table}' does not exist")]
    TableNotFound { table: String },

    #[error("Table '{table}' already exists")]
    TableAlreadyExists { table: String },

    #[error("{count} item(s) were still unprocessed after retrying batch writes to '{table}'")]
    UnprocessedItems { table: String, count: usize },

    #[error("Invalid request: {message}")]
    Validation { message: String },

    #[error("{operation} failed: {message}")]
    Provider {
        operation: &'static str,
        message: String,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation {
            message: message.into(),
        }
    }
}

/// Find the first [`StoreError`] in an error chain
///
/// Application code wraps store failures in `anyhow` context as they bubble
/// up; this recovers the typed cause so callers can react to it.
pub fn find_store_error(err: &anyhow::Error) -> Option<&StoreError> {
    err.chain().find_map(|cause| cause.downcast_ref::<StoreError>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_find_store_error_through_context() {
        let result: anyhow::Result<()> = Err(StoreError::TableNotFound {
            table: "employee".to_string(),
        })
        .context("Failed to read schema")
        .context("Migration aborted");

        let err = result.unwrap_err();
        assert_eq!(
            find_store_error(&err),
            Some(&StoreError::TableNotFound {
                table: "employee".to_string()
            })
        );
    }

    #[test]
    fn test_find_store_error_absent() {
        let err = anyhow::anyhow!("plain failure");
        assert!(find_store_error(&err).is_none());
    }

    #[test]
    fn test_display_messages() {
        let err = StoreError::TableAlreadyExists {
            table: "orders".to_string(),
        };
        assert_eq!(err.to_string(), "Table 'orders' already exists");

        let err = StoreError::Provider {
            operation: "Scan",
            message: "throttled".to_string(),
        };
        assert_eq!(err.to_string(), "Scan failed: throttled");
    }
}
