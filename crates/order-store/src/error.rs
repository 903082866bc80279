use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key is already taken.
    #[error("Duplicate {entity}: {key}")]
    DuplicateKey { entity: &'static str, key: String },

    /// A value does not fit the column it is written to.
    #[error("Value out of range for {field}: {value}")]
    OutOfRange { field: &'static str, value: u64 },

    /// A stored row could not be mapped back to the data model.
    #[error("Invalid stored row: {0}")]
    InvalidRow(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
