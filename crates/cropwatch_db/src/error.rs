//! Error types for the device-configuration store.

use thiserror::Error;

/// Store operation result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Device-configuration store errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error (connection, query, etc.)
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// IO error (bridge runtime construction)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No active, non-deleted configuration row for the device
    #[error("No active configuration for device {0}")]
    NotFound(u32),

    /// Configuration row exists but the nutrient JSON document is missing
    /// the expected paths
    #[error("Configuration JSON mismatch for device {device_id}: {detail}")]
    SchemaMismatch { device_id: u32, detail: String },

    /// Update matched no active row (deactivated or deleted since startup)
    #[error("Setpoint update for device {0} affected no rows")]
    NoActiveRow(u32),
}
