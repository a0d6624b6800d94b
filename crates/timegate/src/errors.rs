//! Error types for Timegate
//!
//! Persistence failures from SeaORM are carried unchanged inside
//! [`ActivationError::Database`]; the remaining variants describe
//! misconfiguration detected at startup.

use thiserror::Error;

/// Result type alias using ActivationError
pub type Result<T> = std::result::Result<T, ActivationError>;

/// Activation error types
#[derive(Error, Debug)]
pub enum ActivationError {
    // Host data-access errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    // Column naming errors
    #[error("Unknown column `{column}` on entity `{entity}`")]
    UnknownColumn { entity: String, column: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),
}

impl ActivationError {
    /// Check if this error came from the host data-access layer
    pub fn is_database_error(&self) -> bool {
        matches!(self, ActivationError::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_passthrough() {
        let err: ActivationError = sea_orm::DbErr::RecordNotUpdated.into();
        assert!(err.is_database_error());
        assert!(matches!(
            err,
            ActivationError::Database(sea_orm::DbErr::RecordNotUpdated)
        ));
    }

    #[test]
    fn test_unknown_column_message() {
        let err = ActivationError::UnknownColumn {
            entity: "promotions".into(),
            column: "enabled".into(),
        };
        assert!(!err.is_database_error());
        assert_eq!(
            err.to_string(),
            "Unknown column `enabled` on entity `promotions`"
        );
    }
}
