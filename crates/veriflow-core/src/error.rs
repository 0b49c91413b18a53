//! Error types module
//!
//! All errors are unified under the `AppError` enum. Every variant maps to a
//! stable, named condition so a front end can render a specific message
//! rather than a generic failure.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature. With `default-features = false` the enum carries the database
//! failure as a plain string instead.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like denied access checks
    Debug,
    /// Warning level - for suspicious but recoverable conditions
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their HTTP response characteristics.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "CONFLICT")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Store unavailable: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Store unavailable: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid share target: {0}")]
    InvalidTarget(String),

    #[error("Invitation expired: {0}")]
    Expired(String),

    #[error("Invitation already resolved: {0}")]
    AlreadyResolved(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => AppError::NotFound("row not found".to_string()),
            SqlxError::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(db_err.to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, log_level).
/// Reduces duplication in the ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (u16, &'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::Database(_) => (
            500,
            "STORE_UNAVAILABLE",
            true,
            Some("Retry idempotent reads after a short delay"),
            LogLevel::Error,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the referenced entity exists"),
            LogLevel::Debug,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            false,
            Some("The entity already exists; fetch the current state"),
            LogLevel::Debug,
        ),
        AppError::InvalidTarget(_) => (
            400,
            "INVALID_TARGET",
            false,
            Some("Supply exactly one of organization, team, or user"),
            LogLevel::Debug,
        ),
        AppError::Expired(_) => (
            410,
            "INVITATION_EXPIRED",
            false,
            Some("Request a new invitation"),
            LogLevel::Debug,
        ),
        AppError::AlreadyResolved(_) => (
            409,
            "INVITATION_ALREADY_RESOLVED",
            false,
            Some("The invitation was already accepted or declined"),
            LogLevel::Debug,
        ),
        AppError::Forbidden(_) => (
            403,
            "FORBIDDEN",
            false,
            Some("Ask the workflow owner for access"),
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            LogLevel::Debug,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::InvalidTarget(_) => "InvalidTarget",
            AppError::Expired(_) => "Expired",
            AppError::AlreadyResolved(_) => "AlreadyResolved",
            AppError::Forbidden(_) => "Forbidden",
            AppError::InvalidInput(_) => "InvalidInput",
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access the record store".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::InvalidTarget(ref msg) => msg.clone(),
            AppError::Expired(ref msg) => msg.clone(),
            AppError::AlreadyResolved(ref msg) => msg.clone(),
            AppError::Forbidden(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("workflow not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "workflow not found");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_store_unavailable() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access the record store");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_invitation_conditions() {
        let expired = AppError::Expired("token abc".to_string());
        assert_eq!(expired.http_status_code(), 410);
        assert_eq!(expired.error_code(), "INVITATION_EXPIRED");

        let resolved = AppError::AlreadyResolved("token abc".to_string());
        assert_eq!(resolved.http_status_code(), 409);
        assert_eq!(resolved.error_code(), "INVITATION_ALREADY_RESOLVED");
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
