//! Error types used throughout the application

use thiserror::Error;

/// Main error type for costsync
#[derive(Error, Debug)]
pub enum CostsyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    /// The remote system already has an entity with the requested name.
    /// The message carries the server's conflict body so the caller can
    /// resolve the existing identifier from it.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The budgets endpoints answered 404: the feature is not enabled
    /// for this enterprise. Distinct from a generic API failure so call
    /// sites can report it as "feature not available".
    #[error("Budgets API unavailable: {0}")]
    BudgetsUnavailable(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for costsync operations
pub type Result<T> = std::result::Result<T, CostsyncError>;
