//! Selection error types.

use thiserror::Error;

/// Errors from catalog sync and content selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// Store failure.
    #[error("Store error: {0}")]
    Store(#[from] database::DatabaseError),

    /// Content-source failure. Selection itself degrades to the cache instead
    /// of returning this; it surfaces from catalog sync.
    #[error("Gateway error: {0}")]
    Gateway(#[from] upstream::GatewayError),
}

/// Result type for selection operations.
pub type Result<T> = std::result::Result<T, SelectionError>;
