//! Scheduler error types.

use thiserror::Error;

/// Errors from schedule building and delivery execution.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Store failure.
    #[error("Store error: {0}")]
    Store(#[from] database::DatabaseError),

    /// Content selection failure.
    #[error("Selection error: {0}")]
    Selection(#[from] selection::SelectionError),

    /// Time-source failure while fetching a day's times.
    #[error("Gateway error: {0}")]
    Gateway(#[from] upstream::GatewayError),

    /// A group's stored timezone failed to parse. Input error; the group is
    /// skipped for the cycle, not retried.
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
