use thiserror::Error;

use crate::completeness::ValidationIssue;
use crate::flight_plan::FlowViolation;

/// Failures of the generic resource actor plumbing.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped")]
    ActorDropped,
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("ULD record rejected: {0}")]
    InvalidRecord(String),
    #[error("Catalog backend unavailable: {0}")]
    Unavailable(String),
}

impl From<FrameworkError> for CatalogError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::Rejected(msg) => CatalogError::InvalidRecord(msg),
            other => CatalogError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StockTakeError {
    #[error("Invalid ULD identifier: {0}")]
    InvalidIdentifier(String),
    #[error("A location is required")]
    MissingLocation,
    #[error("ULD not tracked in this stock take: {0}")]
    UnknownUld(String),
    #[error("ULD is not an additional ULD: {0}")]
    NotAdditional(String),
    #[error("ULD already tracked: {0}")]
    AlreadyTracked(String),
    #[error("ULD has no original location: {0}")]
    NotDisplaced(String),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

/// Key-value storage failures. A missing key is not an error.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Storage IO error: {0}")]
    Io(String),
    #[error("Stored record {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order has no valid AWB number")]
    MissingAwb,
    #[error("Order is incomplete: {} issue(s)", .0.len())]
    Incomplete(Vec<ValidationIssue>),
    #[error("Flight plan does not balance: {} violation(s)", .0.len())]
    Unbalanced(Vec<FlowViolation>),
    #[error("Order storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(String),
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}
