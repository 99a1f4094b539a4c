//! Platform error types

use thiserror::Error;

use crate::NodeId;

/// Platform-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    /// Selector could not be parsed
    #[error("Invalid selector: {0:?}")]
    InvalidSelector(String),

    /// Node is no longer attached to the document
    #[error("Node {0:?} is detached from the document")]
    NodeDetached(NodeId),

    /// Layout could not be computed for a node
    #[error("Layout failed: {0}")]
    Layout(String),

    /// Generic platform error
    #[error("Platform error: {0}")]
    Other(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
