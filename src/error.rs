//! Error types for chain-event-bus

use thiserror::Error;

/// Errors that can occur in the event bus and pipeline
#[derive(Debug, Error)]
pub enum EventError {
    /// `Subscribe` was called with a filter that failed validation
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A custom parser or ABI is already registered for an address
    #[error("duplicate registration for address {0}")]
    DuplicateRegistration(String),

    /// `ParseLog` found neither a custom parser nor an ABI parser for the log's address
    #[error("no parser registered for address {0}")]
    NoParser(String),

    /// Log topics/data are inconsistent with the event schema
    #[error("malformed log: {0}")]
    MalformedLog(String),

    /// A registered handler returned an error while processing an event
    #[error("handler failed for event '{event_name}': {source}")]
    HandlerFailed {
        /// Name of the event being handled
        event_name: String,
        /// Underlying cause
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A registered storage handler returned an error while processing an event
    #[error("storage handler failed for event '{event_name}': {source}")]
    StorageFailed {
        /// Name of the event being stored
        event_name: String,
        /// Underlying cause
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal lock/state failure unrelated to caller input
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for event bus operations
pub type Result<T> = std::result::Result<T, EventError>;
