//! Error types for ostinato-core.

use thiserror::Error;

/// Error type for all fallible engine operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The instrument event queue is full. The event was not enqueued;
    /// the caller should throttle updates or build the engine with a
    /// larger queue capacity.
    #[error("Event queue full")]
    QueueFull,

    #[error("Not implemented: {0}")]
    Unimplemented(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Unknown error")]
    Unknown,
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
