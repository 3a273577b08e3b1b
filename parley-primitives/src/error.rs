//! Shared error definitions for broker primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the primitives crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent identifier failed validation.
    #[error("invalid agent id `{id}`: {reason}")]
    InvalidAgentId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A thread or message identifier could not be parsed.
    #[error("invalid identifier: {source}")]
    InvalidIdentifier {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },
}
