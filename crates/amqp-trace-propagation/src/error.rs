//! Error types for trace-context propagation.

use thiserror::Error;

/// A specialised Result type for propagation operations.
pub type Result<T> = std::result::Result<T, PropagationError>;

/// Errors that can occur while reading or writing trace headers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PropagationError {
    /// A value of an unsupported type was stored through the header accessor.
    ///
    /// Only string values (and the reserved current-span passthrough value)
    /// may be written to a message's metadata map. Hitting this error
    /// indicates a programming mistake in tag-building logic, not a runtime
    /// condition worth retrying.
    #[error("'{0}' header value must be a string")]
    InvalidHeaderValue(String),

    /// An identifier string was not fixed-width hexadecimal.
    #[error("malformed identifier '{value}': expected {expected} hex characters")]
    MalformedIdentifier {
        /// The offending header value.
        value: String,
        /// The length the codec expected (16 or 32).
        expected: usize,
    },
}
