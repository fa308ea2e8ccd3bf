//! Error types for the geecache library.
//!
//! ## Key Components
//!
//! - [`GetError`]: failure surfaced from [`Group::get`](crate::group::Group::get).
//!   Either the key was invalid or the user loader failed; a peer fetch
//!   failure alone never surfaces here because the orchestrator falls back
//!   to the local loader.
//! - [`LoaderError`]: opaque failure from the user-supplied loader, e.g. the
//!   key does not exist in the backing source.
//! - [`TransportError`]: peer fetch failure (unreachable peer, non-success
//!   status, or payload decode failure). Handled by the orchestrator's
//!   fallback policy; returned directly by the transport client.
//!
//! Programming mistakes (registering a peer picker twice) are not modeled as
//! error values. They abort at setup time via `panic!`.
//!
//! [`GetError`] is `Clone`: when concurrent callers collapse onto one load,
//! every caller receives the identical outcome.

use thiserror::Error;

/// Failure returned by a group lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GetError {
    /// The caller passed an empty key.
    #[error("key is required")]
    EmptyKey,

    /// The user loader failed to produce bytes for the key.
    #[error("load failed for key {key:?}: {source}")]
    Loader {
        /// Key the load was attempted for.
        key: String,
        /// Underlying loader failure.
        #[source]
        source: LoaderError,
    },
}

/// Opaque failure from a user-supplied [`Loader`](crate::traits::Loader).
///
/// Carries a human-readable description only; the cache does not interpret
/// loader failures beyond propagating them.
///
/// # Example
///
/// ```
/// use geecache::error::LoaderError;
///
/// let err = LoaderError::new("Tom not found");
/// assert_eq!(err.message(), "Tom not found");
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct LoaderError {
    message: String,
}

impl LoaderError {
    /// Creates a new `LoaderError` with the given description.
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure while fetching a value from a remote peer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be issued or completed.
    #[error("peer request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The peer answered with a non-success status.
    #[error("peer returned status {status}")]
    Status {
        /// HTTP status code from the peer.
        status: u16,
    },

    /// The response body did not decode as a fetch payload.
    #[error("decoding peer response: {0}")]
    Decode(#[from] prost::DecodeError),
}
