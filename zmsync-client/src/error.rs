//! Error types for zmsync-client.

use thiserror::Error;

/// Result alias for every [`crate::ZmsClient`] operation.
pub type ClientResult<T> = Result<T, ClientError>;

/// A failed call against ZMS.
#[derive(Debug, Error)]
pub enum ClientError {
    /// ZMS answered with a non-success status; `message` is taken from the
    /// `ResourceError` body when one is present.
    #[error("ZMS returned {code}: {message}")]
    Api { code: u16, message: String },

    /// The request never produced an HTTP status (DNS, TLS, timeout, reset).
    #[error("transport error calling {url}: {message}")]
    Transport { url: String, message: String },

    /// A success response whose body was not the expected JSON.
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// The structured status code, if ZMS produced one.
    pub fn code(&self) -> Option<u16> {
        match self {
            ClientError::Api { code, .. } => Some(*code),
            ClientError::Transport { .. } | ClientError::Decode { .. } => None,
        }
    }
}
