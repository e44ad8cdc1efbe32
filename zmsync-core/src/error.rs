//! Error types for zmsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from manifest loading and identifier handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure (permission denied, unreadable file, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse manifest at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The manifest file did not exist at the given path.
    #[error("manifest not found at {path}")]
    ManifestNotFound { path: PathBuf },

    /// The manifest parsed but describes an impossible desired state.
    #[error("invalid manifest at {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    /// A persisted role identifier did not decode to exactly `(domain, role)`.
    #[error("invalid role identifier '{id}': expected <domain>:role.<role>")]
    InvalidRoleId { id: String },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.zmsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
