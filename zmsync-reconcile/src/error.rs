//! Error types for zmsync-reconcile.

use std::path::PathBuf;

use thiserror::Error;

use zmsync_client::ClientError;
use zmsync_core::{CoreError, DomainName, RoleId};

/// All errors that can arise from reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A ZMS call failed for a reason other than "not found" (or "not found"
    /// where absence is not acceptable). The original failure is the source.
    #[error("{entity}: {call} failed: {source}")]
    Client {
        entity: String,
        call: &'static str,
        #[source]
        source: ClientError,
    },

    /// Create was attempted against a role that already exists remotely.
    #[error("role {id} already exists in ZMS; use `zmsync import role {id}` to manage it")]
    AlreadyExists { id: RoleId },

    /// The manifest keeps a role whose tracked domain it no longer declares.
    #[error("role {id} is declared under domain {domain}, which this run would delete; keep the domain in the manifest or remove the role")]
    RoleUnderDeletedDomain { id: RoleId, domain: DomainName },

    /// A call succeeded but returned no value where one was required.
    #[error("{entity}: {call} returned no result; make sure your principal credentials are valid")]
    AmbiguousResult { entity: String, call: &'static str },

    /// The entity is absent where presence is required (import, update, read-back).
    #[error("{entity} does not exist in ZMS")]
    NotFound { entity: String },

    /// Manifest, identifier, or home-directory error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (state file).
    #[error("state file JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`ReconcileError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ReconcileError {
    ReconcileError::Io {
        path: path.into(),
        source,
    }
}

/// Wrap a client failure with the entity and call it came from.
pub(crate) fn client_err(
    entity: impl std::fmt::Display,
    call: &'static str,
) -> impl FnOnce(ClientError) -> ReconcileError {
    let entity = entity.to_string();
    move |source| ReconcileError::Client {
        entity,
        call,
        source,
    }
}
