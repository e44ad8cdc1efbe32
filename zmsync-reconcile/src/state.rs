//! Persisted state: what zmsync believes it manages remotely.
//!
//! One JSON document per workspace at `<home>/.zmsync/state/<workspace>.json`.
//! Saves are atomic (`.tmp` + rename) and hash-gated: the file is left alone
//! when the SHA-256 of the new document matches what is already on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use zmsync_core::{paths, DomainName, Role, RoleId, TopLevelDomain};

use crate::error::{io_err, ReconcileError};

/// A resource as recorded in state: its persisted identifier plus the
/// attributes last read from ZMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracked<T> {
    pub id: String,
    pub attributes: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub workspace: String,
    #[serde(default)]
    pub domains: BTreeMap<String, Tracked<TopLevelDomain>>,
    #[serde(default)]
    pub roles: BTreeMap<String, Tracked<Role>>,
}

/// Outcome of [`save_at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveResult {
    Written { path: PathBuf },
    Unchanged { path: PathBuf },
}

impl State {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.roles.is_empty()
    }

    pub fn domain(&self, name: &DomainName) -> Option<&TopLevelDomain> {
        self.domains.get(name.as_str()).map(|t| &t.attributes)
    }

    pub fn role(&self, id: &RoleId) -> Option<&Role> {
        self.roles.get(&id.to_string()).map(|t| &t.attributes)
    }

    pub fn upsert_domain(&mut self, domain: TopLevelDomain) {
        let id = domain.name.to_string();
        self.domains.insert(
            id.clone(),
            Tracked {
                id,
                attributes: domain,
            },
        );
    }

    /// Forget a domain together with every role recorded under it. Returns the
    /// identifiers of the roles forgotten with it.
    pub fn remove_domain(&mut self, name: &DomainName) -> Vec<RoleId> {
        let mut forgotten = Vec::new();
        self.roles.retain(|_, t| {
            if &t.attributes.domain == name {
                forgotten.push(t.attributes.id());
                false
            } else {
                true
            }
        });
        self.domains.remove(name.as_str());
        forgotten
    }

    pub fn upsert_role(&mut self, role: Role) {
        let id = role.id().to_string();
        self.roles.insert(
            id.clone(),
            Tracked {
                id,
                attributes: role,
            },
        );
    }

    pub fn remove_role(&mut self, id: &RoleId) -> Option<Role> {
        self.roles.remove(&id.to_string()).map(|t| t.attributes)
    }

    /// Decode every stored role identifier.
    ///
    /// A malformed identifier means the state file was damaged and is reported
    /// rather than skipped.
    pub fn role_ids(&self) -> Result<Vec<RoleId>, ReconcileError> {
        self.roles
            .values()
            .map(|t| t.id.parse::<RoleId>().map_err(ReconcileError::from))
            .collect()
    }

    pub fn domain_names(&self) -> Vec<DomainName> {
        self.domains
            .values()
            .map(|t| DomainName::from(t.id.as_str()))
            .collect()
    }
}

/// Load the state for `workspace`; an empty state when no file exists yet.
pub fn load_at(home: &Path, workspace: &str) -> Result<State, ReconcileError> {
    let path = paths::state_path(home, workspace);
    if !path.exists() {
        return Ok(State::new(workspace));
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let mut state: State = serde_json::from_str(&contents)?;
    if state.workspace.is_empty() {
        state.workspace = workspace.to_owned();
    }
    Ok(state)
}

/// Save `state` atomically, skipping the write when nothing changed.
pub fn save_at(home: &Path, state: &State) -> Result<SaveResult, ReconcileError> {
    let path = paths::state_path(home, &state.workspace);
    let tmp = path.with_extension("json.tmp");
    save_with_tmp(&path, &tmp, state)
}

fn save_with_tmp(path: &Path, tmp: &Path, state: &State) -> Result<SaveResult, ReconcileError> {
    let json = serde_json::to_string_pretty(state)?;
    let digest = sha256_hex(json.as_bytes());

    if let Ok(existing) = std::fs::read(path) {
        if sha256_hex(&existing) == digest {
            tracing::debug!("state unchanged: {}", path.display());
            return Ok(SaveResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
    }

    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid state path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    write_private(tmp, json.as_bytes()).map_err(|e| io_err(tmp, e))?;
    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!("wrote state: {}", path.display());
    Ok(SaveResult::Written {
        path: path.to_path_buf(),
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}
