//! Desired-state manifest.
//!
//! # File shape
//!
//! ```yaml
//! workspace: sports-prod
//! zms:
//!   url: https://zms.example.com:4443/zms/v1
//! audit_ref: managed by zmsync        # optional
//! domains:
//!   - { name: sports, admin_users: [user.alice], ypm_id: 12 }
//! roles:
//!   - domain: sports
//!     name: readers
//!     members: [user.bob]
//!     tags: { env: prod }
//! ```
//!
//! The YAML is parsed into loosely-typed file records once, then validated
//! and resolved into [`TopLevelDomain`] / [`Role`] records. Nothing past this
//! module looks at the raw file shape.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{
    DomainName, Member, MemberName, Role, RoleId, RoleName, Tags, TopLevelDomain,
    DEFAULT_AUDIT_REF, ROLE_SEPARATOR,
};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding `zms.url`.
pub const ENV_ZMS_URL: &str = "ZMS_URL";
/// Environment variable overriding `zms.principal_token`.
pub const ENV_PRINCIPAL_TOKEN: &str = "ZMS_PRINCIPAL_TOKEN";

// ---------------------------------------------------------------------------
// Resolved manifest
// ---------------------------------------------------------------------------

/// Connection settings for the ZMS endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZmsSettings {
    /// Base URL including the API prefix, e.g. `https://zms:4443/zms/v1`.
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Sent as `Athenz-Principal-Auth` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_token: Option<String>,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ZmsSettings {
    /// Apply `ZMS_URL` / `ZMS_PRINCIPAL_TOKEN` from `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_ZMS_URL).filter(|v| !v.is_empty()) {
            self.url = url;
        }
        if let Some(token) = lookup(ENV_PRINCIPAL_TOKEN).filter(|v| !v.is_empty()) {
            self.principal_token = Some(token);
        }
        self
    }
}

/// A validated desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub workspace: String,
    pub zms: ZmsSettings,
    pub domains: Vec<TopLevelDomain>,
    pub roles: Vec<Role>,
}

impl Manifest {
    pub fn domain(&self, name: &DomainName) -> Option<&TopLevelDomain> {
        self.domains.iter().find(|d| &d.name == name)
    }

    pub fn role(&self, id: &RoleId) -> Option<&Role> {
        self.roles
            .iter()
            .find(|r| r.domain == id.domain && r.name == id.role)
    }
}

// ---------------------------------------------------------------------------
// File records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    workspace: String,
    zms: ZmsSettings,
    #[serde(default)]
    audit_ref: Option<String>,
    #[serde(default)]
    domains: Vec<DomainEntry>,
    #[serde(default)]
    roles: Vec<RoleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DomainEntry {
    name: DomainName,
    admin_users: Vec<MemberName>,
    ypm_id: i32,
    #[serde(default)]
    audit_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RoleEntry {
    domain: DomainName,
    name: RoleName,
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    tags: Tags,
    #[serde(default)]
    audit_ref: Option<String>,
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load and validate the manifest at `path`, applying process environment overrides.
///
/// Returns `CoreError::ManifestNotFound` if absent, `CoreError::Parse` (with
/// path + line context) if malformed, `CoreError::Invalid` if it fails validation.
pub fn load(path: &Path) -> Result<Manifest, CoreError> {
    load_with_env(path, |key| std::env::var(key).ok())
}

/// `load` with an explicit environment lookup; used by tests.
pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Manifest, CoreError>
where
    F: Fn(&str) -> Option<String>,
{
    if !path.exists() {
        return Err(CoreError::ManifestNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    let mut manifest = parse(path, &contents)?;
    manifest.zms = manifest.zms.with_env_overrides(lookup);
    if manifest.zms.url.trim().is_empty() {
        return Err(invalid(path, "zms.url must not be empty"));
    }
    Ok(manifest)
}

/// Parse and validate manifest text. `path` is used for error context only.
pub fn parse(path: &Path, contents: &str) -> Result<Manifest, CoreError> {
    let file: ManifestFile = serde_yaml::from_str(contents).map_err(|e| CoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    resolve(path, file)
}

fn resolve(path: &Path, file: ManifestFile) -> Result<Manifest, CoreError> {
    if !is_valid_workspace(&file.workspace) {
        return Err(invalid(
            path,
            format!(
                "workspace '{}' must be non-empty and use only [A-Za-z0-9_.-]",
                file.workspace
            ),
        ));
    }
    let default_audit = file
        .audit_ref
        .unwrap_or_else(|| DEFAULT_AUDIT_REF.to_owned());

    let mut domains = Vec::with_capacity(file.domains.len());
    let mut seen_domains = BTreeSet::new();
    for entry in file.domains {
        check_name(path, "domain", entry.name.as_str())?;
        if !seen_domains.insert(entry.name.clone()) {
            return Err(invalid(path, format!("duplicate domain '{}'", entry.name)));
        }
        if entry.admin_users.is_empty() {
            return Err(invalid(
                path,
                format!("domain '{}' needs at least one admin user", entry.name),
            ));
        }
        for user in &entry.admin_users {
            check_member(path, user)?;
        }
        domains.push(TopLevelDomain {
            name: entry.name,
            admin_users: entry.admin_users.into_iter().collect(),
            ypm_id: entry.ypm_id,
            audit_ref: entry.audit_ref.unwrap_or_else(|| default_audit.clone()),
        });
    }

    let mut roles = Vec::with_capacity(file.roles.len());
    let mut seen_roles = BTreeSet::new();
    for entry in file.roles {
        check_name(path, "domain", entry.domain.as_str())?;
        check_name(path, "role", entry.name.as_str())?;
        let id = RoleId::new(entry.domain.clone(), entry.name.clone());
        if !seen_roles.insert(id.clone()) {
            return Err(invalid(path, format!("duplicate role '{id}'")));
        }

        let mut members: BTreeMap<MemberName, Member> = BTreeMap::new();
        for member in entry.members {
            check_member(path, &member.name)?;
            if members.contains_key(&member.name) {
                return Err(invalid(
                    path,
                    format!("role '{id}' lists member '{}' twice", member.name),
                ));
            }
            members.insert(member.name.clone(), member);
        }
        for key in entry.tags.keys() {
            if key.trim().is_empty() {
                return Err(invalid(path, format!("role '{id}' has an empty tag key")));
            }
        }

        roles.push(Role {
            domain: entry.domain,
            name: entry.name,
            members: members.into_values().collect(),
            tags: entry.tags,
            audit_ref: entry.audit_ref.unwrap_or_else(|| default_audit.clone()),
        });
    }

    Ok(Manifest {
        workspace: file.workspace,
        zms: file.zms,
        domains,
        roles,
    })
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn invalid(path: &Path, reason: impl Into<String>) -> CoreError {
    CoreError::Invalid {
        path: PathBuf::from(path),
        reason: reason.into(),
    }
}

fn is_valid_workspace(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Athenz domain and role names: `[A-Za-z0-9_][A-Za-z0-9_.-]*`.
fn check_name(path: &Path, kind: &str, name: &str) -> Result<(), CoreError> {
    let mut chars = name.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid_first && valid_rest && !name.contains(ROLE_SEPARATOR) {
        Ok(())
    } else {
        Err(invalid(path, format!("invalid {kind} name '{name}'")))
    }
}

fn check_member(path: &Path, member: &MemberName) -> Result<(), CoreError> {
    let name = member.as_str();
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(invalid(path, format!("invalid member name '{name}'")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
