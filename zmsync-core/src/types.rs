//! Domain types for zmsync desired and persisted state.
//!
//! The same records describe what the manifest wants and what a refresh read
//! back from ZMS, so the planner can compare them field by field.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Justification attached to mutating calls when nothing more specific is configured.
pub const DEFAULT_AUDIT_REF: &str = "done by zmsync";

/// Joins domain and role name in a persisted role identifier.
pub const ROLE_SEPARATOR: &str = ":role.";

/// Name of the role ZMS creates alongside every top-level domain.
pub const ADMIN_ROLE: &str = "admin";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed Athenz domain name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DomainName(pub String);

impl DomainName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DomainName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DomainName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A role name, unqualified by its domain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleName(pub String);

impl RoleName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RoleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoleName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A principal identity (`user.alice`, `sports.api`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberName(pub String);

impl MemberName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for MemberName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MemberName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Role identifier
// ---------------------------------------------------------------------------

/// Persisted identifier of a role: `<domain>:role.<role>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoleId {
    pub domain: DomainName,
    pub role: RoleName,
}

impl RoleId {
    pub fn new(domain: impl Into<DomainName>, role: impl Into<RoleName>) -> Self {
        Self {
            domain: domain.into(),
            role: role.into(),
        }
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.domain, ROLE_SEPARATOR, self.role)
    }
}

impl FromStr for RoleId {
    type Err = CoreError;

    /// Exactly two non-empty components, or [`CoreError::InvalidRoleId`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(ROLE_SEPARATOR).collect();
        match parts.as_slice() {
            [domain, role] if !domain.is_empty() && !role.is_empty() => {
                Ok(Self::new(*domain, *role))
            }
            _ => Err(CoreError::InvalidRoleId { id: s.to_owned() }),
        }
    }
}

impl Serialize for RoleId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoleId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Members and tags
// ---------------------------------------------------------------------------

/// A role member: identity plus optional expiration.
///
/// Identity alone decides whether two members are the same logical member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MemberRepr")]
pub struct Member {
    pub name: MemberName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

impl Member {
    pub fn new(name: impl Into<MemberName>) -> Self {
        Self {
            name: name.into(),
            expiration: None,
        }
    }

    pub fn expiring(name: impl Into<MemberName>, expiration: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            expiration: Some(expiration),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MemberRepr {
    Name(MemberName),
    Full(FullMember),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FullMember {
    name: MemberName,
    #[serde(default)]
    expiration: Option<DateTime<Utc>>,
}

impl From<MemberRepr> for Member {
    fn from(repr: MemberRepr) -> Self {
        match repr {
            MemberRepr::Name(name) => Self {
                name,
                expiration: None,
            },
            MemberRepr::Full(FullMember { name, expiration }) => Self { name, expiration },
        }
    }
}

/// Values of a single tag key, kept sorted and deduplicated so two lists with
/// the same content compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "TagValuesRepr")]
pub struct TagValues(Vec<String>);

impl TagValues {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        Self(set.into_iter().collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for TagValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagValuesRepr {
    One(String),
    Many(Vec<String>),
}

impl From<TagValuesRepr> for TagValues {
    fn from(repr: TagValuesRepr) -> Self {
        match repr {
            TagValuesRepr::One(value) => Self::new([value]),
            TagValuesRepr::Many(values) => Self::new(values),
        }
    }
}

/// Tag key to value list.
pub type Tags = BTreeMap<String, TagValues>;

// ---------------------------------------------------------------------------
// Resource records
// ---------------------------------------------------------------------------

/// A top-level domain. Every field is fixed at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopLevelDomain {
    pub name: DomainName,
    pub admin_users: BTreeSet<MemberName>,
    pub ypm_id: i32,
    pub audit_ref: String,
}

/// A role scoped to a domain, with its members and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub domain: DomainName,
    pub name: RoleName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,
    pub audit_ref: String,
}

impl Role {
    pub fn id(&self) -> RoleId {
        RoleId::new(self.domain.clone(), self.name.clone())
    }

    /// Member identities; the comparison key for membership convergence.
    pub fn member_names(&self) -> BTreeSet<MemberName> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
