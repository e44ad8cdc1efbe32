//! zmsync core library: domain types, set diff, manifest loading, errors.
//!
//! - [`types`]: newtypes, [`RoleId`], desired/persisted records
//! - [`diff`]: set difference used for membership and tag convergence
//! - [`manifest`]: load / validate the desired-state YAML
//! - [`error`]: [`CoreError`]

pub mod diff;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod types;

pub use diff::SetDiff;
pub use error::CoreError;
pub use manifest::{Manifest, ZmsSettings};
pub use types::{
    DomainName, Member, MemberName, Role, RoleId, RoleName, TagValues, Tags, TopLevelDomain,
    ADMIN_ROLE, DEFAULT_AUDIT_REF, ROLE_SEPARATOR,
};
