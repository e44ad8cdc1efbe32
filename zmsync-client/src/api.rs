//! The client facade consumed by the reconcilers.

use zmsync_core::{DomainName, MemberName, RoleName};

use crate::error::ClientResult;
use crate::model::{Domain, Membership, Role, TopLevelDomain};

/// Typed operations against ZMS.
///
/// Reads and creates return `Ok(None)` when the call succeeded but the server
/// sent no body. Callers decide whether that is acceptable; a missing entity is
/// always an `Err` carrying code 404, never `Ok(None)`.
pub trait ZmsClient {
    fn get_domain(&self, domain: &DomainName) -> ClientResult<Option<Domain>>;

    fn post_top_level_domain(
        &self,
        audit_ref: &str,
        detail: &TopLevelDomain,
    ) -> ClientResult<Option<Domain>>;

    fn delete_top_level_domain(&self, domain: &DomainName, audit_ref: &str) -> ClientResult<()>;

    fn get_role(&self, domain: &DomainName, role: &RoleName) -> ClientResult<Option<Role>>;

    /// Create or replace the whole role, members and tags included.
    fn put_role(
        &self,
        domain: &DomainName,
        role: &RoleName,
        audit_ref: &str,
        body: &Role,
    ) -> ClientResult<()>;

    fn delete_role(&self, domain: &DomainName, role: &RoleName, audit_ref: &str)
        -> ClientResult<()>;

    fn put_membership(
        &self,
        domain: &DomainName,
        role: &RoleName,
        membership: &Membership,
        audit_ref: &str,
    ) -> ClientResult<()>;

    fn delete_membership(
        &self,
        domain: &DomainName,
        role: &RoleName,
        member: &MemberName,
        audit_ref: &str,
    ) -> ClientResult<()>;
}
