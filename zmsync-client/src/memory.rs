//! In-memory ZMS backend.
//!
//! Behaves like the subset of ZMS that zmsync talks to (404 for missing
//! entities, an `admin` role created with every top-level domain, roles
//! removed with their domain) and journals every call so tests can assert on
//! ordering and call counts. Failures can be injected per call.

use std::cell::RefCell;
use std::collections::BTreeMap;

use zmsync_core::{DomainName, MemberName, RoleName, ADMIN_ROLE, ROLE_SEPARATOR};

use crate::api::ZmsClient;
use crate::error::{ClientError, ClientResult};
use crate::model::{Domain, Membership, Role, RoleMember, TopLevelDomain};

/// One recorded client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetDomain { domain: String },
    PostTopLevelDomain { domain: String, audit_ref: String },
    DeleteTopLevelDomain { domain: String, audit_ref: String },
    GetRole { domain: String, role: String },
    PutRole { domain: String, role: String, audit_ref: String, body: Role },
    DeleteRole { domain: String, role: String, audit_ref: String },
    PutMembership { domain: String, role: String, member: String, audit_ref: String },
    DeleteMembership { domain: String, role: String, member: String, audit_ref: String },
}

impl Call {
    /// True for every call that mutates remote state.
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::GetDomain { .. } | Call::GetRole { .. })
    }
}

/// What an injected fault does to a matching call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Fail with a structured status.
    Status { code: u16, message: String },
    /// Fail before any status is produced.
    Transport(String),
    /// Succeed without a body (reads and creates return `Ok(None)`).
    EmptyBody,
}

type Matcher = Box<dyn Fn(&Call) -> bool>;

#[derive(Default)]
struct Remote {
    domains: BTreeMap<String, Domain>,
    roles: BTreeMap<(String, String), Role>,
}

/// A single-threaded stand-in for ZMS.
#[derive(Default)]
pub struct MemoryZms {
    remote: RefCell<Remote>,
    calls: RefCell<Vec<Call>>,
    faults: RefCell<Vec<(Matcher, Fault)>>,
}

impl MemoryZms {
    pub fn new() -> Self {
        Self::default()
    }

    // -- seeding ------------------------------------------------------------

    /// Create a domain (and its admin role) without journaling a call.
    pub fn seed_domain(&self, name: &str, ypm_id: i32, admins: &[&str]) {
        let mut remote = self.remote.borrow_mut();
        remote.domains.insert(
            name.to_owned(),
            Domain {
                name: name.to_owned(),
                ypm_id: Some(ypm_id),
                enabled: Some(true),
                ..Default::default()
            },
        );
        remote.roles.insert(
            (name.to_owned(), ADMIN_ROLE.to_owned()),
            Role {
                name: full_role_name(name, ADMIN_ROLE),
                role_members: admins.iter().map(|m| member(m)).collect(),
                ..Default::default()
            },
        );
    }

    /// Insert or replace a role without journaling a call.
    pub fn seed_role(&self, domain: &str, role: &str, members: &[&str], tags: &[(&str, &[&str])]) {
        let body = Role {
            name: full_role_name(domain, role),
            role_members: members.iter().map(|m| member(m)).collect(),
            tags: tags
                .iter()
                .map(|(k, values)| {
                    (
                        (*k).to_owned(),
                        crate::model::TagValueList {
                            list: values.iter().map(|v| (*v).to_owned()).collect(),
                        },
                    )
                })
                .collect(),
            ..Default::default()
        };
        self.remote
            .borrow_mut()
            .roles
            .insert((domain.to_owned(), role.to_owned()), body);
    }

    /// Remove a role behind the reconciler's back.
    pub fn forget_role(&self, domain: &str, role: &str) {
        self.remote
            .borrow_mut()
            .roles
            .remove(&(domain.to_owned(), role.to_owned()));
    }

    /// Remove a domain and its roles behind the reconciler's back.
    pub fn forget_domain(&self, domain: &str) {
        let mut remote = self.remote.borrow_mut();
        remote.domains.remove(domain);
        remote.roles.retain(|(d, _), _| d != domain);
    }

    // -- inspection ---------------------------------------------------------

    pub fn domain(&self, name: &str) -> Option<Domain> {
        self.remote.borrow().domains.get(name).cloned()
    }

    pub fn role(&self, domain: &str, role: &str) -> Option<Role> {
        self.remote
            .borrow()
            .roles
            .get(&(domain.to_owned(), role.to_owned()))
            .cloned()
    }

    /// Member names of a role, sorted.
    pub fn member_names(&self, domain: &str, role: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .role(domain, role)
            .map(|r| r.role_members.into_iter().map(|m| m.member_name).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls.borrow().iter().filter(|c| c.is_write()).cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    // -- faults -------------------------------------------------------------

    /// Apply `fault` to every future call matching `matcher`.
    pub fn inject<F>(&self, matcher: F, fault: Fault)
    where
        F: Fn(&Call) -> bool + 'static,
    {
        self.faults.borrow_mut().push((Box::new(matcher), fault));
    }

    pub fn clear_faults(&self) {
        self.faults.borrow_mut().clear();
    }

    /// Journal `call`, then report the first fault that matches it.
    fn record(&self, call: Call) -> Option<Fault> {
        let fault = self
            .faults
            .borrow()
            .iter()
            .find(|(matcher, _)| matcher(&call))
            .map(|(_, fault)| fault.clone());
        self.calls.borrow_mut().push(call);
        fault
    }
}

impl ZmsClient for MemoryZms {
    fn get_domain(&self, domain: &DomainName) -> ClientResult<Option<Domain>> {
        let call = Call::GetDomain {
            domain: domain.to_string(),
        };
        if let Some(result) = self.faulted(call) {
            return result.map(|_| None);
        }
        match self.remote.borrow().domains.get(domain.as_str()) {
            Some(found) => Ok(Some(found.clone())),
            None => Err(not_found(format!("domain {domain} not found"))),
        }
    }

    fn post_top_level_domain(
        &self,
        audit_ref: &str,
        detail: &TopLevelDomain,
    ) -> ClientResult<Option<Domain>> {
        let call = Call::PostTopLevelDomain {
            domain: detail.name.clone(),
            audit_ref: audit_ref.to_owned(),
        };
        if let Some(result) = self.faulted(call) {
            return result.map(|_| None);
        }
        if self.remote.borrow().domains.contains_key(&detail.name) {
            return Err(ClientError::Api {
                code: 400,
                message: format!("domain {} already exists", detail.name),
            });
        }
        let admins: Vec<&str> = detail.admin_users.iter().map(String::as_str).collect();
        self.seed_domain(&detail.name, detail.ypm_id.unwrap_or_default(), &admins);
        Ok(self.domain(&detail.name))
    }

    fn delete_top_level_domain(&self, domain: &DomainName, audit_ref: &str) -> ClientResult<()> {
        let call = Call::DeleteTopLevelDomain {
            domain: domain.to_string(),
            audit_ref: audit_ref.to_owned(),
        };
        if let Some(result) = self.faulted(call) {
            return result;
        }
        if self.domain(domain.as_str()).is_none() {
            return Err(not_found(format!("domain {domain} not found")));
        }
        self.forget_domain(domain.as_str());
        Ok(())
    }

    fn get_role(&self, domain: &DomainName, role: &RoleName) -> ClientResult<Option<Role>> {
        let call = Call::GetRole {
            domain: domain.to_string(),
            role: role.to_string(),
        };
        if let Some(result) = self.faulted(call) {
            return result.map(|_| None);
        }
        self.role(domain.as_str(), role.as_str())
            .map(Some)
            .ok_or_else(|| not_found(format!("role {domain}{ROLE_SEPARATOR}{role} not found")))
    }

    fn put_role(
        &self,
        domain: &DomainName,
        role: &RoleName,
        audit_ref: &str,
        body: &Role,
    ) -> ClientResult<()> {
        let call = Call::PutRole {
            domain: domain.to_string(),
            role: role.to_string(),
            audit_ref: audit_ref.to_owned(),
            body: body.clone(),
        };
        if let Some(result) = self.faulted(call) {
            return result;
        }
        if self.domain(domain.as_str()).is_none() {
            return Err(not_found(format!("domain {domain} not found")));
        }
        let mut stored = body.clone();
        stored.name = full_role_name(domain.as_str(), role.as_str());
        self.remote
            .borrow_mut()
            .roles
            .insert((domain.to_string(), role.to_string()), stored);
        Ok(())
    }

    fn delete_role(
        &self,
        domain: &DomainName,
        role: &RoleName,
        audit_ref: &str,
    ) -> ClientResult<()> {
        let call = Call::DeleteRole {
            domain: domain.to_string(),
            role: role.to_string(),
            audit_ref: audit_ref.to_owned(),
        };
        if let Some(result) = self.faulted(call) {
            return result;
        }
        if role.as_str() == ADMIN_ROLE {
            return Err(ClientError::Api {
                code: 400,
                message: "cannot delete the admin role".to_owned(),
            });
        }
        let removed = self
            .remote
            .borrow_mut()
            .roles
            .remove(&(domain.to_string(), role.to_string()));
        match removed {
            Some(_) => Ok(()),
            None => Err(not_found(format!("role {domain}{ROLE_SEPARATOR}{role} not found"))),
        }
    }

    fn put_membership(
        &self,
        domain: &DomainName,
        role: &RoleName,
        membership: &Membership,
        audit_ref: &str,
    ) -> ClientResult<()> {
        let call = Call::PutMembership {
            domain: domain.to_string(),
            role: role.to_string(),
            member: membership.member_name.clone(),
            audit_ref: audit_ref.to_owned(),
        };
        if let Some(result) = self.faulted(call) {
            return result;
        }
        let mut remote = self.remote.borrow_mut();
        let Some(stored) = remote.roles.get_mut(&(domain.to_string(), role.to_string())) else {
            return Err(not_found(format!("role {domain}{ROLE_SEPARATOR}{role} not found")));
        };
        stored
            .role_members
            .retain(|m| m.member_name != membership.member_name);
        stored.role_members.push(RoleMember {
            member_name: membership.member_name.clone(),
            expiration: membership.expiration,
            ..Default::default()
        });
        Ok(())
    }

    fn delete_membership(
        &self,
        domain: &DomainName,
        role: &RoleName,
        member: &MemberName,
        audit_ref: &str,
    ) -> ClientResult<()> {
        let call = Call::DeleteMembership {
            domain: domain.to_string(),
            role: role.to_string(),
            member: member.to_string(),
            audit_ref: audit_ref.to_owned(),
        };
        if let Some(result) = self.faulted(call) {
            return result;
        }
        let mut remote = self.remote.borrow_mut();
        let Some(stored) = remote.roles.get_mut(&(domain.to_string(), role.to_string())) else {
            return Err(not_found(format!("role {domain}{ROLE_SEPARATOR}{role} not found")));
        };
        stored.role_members.retain(|m| m.member_name != member.as_str());
        Ok(())
    }
}

impl MemoryZms {
    /// `Some(Err)` for an injected failure, `Some(Ok(()))` for an injected empty
    /// body, `None` to run the call normally.
    fn faulted(&self, call: Call) -> Option<ClientResult<()>> {
        let url = format!("memory://{call:?}");
        match self.record(call)? {
            Fault::Status { code, message } => Some(Err(ClientError::Api { code, message })),
            Fault::Transport(message) => Some(Err(ClientError::Transport { url, message })),
            Fault::EmptyBody => Some(Ok(())),
        }
    }
}

fn not_found(message: String) -> ClientError {
    ClientError::Api { code: 404, message }
}

fn member(name: &str) -> RoleMember {
    RoleMember {
        member_name: name.to_owned(),
        ..Default::default()
    }
}

fn full_role_name(domain: &str, role: &str) -> String {
    format!("{domain}{ROLE_SEPARATOR}{role}")
}
