//! Top-level domain reconciler.
//!
//! A top-level domain has no update call in ZMS. Every attribute is fixed at
//! creation, so convergence is delete followed by create (see
//! [`crate::plan::Action::ReplaceDomain`]).

use zmsync_client::ZmsClient;
use zmsync_core::{DomainName, RoleName, TopLevelDomain, ADMIN_ROLE};

use crate::classify::{lookup, Lookup};
use crate::error::{client_err, ReconcileError};
use crate::mapper;

pub struct DomainReconciler<'a> {
    client: &'a dyn ZmsClient,
}

impl<'a> DomainReconciler<'a> {
    pub fn new(client: &'a dyn ZmsClient) -> Self {
        Self { client }
    }

    /// Create the domain, then read it back so the stored record reflects
    /// what ZMS actually holds.
    pub fn create(&self, desired: &TopLevelDomain) -> Result<TopLevelDomain, ReconcileError> {
        let entity = format!("domain {}", desired.name);
        tracing::info!("creating {entity}");

        let created = self
            .client
            .post_top_level_domain(
                &desired.audit_ref,
                &mapper::top_level_domain_detail(desired),
            )
            .map_err(client_err(&entity, "create domain"))?;
        if created.is_none() {
            return Err(ReconcileError::AmbiguousResult {
                entity,
                call: "create domain",
            });
        }

        match self.read(&desired.name, &desired.audit_ref)? {
            Lookup::Found(domain) => Ok(domain),
            Lookup::Absent => Err(ReconcileError::NotFound { entity }),
        }
    }

    /// Fetch the domain and the members of its `admin` role.
    ///
    /// A 404 on the domain is [`Lookup::Absent`]. `audit_ref` is local-only
    /// and is carried into the returned record unchanged.
    pub fn read(
        &self,
        name: &DomainName,
        audit_ref: &str,
    ) -> Result<Lookup<TopLevelDomain>, ReconcileError> {
        let entity = format!("domain {name}");
        tracing::debug!("reading {entity}");

        let remote = match lookup(self.client.get_domain(name))
            .map_err(client_err(&entity, "get domain"))?
        {
            Lookup::Absent => return Ok(Lookup::Absent),
            Lookup::Found(None) => {
                return Err(ReconcileError::AmbiguousResult {
                    entity,
                    call: "get domain",
                })
            }
            Lookup::Found(Some(domain)) => domain,
        };

        // Every domain has an admin role, so any failure here is surfaced,
        // 404 included.
        let admin = RoleName::from(ADMIN_ROLE);
        let admin_users = match self
            .client
            .get_role(name, &admin)
            .map_err(client_err(&entity, "get admin role"))?
        {
            Some(role) => mapper::flatten_role_members(&role.role_members)
                .into_iter()
                .map(|m| m.name)
                .collect(),
            None => {
                return Err(ReconcileError::AmbiguousResult {
                    entity,
                    call: "get admin role",
                })
            }
        };

        Ok(Lookup::Found(TopLevelDomain {
            name: DomainName::from(remote.name),
            admin_users,
            ypm_id: remote.ypm_id.unwrap_or_default(),
            audit_ref: audit_ref.to_owned(),
        }))
    }

    /// Delete the domain with the audit reference it was created with.
    pub fn delete(&self, current: &TopLevelDomain) -> Result<(), ReconcileError> {
        let entity = format!("domain {}", current.name);
        tracing::info!("deleting {entity}");
        self.client
            .delete_top_level_domain(&current.name, &current.audit_ref)
            .map_err(client_err(&entity, "delete domain"))
    }
}
