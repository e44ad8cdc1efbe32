//! Role reconciler.
//!
//! Membership converges one member at a time (every removal before any
//! addition). Tags converge with a single whole-role write built from a fresh
//! read of the role.

use zmsync_client::{model, ZmsClient};
use zmsync_core::diff::{diff_members, diff_tags, member_names};
use zmsync_core::{MemberName, Role, RoleId};

use crate::classify::{lookup, Lookup};
use crate::error::{client_err, ReconcileError};
use crate::mapper;

/// What an update changed remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleChanges {
    pub removed_members: Vec<MemberName>,
    pub added_members: Vec<MemberName>,
    pub tags_replaced: bool,
}

impl RoleChanges {
    pub fn is_empty(&self) -> bool {
        self.removed_members.is_empty() && self.added_members.is_empty() && !self.tags_replaced
    }

    /// Number of mutating calls issued.
    pub fn writes(&self) -> usize {
        self.removed_members.len() + self.added_members.len() + usize::from(self.tags_replaced)
    }
}

pub struct RoleReconciler<'a> {
    client: &'a dyn ZmsClient,
}

impl<'a> RoleReconciler<'a> {
    pub fn new(client: &'a dyn ZmsClient) -> Self {
        Self { client }
    }

    /// Create the role with its members and tags.
    ///
    /// Fails with [`ReconcileError::AlreadyExists`] without writing anything
    /// when the role is already present remotely.
    pub fn create(&self, desired: &Role) -> Result<Role, ReconcileError> {
        let id = desired.id();
        let entity = format!("role {id}");

        match lookup(self.client.get_role(&id.domain, &id.role))
            .map_err(client_err(&entity, "get role"))?
        {
            Lookup::Found(_) => return Err(ReconcileError::AlreadyExists { id }),
            Lookup::Absent => {}
        }

        tracing::info!("creating {entity}");
        self.client
            .put_role(
                &id.domain,
                &id.role,
                &desired.audit_ref,
                &mapper::role_body(desired),
            )
            .map_err(client_err(&entity, "put role"))?;

        match self.read(&id, &desired.audit_ref)? {
            Lookup::Found(role) => Ok(role),
            Lookup::Absent => Err(ReconcileError::NotFound { entity }),
        }
    }

    /// Fetch the role. A 404 is [`Lookup::Absent`].
    pub fn read(&self, id: &RoleId, audit_ref: &str) -> Result<Lookup<Role>, ReconcileError> {
        tracing::debug!("reading role {id}");
        Ok(match self.fetch(id)? {
            Lookup::Found(remote) => Lookup::Found(mapper::role_from_remote(id, &remote, audit_ref)),
            Lookup::Absent => Lookup::Absent,
        })
    }

    /// Converge members and tags of an existing role toward `desired`.
    ///
    /// The diff is taken against a fresh read, so a second call with the same
    /// desired state writes nothing. A failed write stops the update; earlier
    /// writes are not rolled back.
    pub fn update(&self, desired: &Role) -> Result<RoleChanges, ReconcileError> {
        let id = desired.id();
        let entity = format!("role {id}");
        let audit_ref = desired.audit_ref.as_str();

        let Lookup::Found(mut remote) = self.fetch(&id)? else {
            return Err(ReconcileError::NotFound { entity });
        };
        let current = mapper::role_from_remote(&id, &remote, audit_ref);
        let mut changes = RoleChanges::default();

        let members = diff_members(&current.members, &desired.members);
        for member in &members.remove {
            tracing::info!("removing {} from {entity}", member.name);
            self.client
                .delete_membership(&id.domain, &id.role, &member.name, audit_ref)
                .map_err(client_err(&entity, "delete member"))?;
            changes.removed_members.push(member.name.clone());
        }
        for member in &members.add {
            tracing::info!("adding {} to {entity}", member.name);
            self.client
                .put_membership(
                    &id.domain,
                    &id.role,
                    &mapper::membership(&id, member),
                    audit_ref,
                )
                .map_err(client_err(&entity, "put member"))?;
            changes.added_members.push(member.name.clone());
        }

        let tags = diff_tags(&current.tags, &desired.tags);
        if !tags.is_empty() {
            if !members.is_empty() {
                let Lookup::Found(fresh) = self.fetch(&id)? else {
                    return Err(ReconcileError::NotFound { entity });
                };
                remote = fresh;
            }
            tracing::info!("replacing tags of {entity}");
            remote.tags = mapper::expand_tags(&desired.tags);
            self.client
                .put_role(&id.domain, &id.role, audit_ref, &remote)
                .map_err(client_err(&entity, "put role"))?;
            changes.tags_replaced = true;
        }

        if changes.is_empty() {
            tracing::debug!("{entity} already converged");
        } else {
            tracing::debug!(
                "{entity}: -{:?} +{:?}",
                member_names(&members.remove),
                member_names(&members.add)
            );
        }
        Ok(changes)
    }

    /// Delete the role with its stored audit reference.
    pub fn delete(&self, current: &Role) -> Result<(), ReconcileError> {
        let id = current.id();
        let entity = format!("role {id}");
        tracing::info!("deleting {entity}");
        self.client
            .delete_role(&id.domain, &id.role, &current.audit_ref)
            .map_err(client_err(&entity, "delete role"))
    }

    fn fetch(&self, id: &RoleId) -> Result<Lookup<model::Role>, ReconcileError> {
        let entity = format!("role {id}");
        match lookup(self.client.get_role(&id.domain, &id.role))
            .map_err(client_err(&entity, "get role"))?
        {
            Lookup::Found(Some(role)) => Ok(Lookup::Found(role)),
            Lookup::Found(None) => Err(ReconcileError::AmbiguousResult {
                entity,
                call: "get role",
            }),
            Lookup::Absent => Ok(Lookup::Absent),
        }
    }
}
