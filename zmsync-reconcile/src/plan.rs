//! Plan: the ordered actions that take persisted state to the manifest.
//!
//! Ordering: role deletions, domain deletions, domain replacements, domain
//! creations, then role creations and updates in manifest order. Roles
//! recorded under a domain that is deleted or replaced go away with it, so
//! they are neither deleted on their own nor updated; a desired role there is
//! created afresh.

use std::collections::BTreeSet;

use serde::Serialize;
use similar::TextDiff;

use zmsync_core::{DomainName, Manifest, Role, TopLevelDomain};

use crate::error::ReconcileError;
use crate::state::State;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateDomain(TopLevelDomain),
    /// Delete then create: top-level domains cannot be updated in place.
    ReplaceDomain {
        current: TopLevelDomain,
        desired: TopLevelDomain,
    },
    DeleteDomain(TopLevelDomain),
    CreateRole(Role),
    UpdateRole {
        current: Role,
        desired: Role,
    },
    DeleteRole(Role),
}

impl Action {
    pub fn verb(&self) -> &'static str {
        match self {
            Action::CreateDomain(_) | Action::CreateRole(_) => "create",
            Action::ReplaceDomain { .. } => "replace",
            Action::UpdateRole { .. } => "update",
            Action::DeleteDomain(_) | Action::DeleteRole(_) => "delete",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::CreateDomain(_) | Action::ReplaceDomain { .. } | Action::DeleteDomain(_) => {
                "domain"
            }
            Action::CreateRole(_) | Action::UpdateRole { .. } | Action::DeleteRole(_) => "role",
        }
    }

    /// Persisted identifier of the resource the action touches.
    pub fn address(&self) -> String {
        match self {
            Action::CreateDomain(d) | Action::DeleteDomain(d) => d.name.to_string(),
            Action::ReplaceDomain { desired, .. } => desired.name.to_string(),
            Action::CreateRole(r) | Action::DeleteRole(r) => r.id().to_string(),
            Action::UpdateRole { desired, .. } => desired.id().to_string(),
        }
    }

    /// Unified diff of the resource attributes before and after the action.
    pub fn attribute_diff(&self) -> Result<String, ReconcileError> {
        let (before, after) = match self {
            Action::CreateDomain(d) => (String::new(), render(d)?),
            Action::ReplaceDomain { current, desired } => (render(current)?, render(desired)?),
            Action::DeleteDomain(d) => (render(d)?, String::new()),
            Action::CreateRole(r) => (String::new(), render(r)?),
            Action::UpdateRole { current, desired } => (render(current)?, render(desired)?),
            Action::DeleteRole(r) => (render(r)?, String::new()),
        };
        let address = self.address();
        Ok(TextDiff::from_lines(&before, &after)
            .unified_diff()
            .header(&format!("a/{address}"), &format!("b/{address}"))
            .context_radius(3)
            .to_string())
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, ReconcileError> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

/// Ordered list of actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub actions: Vec<Action>,
}

/// Action counts by verb.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub replace: usize,
    pub update: usize,
    pub delete: usize,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn summary(&self) -> PlanSummary {
        let mut s = PlanSummary::default();
        for action in &self.actions {
            match action.verb() {
                "create" => s.create += 1,
                "replace" => s.replace += 1,
                "update" => s.update += 1,
                _ => s.delete += 1,
            }
        }
        s
    }
}

/// Plan the actions that take `state` to `manifest`.
///
/// `state` is expected to have been refreshed against ZMS first. A desired
/// role under a tracked domain that the manifest no longer declares is
/// rejected: the domain deletion would take the role's home with it.
pub fn plan(manifest: &Manifest, state: &State) -> Result<Plan, ReconcileError> {
    let plan = plan_for(&manifest.domains, &manifest.roles, state);
    for role in &manifest.roles {
        let doomed = plan
            .iter()
            .any(|a| matches!(a, Action::DeleteDomain(d) if d.name == role.domain));
        if doomed {
            return Err(ReconcileError::RoleUnderDeletedDomain {
                id: role.id(),
                domain: role.domain.clone(),
            });
        }
    }
    Ok(plan)
}

/// Plan the deletion of everything recorded in `state`.
pub fn plan_destroy(state: &State) -> Plan {
    plan_for(&[], &[], state)
}

fn plan_for(domains: &[TopLevelDomain], roles: &[Role], state: &State) -> Plan {
    let desired_domains: BTreeSet<&DomainName> = domains.iter().map(|d| &d.name).collect();
    let desired_roles: BTreeSet<String> = roles.iter().map(|r| r.id().to_string()).collect();

    let mut deleted_domains = Vec::new();
    let mut replaced_domains = Vec::new();
    let mut created_domains = Vec::new();

    for current in state.domains.values().map(|t| &t.attributes) {
        if !desired_domains.contains(&current.name) {
            deleted_domains.push(Action::DeleteDomain(current.clone()));
        }
    }
    for desired in domains {
        match state.domain(&desired.name) {
            None => created_domains.push(Action::CreateDomain(desired.clone())),
            Some(current) if !same_domain(current, desired) => {
                replaced_domains.push(Action::ReplaceDomain {
                    current: current.clone(),
                    desired: desired.clone(),
                })
            }
            Some(_) => {}
        }
    }

    // Domains whose roles vanish remotely as part of this plan.
    let torn_down: BTreeSet<DomainName> = deleted_domains
        .iter()
        .chain(&replaced_domains)
        .filter_map(|a| match a {
            Action::DeleteDomain(d) | Action::ReplaceDomain { current: d, .. } => {
                Some(d.name.clone())
            }
            _ => None,
        })
        .collect();

    let mut actions: Vec<Action> = state
        .roles
        .iter()
        .filter(|(id, t)| {
            !desired_roles.contains(*id) && !torn_down.contains(&t.attributes.domain)
        })
        .map(|(_, t)| Action::DeleteRole(t.attributes.clone()))
        .collect();
    actions.extend(deleted_domains);
    actions.extend(replaced_domains);
    actions.extend(created_domains);

    for desired in roles {
        let current = state
            .role(&desired.id())
            .filter(|_| !torn_down.contains(&desired.domain));
        match current {
            None => actions.push(Action::CreateRole(desired.clone())),
            Some(current) if !same_role(current, desired) => actions.push(Action::UpdateRole {
                current: current.clone(),
                desired: desired.clone(),
            }),
            Some(_) => {}
        }
    }

    Plan { actions }
}

/// Attributes fixed at creation. The audit reference is excluded: it cannot be
/// changed after creation and never forces a replacement.
fn same_domain(current: &TopLevelDomain, desired: &TopLevelDomain) -> bool {
    current.admin_users == desired.admin_users && current.ypm_id == desired.ypm_id
}

/// Member identities and tags. Expiration is not part of member identity.
fn same_role(current: &Role, desired: &Role) -> bool {
    current.member_names() == desired.member_names() && current.tags == desired.tags
}
