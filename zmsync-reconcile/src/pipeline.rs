//! Sequential driver: refresh, plan, apply, destroy, import.
//!
//! Every call is issued in order on the caller's thread. State is saved after
//! each successful action, so a run that stops at the first failure leaves
//! state describing exactly what was done.

use std::path::Path;

use zmsync_client::ZmsClient;
use zmsync_core::{DomainName, Manifest, RoleId};

use crate::classify::Lookup;
use crate::domain::DomainReconciler;
use crate::error::ReconcileError;
use crate::plan::{self, Action, Plan};
use crate::role::{RoleChanges, RoleReconciler};
use crate::state::{self, State};

/// Resources dropped from state because they no longer exist in ZMS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub dropped: Vec<String>,
}

/// One executed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub verb: &'static str,
    pub kind: &'static str,
    pub address: String,
    /// Remote changes made by a role update.
    pub changes: Option<RoleChanges>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub refresh: RefreshReport,
    pub applied: Vec<Applied>,
}

/// Re-read every resource in `state` and replace its attributes with what ZMS
/// holds. Resources that are gone are dropped without error.
pub fn refresh(client: &dyn ZmsClient, state: &mut State) -> Result<RefreshReport, ReconcileError> {
    let domains = DomainReconciler::new(client);
    let roles = RoleReconciler::new(client);
    let mut report = RefreshReport::default();

    for name in state.domain_names() {
        let audit_ref = state
            .domain(&name)
            .map(|d| d.audit_ref.clone())
            .unwrap_or_default();
        match domains.read(&name, &audit_ref)? {
            Lookup::Found(domain) => state.upsert_domain(domain),
            Lookup::Absent => {
                tracing::warn!("domain {name} no longer exists in ZMS, removing it from state");
                let forgotten = state.remove_domain(&name);
                report.dropped.push(name.to_string());
                for id in forgotten {
                    tracing::warn!("role {id} went away with domain {name}, removing it from state");
                    report.dropped.push(id.to_string());
                }
            }
        }
    }

    for id in state.role_ids()? {
        let Some(audit_ref) = state.role(&id).map(|r| r.audit_ref.clone()) else {
            // Removed together with its domain above.
            continue;
        };
        match roles.read(&id, &audit_ref)? {
            Lookup::Found(role) => state.upsert_role(role),
            Lookup::Absent => {
                tracing::warn!("role {id} no longer exists in ZMS, removing it from state");
                state.remove_role(&id);
                report.dropped.push(id.to_string());
            }
        }
    }

    Ok(report)
}

/// Load state for `workspace`, refresh it and save it.
pub fn refresh_at(
    client: &dyn ZmsClient,
    home: &Path,
    workspace: &str,
) -> Result<(State, RefreshReport), ReconcileError> {
    let mut state = state::load_at(home, workspace)?;
    let report = refresh(client, &mut state)?;
    state::save_at(home, &state)?;
    Ok((state, report))
}

/// Refresh a copy of the stored state and plan against `manifest`. Nothing is
/// written, locally or remotely.
pub fn plan_at(
    client: &dyn ZmsClient,
    home: &Path,
    manifest: &Manifest,
) -> Result<(Plan, RefreshReport), ReconcileError> {
    let mut state = state::load_at(home, &manifest.workspace)?;
    let report = refresh(client, &mut state)?;
    Ok((plan::plan(manifest, &state)?, report))
}

/// Refresh, plan and execute. Stops at the first failure.
pub fn apply_at(
    client: &dyn ZmsClient,
    home: &Path,
    manifest: &Manifest,
) -> Result<ApplyReport, ReconcileError> {
    let (mut state, refresh) = refresh_at(client, home, &manifest.workspace)?;
    let plan = plan::plan(manifest, &state)?;
    let applied = execute(client, home, &mut state, &plan)?;
    Ok(ApplyReport { refresh, applied })
}

/// Refresh, then delete everything recorded in state.
pub fn destroy_at(
    client: &dyn ZmsClient,
    home: &Path,
    workspace: &str,
) -> Result<ApplyReport, ReconcileError> {
    let (mut state, refresh) = refresh_at(client, home, workspace)?;
    let plan = plan::plan_destroy(&state);
    let applied = execute(client, home, &mut state, &plan)?;
    Ok(ApplyReport { refresh, applied })
}

/// Run `plan` in order, saving `state` after each action.
pub fn execute(
    client: &dyn ZmsClient,
    home: &Path,
    state: &mut State,
    plan: &Plan,
) -> Result<Vec<Applied>, ReconcileError> {
    let domains = DomainReconciler::new(client);
    let roles = RoleReconciler::new(client);
    let mut applied = Vec::with_capacity(plan.len());

    for action in plan.iter() {
        let mut changes = None;
        match action {
            Action::CreateDomain(desired) => {
                state.upsert_domain(domains.create(desired)?);
            }
            Action::ReplaceDomain { current, desired } => {
                domains.delete(current)?;
                state.remove_domain(&current.name);
                state::save_at(home, state)?;
                state.upsert_domain(domains.create(desired)?);
            }
            Action::DeleteDomain(current) => {
                domains.delete(current)?;
                state.remove_domain(&current.name);
            }
            Action::CreateRole(desired) => {
                state.upsert_role(roles.create(desired)?);
            }
            Action::UpdateRole { desired, .. } => {
                changes = Some(roles.update(desired)?);
                let id = desired.id();
                match roles.read(&id, &desired.audit_ref)? {
                    Lookup::Found(role) => state.upsert_role(role),
                    Lookup::Absent => {
                        return Err(ReconcileError::NotFound {
                            entity: format!("role {id}"),
                        })
                    }
                }
            }
            Action::DeleteRole(current) => {
                roles.delete(current)?;
                state.remove_role(&current.id());
            }
        }
        state::save_at(home, state)?;
        applied.push(Applied {
            verb: action.verb(),
            kind: action.kind(),
            address: action.address(),
            changes,
        });
    }

    Ok(applied)
}

/// Adopt an existing role into state. Fails when the role does not exist.
pub fn import_role(
    client: &dyn ZmsClient,
    home: &Path,
    workspace: &str,
    id: &str,
    audit_ref: &str,
) -> Result<RoleId, ReconcileError> {
    let id: RoleId = id.parse()?;
    let mut state = state::load_at(home, workspace)?;
    match RoleReconciler::new(client).read(&id, audit_ref)? {
        Lookup::Found(role) => state.upsert_role(role),
        Lookup::Absent => {
            return Err(ReconcileError::NotFound {
                entity: format!("role {id}"),
            })
        }
    }
    state::save_at(home, &state)?;
    tracing::info!("imported role {id}");
    Ok(id)
}

/// Adopt an existing top-level domain into state.
pub fn import_domain(
    client: &dyn ZmsClient,
    home: &Path,
    workspace: &str,
    name: &str,
    audit_ref: &str,
) -> Result<DomainName, ReconcileError> {
    let name = DomainName::from(name);
    let mut state = state::load_at(home, workspace)?;
    match DomainReconciler::new(client).read(&name, audit_ref)? {
        Lookup::Found(domain) => state.upsert_domain(domain),
        Lookup::Absent => {
            return Err(ReconcileError::NotFound {
                entity: format!("domain {name}"),
            })
        }
    }
    state::save_at(home, &state)?;
    tracing::info!("imported domain {name}");
    Ok(name)
}
