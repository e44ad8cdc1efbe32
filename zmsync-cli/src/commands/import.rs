//! `zmsync import`: adopt existing ZMS resources into state.

use anyhow::{Context as _, Result};
use clap::Subcommand;
use colored::Colorize;

use zmsync_core::{DomainName, RoleId, DEFAULT_AUDIT_REF};
use zmsync_reconcile::pipeline;

use super::Context;

#[derive(Subcommand, Debug)]
pub enum ImportCommand {
    /// Import a role by identifier, e.g. `sports:role.readers`.
    Role { id: String },

    /// Import a top-level domain by name.
    Domain { name: String },
}

pub fn run(ctx: &Context, command: ImportCommand) -> Result<()> {
    let manifest = ctx.manifest()?;
    let home = ctx.home()?;
    let client = ctx.client(&manifest);

    match command {
        ImportCommand::Role { id } => {
            // The manifest entry, if any, supplies the audit reference.
            let audit_ref = id
                .parse::<RoleId>()
                .ok()
                .and_then(|parsed| manifest.role(&parsed).map(|r| r.audit_ref.clone()))
                .unwrap_or_else(|| DEFAULT_AUDIT_REF.to_string());
            let imported =
                pipeline::import_role(&client, &home, &manifest.workspace, &id, &audit_ref)
                    .with_context(|| format!("import failed for role '{id}'"))?;
            println!("{} imported role {imported}", "✓".green());
        }
        ImportCommand::Domain { name } => {
            let audit_ref = manifest
                .domain(&DomainName::from(name.as_str()))
                .map(|d| d.audit_ref.clone())
                .unwrap_or_else(|| DEFAULT_AUDIT_REF.to_string());
            let imported =
                pipeline::import_domain(&client, &home, &manifest.workspace, &name, &audit_ref)
                    .with_context(|| format!("import failed for domain '{name}'"))?;
            println!("{} imported domain {imported}", "✓".green());
        }
    }
    Ok(())
}
