//! `zmsync show`: print tracked state without contacting ZMS.

use anyhow::{Context as _, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use zmsync_reconcile::{state, State};

use super::Context;

/// Arguments for `zmsync show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "kind")]
    kind: &'static str,
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "members")]
    members: String,
    #[tabled(rename = "tags")]
    tags: String,
    #[tabled(rename = "ypm_id")]
    ypm_id: String,
}

impl ShowArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let manifest = ctx.manifest()?;
        let home = ctx.home()?;
        let state = state::load_at(&home, &manifest.workspace)
            .with_context(|| format!("failed to load state for '{}'", manifest.workspace))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&state)?);
            return Ok(());
        }
        if state.is_empty() {
            println!("No resources tracked for '{}'.", state.workspace);
            return Ok(());
        }

        let mut table = Table::new(rows(&state));
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn rows(state: &State) -> Vec<ResourceRow> {
    let domains = state.domains.values().map(|t| ResourceRow {
        kind: "domain",
        id: t.id.clone(),
        members: join(t.attributes.admin_users.iter().map(|m| m.to_string())),
        tags: String::new(),
        ypm_id: t.attributes.ypm_id.to_string(),
    });
    let roles = state.roles.values().map(|t| ResourceRow {
        kind: "role",
        id: t.id.clone(),
        members: join(t.attributes.members.iter().map(|m| m.name.to_string())),
        tags: join(t.attributes.tags.iter().map(|(k, v)| format!("{k}={v}"))),
        ypm_id: String::new(),
    });
    domains.chain(roles).collect()
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}
