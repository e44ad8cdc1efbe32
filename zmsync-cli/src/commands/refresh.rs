//! `zmsync refresh`: sync state with what ZMS currently holds.

use anyhow::{Context as _, Result};
use colored::Colorize;

use zmsync_reconcile::pipeline;

use super::{print_dropped, Context};

pub fn run(ctx: &Context) -> Result<()> {
    let manifest = ctx.manifest()?;
    let home = ctx.home()?;
    let client = ctx.client(&manifest);

    let (state, report) = pipeline::refresh_at(&client, &home, &manifest.workspace)
        .with_context(|| format!("refresh failed for workspace '{}'", manifest.workspace))?;
    print_dropped(&report);
    println!(
        "{} '{}': {} domain(s), {} role(s) tracked",
        "✓".green(),
        state.workspace,
        state.domains.len(),
        state.roles.len()
    );
    Ok(())
}
