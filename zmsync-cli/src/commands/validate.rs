//! `zmsync validate`: parse and check the manifest offline.

use anyhow::Result;
use colored::Colorize;

use super::Context;

pub fn run(ctx: &Context) -> Result<()> {
    let manifest = ctx.manifest()?;
    println!(
        "{} workspace '{}': {} domain(s), {} role(s)",
        "✓".green(),
        manifest.workspace,
        manifest.domains.len(),
        manifest.roles.len()
    );
    Ok(())
}
