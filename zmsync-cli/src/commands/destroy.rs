//! `zmsync destroy`: delete every tracked resource.

use anyhow::{bail, Context as _, Result};
use clap::Args;
use colored::Colorize;

use zmsync_reconcile::pipeline;

use super::{print_applied, print_dropped, Context};

/// Arguments for `zmsync destroy`.
#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Confirm deletion of every tracked domain and role.
    #[arg(long)]
    pub yes: bool,
}

impl DestroyArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let manifest = ctx.manifest()?;
        if !self.yes {
            bail!(
                "refusing to destroy workspace '{}' without --yes",
                manifest.workspace
            );
        }
        let home = ctx.home()?;
        let client = ctx.client(&manifest);

        let report = pipeline::destroy_at(&client, &home, &manifest.workspace)
            .with_context(|| format!("destroy failed for workspace '{}'", manifest.workspace))?;
        print_dropped(&report.refresh);
        print_applied(&report.applied);
        println!(
            "{} '{}': {} resource(s) destroyed",
            "✓".green(),
            manifest.workspace,
            report.applied.len()
        );
        Ok(())
    }
}
