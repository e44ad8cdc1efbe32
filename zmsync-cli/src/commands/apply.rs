//! `zmsync apply`: converge ZMS toward the manifest.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use zmsync_reconcile::pipeline;

use super::{print_applied, print_dropped, Context};

/// Arguments for `zmsync apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {}

impl ApplyArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let manifest = ctx.manifest()?;
        let home = ctx.home()?;
        let client = ctx.client(&manifest);

        let report = pipeline::apply_at(&client, &home, &manifest)
            .with_context(|| format!("apply failed for workspace '{}'", manifest.workspace))?;

        print_dropped(&report.refresh);
        if report.applied.is_empty() {
            println!("{} '{}': nothing to do", "✓".green(), manifest.workspace);
            return Ok(());
        }
        print_applied(&report.applied);
        println!(
            "{} '{}': {} action(s) applied",
            "✓".green(),
            manifest.workspace,
            report.applied.len()
        );
        Ok(())
    }
}
