//! `zmsync plan`: refresh, then list the actions apply would take.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use zmsync_reconcile::{pipeline, Plan};

use super::{print_dropped, Context};

/// Arguments for `zmsync plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Print an attribute diff for every action.
    #[arg(long)]
    pub diff: bool,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "resource")]
    resource: String,
}

impl PlanArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let manifest = ctx.manifest()?;
        let home = ctx.home()?;
        let client = ctx.client(&manifest);

        let (plan, refresh) = pipeline::plan_at(&client, &home, &manifest)
            .with_context(|| format!("plan failed for workspace '{}'", manifest.workspace))?;
        print_dropped(&refresh);
        print_plan(&plan, self.diff)
    }
}

fn print_plan(plan: &Plan, diff: bool) -> Result<()> {
    if plan.is_empty() {
        println!("{} no changes; ZMS matches the manifest", "✓".green());
        return Ok(());
    }

    let rows: Vec<PlanRow> = plan
        .iter()
        .map(|a| PlanRow {
            action: a.verb().to_string(),
            kind: a.kind().to_string(),
            resource: a.address(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if diff {
        for action in plan.iter() {
            let unified = action.attribute_diff()?;
            print!("{unified}");
            if !unified.ends_with('\n') {
                println!();
            }
        }
    }

    let s = plan.summary();
    println!(
        "Plan: {} to create, {} to replace, {} to update, {} to delete.",
        s.create, s.replace, s.update, s.delete
    );
    Ok(())
}
