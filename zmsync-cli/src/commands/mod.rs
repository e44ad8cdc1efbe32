pub mod apply;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod show;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use colored::Colorize;

use zmsync_client::HttpZmsClient;
use zmsync_core::{manifest, paths, Manifest};
use zmsync_reconcile::pipeline::{Applied, RefreshReport};

/// What every subcommand needs: where the manifest is and how to reach home.
pub struct Context {
    manifest_path: PathBuf,
}

impl Context {
    pub fn new(manifest_path: PathBuf) -> Self {
        Self { manifest_path }
    }

    pub fn manifest(&self) -> Result<Manifest> {
        manifest::load(&self.manifest_path).with_context(|| {
            format!(
                "failed to load manifest '{}'",
                self.manifest_path.display()
            )
        })
    }

    pub fn home(&self) -> Result<PathBuf> {
        paths::home().context("could not determine home directory")
    }

    pub fn client(&self, manifest: &Manifest) -> HttpZmsClient {
        tracing::debug!("using ZMS at {}", manifest.zms.url);
        HttpZmsClient::new(&manifest.zms)
    }
}

pub(crate) fn print_dropped(report: &RefreshReport) {
    for address in &report.dropped {
        println!(
            "{} {address} (no longer exists in ZMS, removed from state)",
            "-".yellow()
        );
    }
}

pub(crate) fn print_applied(applied: &[Applied]) {
    for a in applied {
        let marker = match a.verb {
            "create" => "+".green(),
            "replace" => "±".yellow(),
            "update" => "~".yellow(),
            _ => "-".red(),
        };
        println!("{marker} {} {} ({})", a.kind, a.address, a.verb);
        if let Some(changes) = &a.changes {
            for m in &changes.removed_members {
                println!("    - member {m}");
            }
            for m in &changes.added_members {
                println!("    + member {m}");
            }
            if changes.tags_replaced {
                println!("    ~ tags");
            }
        }
    }
}
