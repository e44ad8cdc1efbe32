//! zmsync: reconcile Athenz ZMS domains and roles from a YAML manifest.
//!
//! # Usage
//!
//! ```text
//! zmsync [-f zmsync.yaml] [-v|-vv] validate
//! zmsync plan [--diff]
//! zmsync apply
//! zmsync import role <domain>:role.<role>
//! zmsync import domain <domain>
//! zmsync refresh
//! zmsync destroy --yes
//! zmsync show [--json]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    apply::ApplyArgs, destroy::DestroyArgs, import::ImportCommand, plan::PlanArgs,
    show::ShowArgs, Context,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "zmsync",
    version,
    about = "Reconcile Athenz ZMS domains and roles against a manifest",
    long_about = None,
)]
struct Cli {
    /// Path to the manifest.
    #[arg(short = 'f', long, global = true, default_value = "zmsync.yaml")]
    manifest: PathBuf,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the manifest without contacting ZMS.
    Validate,

    /// Show the actions apply would take.
    Plan(PlanArgs),

    /// Create, update and delete resources until ZMS matches the manifest.
    Apply(ApplyArgs),

    /// Adopt an existing ZMS resource into state.
    Import {
        #[command(subcommand)]
        command: ImportCommand,
    },

    /// Re-read every tracked resource and drop those gone from ZMS.
    Refresh,

    /// Delete every tracked resource from ZMS.
    Destroy(DestroyArgs),

    /// Print the tracked state.
    Show(ShowArgs),
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Context::new(cli.manifest);
    match cli.command {
        Commands::Validate => commands::validate::run(&ctx),
        Commands::Plan(args) => args.run(&ctx),
        Commands::Apply(args) => args.run(&ctx),
        Commands::Import { command } => commands::import::run(&ctx, command),
        Commands::Refresh => commands::refresh::run(&ctx),
        Commands::Destroy(args) => args.run(&ctx),
        Commands::Show(args) => args.run(&ctx),
    }
}
