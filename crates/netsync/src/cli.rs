//! Clap derive structures for the `netsync` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netsync -- reconcile network inventory sources into DCIM/IPAM
#[derive(Debug, Parser)]
#[command(
    name = "netsync",
    version,
    about = "Reconcile network inventory sources into a DCIM/IPAM inventory",
    long_about = "Reads device and interface snapshots from each configured source,\n\
        derives VLANs, IP addresses and prefixes, and reconciles them into the\n\
        destination inventory, removing objects this tool owns that no source\n\
        reported any more.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every source against an in-memory destination and report the
    /// writes a real run would make
    Plan(PlanArgs),

    /// Validate the configuration and summarise its sources
    #[command(alias = "check")]
    CheckConfig(CheckConfigArgs),
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Only run the named sources (repeatable)
    #[arg(long = "source", short = 's', value_name = "NAME")]
    pub sources: Vec<String>,

    /// Never remove orphans, whatever the config says
    #[arg(long)]
    pub no_prune: bool,

    /// List every planned write instead of per-kind totals
    #[arg(long)]
    pub operations: bool,
}

#[derive(Debug, Args)]
pub struct CheckConfigArgs {
    /// Print the effective configuration (file + environment) as TOML
    #[arg(long)]
    pub effective: bool,
}
