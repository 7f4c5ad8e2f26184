//! CLI argument definitions

use burrow_core::Hostname;
use burrow_namespace::ReportFormat;
use burrow_namespace::config::DEFAULT_HOSTNAME;
use clap::Parser;

/// Both phases parse the same argv; the supervisor forwards it unchanged.
#[derive(Parser, Debug)]
#[command(name = "burrow")]
#[command(
    about = "Run a command in fresh PID, mount, network, UTS and IPC namespaces",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Hostname inside the UTS namespace
    #[arg(long, value_name = "NAME", default_value = DEFAULT_HOSTNAME)]
    pub hostname: Hostname,

    /// Format of the initializer's self-report on stdout (human or json)
    #[arg(long, value_name = "FORMAT", default_value = "human")]
    pub report: ReportFormat,

    /// Command to run inside (default: sh)
    #[arg(last = true)]
    pub command: Vec<String>,
}
