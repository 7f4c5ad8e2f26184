//! Burrow CLI
//!
//! Runs a command as PID 1 of fresh PID, mount, network, UTS and IPC
//! namespaces. The binary re-executes itself once to cross into them.

use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

mod cli;
mod run;

use cli::Cli;

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose; logs stay off stdout
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run::execute(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            process::exit(1);
        }
    }
}
