//! Phase dispatch

use anyhow::{Context, Result};
use burrow_namespace::{InitConfig, Initializer, Phase, Supervisor};
use tracing::{debug, info_span};

use crate::cli::Cli;

/// Run whichever phase this process is, returning the exit code to relay.
pub fn execute(cli: Cli) -> Result<i32> {
    let phase = Phase::from_env();
    let _span = info_span!("burrow", %phase).entered();

    debug!(?cli, "Parsed arguments");

    match phase {
        Phase::Supervisor => supervise(),
        Phase::Initializer => initialize(cli),
    }
}

fn supervise() -> Result<i32> {
    let supervisor =
        Supervisor::from_current_process().context("cannot locate own executable")?;

    supervisor
        .run()
        .context("failed to start isolated environment")
}

fn initialize(cli: Cli) -> Result<i32> {
    let config = InitConfig::new()
        .with_hostname(cli.hostname)
        .with_command(cli.command)
        .with_report(cli.report);

    Initializer::new(config)
        .run()
        .context("failed to initialize isolated environment")
}
