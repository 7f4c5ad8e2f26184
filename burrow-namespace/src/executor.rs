//! Launching the interactive command and mapping exit statuses

use burrow_core::{Error, Result};
use nix::sys::wait::WaitStatus;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_COMMAND, PHASE_ENV_VAR};

/// Exit code reported for a process killed by `signal`, shell style
#[must_use]
pub const fn signal_exit_code(signal: i32) -> i32 {
    128 + signal
}

/// Convert a `std` exit status into a shell-style exit code
#[must_use]
pub fn exit_code_from_status(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => signal_exit_code(signal),
        // neither exited nor signaled cannot be returned by wait()
        (None, None) => 1,
    }
}

/// Convert a terminal `waitpid` status into an exit code
///
/// Returns `None` for stop/continue reports, which do not end the wait.
#[must_use]
pub fn exit_code_from_wait(status: WaitStatus) -> Option<i32> {
    match status {
        WaitStatus::Exited(_, code) => Some(code),
        WaitStatus::Signaled(_, signal, _) => Some(signal_exit_code(signal as i32)),
        _ => None,
    }
}

/// Split a command line into program and arguments
///
/// An empty command means the default interactive shell.
#[must_use]
pub fn build_command(command: &[String]) -> (String, Vec<String>) {
    match command.split_first() {
        Some((program, args)) => (program.clone(), args.to_vec()),
        None => (DEFAULT_COMMAND.to_string(), Vec::new()),
    }
}

/// Command for `program` with inherited standard streams
///
/// The phase marker is removed from the child's environment so nothing
/// started inside the isolated session mistakes itself for an initializer.
#[must_use]
pub fn command(program: &str, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env_remove(PHASE_ENV_VAR)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    cmd
}

/// Run `command` and wait for it
///
/// # Errors
/// Returns [`Error::CommandLaunch`] if the command cannot be spawned or
/// waited for
pub fn run_command(command: &[String]) -> Result<i32> {
    let (program, args) = build_command(command);

    info!("🚀 Executing: {} {:?}", program, args);

    let status = self::command(&program, &args)
        .status()
        .map_err(|e| Error::CommandLaunch {
            program: program.clone(),
            source: e,
        })?;

    let exit_code = exit_code_from_status(status);
    if exit_code == 0 {
        debug!(program = %program, "Command exited successfully");
    } else {
        warn!(program = %program, exit_code, "Command exited with failure");
    }

    Ok(exit_code)
}
