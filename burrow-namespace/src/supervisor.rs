//! The outer phase: re-launch this executable inside new namespaces
//!
//! This module uses `unsafe` for clone(2) and signal(2). clone is the
//! only way to have the kernel create a PID namespace together with the
//! process that becomes its PID 1.

#![allow(unsafe_code)]

use burrow_core::{Error, ProcessId, Result};
use nix::errno::Errno;
use nix::sched::clone;
use nix::sys::signal::{SigHandler, Signal, signal};
use nix::sys::wait::waitpid;
use nix::unistd::{Pid, execve};
use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::{INIT_PHASE_VALUE, NamespaceRequest, PHASE_ENV_VAR};
use crate::executor::exit_code_from_wait;
use crate::info::NamespaceInfo;

/// Stack for the cloned child; it only has to reach execve(2)
const STACK_SIZE: usize = 1024 * 1024;

/// Exit code of the child when execve(2) fails
const EXEC_FAILED: isize = 127;

/// Supervisor owning the isolated child until it exits
#[derive(Debug, Clone)]
pub struct Supervisor {
    executable: PathBuf,
    args: Vec<OsString>,
    env: Vec<(OsString, OsString)>,
    request: NamespaceRequest,
}

impl Supervisor {
    /// Supervisor that re-invokes the running executable with this
    /// process's own argv and environment
    ///
    /// # Errors
    /// Returns [`Error::ExecutableNotFound`] if the executable path cannot
    /// be resolved
    pub fn from_current_process() -> Result<Self> {
        let executable =
            std::env::current_exe().map_err(|e| Error::ExecutableNotFound { source: e })?;

        Ok(Self::new(
            executable,
            std::env::args_os().collect(),
            std::env::vars_os().collect(),
        ))
    }

    /// Create a supervisor for an explicit executable, argv and environment
    #[must_use]
    pub const fn new(
        executable: PathBuf,
        args: Vec<OsString>,
        env: Vec<(OsString, OsString)>,
    ) -> Self {
        Self {
            executable,
            args,
            env,
            request: NamespaceRequest::standard(),
        }
    }

    /// Override the namespace request
    #[must_use]
    pub fn with_request(mut self, request: NamespaceRequest) -> Self {
        self.request = request;
        self
    }

    /// Executable that will be re-invoked
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Namespaces requested for the child
    #[must_use]
    pub const fn request(&self) -> &NamespaceRequest {
        &self.request
    }

    /// Environment for the child: ours, with the phase marker set to the
    /// initializer value
    #[must_use]
    pub fn child_environment(&self) -> Vec<(OsString, OsString)> {
        self.env
            .iter()
            .filter(|(key, _)| key != PHASE_ENV_VAR)
            .cloned()
            .chain(std::iter::once((
                OsString::from(PHASE_ENV_VAR),
                OsString::from(INIT_PHASE_VALUE),
            )))
            .collect()
    }

    /// Create the isolated child and wait for it
    ///
    /// Returns the child's exit code, or `128 + signal` if it was killed.
    ///
    /// # Errors
    /// Returns [`Error::NamespaceCreation`] if the namespaces cannot be
    /// created, or [`Error::Wait`] if the child cannot be waited for
    pub fn run(&self) -> Result<i32> {
        let child = self.spawn()?;
        info!("👨‍👦 Waiting for isolated process (host PID {})", child);

        log_isolation(child);
        ignore_terminal_interrupts();

        wait_for_child(child)
    }

    fn spawn(&self) -> Result<Pid> {
        // everything the child needs is prepared before clone so that it
        // goes straight to execve
        let path = to_cstring(self.executable.as_os_str())?;
        let argv = self
            .args
            .iter()
            .map(|arg| to_cstring(arg))
            .collect::<Result<Vec<_>>>()?;
        let envp = self
            .child_environment()
            .iter()
            .map(|(key, value)| env_entry(key, value))
            .collect::<Result<Vec<_>>>()?;

        let flags = self.request.to_clone_flags();
        let namespaces = self.request.enabled_namespaces().join(", ");

        info!(
            namespaces = %namespaces,
            executable = %self.executable.display(),
            "🔒 Creating namespaces"
        );

        let mut stack = vec![0u8; STACK_SIZE];
        let child_main = Box::new(|| -> isize {
            let Err(e) = execve(&path, &argv, &envp);
            eprintln!("burrow: failed to execute {}: {e}", path.to_string_lossy());
            EXEC_FAILED
        });

        // SAFETY: no CLONE_VM, so the child works on a private copy of our
        // memory and its own stack; it only calls execve(2) on data built
        // above, or reports and exits
        let child = unsafe { clone(child_main, &mut stack, flags, Some(libc::SIGCHLD)) }
            .map_err(|e| {
                error!(
                    error = %e,
                    namespaces = %namespaces,
                    "Failed to create namespaces"
                );
                Error::NamespaceCreation {
                    namespaces: namespaces.clone(),
                    source: e,
                }
            })?;

        debug!(pid = %ProcessId::from(child), "Isolated process created");
        Ok(child)
    }
}

fn to_cstring(value: &OsStr) -> Result<CString> {
    CString::new(value.as_bytes()).map_err(|e| Error::InvalidConfig {
        message: format!("{value:?} contains a NUL byte: {e}"),
    })
}

fn env_entry(key: &OsStr, value: &OsStr) -> Result<CString> {
    let mut entry = OsString::with_capacity(key.len() + value.len() + 1);
    entry.push(key);
    entry.push("=");
    entry.push(value);
    to_cstring(&entry)
}

/// Compare the child's namespaces with ours, for diagnostics only
fn log_isolation(child: Pid) {
    match (
        NamespaceInfo::current(),
        NamespaceInfo::for_pid(child.as_raw()),
    ) {
        (Ok(host), Ok(isolated)) => {
            debug!(
                isolated = ?isolated.differs_from(&host),
                "Child namespaces differ from the supervisor's"
            );
        }
        // the child may already be gone; its exit status says why
        (Err(e), _) | (_, Err(e)) => debug!(error = %e, "Could not read child namespaces"),
    }
}

/// Leave terminal interrupts to the isolated command, as system(3) does
///
/// The child was cloned before this and keeps the default dispositions.
fn ignore_terminal_interrupts() {
    for sig in [Signal::SIGINT, Signal::SIGQUIT] {
        // SAFETY: SIG_IGN installs no handler code
        if let Err(e) = unsafe { signal(sig, SigHandler::SigIgn) } {
            warn!(signal = ?sig, error = %e, "Could not ignore signal");
        }
    }
}

fn wait_for_child(child: Pid) -> Result<i32> {
    loop {
        match waitpid(child, None) {
            Ok(status) => {
                if let Some(exit_code) = exit_code_from_wait(status) {
                    if exit_code == 0 {
                        info!("👋 Isolated process exited");
                    } else {
                        warn!(exit_code, "Isolated process exited with failure");
                    }
                    return Ok(exit_code);
                }
                debug!(?status, "Child status");
            }
            Err(Errno::EINTR) => {
                debug!("Wait interrupted by signal, continuing...");
            }
            Err(e) => {
                error!(error = %e, "Wait failed");
                return Err(Error::Wait {
                    pid: child.as_raw(),
                    source: e,
                });
            }
        }
    }
}
