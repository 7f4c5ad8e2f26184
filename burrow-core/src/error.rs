//! Error types for Burrow

use std::fmt;

use thiserror::Error;

/// Hostname syscall that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostnameOperation {
    /// `sethostname(2)`
    Set,
    /// `gethostname(2)` read-back
    Get,
}

impl fmt::Display for HostnameOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set => f.write_str("set"),
            Self::Get => f.write_str("read back"),
        }
    }
}

/// Burrow error types
///
/// Every variant names the bootstrap step that failed. None of them is
/// recoverable: callers propagate them to `main`, which terminates.
///
/// Messages do not repeat the underlying OS error; it is the `source`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The running executable could not be resolved for re-invocation
    #[error("failed to resolve own executable")]
    ExecutableNotFound {
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// `clone(2)` with namespace flags failed
    #[error("failed to create namespaces [{namespaces}]")]
    NamespaceCreation {
        /// Comma separated namespace kinds that were requested
        namespaces: String,
        /// Underlying OS error
        #[source]
        source: nix::Error,
    },

    /// Waiting for the isolated child failed
    #[error("failed to wait for isolated process {pid}")]
    Wait {
        /// Child PID as seen by the supervisor
        pid: i32,
        /// Underlying OS error
        #[source]
        source: nix::Error,
    },

    /// Namespace links under `/proc/<pid>/ns` could not be read
    #[error("failed to read namespaces from {path}")]
    NamespaceInspection {
        /// Directory that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The initializer is not PID 1 of a fresh PID namespace
    #[error("initializer is PID {pid}, expected PID 1 inside a new PID namespace")]
    PidNotIsolated {
        /// Observed PID
        pid: i32,
    },

    /// Recursive private remount of `/` failed
    #[error("failed to make / recursively private")]
    MountPropagation {
        /// Underlying OS error
        #[source]
        source: nix::Error,
    },

    /// Mounting the proc filesystem failed
    #[error("failed to mount proc at {target}")]
    ProcMount {
        /// Mount point
        target: String,
        /// Underlying OS error
        #[source]
        source: nix::Error,
    },

    /// Hostname set or read-back failed
    #[error("failed to {operation} hostname{}", reason_suffix(.reason))]
    Hostname {
        /// Which half of the set/confirm pair failed
        operation: HostnameOperation,
        /// Failure not coming from the OS, such as a mismatched read-back
        reason: Option<String>,
        /// Underlying OS error, if the syscall itself failed
        #[source]
        source: Option<nix::Error>,
    },

    /// Writing the init report to stdout failed
    #[error("failed to write init report")]
    Report {
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Spawning or waiting for the interactive command failed
    #[error("failed to launch {program}")]
    CommandLaunch {
        /// Program that was launched
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },
}

#[allow(clippy::ref_option)]
fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|reason| format!(": {reason}"))
        .unwrap_or_default()
}

/// Result type alias for Burrow operations
pub type Result<T> = std::result::Result<T, Error>;
