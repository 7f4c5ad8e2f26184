//! Initializer self-report events with structured tracing

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{Hostname, ProcessId};

/// Events reported by the namespace initializer on stdout
///
/// A harness can parse these (one JSON object per line in JSON mode) to
/// assert PID and UTS isolation from outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InitEvent {
    /// PID observed right after entering the namespaces
    Identity {
        /// Own PID inside the new PID namespace
        pid: ProcessId,
        /// `/proc/self/ns` link targets, keyed by namespace kind
        namespaces: BTreeMap<String, String>,
    },

    /// Hostname was set and read back
    HostnameSet {
        /// Value returned by `gethostname(2)`
        hostname: Hostname,
    },

    /// About to launch the interactive command
    Launching {
        /// Program and arguments
        command: Vec<String>,
    },
}

impl InitEvent {
    /// Emit structured tracing event
    pub fn emit_trace(&self) {
        match self {
            Self::Identity { pid, namespaces } => {
                tracing::debug!(
                    pid = pid.as_raw(),
                    namespaces = ?namespaces,
                    event = "identity",
                    "Initializer identity"
                );
            }
            Self::HostnameSet { hostname } => {
                tracing::debug!(
                    hostname = %hostname,
                    event = "hostname_set",
                    "Hostname set"
                );
            }
            Self::Launching { command } => {
                tracing::debug!(
                    command = ?command,
                    event = "launching",
                    "Launching command"
                );
            }
        }
    }
}

impl fmt::Display for InitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity { pid, .. } => write!(f, "Inside isolated environment, PID: {pid}"),
            Self::HostnameSet { hostname } => write!(f, "Hostname set to: {hostname}"),
            Self::Launching { command } => write!(f, "Launching: {}", command.join(" ")),
        }
    }
}
