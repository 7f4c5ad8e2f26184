//! Namespace request and bootstrap configuration

use burrow_core::{Error, Hostname, Result};
use nix::sched::CloneFlags;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::str::FromStr;

/// Environment variable carrying the phase marker across re-execution
pub const PHASE_ENV_VAR: &str = "BURROW_PHASE";

/// Marker value selecting the initializer phase
pub const INIT_PHASE_VALUE: &str = "init";

/// Where the fresh proc filesystem is mounted
pub const PROC_MOUNT_POINT: &str = "/proc";

/// Hostname set inside the UTS namespace unless overridden
pub const DEFAULT_HOSTNAME: &str = Hostname::DEFAULT;

/// Command launched when none is given
pub const DEFAULT_COMMAND: &str = "sh";

/// Which half of the bootstrap this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Outer phase, in the caller's namespaces
    Supervisor,
    /// Inner phase, PID 1 of the new namespaces
    Initializer,
}

impl Phase {
    /// Read the phase marker from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_value(std::env::var_os(PHASE_ENV_VAR).as_deref())
    }

    /// Decide the phase from a raw marker value
    ///
    /// Only the exact sentinel selects the initializer; absence or any
    /// other value means this is the supervisor.
    #[must_use]
    pub fn from_value(value: Option<&OsStr>) -> Self {
        match value {
            Some(v) if v == OsStr::new(INIT_PHASE_VALUE) => Self::Initializer,
            _ => Self::Supervisor,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supervisor => f.write_str("supervisor"),
            Self::Initializer => f.write_str("initializer"),
        }
    }
}

/// A namespace kind that can be requested at clone time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceKind {
    /// Process IDs
    Pid,
    /// Mount table
    Mount,
    /// Network stack
    Network,
    /// Hostname and domain name
    Uts,
    /// System V IPC and POSIX message queues
    Ipc,
}

impl NamespaceKind {
    /// Every kind, in the order they are reported
    pub const ALL: [Self; 5] = [Self::Pid, Self::Mount, Self::Network, Self::Uts, Self::Ipc];

    /// The matching `clone(2)` flag
    #[must_use]
    pub const fn clone_flag(self) -> CloneFlags {
        match self {
            Self::Pid => CloneFlags::CLONE_NEWPID,
            Self::Mount => CloneFlags::CLONE_NEWNS,
            Self::Network => CloneFlags::CLONE_NEWNET,
            Self::Uts => CloneFlags::CLONE_NEWUTS,
            Self::Ipc => CloneFlags::CLONE_NEWIPC,
        }
    }

    /// Link name under `/proc/<pid>/ns`
    #[must_use]
    pub const fn proc_name(self) -> &'static str {
        match self {
            Self::Pid => "pid",
            Self::Mount => "mnt",
            Self::Network => "net",
            Self::Uts => "uts",
            Self::Ipc => "ipc",
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.proc_name())
    }
}

/// Set of namespaces created together with the isolated process
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRequest {
    /// New PID namespace
    pub pid: bool,

    /// New mount namespace
    pub mount: bool,

    /// New network namespace
    pub network: bool,

    /// New UTS namespace (hostname)
    pub uts: bool,

    /// New IPC namespace
    pub ipc: bool,
}

impl Default for NamespaceRequest {
    fn default() -> Self {
        Self::standard()
    }
}

impl NamespaceRequest {
    /// PID, mount, network, UTS and IPC, the set the bootstrap needs
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            pid: true,
            mount: true,
            network: true,
            uts: true,
            ipc: true,
        }
    }

    /// Check whether a kind is requested
    #[must_use]
    pub const fn contains(&self, kind: NamespaceKind) -> bool {
        match kind {
            NamespaceKind::Pid => self.pid,
            NamespaceKind::Mount => self.mount,
            NamespaceKind::Network => self.network,
            NamespaceKind::Uts => self.uts,
            NamespaceKind::Ipc => self.ipc,
        }
    }

    /// Requested kinds in reporting order
    #[must_use]
    pub fn kinds(&self) -> Vec<NamespaceKind> {
        NamespaceKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }

    /// Combined flags for a single `clone(2)` call
    #[must_use]
    pub fn to_clone_flags(&self) -> CloneFlags {
        self.kinds()
            .into_iter()
            .fold(CloneFlags::empty(), |flags, kind| flags | kind.clone_flag())
    }

    /// Get list of requested namespace names
    #[must_use]
    pub fn enabled_namespaces(&self) -> Vec<&'static str> {
        self.kinds().into_iter().map(NamespaceKind::proc_name).collect()
    }
}

/// How the initializer prints its self-report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// One readable line per event
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidConfig {
                message: format!("unknown report format '{other}' (expected human or json)"),
            }),
        }
    }
}

/// Everything the initializer needs once inside the namespaces
#[derive(Debug, Clone)]
pub struct InitConfig {
    /// Hostname for the UTS namespace
    pub hostname: Hostname,

    /// Command and arguments to launch, `sh` when empty
    pub command: Vec<String>,

    /// Self-report format
    pub report: ReportFormat,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            hostname: Hostname::default(),
            command: Vec::new(),
            report: ReportFormat::Human,
        }
    }
}

impl InitConfig {
    /// Create a configuration with the default hostname and command
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set hostname for UTS namespace
    #[must_use]
    pub fn with_hostname(mut self, hostname: Hostname) -> Self {
        self.hostname = hostname;
        self
    }

    /// Set the command to launch
    #[must_use]
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    /// Set the self-report format
    #[must_use]
    pub fn with_report(mut self, report: ReportFormat) -> Self {
        self.report = report;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_value() {
        assert_eq!(Phase::from_value(None), Phase::Supervisor);
        assert_eq!(
            Phase::from_value(Some(OsStr::new("init"))),
            Phase::Initializer
        );
        assert_eq!(Phase::from_value(Some(OsStr::new("1"))), Phase::Supervisor);
        assert_eq!(Phase::from_value(Some(OsStr::new(""))), Phase::Supervisor);
        assert_eq!(
            Phase::from_value(Some(OsStr::new("INIT"))),
            Phase::Supervisor
        );
    }

    #[test]
    fn test_standard_request() {
        let request = NamespaceRequest::standard();
        assert_eq!(request.kinds(), NamespaceKind::ALL.to_vec());
        assert_eq!(
            request.enabled_namespaces(),
            vec!["pid", "mnt", "net", "uts", "ipc"]
        );
    }

    #[test]
    fn test_clone_flags_conversion() {
        let flags = NamespaceRequest::standard().to_clone_flags();

        assert!(flags.contains(CloneFlags::CLONE_NEWPID));
        assert!(flags.contains(CloneFlags::CLONE_NEWNS));
        assert!(flags.contains(CloneFlags::CLONE_NEWNET));
        assert!(flags.contains(CloneFlags::CLONE_NEWUTS));
        assert!(flags.contains(CloneFlags::CLONE_NEWIPC));

        assert!(!flags.contains(CloneFlags::CLONE_NEWUSER));
        assert!(!flags.contains(CloneFlags::CLONE_NEWCGROUP));
    }

    #[test]
    fn test_partial_request() {
        let request = NamespaceRequest {
            network: false,
            ipc: false,
            ..NamespaceRequest::standard()
        };

        assert!(!request.contains(NamespaceKind::Network));
        assert_eq!(request.enabled_namespaces(), vec!["pid", "mnt", "uts"]);
        assert!(!request.to_clone_flags().contains(CloneFlags::CLONE_NEWNET));
    }

    #[test]
    fn test_report_format_parse() {
        assert_eq!("human".parse::<ReportFormat>().unwrap(), ReportFormat::Human);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("yaml".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_init_config_builder() {
        let config = InitConfig::new()
            .with_hostname(Hostname::new("box").unwrap())
            .with_command(vec!["/bin/true".to_string()])
            .with_report(ReportFormat::Json);

        assert_eq!(config.hostname.as_str(), "box");
        assert_eq!(config.command, vec!["/bin/true"]);
        assert_eq!(config.report, ReportFormat::Json);
        assert_eq!(InitConfig::default().hostname.as_str(), DEFAULT_HOSTNAME);
    }
}
