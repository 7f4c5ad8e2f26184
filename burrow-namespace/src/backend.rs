//! Isolation backend trait for pluggable implementations

use burrow_core::{Error, Hostname, HostnameOperation, ProcessId, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::info::NamespaceInfo;
use crate::mount::{self, PrivatePropagation};
use crate::{executor, uts};

/// Operations the initializer performs inside fresh namespaces
///
/// This allows for different implementations:
/// - [`LinuxBackend`] - Real syscalls
/// - [`MockBackend`] - Testing without privileges
pub trait IsolationBackend {
    /// Own PID
    fn pid(&self) -> ProcessId;

    /// Namespace identities of the calling process
    ///
    /// # Errors
    /// Returns error if they cannot be read
    fn namespaces(&self) -> Result<BTreeMap<String, String>>;

    /// Make `/` recursively private
    ///
    /// # Errors
    /// Returns error if propagation cannot be changed
    fn make_root_private(&self) -> Result<PrivatePropagation>;

    /// Mount a fresh proc filesystem
    ///
    /// # Errors
    /// Returns error if the mount fails
    fn mount_proc(&self, propagation: &PrivatePropagation) -> Result<()>;

    /// Set the UTS hostname
    ///
    /// # Errors
    /// Returns error if the hostname cannot be set
    fn set_hostname(&self, hostname: &Hostname) -> Result<()>;

    /// Read the UTS hostname back
    ///
    /// # Errors
    /// Returns error if the hostname cannot be read
    fn hostname(&self) -> Result<String>;

    /// Run the command with inherited streams, returning its exit code
    ///
    /// # Errors
    /// Returns error if the command cannot be launched
    fn run_command(&self, command: &[String]) -> Result<i32>;
}

/// Backend issuing the real Linux syscalls
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxBackend;

impl IsolationBackend for LinuxBackend {
    fn pid(&self) -> ProcessId {
        ProcessId::current()
    }

    fn namespaces(&self) -> Result<BTreeMap<String, String>> {
        Ok(NamespaceInfo::current()?.to_map())
    }

    fn make_root_private(&self) -> Result<PrivatePropagation> {
        mount::make_root_private()
    }

    fn mount_proc(&self, propagation: &PrivatePropagation) -> Result<()> {
        mount::mount_proc(propagation)
    }

    fn set_hostname(&self, hostname: &Hostname) -> Result<()> {
        uts::set_hostname(hostname)
    }

    fn hostname(&self) -> Result<String> {
        uts::hostname()
    }

    fn run_command(&self, command: &[String]) -> Result<i32> {
        executor::run_command(command)
    }
}

/// A step recorded by [`MockBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `make_root_private`
    MakeRootPrivate,
    /// `mount_proc`
    MountProc,
    /// `set_hostname` with the requested name
    SetHostname(String),
    /// `hostname`
    GetHostname,
    /// `run_command` with the command line
    RunCommand(Vec<String>),
}

/// Step at which a [`MockBackend`] should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Namespace links cannot be read
    Namespaces,
    /// Propagation change fails
    MakeRootPrivate,
    /// Proc mount fails
    MountProc,
    /// `sethostname` fails
    SetHostname,
    /// `gethostname` fails
    GetHostname,
    /// Command cannot be launched
    RunCommand,
}

/// Mock backend for testing (no syscalls, records every call)
///
/// # Example
/// ```
/// use burrow_namespace::{IsolationBackend, MockBackend, MockCall};
///
/// let backend = MockBackend::new();
/// let token = backend.make_root_private().unwrap();
/// backend.mount_proc(&token).unwrap();
///
/// assert_eq!(
///     backend.calls(),
///     vec![MockCall::MakeRootPrivate, MockCall::MountProc]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug)]
struct MockState {
    pid: ProcessId,
    hostname: String,
    /// When set, `hostname()` returns this instead of the stored name
    hostname_override: Option<String>,
    exit_code: i32,
    fail_at: Option<MockFailure>,
    calls: Vec<MockCall>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Mock running as PID 1 with host-like hostname `host`
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                pid: ProcessId::INIT,
                hostname: "host".to_string(),
                hostname_override: None,
                exit_code: 0,
                fail_at: None,
                calls: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report this PID instead of 1
    #[must_use]
    pub fn with_pid(self, pid: ProcessId) -> Self {
        self.state().pid = pid;
        self
    }

    /// Exit code the launched command returns
    #[must_use]
    pub fn with_exit_code(self, code: i32) -> Self {
        self.state().exit_code = code;
        self
    }

    /// Fail at the given step
    #[must_use]
    pub fn failing_at(self, step: MockFailure) -> Self {
        self.state().fail_at = Some(step);
        self
    }

    /// Make the read-back return a different name than was set
    #[must_use]
    pub fn with_hostname_readback(self, name: impl Into<String>) -> Self {
        self.state().hostname_override = Some(name.into());
        self
    }

    /// Calls recorded so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    fn record(&self, call: MockCall, step: MockFailure) -> Result<()> {
        let mut state = self.state();
        state.calls.push(call);
        if state.fail_at != Some(step) {
            return Ok(());
        }

        Err(Self::failure(step))
    }

    fn failure(step: MockFailure) -> Error {
        match step {
            MockFailure::Namespaces => Error::NamespaceInspection {
                path: "/proc/self/ns".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            },
            MockFailure::MakeRootPrivate => Error::MountPropagation {
                source: nix::Error::EPERM,
            },
            MockFailure::MountProc => Error::ProcMount {
                target: crate::config::PROC_MOUNT_POINT.to_string(),
                source: nix::Error::EBUSY,
            },
            MockFailure::SetHostname => Error::Hostname {
                operation: HostnameOperation::Set,
                reason: None,
                source: Some(nix::Error::EPERM),
            },
            MockFailure::GetHostname => Error::Hostname {
                operation: HostnameOperation::Get,
                reason: None,
                source: Some(nix::Error::EFAULT),
            },
            MockFailure::RunCommand => Error::CommandLaunch {
                program: "mock".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            },
        }
    }
}

impl IsolationBackend for MockBackend {
    fn pid(&self) -> ProcessId {
        self.state().pid
    }

    fn namespaces(&self) -> Result<BTreeMap<String, String>> {
        if self.state().fail_at == Some(MockFailure::Namespaces) {
            return Err(Self::failure(MockFailure::Namespaces));
        }

        Ok(BTreeMap::from([(
            "pid".to_string(),
            "pid:[4026532000]".to_string(),
        )]))
    }

    fn make_root_private(&self) -> Result<PrivatePropagation> {
        self.record(MockCall::MakeRootPrivate, MockFailure::MakeRootPrivate)?;
        Ok(PrivatePropagation::new())
    }

    fn mount_proc(&self, _propagation: &PrivatePropagation) -> Result<()> {
        self.record(MockCall::MountProc, MockFailure::MountProc)
    }

    fn set_hostname(&self, hostname: &Hostname) -> Result<()> {
        self.record(
            MockCall::SetHostname(hostname.to_string()),
            MockFailure::SetHostname,
        )?;
        self.state().hostname = hostname.to_string();
        Ok(())
    }

    fn hostname(&self) -> Result<String> {
        self.record(MockCall::GetHostname, MockFailure::GetHostname)?;
        let state = self.state();
        Ok(state
            .hostname_override
            .clone()
            .unwrap_or_else(|| state.hostname.clone()))
    }

    fn run_command(&self, command: &[String]) -> Result<i32> {
        self.record(MockCall::RunCommand(command.to_vec()), MockFailure::RunCommand)?;
        Ok(self.state().exit_code)
    }
}
