//! Namespace bootstrap for a single isolated process environment
//!
//! The same executable runs twice:
//! - as the [`Supervisor`], in the caller's namespaces, which clones a child
//!   into new PID, mount, network, UTS and IPC namespaces and re-executes
//!   itself there
//! - as the [`Initializer`], PID 1 of the new PID namespace, which privatizes
//!   mounts, mounts `/proc`, sets the hostname and runs the command
//!
//! [`Phase::from_env`] decides which one a process is.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod backend;
pub mod config;
pub mod executor;
pub mod info;
pub mod init;
pub mod mount;
pub mod supervisor;
pub mod uts;

pub use backend::{IsolationBackend, LinuxBackend, MockBackend, MockCall, MockFailure};
pub use config::{InitConfig, NamespaceKind, NamespaceRequest, Phase, ReportFormat};
pub use info::NamespaceInfo;
pub use init::Initializer;
pub use mount::PrivatePropagation;
pub use supervisor::Supervisor;
