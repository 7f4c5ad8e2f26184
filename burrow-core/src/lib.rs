//! Burrow Core - Foundation types, errors and events
//!
//! This crate provides the core abstractions shared by the supervisor and
//! the namespace initializer.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod events;
pub mod types;

pub use error::{Error, HostnameOperation, Result};
pub use events::InitEvent;
pub use types::{Hostname, ProcessId};
