//! Core type definitions with strong typing and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Hostname for a UTS namespace, validated before any syscall sees it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct Hostname(String);

impl Hostname {
    /// Maximum length in bytes (`HOST_NAME_MAX` on Linux)
    pub const MAX_LENGTH: usize = 64;

    /// Name used when none is configured
    pub const DEFAULT: &'static str = "mycontainer";

    /// Create a new `Hostname` with validation
    ///
    /// # Errors
    /// Returns error if the name is empty, too long, or contains NUL,
    /// whitespace or `/`
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidConfig {
                message: "hostname cannot be empty".to_string(),
            });
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(Error::InvalidConfig {
                message: format!("hostname too long (max {} bytes)", Self::MAX_LENGTH),
            });
        }

        if name
            .chars()
            .any(|c| c == '\0' || c == '/' || c.is_whitespace())
        {
            return Err(Error::InvalidConfig {
                message: "hostname cannot contain NUL, '/' or whitespace".to_string(),
            });
        }

        Ok(())
    }

    /// Get the hostname as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Hostname {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Hostname {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Hostname {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<Hostname> for String {
    fn from(name: Hostname) -> Self {
        name.0
    }
}

/// Process identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ProcessId(i32);

impl ProcessId {
    /// PID of the first process in a PID namespace
    pub const INIT: Self = Self(1);

    /// Create from raw PID
    #[must_use]
    pub const fn from_raw(pid: i32) -> Self {
        Self(pid)
    }

    /// Get the current process ID
    #[must_use]
    pub fn current() -> Self {
        nix::unistd::getpid().into()
    }

    /// Whether this is PID 1 of its namespace
    #[must_use]
    pub const fn is_init(self) -> bool {
        self.0 == Self::INIT.0
    }

    /// Get raw PID value
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<nix::unistd::Pid> for ProcessId {
    fn from(pid: nix::unistd::Pid) -> Self {
        Self(pid.as_raw())
    }
}
