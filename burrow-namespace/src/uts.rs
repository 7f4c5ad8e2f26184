//! Hostname handling inside a new UTS namespace

use burrow_core::{Error, Hostname, HostnameOperation, Result};
use nix::unistd::{gethostname, sethostname};

/// Set the hostname of the caller's UTS namespace
///
/// # Errors
/// Returns [`Error::Hostname`] if `sethostname(2)` fails
pub fn set_hostname(hostname: &Hostname) -> Result<()> {
    tracing::debug!(hostname = %hostname, "Setting hostname");

    sethostname(hostname.as_str()).map_err(|e| {
        tracing::error!(hostname = %hostname, error = %e, "Failed to set hostname");
        Error::Hostname {
            operation: HostnameOperation::Set,
            reason: None,
            source: Some(e),
        }
    })
}

/// Read the hostname of the caller's UTS namespace
///
/// # Errors
/// Returns [`Error::Hostname`] if `gethostname(2)` fails or the name is not
/// valid UTF-8
pub fn hostname() -> Result<String> {
    let name = gethostname().map_err(|e| Error::Hostname {
        operation: HostnameOperation::Get,
        reason: None,
        source: Some(e),
    })?;

    name.into_string().map_err(|raw| Error::Hostname {
        operation: HostnameOperation::Get,
        reason: Some(format!("hostname {raw:?} is not valid UTF-8")),
        source: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_hostname() {
        assert!(hostname().is_ok());
    }
}
