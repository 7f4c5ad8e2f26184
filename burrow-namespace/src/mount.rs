//! Mount propagation and proc filesystem setup inside a new mount namespace

use burrow_core::{Error, Result};
use nix::mount::{MsFlags, mount};

use crate::config::PROC_MOUNT_POINT;

/// Proof that `/` has been made recursively private in this mount namespace
///
/// Only [`make_root_private`] hands these out, and every mount performed by
/// the initializer requires one, so no mount can happen while propagation
/// is still shared with the host.
#[derive(Debug)]
pub struct PrivatePropagation {
    _private: (),
}

impl PrivatePropagation {
    pub(crate) const fn new() -> Self {
        Self { _private: () }
    }
}

/// Recursively mark `/` as private
///
/// New mount namespaces copy the parent's propagation, which is usually
/// shared on systemd hosts; without this a later `/proc` mount would appear
/// in the host's mount table.
///
/// # Errors
/// Returns [`Error::MountPropagation`] if `mount(2)` fails
pub fn make_root_private() -> Result<PrivatePropagation> {
    tracing::debug!("Making / recursively private");

    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to make / private");
        Error::MountPropagation { source: e }
    })?;

    Ok(PrivatePropagation::new())
}

/// Mount a fresh proc filesystem at [`PROC_MOUNT_POINT`]
///
/// The new instance reflects the caller's PID namespace, so tools like `ps`
/// only see processes of the isolated environment.
///
/// # Errors
/// Returns [`Error::ProcMount`] if `mount(2)` fails
pub fn mount_proc(_propagation: &PrivatePropagation) -> Result<()> {
    tracing::debug!(target_path = PROC_MOUNT_POINT, "Mounting proc");

    mount(
        Some("proc"),
        PROC_MOUNT_POINT,
        Some("proc"),
        MsFlags::empty(),
        None::<&str>,
    )
    .map_err(|e| {
        tracing::error!(target_path = PROC_MOUNT_POINT, error = %e, "Failed to mount proc");
        Error::ProcMount {
            target: PROC_MOUNT_POINT.to_string(),
            source: e,
        }
    })
}
