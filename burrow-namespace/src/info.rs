//! Namespace identity introspection via `/proc/<pid>/ns`

use burrow_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Namespace identities of one process, as `kind:[inode]` link targets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    /// PID namespace ID
    pub pid: Option<String>,
    /// Network namespace ID
    pub net: Option<String>,
    /// Mount namespace ID
    pub mnt: Option<String>,
    /// UTS namespace ID
    pub uts: Option<String>,
    /// IPC namespace ID
    pub ipc: Option<String>,
    /// User namespace ID
    pub user: Option<String>,
    /// CGroup namespace ID
    pub cgroup: Option<String>,
}

impl NamespaceInfo {
    /// Namespaces of the calling process
    ///
    /// Reads `/proc/self/ns`, which stays correct while `/proc` still
    /// belongs to an ancestor PID namespace.
    ///
    /// # Errors
    /// Returns error if `/proc/self/ns` cannot be read
    pub fn current() -> Result<Self> {
        Self::read_from(Path::new("/proc/self/ns"))
    }

    /// Namespaces of a specific PID in the caller's `/proc`
    ///
    /// # Errors
    /// Returns error if `/proc/<pid>/ns` cannot be read
    pub fn for_pid(pid: i32) -> Result<Self> {
        Self::read_from(&Path::new("/proc").join(pid.to_string()).join("ns"))
    }

    fn read_from(base: &Path) -> Result<Self> {
        // surface a missing process as an error; individual links may be
        // absent on kernels without that namespace kind
        fs::metadata(base).map_err(|e| Error::NamespaceInspection {
            path: base.display().to_string(),
            source: e,
        })?;

        let read_ns = |name: &str| -> Option<String> {
            fs::read_link(base.join(name))
                .map(|p| p.to_string_lossy().into_owned())
                .ok()
        };

        Ok(Self {
            pid: read_ns("pid"),
            net: read_ns("net"),
            mnt: read_ns("mnt"),
            uts: read_ns("uts"),
            ipc: read_ns("ipc"),
            user: read_ns("user"),
            cgroup: read_ns("cgroup"),
        })
    }

    fn entries(&self) -> [(&'static str, Option<&String>); 7] {
        [
            ("pid", self.pid.as_ref()),
            ("net", self.net.as_ref()),
            ("mnt", self.mnt.as_ref()),
            ("uts", self.uts.as_ref()),
            ("ipc", self.ipc.as_ref()),
            ("user", self.user.as_ref()),
            ("cgroup", self.cgroup.as_ref()),
        ]
    }

    /// Kinds whose identity differs from `other`
    ///
    /// Kinds unknown on either side are skipped.
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .zip(other.entries())
            .filter_map(|((name, mine), (_, theirs))| match (mine, theirs) {
                (Some(a), Some(b)) if a != b => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Known identities keyed by kind
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries()
            .into_iter()
            .filter_map(|(name, id)| id.map(|id| (name.to_string(), id.clone())))
            .collect()
    }
}

impl std::fmt::Display for NamespaceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Namespace Info:")?;
        for (name, id) in self.entries() {
            if let Some(id) = id {
                writeln!(f, "  {:<7} {id}", format!("{}:", name.to_uppercase()))?;
            }
        }
        Ok(())
    }
}
