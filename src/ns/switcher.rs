/*!
 * Namespace Switcher
 * Enters a Linux namespace by path or by descriptor
 *
 * Namespace membership is a property of the calling thread, and every call
 * here changes it for the whole (single-threaded) process. Callers must not
 * invoke these functions from more than one thread.
 */

use crate::core::{HookError, HookResult};
use log::debug;
use nix::sched::{setns, CloneFlags};
use std::fs::File;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::path::Path;

/// Namespace kinds the hook can switch into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    Mount,
}

impl NamespaceKind {
    /// Name of the namespace file under `/proc/<pid>/ns/`
    pub fn proc_name(self) -> &'static str {
        match self {
            NamespaceKind::Mount => "mnt",
        }
    }

    fn clone_flag(self) -> CloneFlags {
        match self {
            NamespaceKind::Mount => CloneFlags::CLONE_NEWNS,
        }
    }
}

/// Owned handle to a namespace file.
///
/// Held by the controller for the invocation's duration so the original
/// namespace can be restored; the descriptor is closed exactly once when
/// the handle drops, on every exit path.
#[derive(Debug)]
pub struct NamespaceHandle {
    fd: OwnedFd,
}

impl NamespaceHandle {
    /// Open a namespace file read-only.
    pub fn open(path: &Path) -> HookResult<Self> {
        let file = File::open(path).map_err(|err| {
            HookError::ResourceLookup(format!(
                "cannot open namespace file {}: {}",
                path.display(),
                err
            ))
        })?;
        Ok(Self {
            fd: OwnedFd::from(file),
        })
    }

    pub fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

/// Associate the calling thread's namespace of `kind` with the namespace
/// file at `path`.
pub fn enter_by_path(path: &Path, kind: NamespaceKind) -> HookResult<()> {
    let handle = NamespaceHandle::open(path)?;
    debug!("entering {} namespace at {}", kind.proc_name(), path.display());
    enter_by_fd(handle.as_fd(), kind)
}

/// Identical effect from an already-open handle; used to restore the
/// original namespace.
pub fn enter_by_fd(fd: BorrowedFd<'_>, kind: NamespaceKind) -> HookResult<()> {
    setns(fd, kind.clone_flag()).map_err(|err| {
        HookError::NamespaceSwitch(format!(
            "setns into {} namespace failed: {}",
            kind.proc_name(),
            err
        ))
    })
}
