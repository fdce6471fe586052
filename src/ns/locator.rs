/*!
 * Namespace Locator
 * Derives the on-disk paths identifying a process's namespaces and cgroup
 */

use super::switcher::NamespaceKind;
use crate::core::{HookError, HookResult, Pid};
use log::debug;
use std::fs;
use std::path::PathBuf;

/// Namespace file of `kind` for a target process.
pub fn ns_path(pid: Pid, kind: NamespaceKind) -> PathBuf {
    PathBuf::from(format!("/proc/{}/ns/{}", pid, kind.proc_name()))
}

/// Namespace file of `kind` for the calling process.
pub fn self_ns_path(kind: NamespaceKind) -> PathBuf {
    PathBuf::from(format!("/proc/self/ns/{}", kind.proc_name()))
}

/// Resolve the devices-controller cgroup directory of a target process.
///
/// Reads the process's cgroup assignment, takes the hierarchy bound to the
/// `devices` controller, and joins it onto that hierarchy's mount point.
pub fn devices_cgroup_path(pid: Pid) -> HookResult<PathBuf> {
    let cgroup_file = format!("/proc/{}/cgroup", pid);
    let cgroup_content = fs::read_to_string(&cgroup_file).map_err(|err| {
        HookError::ResourceLookup(format!("cannot read {}: {}", cgroup_file, err))
    })?;
    let relative = parse_devices_cgroup(&cgroup_content)?;

    let mounts_file = format!("/proc/{}/mounts", pid);
    let mounts_content = fs::read_to_string(&mounts_file).map_err(|err| {
        HookError::ResourceLookup(format!("cannot read {}: {}", mounts_file, err))
    })?;
    let mount_point = parse_devices_mount(&mounts_content)?;

    let path = mount_point.join(relative.trim_start_matches('/'));
    debug!("devices cgroup for pid {} is {}", pid, path.display());
    Ok(path)
}

/// Extract the cgroup path bound to the `devices` controller from
/// `/proc/<pid>/cgroup` content (`hierarchy:controllers:path` lines).
fn parse_devices_cgroup(content: &str) -> HookResult<String> {
    for line in content.lines() {
        let mut fields = line.splitn(3, ':');
        let _hierarchy = fields.next();
        let controllers = fields.next().unwrap_or("");
        let path = fields.next().unwrap_or("");
        if controllers.split(',').any(|c| c == "devices") {
            return Ok(path.to_string());
        }
    }
    Err(HookError::ResourceLookup(
        "no devices controller in cgroup assignment".to_string(),
    ))
}

/// Extract the mount point of the devices cgroup hierarchy from
/// `/proc/<pid>/mounts` content.
fn parse_devices_mount(content: &str) -> HookResult<PathBuf> {
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            continue;
        }
        let (mount_point, fstype, options) = (fields[1], fields[2], fields[3]);
        if fstype == "cgroup" && options.split(',').any(|o| o == "devices") {
            return Ok(PathBuf::from(mount_point));
        }
    }
    Err(HookError::ResourceLookup(
        "devices cgroup hierarchy is not mounted".to_string(),
    ))
}
