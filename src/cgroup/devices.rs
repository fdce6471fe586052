/*!
 * Cgroup Device Configurator
 * Writes device whitelist rules into the target cgroup
 *
 * Rules are appended to the devices-controller `devices.allow` interface.
 * The kernel deduplicates entries, so re-adding an existing rule is not an
 * error. Any write failure is fatal to the setup.
 */

use crate::config::{ResolvedConfig, RuntimeOptions};
use crate::core::{HookError, HookResult};
use crate::driver::DriverBinding;
use crate::mount::{device_node, MANAGER_DEVICE_NODES};
use log::{debug, error, info};
use nix::sys::stat::{major, minor, stat, SFlag};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

const DEVICES_ALLOW: &str = "devices.allow";

/// Grant read/write/mknod access to each requested device's node and,
/// unless NODRV, the management nodes.
pub fn grant_device_access(
    config: &ResolvedConfig<'_>,
    options: RuntimeOptions,
    driver: Option<&DriverBinding>,
) -> HookResult<()> {
    let allow_path = config.cgroup_path.join(DEVICES_ALLOW);

    for id in config.devices.iter() {
        let node = device_node(id, options, driver)?;
        allow_device(&allow_path, &node)?;
    }

    if !options.no_drv {
        for node in MANAGER_DEVICE_NODES {
            allow_device(&allow_path, Path::new(node))?;
        }
    }

    info!(
        "granted device access for {} devices in {}",
        config.devices.len(),
        config.cgroup_path.display()
    );
    Ok(())
}

fn allow_device(allow_path: &Path, node: &Path) -> HookResult<()> {
    let st = stat(node).map_err(|err| {
        HookError::CgroupWrite(format!(
            "cannot stat device node {}: {}",
            node.display(),
            err
        ))
    })?;
    let file_type = SFlag::from_bits_truncate(st.st_mode) & SFlag::S_IFMT;
    if file_type != SFlag::S_IFCHR {
        return Err(HookError::CgroupWrite(format!(
            "{} is not a character device",
            node.display()
        )));
    }

    let rule = format_rule(major(st.st_rdev), minor(st.st_rdev));
    debug!("writing rule {:?} to {}", rule, allow_path.display());
    write_rule(allow_path, &rule)
}

fn write_rule(allow_path: &Path, rule: &str) -> HookResult<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(allow_path)
        .map_err(|err| {
            error!("cannot open {}: {}", allow_path.display(), err);
            HookError::CgroupWrite(format!("cannot open {}: {}", allow_path.display(), err))
        })?;
    file.write_all(rule.as_bytes()).map_err(|err| {
        error!("cannot write to {}: {}", allow_path.display(), err);
        HookError::CgroupWrite(format!(
            "cannot write rule {:?} to {}: {}",
            rule,
            allow_path.display(),
            err
        ))
    })
}

/// `c <major>:<minor> rwm` device-controller rule
fn format_rule(major: u64, minor: u64) -> String {
    format!("c {}:{} rwm\n", major, minor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rule() {
        assert_eq!(format_rule(236, 0), "c 236:0 rwm\n");
        assert_eq!(format_rule(1, 3), "c 1:3 rwm\n");
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_allow_char_device() {
        let dir = tempfile::tempdir().unwrap();
        let allow = dir.path().join(DEVICES_ALLOW);
        std::fs::write(&allow, b"").unwrap();

        // /dev/null is always a character device (1:3)
        allow_device(&allow, Path::new("/dev/null")).unwrap();
        let written = std::fs::read_to_string(&allow).unwrap();
        assert_eq!(written, "c 1:3 rwm\n");
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_allow_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let allow = dir.path().join(DEVICES_ALLOW);
        std::fs::write(&allow, b"").unwrap();

        allow_device(&allow, Path::new("/dev/null")).unwrap();
        // re-adding the same rule is not an error
        allow_device(&allow, Path::new("/dev/null")).unwrap();
    }

    #[test]
    fn test_non_character_device_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let allow = dir.path().join(DEVICES_ALLOW);
        std::fs::write(&allow, b"").unwrap();
        let regular = dir.path().join("plain");
        std::fs::write(&regular, b"x").unwrap();

        let err = allow_device(&allow, &regular).unwrap_err();
        assert!(matches!(err, HookError::CgroupWrite(_)));
    }

    #[test]
    fn test_missing_device_node_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let allow = dir.path().join(DEVICES_ALLOW);
        std::fs::write(&allow, b"").unwrap();

        let err = allow_device(&allow, Path::new("/dev/no-such-node")).unwrap_err();
        assert!(matches!(err, HookError::CgroupWrite(_)));
    }
}
