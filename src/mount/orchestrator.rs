/*!
 * Mount Orchestrator
 * Performs the bind mounts inside the target mount namespace
 *
 * Order is fixed: device nodes, then management nodes, then whitelisted
 * files, then whitelisted directories, so repeated invocations are
 * idempotent at the mount-target level. Completed mounts are NOT rolled
 * back when a later one fails; the invoking runtime tears the container
 * down on hook failure.
 */

use crate::config::{ResolvedConfig, RuntimeOptions};
use crate::core::{HookError, HookResult};
use crate::driver::DriverBinding;
use log::{debug, error, info};
use nix::mount::{mount, MsFlags};
use std::fs;
use std::path::{Path, PathBuf};

/// Device node prefix for physical NPUs
pub const DEVICE_NODE_PREFIX: &str = "/dev/davinci";

/// Device node prefix for virtual NPUs
pub const VIRTUAL_DEVICE_NODE_PREFIX: &str = "/dev/vdavinci";

/// Management nodes the driver stack needs alongside the devices
pub const MANAGER_DEVICE_NODES: [&str; 3] =
    ["/dev/davinci_manager", "/dev/devmm_svm", "/dev/hisi_hdc"];

/// Resolve a requested device id to its device node path.
///
/// Under the VIRTUAL option the id is a physical id and is translated to a
/// logical id through the driver binding.
pub fn device_node(
    id: u32,
    options: RuntimeOptions,
    driver: Option<&DriverBinding>,
) -> HookResult<PathBuf> {
    if options.virtual_dev {
        let driver = driver.ok_or_else(|| {
            HookError::DriverUnavailable(
                "virtual device translation requires the driver library".to_string(),
            )
        })?;
        let logical = driver.logical_id_from_physical(id)?;
        Ok(PathBuf::from(format!(
            "{}{}",
            VIRTUAL_DEVICE_NODE_PREFIX, logical
        )))
    } else {
        Ok(PathBuf::from(format!("{}{}", DEVICE_NODE_PREFIX, id)))
    }
}

/// Mount target for a source path inside the container rootfs.
fn target_in_rootfs(rootfs: &str, source: &Path) -> PathBuf {
    let relative = source.strip_prefix("/").unwrap_or(source);
    Path::new(rootfs).join(relative)
}

/// Whether `target` is already a mount point in the current namespace.
fn already_mounted(mounts: &str, target: &Path) -> bool {
    mounts
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|mount_point| Path::new(mount_point) == target)
}

fn is_mounted(target: &Path) -> HookResult<bool> {
    let content = fs::read_to_string("/proc/self/mounts")
        .map_err(|err| HookError::Mount(format!("cannot read /proc/self/mounts: {}", err)))?;
    Ok(already_mounted(&content, target))
}

fn ensure_file_target(target: &Path) -> HookResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            HookError::Mount(format!(
                "cannot create mount target directory {}: {}",
                parent.display(),
                err
            ))
        })?;
    }
    if !target.exists() {
        fs::File::create(target).map_err(|err| {
            HookError::Mount(format!(
                "cannot create mount target {}: {}",
                target.display(),
                err
            ))
        })?;
    }
    Ok(())
}

fn ensure_dir_target(target: &Path) -> HookResult<()> {
    fs::create_dir_all(target).map_err(|err| {
        HookError::Mount(format!(
            "cannot create mount target {}: {}",
            target.display(),
            err
        ))
    })
}

fn bind(source: &Path, target: &Path) -> HookResult<()> {
    mount(
        Some(source),
        target,
        None::<&str>,
        MsFlags::MS_BIND,
        None::<&str>,
    )
    .map_err(|err| {
        error!(
            "bind mount {} -> {} failed: {}",
            source.display(),
            target.display(),
            err
        );
        HookError::Mount(format!(
            "bind mount {} -> {} failed: {}",
            source.display(),
            target.display(),
            err
        ))
    })
}

fn remount_read_only(target: &Path) -> HookResult<()> {
    let flags =
        MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY | MsFlags::MS_NOSUID;
    mount(None::<&str>, target, None::<&str>, flags, None::<&str>).map_err(|err| {
        error!("read-only remount of {} failed: {}", target.display(), err);
        HookError::Mount(format!(
            "read-only remount of {} failed: {}",
            target.display(),
            err
        ))
    })
}

/// Performs the bind mounts for one invocation.
///
/// Must be called while already inside the target mount namespace.
pub struct MountOrchestrator<'a> {
    config: &'a ResolvedConfig<'a>,
    options: RuntimeOptions,
    driver: Option<&'a DriverBinding>,
}

impl<'a> MountOrchestrator<'a> {
    pub fn new(
        config: &'a ResolvedConfig<'a>,
        options: RuntimeOptions,
        driver: Option<&'a DriverBinding>,
    ) -> Self {
        Self {
            config,
            options,
            driver,
        }
    }

    /// Devices, then management nodes, then files, then directories.
    /// Aborts on the first failing mount.
    pub fn perform_mounts(&self) -> HookResult<()> {
        for id in self.config.devices.iter() {
            let node = device_node(id, self.options, self.driver)?;
            self.mount_device(&node)?;
        }

        if !self.options.no_drv {
            for node in MANAGER_DEVICE_NODES {
                self.mount_device(Path::new(node))?;
            }
        }

        for file in self.config.files.iter() {
            self.mount_file(Path::new(file))?;
        }

        for dir in self.config.dirs.iter() {
            self.mount_dir(Path::new(dir))?;
        }

        info!(
            "mounted {} devices, {} files, {} dirs into {}",
            self.config.devices.len(),
            self.config.files.len(),
            self.config.dirs.len(),
            self.config.rootfs
        );
        Ok(())
    }

    fn mount_device(&self, source: &Path) -> HookResult<()> {
        if !source.exists() {
            return Err(HookError::Mount(format!(
                "device node {} does not exist",
                source.display()
            )));
        }
        let target = target_in_rootfs(&self.config.rootfs, source);
        ensure_file_target(&target)?;
        if is_mounted(&target)? {
            debug!("{} already mounted, skipping", target.display());
            return Ok(());
        }
        bind(source, &target)
    }

    fn mount_file(&self, source: &Path) -> HookResult<()> {
        let target = target_in_rootfs(&self.config.rootfs, source);
        ensure_file_target(&target)?;
        if is_mounted(&target)? {
            debug!("{} already mounted, skipping", target.display());
            return Ok(());
        }
        bind(source, &target)?;
        remount_read_only(&target)
    }

    fn mount_dir(&self, source: &Path) -> HookResult<()> {
        let target = target_in_rootfs(&self.config.rootfs, source);
        ensure_dir_target(&target)?;
        if is_mounted(&target)? {
            debug!("{} already mounted, skipping", target.display());
            return Ok(());
        }
        bind(source, &target)?;
        remount_read_only(&target)
    }
}
