/*!
 * Resolved Configuration
 * Bounded owned containers and the per-invocation setup configuration
 */

use crate::core::{HookError, HookResult, MAX_DEVICE_NR, MAX_MOUNT_NR};
use crate::ns::NamespaceHandle;
use std::path::PathBuf;

/// Fixed-capacity ordered list of validated mount paths.
///
/// Appending past capacity fails closed; entries are never truncated or
/// silently dropped.
#[derive(Debug, Default)]
pub struct MountList {
    entries: Vec<String>,
}

impl MountList {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a path, rejecting once the list is full.
    pub fn push(&mut self, path: String) -> HookResult<()> {
        if self.entries.len() == MAX_MOUNT_NR {
            return Err(HookError::InputValidation(format!(
                "too many mount entries, maximum is {}",
                MAX_MOUNT_NR
            )));
        }
        self.entries.push(path);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fixed-capacity ordered list of numeric device ids.
#[derive(Debug, Clone, Default)]
pub struct DeviceList {
    ids: Vec<u32>,
}

impl DeviceList {
    pub fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Append a device id, rejecting once the list is full.
    pub fn push(&mut self, id: u32) -> HookResult<()> {
        if self.ids.len() == MAX_DEVICE_NR {
            return Err(HookError::InputValidation(format!(
                "too many devices, maximum is {}",
                MAX_DEVICE_NR
            )));
        }
        self.ids.push(id);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Parsed form of the runtime options string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Skip driver management-node mounts and grants
    pub no_drv: bool,
    /// Device ids are physical ids of virtual NPUs and require translation
    pub virtual_dev: bool,
}

impl RuntimeOptions {
    /// Parse the options string against the closed enumerated set.
    ///
    /// An absent string leaves both flags unset; anything outside the set
    /// is rejected.
    pub fn parse(options: Option<&str>) -> HookResult<Self> {
        match options {
            None => Ok(Self::default()),
            Some("NODRV,VIRTUAL") => Ok(Self {
                no_drv: true,
                virtual_dev: true,
            }),
            Some("NODRV") => Ok(Self {
                no_drv: true,
                virtual_dev: false,
            }),
            Some("VIRTUAL") => Ok(Self {
                no_drv: false,
                virtual_dev: true,
            }),
            Some(other) => Err(HookError::InputValidation(format!(
                "unrecognized options string: {}",
                other
            ))),
        }
    }
}

/// Everything the setup sequence needs, resolved and validated.
///
/// Lives for exactly one controller invocation; the original-namespace
/// handle is owned here and released when the config drops.
#[derive(Debug)]
pub struct ResolvedConfig<'a> {
    pub rootfs: String,
    pub devices: DeviceList,
    pub container_ns_path: PathBuf,
    pub cgroup_path: PathBuf,
    pub origin_ns: NamespaceHandle,
    pub files: &'a MountList,
    pub dirs: &'a MountList,
}
