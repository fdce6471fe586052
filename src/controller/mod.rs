/*!
 * Hook Controller
 * Sequences validation, namespace switch, mounts, and cgroup grants
 *
 * The controller owns the saved original-namespace handle for the whole
 * invocation; it is released on every exit path. The process must stay
 * single-threaded: namespace membership is a property of the calling
 * thread and every switch here is effectively process-wide.
 */

use crate::cgroup;
use crate::config::{CmdArgs, ResolvedConfig, ValidatedArgs};
use crate::core::{HookError, HookResult};
use crate::driver::DriverBinding;
use crate::mount::MountOrchestrator;
use crate::ns::{self, NamespaceHandle, NamespaceKind};
use log::{error, info, warn};

/// Setup pipeline states. `Failed` is reachable from any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Init,
    Validated,
    NamespaceEntered,
    Mounted,
    CgroupConfigured,
    Restored,
    Done,
    Failed,
}

/// Drives one setup invocation through the pipeline.
pub struct HookController {
    state: HookState,
}

impl HookController {
    pub fn new() -> Self {
        Self {
            state: HookState::Init,
        }
    }

    pub fn state(&self) -> HookState {
        self.state
    }

    /// Run the full pipeline. Any failure halts the sequence at that step
    /// and maps to an error; no partial success is reported.
    pub fn run(&mut self, args: &CmdArgs) -> HookResult<()> {
        let result = self.execute(args);
        if result.is_err() {
            self.state = HookState::Failed;
        }
        result
    }

    fn execute(&mut self, args: &CmdArgs) -> HookResult<()> {
        info!("validating invocation");
        let validated = args.validate()?;
        self.state = HookState::Validated;

        // the driver binding is only needed for virtual-id translation
        let driver = if validated.options.virtual_dev {
            let binding = DriverBinding::load()?;
            binding.init()?;
            Some(binding)
        } else {
            None
        };

        info!("resolving namespace and cgroup paths");
        let config = prepare(&validated)?;

        info!("entering container mount namespace");
        ns::enter_by_path(&config.container_ns_path, NamespaceKind::Mount)?;
        self.state = HookState::NamespaceEntered;

        let setup = self.setup(&config, &validated, driver.as_ref());

        // restore the original namespace no matter how setup went
        let restore = ns::enter_by_fd(config.origin_ns.as_fd(), NamespaceKind::Mount);

        match (setup, restore) {
            (Ok(()), Ok(())) => {
                self.state = HookState::Restored;
                if let Some(binding) = driver {
                    binding.shutdown();
                }
                self.state = HookState::Done;
                info!("container setup complete");
                Ok(())
            }
            (Err(setup_err), Ok(())) => {
                self.state = HookState::Restored;
                warn!("setup failed, original namespace restored");
                Err(setup_err)
            }
            (setup_result, Err(restore_err)) => {
                // running attached to the wrong mount namespace is unsafe,
                // so a failed restore is fatal regardless of the setup result
                if let Err(setup_err) = setup_result {
                    error!("setup failed and namespace restore failed: {}", setup_err);
                }
                Err(restore_err)
            }
        }
    }

    fn setup(
        &mut self,
        config: &ResolvedConfig<'_>,
        validated: &ValidatedArgs,
        driver: Option<&DriverBinding>,
    ) -> HookResult<()> {
        info!("performing mounts");
        MountOrchestrator::new(config, validated.options, driver).perform_mounts()?;
        self.state = HookState::Mounted;

        info!("configuring cgroup device access");
        cgroup::grant_device_access(config, validated.options, driver)?;
        self.state = HookState::CgroupConfigured;
        Ok(())
    }
}

impl Default for HookController {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve namespace and cgroup paths and save the caller's own namespace
/// handle, producing the per-invocation configuration.
fn prepare(args: &ValidatedArgs) -> HookResult<ResolvedConfig<'_>> {
    let container_ns_path = ns::ns_path(args.pid, NamespaceKind::Mount);
    if !container_ns_path.exists() {
        return Err(HookError::ResourceLookup(format!(
            "target process {} does not exist",
            args.pid
        )));
    }

    let cgroup_path = ns::devices_cgroup_path(args.pid)?;
    let origin_ns = NamespaceHandle::open(&ns::self_ns_path(NamespaceKind::Mount))?;

    Ok(ResolvedConfig {
        rootfs: args.rootfs.clone(),
        devices: args.devices.clone(),
        container_ns_path,
        cgroup_path,
        origin_ns,
        files: &args.files,
        dirs: &args.dirs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CmdArgs {
        let rootfs = std::env::temp_dir().canonicalize().unwrap();
        CmdArgs {
            devices: "0".to_string(),
            pid: std::process::id().to_string(),
            rootfs: rootfs.to_str().unwrap().to_string(),
            options: None,
            mount_file: Vec::new(),
            mount_dir: Vec::new(),
        }
    }

    fn own_mount_ns() -> std::path::PathBuf {
        std::fs::read_link("/proc/self/ns/mnt").unwrap()
    }

    #[test]
    fn test_new_controller_starts_in_init() {
        let controller = HookController::new();
        assert_eq!(controller.state(), HookState::Init);
    }

    #[test]
    fn test_invalid_devices_fail_before_namespace_ops() {
        let before = own_mount_ns();

        let mut args = base_args();
        args.devices = "1,2,a".to_string();
        let mut controller = HookController::new();
        let err = controller.run(&args).unwrap_err();

        assert!(matches!(err, HookError::InputValidation(_)));
        assert_eq!(controller.state(), HookState::Failed);
        // namespace membership untouched
        assert_eq!(own_mount_ns(), before);
    }

    #[test]
    fn test_overflowing_device_id_fails_before_namespace_ops() {
        let before = own_mount_ns();

        let mut args = base_args();
        args.devices = "99999999999999".to_string();
        let mut controller = HookController::new();
        assert!(controller.run(&args).is_err());
        assert_eq!(controller.state(), HookState::Failed);
        assert_eq!(own_mount_ns(), before);
    }

    #[test]
    fn test_bad_pid_fails_closed() {
        let mut args = base_args();
        args.pid = "0".to_string();
        let mut controller = HookController::new();
        assert!(controller.run(&args).is_err());
        assert_eq!(controller.state(), HookState::Failed);
    }
}
