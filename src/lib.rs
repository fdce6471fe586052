/*!
 * NPU Container Hook Library
 * Security-validated injection of NPU devices into a container's
 * mount namespace and device cgroup
 */

pub mod cgroup;
pub mod config;
pub mod controller;
pub mod core;
pub mod driver;
pub mod mount;
pub mod ns;

// Re-exports
pub use config::{CmdArgs, DeviceList, MountList, ResolvedConfig, RuntimeOptions, ValidatedArgs};
pub use controller::{HookController, HookState};
pub use crate::core::{HookError, HookResult};
pub use driver::DriverBinding;
