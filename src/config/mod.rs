/*!
 * Configuration Module
 * Argument parsing, path security validation, and resolved configuration
 */

pub mod args;
pub mod resolved;
pub mod validation;

pub use args::{ArgKind, CmdArgs, ValidatedArgs};
pub use resolved::{DeviceList, MountList, ResolvedConfig, RuntimeOptions};
pub use validation::{check_path, check_whitelist, MOUNT_WHITELIST};
