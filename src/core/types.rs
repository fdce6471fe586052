/*!
 * Core Types
 * Common types and fixed bounds used across the hook
 */

/// Process ID type
pub type Pid = i32;

/// Maximum number of NPU devices a single container may request
pub const MAX_DEVICE_NR: usize = 64;

/// Maximum number of entries in a mount list
pub const MAX_MOUNT_NR: usize = 128;

/// Maximum accepted length of any path argument, in bytes
pub const MAX_PATH_LEN: usize = 4096;

/// Maximum accepted length of the device-id string, in bytes
pub const MAX_DEVICE_STR_LEN: usize = 1024;

/// Bounded read size for trusted system sources such as pid_max
pub const MAX_SYS_READ_LEN: u64 = 64;
