/*!
 * Cgroup Module
 * Device-access grants in the target cgroup's device controller
 */

pub mod devices;

pub use devices::grant_device_access;
