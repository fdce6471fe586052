/*!
 * Namespace Module
 * Locating and switching Linux namespaces for a target process
 */

pub mod locator;
pub mod switcher;

pub use locator::{devices_cgroup_path, ns_path, self_ns_path};
pub use switcher::{enter_by_fd, enter_by_path, NamespaceHandle, NamespaceKind};
