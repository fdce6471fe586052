/*!
 * Mount Module
 * Bind-mount injection of device nodes, driver files, and directories
 */

pub mod orchestrator;

pub use orchestrator::{
    device_node, MountOrchestrator, DEVICE_NODE_PREFIX, MANAGER_DEVICE_NODES,
    VIRTUAL_DEVICE_NODE_PREFIX,
};
