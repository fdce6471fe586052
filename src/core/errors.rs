/*!
 * Error Types
 * Centralized error taxonomy with thiserror
 */

use thiserror::Error;

/// Result type for hook operations
pub type HookResult<T> = Result<T, HookError>;

/// Failure taxonomy for the setup pipeline.
///
/// Every fallible operation returns one of these; the diagnostic is logged
/// at the point of detection and the controller maps any variant to a
/// nonzero process exit.
#[derive(Error, Debug)]
pub enum HookError {
    #[error("invalid argument: {0}")]
    InputValidation(String),

    #[error("security violation: {0}")]
    SecurityViolation(String),

    #[error("resource lookup failed: {0}")]
    ResourceLookup(String),

    #[error("namespace switch failed: {0}")]
    NamespaceSwitch(String),

    #[error("mount failed: {0}")]
    Mount(String),

    #[error("cgroup write failed: {0}")]
    CgroupWrite(String),

    #[error("driver unavailable: {0}")]
    DriverUnavailable(String),
}
