/*!
 * Core Module
 * Shared types, bounds, and error taxonomy
 */

pub mod errors;
pub mod types;

pub use errors::{HookError, HookResult};
pub use types::*;
