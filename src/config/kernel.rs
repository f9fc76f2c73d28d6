//! Build-time configuration constants.
//!
//! Each constant can be overridden by setting the named environment
//! variable when the crate is compiled.

use const_env::env_item;

/// Task context slots held by one manager.
#[env_item("TRAPCTX_MAX_TASKS")]
pub const MAX_TASKS: usize = 64;

/// Cores, and therefore trap frames, one manager can drive.
#[env_item("TRAPCTX_MAX_CPUS")]
pub const MAX_CPUS: usize = 4;

/// Resume every task with traps disabled.
#[env_item("TRAPCTX_SUPPRESS_INTERRUPTS")]
pub const SUPPRESS_INTERRUPTS: bool = false;
