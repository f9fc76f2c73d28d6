//! trapctx - task/trap context-switch core.
//!
//! Moves register state between the trap frame a core reloads on trap exit
//! and the task control blocks the scheduler keeps:
//! - [`ContextManager::copy_context`] duplicates one register context into
//!   another, skipping the copy when both name the same storage.
//! - [`ContextManager::latch_current_as_task`] makes a task's storage the
//!   live register context of a core.
//! - [`ContextManager::flush_task_into_trap`] installs the next task into the
//!   trap frame and forces its trap-enable bit from [`SwitchConfig`].
//!
//! Architecture ports live in [`arch`].

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

extern crate alloc;

pub mod arch;
pub mod config;
pub mod error;
pub mod hal;
pub mod task;

pub use arch::RegisterLayout;
pub use config::SwitchConfig;
pub use error::{CtxError, CtxResult};
pub use hal::{CoreState, CpuId, RegisterContext, SwitchStats};
pub use task::{ContextManager, ContextRef, CopyStats, TaskHandle, TrapFrameHandle};
