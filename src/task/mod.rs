//! Task context management.
//!
//! This module provides:
//! - Handle-based storage for task and trap-frame register contexts
//! - The per-core context manager passed through the dispatch path
//! - Context copy, trap-to-task latch and task-to-trap flush

mod arena;
mod manager;
mod switch;

pub use arena::{ContextArena, ContextRef, TaskHandle, TrapFrameHandle};
pub use manager::{ContextManager, CopyStats};
