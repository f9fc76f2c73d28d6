//! Error types for the context-switch core.
//!
//! Setup and lookup paths return [`CtxResult<T>`], an alias for
//! `anyhow::Result<T>`. The switch operations themselves never return an
//! error: a broken precondition there leaves no context that is safe to
//! resume, so they panic instead.
//!
//! ## Usage Examples
//!
//! ```ignore
//! anyhow::ensure!(config.num_cpus > 0, CtxError::InvalidConfig("no cpus"));
//! let handle = manager.insert_task(ctx)?;
//! ```

use core::fmt;

use crate::hal::CpuId;
use crate::task::TaskHandle;

/// Result type alias using anyhow::Error.
pub type CtxResult<T> = anyhow::Result<T>;

/// Failures reported by the fallible paths of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtxError {
    /// Every task slot of the arena is occupied.
    ArenaFull { capacity: usize },
    /// The task behind the handle has been removed.
    StaleTask(TaskHandle),
    /// No trap frame exists for this core.
    NoSuchCpu(CpuId),
    /// A raw save area does not hold one full register context.
    SizeMismatch { expected: usize, found: usize },
    InvalidConfig(&'static str),
}

impl fmt::Display for CtxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArenaFull { capacity } => {
                write!(f, "task context arena is full ({capacity} slots)")
            }
            Self::StaleTask(handle) => write!(f, "stale task handle {handle:?}"),
            Self::NoSuchCpu(cpu) => write!(f, "no trap frame for cpu {cpu}"),
            Self::SizeMismatch { expected, found } => {
                write!(f, "register context needs {expected} words, got {found}")
            }
            Self::InvalidConfig(why) => write!(f, "invalid switch configuration: {why}"),
        }
    }
}

impl core::error::Error for CtxError {}
