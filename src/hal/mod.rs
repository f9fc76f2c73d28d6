//! HAL (Hardware Abstraction Layer) module.
//!
//! Register context storage and the per-CPU state the switch core keeps.

pub mod context;
pub mod percpu;

pub use context::RegisterContext;
pub use percpu::{CoreState, CpuId, PerCpu, SwitchStats};
