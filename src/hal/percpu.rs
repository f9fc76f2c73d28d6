//! Per-CPU switch state.
//!
//! Each core records which register context is live for introspection,
//! whether it is inside a trap handler, and a few switch counters. The
//! live-context reference has exactly one setter, [`PerCpu::latch`],
//! reachable only from the trap-to-task latch.

use crate::task::{ContextRef, TaskHandle};

/// CPU identifier type.
pub type CpuId = usize;

/// What a core is doing, from the switch core's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreState {
    /// Inside a trap handler with traps disabled. Initial state at boot.
    HandlingTrap,
    /// Running the task last dispatched onto the core.
    ExecutingTask,
}

/// Per-core switch counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SwitchStats {
    pub traps: usize,
    pub flushes: usize,
    pub latches: usize,
    pub dispatches: usize,
}

/// Per-CPU data structure.
#[derive(Debug)]
pub struct PerCpu {
    cpu_id: CpuId,
    /// Context register accessors resolve against.
    current: ContextRef,
    state: CoreState,
    stats: SwitchStats,
}

impl PerCpu {
    /// Boot state: inside a trap, with the trap frame as the live context.
    pub(crate) const fn new(cpu_id: CpuId) -> Self {
        Self {
            cpu_id,
            current: ContextRef::TrapFrame(cpu_id),
            state: CoreState::HandlingTrap,
            stats: SwitchStats {
                traps: 0,
                flushes: 0,
                latches: 0,
                dispatches: 0,
            },
        }
    }

    #[inline]
    pub fn cpu_id(&self) -> CpuId {
        self.cpu_id
    }

    /// Returns the context currently considered live on this core.
    #[inline]
    pub fn current(&self) -> ContextRef {
        self.current
    }

    #[inline]
    pub fn state(&self) -> CoreState {
        self.state
    }

    #[inline]
    pub fn in_trap(&self) -> bool {
        self.state == CoreState::HandlingTrap
    }

    #[inline]
    pub fn stats(&self) -> SwitchStats {
        self.stats
    }

    /// Points the live context at a task's storage.
    #[inline]
    pub(crate) fn latch(&mut self, task: TaskHandle) {
        self.current = ContextRef::Task(task);
        self.stats.latches += 1;
    }

    #[inline]
    pub(crate) fn set_state(&mut self, state: CoreState) {
        self.state = state;
    }

    #[inline]
    pub(crate) fn stats_mut(&mut self) -> &mut SwitchStats {
        &mut self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boots_inside_a_trap() {
        let cpu = PerCpu::new(2);
        assert_eq!(cpu.cpu_id(), 2);
        assert_eq!(cpu.state(), CoreState::HandlingTrap);
        assert!(cpu.in_trap());
        assert_eq!(cpu.current(), ContextRef::TrapFrame(2));
        assert_eq!(cpu.stats(), SwitchStats::default());
    }

    #[test]
    fn latch_retargets_at_task() {
        let mut cpu = PerCpu::new(0);
        let task = TaskHandle::new(5, 1);
        cpu.latch(task);
        assert_eq!(cpu.current(), ContextRef::Task(task));
        assert_eq!(cpu.stats().latches, 1);
    }
}
