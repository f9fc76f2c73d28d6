//! Context manager.
//!
//! Owns the context arena and the per-CPU records, and is passed explicitly
//! down the dispatch and trap-handling call chain. The switch operations
//! themselves live in [`super::switch`].

use alloc::vec::Vec;
use core::fmt;

use crate::arch::RegisterLayout;
use crate::config::{self, SwitchConfig};
use crate::error::{CtxError, CtxResult};
use crate::hal::{CpuId, PerCpu, RegisterContext, SwitchStats};

use super::arena::{ContextArena, ContextRef, TaskHandle, TrapFrameHandle};

/// Counters for [`ContextManager::copy_context`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyStats {
    pub copies: usize,
    /// Copies skipped because source and destination were the same storage.
    pub elided: usize,
}

/// Register contexts of every task and core, plus the switch policy.
pub struct ContextManager<A: RegisterLayout> {
    pub(super) arena: ContextArena<A>,
    pub(super) cpus: Vec<PerCpu>,
    pub(super) config: SwitchConfig,
    pub(super) copy_stats: CopyStats,
}

impl<A: RegisterLayout> ContextManager<A> {
    /// Creates a manager with one trap frame per configured core.
    pub fn new(config: SwitchConfig) -> CtxResult<Self> {
        config.validate()?;
        let cpus = (0..config.num_cpus).map(PerCpu::new).collect();

        info!(
            "context manager: arch={}, context={} words, cpus={}, task slots={}, suppress_interrupts={}",
            A::NAME,
            A::CONTEXT_SIZE,
            config.num_cpus,
            config.max_tasks,
            config.suppress_interrupts
        );

        Ok(Self {
            arena: ContextArena::new(config.max_tasks, config.num_cpus),
            cpus,
            config,
            copy_stats: CopyStats::default(),
        })
    }

    /// Creates a manager from the startup configuration.
    pub fn from_global() -> CtxResult<Self> {
        Self::new(*config::global())
    }

    #[inline]
    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    #[inline]
    pub fn arena(&self) -> &ContextArena<A> {
        &self.arena
    }

    /// Stores a new task's register context.
    pub fn insert_task(&mut self, context: RegisterContext<A>) -> CtxResult<TaskHandle> {
        let handle = self.arena.insert_task(context)?;
        debug!(
            "task context created: slot={}, generation={}",
            handle.index(),
            handle.generation()
        );
        Ok(handle)
    }

    /// Removes a terminated task's register context.
    ///
    /// # Panics
    ///
    /// Panics if the task is still the live context of a core.
    #[track_caller]
    pub fn remove_task(&mut self, handle: TaskHandle) -> Option<RegisterContext<A>> {
        if let Some(cpu) = self
            .cpus
            .iter()
            .find(|cpu| cpu.current() == ContextRef::Task(handle))
        {
            fail_fast(format_args!(
                "removing task {:?} while it is live on cpu {}",
                handle,
                cpu.cpu_id()
            ));
        }
        let context = self.arena.remove_task(handle);
        if context.is_some() {
            debug!("task context removed: slot={}", handle.index());
        }
        context
    }

    pub fn task(&self, handle: TaskHandle) -> Option<&RegisterContext<A>> {
        self.arena.task(handle)
    }

    pub fn task_mut(&mut self, handle: TaskHandle) -> Option<&mut RegisterContext<A>> {
        self.arena.task_mut(handle)
    }

    /// Like [`Self::task`], reporting a stale handle as an error.
    pub fn try_task(&self, handle: TaskHandle) -> CtxResult<&RegisterContext<A>> {
        self.arena
            .task(handle)
            .ok_or_else(|| anyhow::Error::from(CtxError::StaleTask(handle)))
    }

    /// Returns the trap frame handle of `cpu`.
    pub fn trap_frame_handle(&self, cpu: CpuId) -> CtxResult<TrapFrameHandle> {
        self.arena.trap_frame_handle(cpu)
    }

    /// The frame the trap-exit stub reloads registers from.
    #[track_caller]
    pub fn trap_frame(&self, frame: TrapFrameHandle) -> &RegisterContext<A> {
        self.resolve(frame.into())
    }

    /// The frame the trap-entry stub saves registers into.
    #[track_caller]
    pub fn trap_frame_mut(&mut self, frame: TrapFrameHandle) -> &mut RegisterContext<A> {
        self.resolve_mut(frame.into())
    }

    pub fn percpu(&self, cpu: CpuId) -> Option<&PerCpu> {
        self.cpus.get(cpu)
    }

    pub fn stats(&self, cpu: CpuId) -> Option<SwitchStats> {
        self.cpus.get(cpu).map(PerCpu::stats)
    }

    #[inline]
    pub fn copy_stats(&self) -> CopyStats {
        self.copy_stats
    }

    /// Returns whether the core is inside a trap handler.
    #[track_caller]
    pub fn in_trap(&self, frame: TrapFrameHandle) -> bool {
        self.cpu(frame).in_trap()
    }

    /// The storage register accessors on this core resolve against.
    #[track_caller]
    pub fn current(&self, frame: TrapFrameHandle) -> ContextRef {
        self.cpu(frame).current()
    }

    /// The live register context of the core, for debuggers and
    /// introspection.
    #[track_caller]
    pub fn current_context(&self, frame: TrapFrameHandle) -> &RegisterContext<A> {
        self.resolve(self.current(frame))
    }

    /// Mutable view of the live register context, for signal delivery.
    #[track_caller]
    pub fn current_context_mut(&mut self, frame: TrapFrameHandle) -> &mut RegisterContext<A> {
        let current = self.current(frame);
        self.resolve_mut(current)
    }

    /// Logs the live register context of the core.
    pub fn dump_current(&self, frame: TrapFrameHandle) {
        let Some(cpu) = self.cpus.get(frame.cpu()) else {
            error!("cpu {}: no such cpu", frame.cpu());
            return;
        };
        match self.arena.get(cpu.current()) {
            Some(context) => error!(
                "cpu {} ({:?}) live context {:?}:\n{:?}",
                cpu.cpu_id(),
                cpu.state(),
                cpu.current(),
                context
            ),
            None => error!(
                "cpu {}: live context {:?} is gone",
                cpu.cpu_id(),
                cpu.current()
            ),
        }
    }

    #[track_caller]
    pub(super) fn cpu(&self, frame: TrapFrameHandle) -> &PerCpu {
        match self.cpus.get(frame.cpu()) {
            Some(cpu) => cpu,
            None => fail_fast(format_args!("unknown cpu {}", frame.cpu())),
        }
    }

    #[track_caller]
    pub(super) fn cpu_mut(&mut self, frame: TrapFrameHandle) -> &mut PerCpu {
        match self.cpus.get_mut(frame.cpu()) {
            Some(cpu) => cpu,
            None => fail_fast(format_args!("unknown cpu {}", frame.cpu())),
        }
    }

    /// Fails fast unless `target` names live storage.
    #[track_caller]
    pub(super) fn expect_live(&self, target: ContextRef) {
        if self.arena.get(target).is_none() {
            fail_fast(format_args!("dangling context reference {target:?}"));
        }
    }

    #[track_caller]
    pub(super) fn resolve(&self, target: ContextRef) -> &RegisterContext<A> {
        match self.arena.get(target) {
            Some(context) => context,
            None => fail_fast(format_args!("dangling context reference {target:?}")),
        }
    }

    #[track_caller]
    pub(super) fn resolve_mut(&mut self, target: ContextRef) -> &mut RegisterContext<A> {
        match self.arena.get_mut(target) {
            Some(context) => context,
            None => fail_fast(format_args!("dangling context reference {target:?}")),
        }
    }
}

/// Logs and panics on a broken switch precondition.
#[cold]
#[track_caller]
pub(super) fn fail_fast(args: fmt::Arguments<'_>) -> ! {
    error!("context switch precondition violated: {}", args);
    panic!("{}", args);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Riscv32;

    fn manager(cpus: usize, tasks: usize) -> ContextManager<Riscv32> {
        let config = SwitchConfig::from_build()
            .with_num_cpus(cpus)
            .with_max_tasks(tasks);
        ContextManager::new(config).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SwitchConfig::from_build().with_num_cpus(0);
        assert!(ContextManager::<Riscv32>::new(config).is_err());
    }

    #[test]
    fn from_global_uses_build_config() {
        let manager = ContextManager::<Riscv32>::from_global().unwrap();
        assert_eq!(*manager.config(), *config::global());
        assert_eq!(manager.arena().num_cpus(), manager.config().num_cpus);
    }

    #[test]
    fn boot_current_is_trap_frame() {
        let manager = manager(2, 4);
        let frame = manager.trap_frame_handle(1).unwrap();
        assert!(manager.in_trap(frame));
        assert_eq!(manager.current(frame), ContextRef::TrapFrame(1));
        assert_eq!(manager.current_context(frame), manager.trap_frame(frame));
    }

    #[test]
    fn try_task_reports_stale_handle() {
        let mut manager = manager(1, 4);
        let task = manager.insert_task(RegisterContext::zeroed()).unwrap();
        assert!(manager.try_task(task).is_ok());
        assert!(manager.remove_task(task).is_some());
        let err = manager.try_task(task).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CtxError>(),
            Some(&CtxError::StaleTask(task))
        );
    }

    #[test]
    fn stats_per_cpu() {
        let manager = manager(2, 1);
        assert_eq!(manager.stats(0), Some(SwitchStats::default()));
        assert!(manager.stats(2).is_none());
        assert!(manager.percpu(2).is_none());
        assert_eq!(manager.copy_stats(), CopyStats::default());
    }
}
