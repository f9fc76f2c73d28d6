//! Task context switching.
//!
//! The trap-entry stub saves the interrupted registers into the core's trap
//! frame and calls [`ContextManager::enter_trap`]. The scheduler then picks a
//! task and [`ContextManager::dispatch`]es it: the task context is flushed
//! into the trap frame with the trap-enable bit forced by the suppression
//! policy, the core's live context is latched onto the task, and the exit
//! stub reloads the registers from the frame.
//!
//! Everything here runs inside a trap handler with traps disabled, so the
//! word-by-word copies can not be observed half done on the same core.

use crate::arch::RegisterLayout;
use crate::hal::{CoreState, RegisterContext};

use super::arena::{ContextRef, TaskHandle, TrapFrameHandle};
use super::manager::{ContextManager, fail_fast};

impl<A: RegisterLayout> ContextManager<A> {
    /// Copies every register of `src` into `dest`.
    ///
    /// Copying a context onto itself does nothing.
    ///
    /// # Panics
    ///
    /// Panics if either reference names a removed task or an unknown core,
    /// if `dest` is the trap frame of a core that is not handling a trap, or
    /// if `dest` is a task executing on some core.
    #[track_caller]
    pub fn copy_context(&mut self, dest: impl Into<ContextRef>, src: impl Into<ContextRef>) {
        let (dest, src) = (dest.into(), src.into());
        if dest == src {
            self.expect_live(src);
            self.copy_stats.elided += 1;
            debug!("copy of {:?} onto itself elided", src);
            return;
        }

        match dest {
            ContextRef::TrapFrame(cpu) => {
                if self.percpu(cpu).is_some_and(|core| !core.in_trap()) {
                    fail_fast(format_args!(
                        "cpu {}: copy into trap frame outside a trap handler",
                        cpu
                    ));
                }
            }
            ContextRef::Task(task) => self.expect_not_executing(task, "copy into"),
        }

        let snapshot = *self.resolve(src);
        self.resolve_mut(dest).copy_from(&snapshot);
        self.copy_stats.copies += 1;
        trace!("context copy: {:?} -> {:?}", src, dest);
    }

    /// Makes `task` the live context of the core owning `frame`.
    ///
    /// Register accessors on that core resolve against the task's storage
    /// from now on, not against the trap frame. Nothing is copied.
    ///
    /// # Panics
    ///
    /// Panics outside a trap handler or if `task` has been removed.
    #[track_caller]
    pub fn latch_current_as_task(&mut self, frame: TrapFrameHandle, task: TaskHandle) {
        self.expect_in_trap(frame, "latch");
        if !self.arena.contains(task) {
            fail_fast(format_args!(
                "cpu {}: latching removed task {:?}",
                frame.cpu(),
                task
            ));
        }
        self.cpu_mut(frame).latch(task);
        trace!("cpu {}: live context -> task {}", frame.cpu(), task.index());
    }

    /// Installs `task`'s registers into the trap frame the exit stub reloads.
    ///
    /// The trap-enable bit of the frame's status word is then forced: clear
    /// when interrupts are suppressed, set otherwise. Every other bit and
    /// register comes from the task, which is left unmodified.
    ///
    /// # Panics
    ///
    /// Panics outside a trap handler, if `task` has been removed, or if
    /// `task` is executing on another core.
    #[track_caller]
    pub fn flush_task_into_trap(&mut self, task: TaskHandle, frame: TrapFrameHandle) {
        self.expect_in_trap(frame, "flush");
        self.expect_not_executing(task, "flush");
        self.copy_context(frame, task);

        let enabled = !self.config.suppress_interrupts;
        self.resolve_mut(frame.into()).set_trap_enabled(enabled);
        self.cpu_mut(frame).stats_mut().flushes += 1;

        trace!(
            "cpu {}: task {} flushed into trap frame, traps {}",
            frame.cpu(),
            task.index(),
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Captures the registers saved in the trap frame into `task`'s storage.
    ///
    /// # Panics
    ///
    /// Panics outside a trap handler or if `task` has been removed.
    #[track_caller]
    pub fn save_trap_into_task(&mut self, frame: TrapFrameHandle, task: TaskHandle) {
        self.expect_in_trap(frame, "save");
        self.copy_context(task, frame);
        trace!("cpu {}: trap frame saved into task {}", frame.cpu(), task.index());
    }

    /// Records a trap entry on the core owning `frame`.
    ///
    /// # Panics
    ///
    /// Panics on a nested entry, the core must be executing a task.
    #[track_caller]
    pub fn enter_trap(&mut self, frame: TrapFrameHandle) {
        if self.cpu(frame).in_trap() {
            self.dump_current(frame);
            fail_fast(format_args!("cpu {}: nested trap entry", frame.cpu()));
        }
        let cpu = self.cpu_mut(frame);
        cpu.set_state(CoreState::HandlingTrap);
        cpu.stats_mut().traps += 1;
    }

    /// Switches the core owning `frame` to `task`.
    ///
    /// Flushes the task into the trap frame, latches it as the live context
    /// and leaves the trap-handling state. Returns the frame the exit stub
    /// must reload.
    ///
    /// # Panics
    ///
    /// Panics outside a trap handler, if `task` has been removed, or if
    /// `task` is executing on another core.
    #[track_caller]
    pub fn dispatch(&mut self, frame: TrapFrameHandle, task: TaskHandle) -> &RegisterContext<A> {
        self.flush_task_into_trap(task, frame);
        self.latch_current_as_task(frame, task);

        let cpu = self.cpu_mut(frame);
        cpu.set_state(CoreState::ExecutingTask);
        cpu.stats_mut().dispatches += 1;

        debug!("cpu {}: dispatched task {}", frame.cpu(), task.index());
        self.trap_frame(frame)
    }

    /// A core that has `task` latched and left its trap handler is running it.
    #[track_caller]
    fn expect_not_executing(&self, task: TaskHandle, op: &str) {
        let running = ContextRef::Task(task);
        if let Some(cpu) = self
            .cpus
            .iter()
            .find(|cpu| cpu.state() == CoreState::ExecutingTask && cpu.current() == running)
        {
            fail_fast(format_args!(
                "{} task {:?} while it is executing on cpu {}",
                op,
                task,
                cpu.cpu_id()
            ));
        }
    }

    #[track_caller]
    fn expect_in_trap(&self, frame: TrapFrameHandle, op: &str) {
        if !self.cpu(frame).in_trap() {
            self.dump_current(frame);
            fail_fast(format_args!(
                "cpu {}: {} outside a trap handler",
                frame.cpu(),
                op
            ));
        }
    }
}
