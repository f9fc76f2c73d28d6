//! Register context storage for tasks and trap frames.
//!
//! Task control blocks and trap frames hand out handles instead of raw
//! addresses. A task slot carries a generation that is bumped when the task
//! is removed, so a handle kept past its task's lifetime is rejected rather
//! than aliasing whatever reuses the slot.

use alloc::vec::Vec;

use crate::arch::RegisterLayout;
use crate::error::{CtxError, CtxResult};
use crate::hal::{CpuId, RegisterContext};

/// Handle to a task's persistent register context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    index: u32,
    generation: u32,
}

impl TaskHandle {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the arena.
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Handle to the trap-return frame of one core.
///
/// Only [`ContextArena::trap_frame_handle`] creates one, after checking the
/// core exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrapFrameHandle {
    cpu: CpuId,
}

impl TrapFrameHandle {
    #[inline]
    pub fn cpu(&self) -> CpuId {
        self.cpu
    }
}

/// Any register context storage the arena holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextRef {
    Task(TaskHandle),
    TrapFrame(CpuId),
}

impl From<TaskHandle> for ContextRef {
    fn from(handle: TaskHandle) -> Self {
        Self::Task(handle)
    }
}

impl From<TrapFrameHandle> for ContextRef {
    fn from(handle: TrapFrameHandle) -> Self {
        Self::TrapFrame(handle.cpu)
    }
}

struct TaskSlot<A: RegisterLayout> {
    generation: u32,
    context: Option<RegisterContext<A>>,
}

/// One slot per task, one trap frame per core.
pub struct ContextArena<A: RegisterLayout> {
    tasks: Vec<TaskSlot<A>>,
    free: Vec<u32>,
    frames: Vec<RegisterContext<A>>,
    capacity: usize,
}

impl<A: RegisterLayout> ContextArena<A> {
    /// Creates an arena for `capacity` tasks and `num_cpus` trap frames.
    pub fn new(capacity: usize, num_cpus: usize) -> Self {
        let mut frames = Vec::with_capacity(num_cpus);
        frames.resize(num_cpus, RegisterContext::zeroed());
        Self {
            tasks: Vec::with_capacity(capacity),
            free: Vec::new(),
            frames,
            capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn num_cpus(&self) -> usize {
        self.frames.len()
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.tasks.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores a new task context and returns its handle.
    pub fn insert_task(&mut self, context: RegisterContext<A>) -> CtxResult<TaskHandle> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.tasks[index as usize];
            slot.context = Some(context);
            return Ok(TaskHandle::new(index, slot.generation));
        }
        if self.tasks.len() >= self.capacity {
            return Err(CtxError::ArenaFull {
                capacity: self.capacity,
            }
            .into());
        }
        let index = self.tasks.len() as u32;
        self.tasks.push(TaskSlot {
            generation: 0,
            context: Some(context),
        });
        Ok(TaskHandle::new(index, 0))
    }

    /// Removes a task, invalidating every copy of its handle.
    pub fn remove_task(&mut self, handle: TaskHandle) -> Option<RegisterContext<A>> {
        let slot = self.tasks.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let context = slot.context.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(context)
    }

    pub fn contains(&self, handle: TaskHandle) -> bool {
        self.task(handle).is_some()
    }

    pub fn task(&self, handle: TaskHandle) -> Option<&RegisterContext<A>> {
        let slot = self.tasks.get(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.context.as_ref()
    }

    pub fn task_mut(&mut self, handle: TaskHandle) -> Option<&mut RegisterContext<A>> {
        let slot = self.tasks.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.context.as_mut()
    }

    /// Returns the handle of `cpu`'s trap frame.
    pub fn trap_frame_handle(&self, cpu: CpuId) -> CtxResult<TrapFrameHandle> {
        if cpu >= self.frames.len() {
            return Err(CtxError::NoSuchCpu(cpu).into());
        }
        Ok(TrapFrameHandle { cpu })
    }

    pub fn trap_frame(&self, cpu: CpuId) -> Option<&RegisterContext<A>> {
        self.frames.get(cpu)
    }

    pub fn trap_frame_mut(&mut self, cpu: CpuId) -> Option<&mut RegisterContext<A>> {
        self.frames.get_mut(cpu)
    }

    /// Resolves any context reference.
    pub fn get(&self, target: ContextRef) -> Option<&RegisterContext<A>> {
        match target {
            ContextRef::Task(handle) => self.task(handle),
            ContextRef::TrapFrame(cpu) => self.trap_frame(cpu),
        }
    }

    pub fn get_mut(&mut self, target: ContextRef) -> Option<&mut RegisterContext<A>> {
        match target {
            ContextRef::Task(handle) => self.task_mut(handle),
            ContextRef::TrapFrame(cpu) => self.trap_frame_mut(cpu),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Sparc;

    fn ctx(fill: u32) -> RegisterContext<Sparc> {
        RegisterContext::from_regs([fill; 38])
    }

    #[test]
    fn insert_and_lookup() {
        let mut arena = ContextArena::<Sparc>::new(4, 2);
        let a = arena.insert_task(ctx(1)).unwrap();
        let b = arena.insert_task(ctx(2)).unwrap();
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.task(a), Some(&ctx(1)));
        assert_eq!(arena.get(ContextRef::Task(b)), Some(&ctx(2)));
        assert_eq!(arena.trap_frame(1), Some(&RegisterContext::zeroed()));
        assert!(arena.trap_frame(2).is_none());
    }

    #[test]
    fn removed_handle_goes_stale() {
        let mut arena = ContextArena::<Sparc>::new(1, 1);
        let old = arena.insert_task(ctx(1)).unwrap();
        assert_eq!(arena.remove_task(old), Some(ctx(1)));
        assert!(!arena.contains(old));
        assert!(arena.remove_task(old).is_none());

        // The slot is reused under a new generation.
        let new = arena.insert_task(ctx(9)).unwrap();
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert!(arena.task(old).is_none());
        assert!(arena.task_mut(old).is_none());
        assert_eq!(arena.task(new), Some(&ctx(9)));
    }

    #[test]
    fn full_arena_reports_capacity() {
        let mut arena = ContextArena::<Sparc>::new(2, 1);
        arena.insert_task(ctx(0)).unwrap();
        arena.insert_task(ctx(0)).unwrap();
        let err = arena.insert_task(ctx(0)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CtxError>(),
            Some(&CtxError::ArenaFull { capacity: 2 })
        );
    }

    #[test]
    fn trap_frame_handle_checks_cpu() {
        let arena = ContextArena::<Sparc>::new(1, 2);
        assert_eq!(arena.trap_frame_handle(1).unwrap().cpu(), 1);
        let err = arena.trap_frame_handle(2).unwrap_err();
        assert_eq!(err.downcast_ref::<CtxError>(), Some(&CtxError::NoSuchCpu(2)));
    }
}
