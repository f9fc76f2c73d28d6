//! Register context block shared by task control blocks and trap frames.

use core::fmt;

use crate::arch::RegisterLayout;
use crate::error::{CtxError, CtxResult};

/// Every register needed to resume a unit of execution, in slot order.
///
/// The block is an owned value: copying one context into another goes
/// through `&mut self` / `&Self`, which can never name the same storage.
#[repr(C)]
pub struct RegisterContext<A: RegisterLayout> {
    regs: A::Regs,
}

impl<A: RegisterLayout> RegisterContext<A> {
    /// Creates a context with every slot cleared.
    pub const fn zeroed() -> Self {
        Self { regs: A::ZEROED }
    }

    pub const fn from_regs(regs: A::Regs) -> Self {
        Self { regs }
    }

    /// Builds a context from a raw save area.
    ///
    /// The save area must hold exactly [`RegisterLayout::CONTEXT_SIZE`] words.
    pub fn from_words(words: &[A::Word]) -> CtxResult<Self> {
        if words.len() != A::CONTEXT_SIZE {
            return Err(CtxError::SizeMismatch {
                expected: A::CONTEXT_SIZE,
                found: words.len(),
            }
            .into());
        }
        let mut ctx = Self::zeroed();
        ctx.regs.as_mut().copy_from_slice(words);
        Ok(ctx)
    }

    /// All slots, in slot order.
    #[inline]
    pub fn regs(&self) -> &[A::Word] {
        self.regs.as_ref()
    }

    #[inline]
    pub fn regs_mut(&mut self) -> &mut [A::Word] {
        self.regs.as_mut()
    }

    /// The saved processor status word.
    #[inline]
    pub fn status(&self) -> A::Word {
        self.regs()[A::STATUS_SLOT]
    }

    #[inline]
    pub fn set_status(&mut self, status: A::Word) {
        self.regs_mut()[A::STATUS_SLOT] = status;
    }

    /// Returns whether this context takes traps once resumed.
    #[inline]
    pub fn trap_enabled(&self) -> bool {
        A::TRAP_ENABLE.is_enabled(self.status())
    }

    /// Rewrites the trap-enable bit, keeping the rest of the status word.
    #[inline]
    pub fn set_trap_enabled(&mut self, enabled: bool) {
        let status = A::TRAP_ENABLE.apply(self.status(), enabled);
        self.set_status(status);
    }

    /// Returns a copy of `self` with the trap-enable bit rewritten.
    #[must_use]
    pub fn with_trap_enable(mut self, enabled: bool) -> Self {
        self.set_trap_enabled(enabled);
        self
    }

    /// Overwrites every slot of `self` with the slots of `src`.
    #[inline]
    pub fn copy_from(&mut self, src: &Self) {
        self.regs = src.regs;
    }
}

impl<A: RegisterLayout> Clone for RegisterContext<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: RegisterLayout> Copy for RegisterContext<A> {}

impl<A: RegisterLayout> PartialEq for RegisterContext<A> {
    fn eq(&self, other: &Self) -> bool {
        self.regs == other.regs
    }
}

impl<A: RegisterLayout> Eq for RegisterContext<A> {}

impl<A: RegisterLayout> Default for RegisterContext<A> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<A: RegisterLayout> fmt::Debug for RegisterContext<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RegisterContext ({}): {{", A::NAME)?;
        for (name, reg) in A::SLOT_NAMES.iter().zip(self.regs()) {
            writeln!(f, "    {name}: {reg:#x},")?;
        }
        write!(f, "}}")?;
        Ok(())
    }
}
