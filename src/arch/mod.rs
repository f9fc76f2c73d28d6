//! Architecture register layouts.
//!
//! Every port describes its register context block through [`RegisterLayout`]:
//! how many machine words it holds, which slot is the processor status word,
//! and which bit of that word decides whether traps are taken once the
//! context is resumed.

use core::fmt;
use core::mem::size_of;
use core::ops::{BitAnd, BitOr, Not};

use tock_registers::UIntLike;

mod aarch64;
mod riscv32;
mod sparc;

pub use aarch64::Aarch64;
pub use riscv32::{Mstatus, Riscv32};
pub use sparc::{PSR, Sparc};

/// A machine word stored in one slot of a register context.
pub trait MachineWord:
    UIntLike
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + Not<Output = Self>
    + Copy
    + Eq
    + fmt::Debug
    + fmt::LowerHex
    + Send
    + Sync
    + 'static
{
    const ZERO: Self;
}

impl MachineWord for u32 {
    const ZERO: Self = 0;
}

impl MachineWord for u64 {
    const ZERO: Self = 0;
}

/// Electrical sense of the trap-enable bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Bit set means traps are accepted (SPARC `PSR.ET`, RISC-V `MPIE`).
    ActiveHigh,
    /// Bit set means traps are masked (AArch64 `SPSR.I`).
    ActiveLow,
}

/// Location and sense of the trap-enable bit inside the status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapEnableBit<W> {
    pub mask: W,
    pub polarity: Polarity,
}

impl<W: MachineWord> TrapEnableBit<W> {
    /// Returns whether `status` lets the resumed context take traps.
    #[inline]
    pub fn is_enabled(&self, status: W) -> bool {
        let set = (status & self.mask) != W::ZERO;
        match self.polarity {
            Polarity::ActiveHigh => set,
            Polarity::ActiveLow => !set,
        }
    }

    /// Returns `status` with only the trap-enable bit rewritten.
    #[inline]
    pub fn apply(&self, status: W, enabled: bool) -> W {
        let set = match self.polarity {
            Polarity::ActiveHigh => enabled,
            Polarity::ActiveLow => !enabled,
        };
        if set {
            status | self.mask
        } else {
            status & !self.mask
        }
    }
}

/// Register context layout of one architecture port.
pub trait RegisterLayout: Sized + Send + Sync + 'static {
    /// Port name, used in logs and register dumps.
    const NAME: &'static str;

    /// Number of machine words in one register context block.
    const CONTEXT_SIZE: usize;

    /// Slot index of the processor status word.
    const STATUS_SLOT: usize;

    /// The trap-enable bit inside the status word.
    const TRAP_ENABLE: TrapEnableBit<Self::Word>;

    /// Register names, one per slot, in slot order.
    const SLOT_NAMES: &'static [&'static str];

    /// All-zero register block.
    const ZEROED: Self::Regs;

    type Word: MachineWord;

    /// Backing storage, a `[Self::Word; Self::CONTEXT_SIZE]` array.
    type Regs: Copy + Eq + Send + Sync + AsRef<[Self::Word]> + AsMut<[Self::Word]>;
}

/// Compile-time consistency check every port runs on itself.
pub(crate) const fn assert_layout<A: RegisterLayout>() {
    assert!(A::CONTEXT_SIZE > 0, "empty register context");
    assert!(
        A::STATUS_SLOT < A::CONTEXT_SIZE,
        "status slot outside the register context"
    );
    assert!(
        size_of::<A::Regs>() == A::CONTEXT_SIZE * size_of::<A::Word>(),
        "register block size does not match CONTEXT_SIZE"
    );
    assert!(
        A::SLOT_NAMES.len() == A::CONTEXT_SIZE,
        "one slot name per register required"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_high_bit_follows_request() {
        let bit = TrapEnableBit {
            mask: 0x20u32,
            polarity: Polarity::ActiveHigh,
        };
        assert!(bit.is_enabled(0x20));
        assert!(!bit.is_enabled(0xffff_ffdf));
        assert_eq!(bit.apply(0, true), 0x20);
        assert_eq!(bit.apply(0xffff_ffff, false), 0xffff_ffdf);
    }

    #[test]
    fn active_low_bit_is_inverted() {
        let bit = TrapEnableBit {
            mask: 0x80u64,
            polarity: Polarity::ActiveLow,
        };
        assert!(bit.is_enabled(0x3c5 & !0x80));
        assert!(!bit.is_enabled(0x3c5));
        assert_eq!(bit.apply(0x3c5, true), 0x345);
        assert_eq!(bit.apply(0x345, false), 0x3c5);
    }

    #[test]
    fn apply_leaves_other_bits_alone() {
        let bit = TrapEnableBit {
            mask: 1u32 << 7,
            polarity: Polarity::ActiveHigh,
        };
        for status in [0u32, 0x1234_5678, 0xdead_beef, u32::MAX] {
            for enabled in [false, true] {
                let out = bit.apply(status, enabled);
                assert_eq!(out & !0x80, status & !0x80);
                assert_eq!(bit.is_enabled(out), enabled);
            }
        }
    }
}
