//! AArch64 register context, laid out like the EL1 exception frame.

use aarch64_cpu::registers::SPSR_EL1;

use super::{Polarity, RegisterLayout, TrapEnableBit, assert_layout};
use crate::hal::RegisterContext;

/// AArch64 port: `x0..x30`, `SP_EL0`, `ELR_EL1`, `SPSR_EL1`.
pub struct Aarch64;

impl Aarch64 {
    /// Frame pointer (`x29`).
    pub const REG_FP: usize = 29;
    /// Link register (`x30`).
    pub const REG_LR: usize = 30;
    pub const REG_USP: usize = 31;
    pub const REG_ELR: usize = 32;
    pub const REG_SPSR: usize = 33;
}

const CONTEXT_REGS: usize = 34;

impl RegisterLayout for Aarch64 {
    const NAME: &'static str = "aarch64";
    const CONTEXT_SIZE: usize = CONTEXT_REGS;
    const STATUS_SLOT: usize = Aarch64::REG_SPSR;
    // `SPSR_EL1.I` masks IRQs once `eret` restores it.
    const TRAP_ENABLE: TrapEnableBit<u64> = TrapEnableBit {
        mask: SPSR_EL1::I.mask << SPSR_EL1::I.shift,
        polarity: Polarity::ActiveLow,
    };
    const SLOT_NAMES: &'static [&'static str] = &[
        "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", //
        "r8", "r9", "r10", "r11", "r12", "r13", "r14", "r15", //
        "r16", "r17", "r18", "r19", "r20", "r21", "r22", "r23", //
        "r24", "r25", "r26", "r27", "r28", "r29", "r30", //
        "usp", "elr", "spsr",
    ];
    const ZEROED: [u64; CONTEXT_REGS] = [0; CONTEXT_REGS];

    type Word = u64;
    type Regs = [u64; CONTEXT_REGS];
}

const _: () = assert_layout::<Aarch64>();

impl RegisterContext<Aarch64> {
    /// Exception return address.
    pub fn elr(&self) -> u64 {
        self.regs()[Aarch64::REG_ELR]
    }

    /// Exception level and stack selection the context returns to.
    pub fn mode(&self) -> u64 {
        (self.status() >> SPSR_EL1::M.shift) & SPSR_EL1::M.mask
    }
}
