//! RV32 machine-mode register context.

use super::{Polarity, RegisterLayout, TrapEnableBit, assert_layout};
use crate::hal::RegisterContext;

bitflags::bitflags! {
    /// The `mstatus` bits a saved context cares about.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mstatus: u32 {
        /// Supervisor interrupt enable.
        const SIE  = 1 << 1;
        /// Machine interrupt enable.
        const MIE  = 1 << 3;
        const SPIE = 1 << 5;
        /// Machine previous interrupt enable, copied into `MIE` by `mret`.
        const MPIE = 1 << 7;
        const SPP  = 1 << 8;
        /// Machine previous privilege, two bits.
        const MPP  = 0b11 << 11;
    }
}

/// RV32 port: `x0..x31`, `mepc`, `mstatus`.
pub struct Riscv32;

impl Riscv32 {
    pub const REG_RA: usize = 1;
    pub const REG_SP: usize = 2;
    pub const REG_A0: usize = 10;
    pub const REG_MEPC: usize = 32;
    pub const REG_MSTATUS: usize = 33;
}

const CONTEXT_REGS: usize = 34;

impl RegisterLayout for Riscv32 {
    const NAME: &'static str = "riscv32";
    const CONTEXT_SIZE: usize = CONTEXT_REGS;
    const STATUS_SLOT: usize = Riscv32::REG_MSTATUS;
    const TRAP_ENABLE: TrapEnableBit<u32> = TrapEnableBit {
        mask: Mstatus::MPIE.bits(),
        polarity: Polarity::ActiveHigh,
    };
    const SLOT_NAMES: &'static [&'static str] = &[
        "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", //
        "s0", "s1", "a0", "a1", "a2", "a3", "a4", "a5", //
        "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", //
        "s8", "s9", "s10", "s11", "t3", "t4", "t5", "t6", //
        "mepc", "mstatus",
    ];
    const ZEROED: [u32; CONTEXT_REGS] = [0; CONTEXT_REGS];

    type Word = u32;
    type Regs = [u32; CONTEXT_REGS];
}

const _: () = assert_layout::<Riscv32>();

impl RegisterContext<Riscv32> {
    /// Saved `mstatus`, unknown bits dropped.
    pub fn mstatus(&self) -> Mstatus {
        Mstatus::from_bits_truncate(self.status())
    }

    pub fn mepc(&self) -> u32 {
        self.regs()[Riscv32::REG_MEPC]
    }
}
