//! SPARC V8 register context.

use tock_registers::{LocalRegisterCopy, register_bitfields};

use super::{Polarity, RegisterLayout, TrapEnableBit, assert_layout};
use crate::hal::RegisterContext;

register_bitfields! [
    u32,
    /// Processor State Register.
    pub PSR [
        /// Current window pointer.
        CWP OFFSET(0) NUMBITS(5) [],
        /// Enable traps.
        ET OFFSET(5) NUMBITS(1) [],
        /// Previous supervisor.
        PS OFFSET(6) NUMBITS(1) [],
        /// Supervisor.
        S OFFSET(7) NUMBITS(1) [],
        /// Processor interrupt level.
        PIL OFFSET(8) NUMBITS(4) [],
        /// Enable floating-point unit.
        EF OFFSET(12) NUMBITS(1) [],
        /// Enable coprocessor.
        EC OFFSET(13) NUMBITS(1) [],
        /// Integer condition codes.
        ICC OFFSET(20) NUMBITS(4) [],
        VER OFFSET(24) NUMBITS(4) [],
        IMPL OFFSET(28) NUMBITS(4) []
    ]
];

/// SPARC V8 port: globals, the current window, and the control registers.
pub struct Sparc;

impl Sparc {
    pub const REG_G0: usize = 0;
    pub const REG_O0: usize = 8;
    pub const REG_L0: usize = 16;
    pub const REG_I0: usize = 24;
    pub const REG_Y: usize = 32;
    pub const REG_PSR: usize = 33;
    pub const REG_WIM: usize = 34;
    pub const REG_TBR: usize = 35;
    pub const REG_PC: usize = 36;
    pub const REG_NPC: usize = 37;
}

const CONTEXT_REGS: usize = 38;

impl RegisterLayout for Sparc {
    const NAME: &'static str = "sparc-v8";
    const CONTEXT_SIZE: usize = CONTEXT_REGS;
    const STATUS_SLOT: usize = Sparc::REG_PSR;
    const TRAP_ENABLE: TrapEnableBit<u32> = TrapEnableBit {
        mask: PSR::ET.mask << PSR::ET.shift,
        polarity: Polarity::ActiveHigh,
    };
    const SLOT_NAMES: &'static [&'static str] = &[
        "g0", "g1", "g2", "g3", "g4", "g5", "g6", "g7", //
        "o0", "o1", "o2", "o3", "o4", "o5", "sp", "o7", //
        "l0", "l1", "l2", "l3", "l4", "l5", "l6", "l7", //
        "i0", "i1", "i2", "i3", "i4", "i5", "fp", "i7", //
        "y", "psr", "wim", "tbr", "pc", "npc",
    ];
    const ZEROED: [u32; CONTEXT_REGS] = [0; CONTEXT_REGS];

    type Word = u32;
    type Regs = [u32; CONTEXT_REGS];
}

const _: () = assert_layout::<Sparc>();

impl RegisterContext<Sparc> {
    /// Decoded view of the saved `PSR`.
    pub fn psr(&self) -> LocalRegisterCopy<u32, PSR::Register> {
        LocalRegisterCopy::new(self.status())
    }

    /// Window the context was saved from.
    pub fn cwp(&self) -> u32 {
        self.psr().read(PSR::CWP)
    }

    pub fn pc(&self) -> u32 {
        self.regs()[Sparc::REG_PC]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn et_is_bit_five() {
        assert_eq!(Sparc::TRAP_ENABLE.mask, 0x20);
        assert_eq!(Sparc::SLOT_NAMES[Sparc::STATUS_SLOT], "psr");
    }

    #[test]
    fn psr_fields_decode() {
        let mut ctx = RegisterContext::<Sparc>::zeroed();
        // S=1, PS=1, ET=1, CWP=3, PIL=0xf
        ctx.set_status(0x0000_0fe3);
        ctx.regs_mut()[Sparc::REG_PC] = 0x4000_1000;

        let psr = ctx.psr();
        assert!(psr.is_set(PSR::ET));
        assert!(psr.is_set(PSR::S));
        assert_eq!(psr.read(PSR::PIL), 0xf);
        assert_eq!(ctx.cwp(), 3);
        assert_eq!(ctx.pc(), 0x4000_1000);
        assert!(ctx.trap_enabled());
    }
}
