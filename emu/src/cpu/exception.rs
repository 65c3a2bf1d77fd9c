//! # Exceptions
//!
//! Every exception switches to a privileged mode, saves CPSR into that mode's
//! SPSR, stores a return address in its LR and jumps to a fixed vector in
//! ARM state with IRQs masked.
//!
//! ```text
//! ┌────────────────┬────────┬────────────┬──────────┬──────────┬─────┐
//! │ Exception      │ Vector │ Mode       │ LR (ARM) │ LR (Thb) │ F   │
//! ├────────────────┼────────┼────────────┼──────────┼──────────┼─────┤
//! │ Reset          │ 0x00   │ Supervisor │    -     │    -     │ set │
//! │ Undefined      │ 0x04   │ Undefined  │ instr+4  │ instr+2  │  -  │
//! │ SWI            │ 0x08   │ Supervisor │ instr+4  │ instr+2  │  -  │
//! │ Prefetch abort │ 0x0C   │ Abort      │ instr+4  │ instr+4  │  -  │
//! │ Data abort     │ 0x10   │ Abort      │ instr+8  │ instr+8  │  -  │
//! │ IRQ            │ 0x18   │ IRQ        │ next+4   │ next+4   │  -  │
//! │ FIQ            │ 0x1C   │ FIQ        │ next+4   │ next+4   │ set │
//! └────────────────┴────────┴────────────┴──────────┴──────────┴─────┘
//! ```
//!
//! When several are pending at an instruction boundary they are taken in
//! priority order: Reset, data abort, FIQ, IRQ, prefetch abort, then
//! undefined and SWI (which cannot both come from the same instruction).

use serde::{Deserialize, Serialize};

use crate::cpu::cpu_modes::Mode;
use crate::cpu::psr::CpuState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionKind {
    Reset,
    DataAbort,
    Fiq,
    Irq,
    PrefetchAbort,
    Undefined,
    Swi,
}

impl ExceptionKind {
    /// Highest priority first.
    pub const BY_PRIORITY: [Self; 7] = [
        Self::Reset,
        Self::DataAbort,
        Self::Fiq,
        Self::Irq,
        Self::PrefetchAbort,
        Self::Undefined,
        Self::Swi,
    ];

    #[must_use]
    pub const fn vector(self) -> u32 {
        match self {
            Self::Reset => 0x00,
            Self::Undefined => 0x04,
            Self::Swi => 0x08,
            Self::PrefetchAbort => 0x0C,
            Self::DataAbort => 0x10,
            Self::Irq => 0x18,
            Self::Fiq => 0x1C,
        }
    }

    #[must_use]
    pub const fn mode(self) -> Mode {
        match self {
            Self::Reset | Self::Swi => Mode::Supervisor,
            Self::Undefined => Mode::Undefined,
            Self::PrefetchAbort | Self::DataAbort => Mode::Abort,
            Self::Irq => Mode::Irq,
            Self::Fiq => Mode::Fiq,
        }
    }

    /// Distance between the address the exception is raised at and the
    /// value stored in LR.
    #[must_use]
    pub const fn return_offset(self, state: CpuState) -> u32 {
        match self {
            Self::Reset => 0,
            Self::Undefined | Self::Swi => state.instruction_size(),
            Self::PrefetchAbort | Self::Irq | Self::Fiq => 4,
            Self::DataAbort => 8,
        }
    }

    /// FIQ and Reset also mask FIQs.
    #[must_use]
    pub const fn disables_fiq(self) -> bool {
        matches!(self, Self::Reset | Self::Fiq)
    }

    pub(crate) const fn pending_bit(self) -> u8 {
        1 << (self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn vectors_and_modes() {
        assert_eq!(ExceptionKind::Swi.vector(), 0x08);
        assert_eq!(ExceptionKind::Irq.vector(), 0x18);
        assert_eq!(ExceptionKind::Fiq.mode(), Mode::Fiq);
        assert_eq!(ExceptionKind::DataAbort.mode(), Mode::Abort);
    }

    #[test]
    fn return_offsets_depend_on_state_only_for_instruction_exceptions() {
        assert_eq!(ExceptionKind::Swi.return_offset(CpuState::Thumb), 2);
        assert_eq!(ExceptionKind::Swi.return_offset(CpuState::Arm), 4);
        assert_eq!(ExceptionKind::Irq.return_offset(CpuState::Thumb), 4);
        assert_eq!(ExceptionKind::DataAbort.return_offset(CpuState::Thumb), 8);
    }

    #[test]
    fn pending_bits_are_distinct() {
        let all = ExceptionKind::BY_PRIORITY
            .iter()
            .fold(0_u8, |acc, kind| acc | kind.pending_bit());
        assert_eq!(all.count_ones(), 7);
    }
}
