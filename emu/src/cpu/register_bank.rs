//! # Register Bank
//!
//! Storage for the 31 general purpose registers and the 5 SPSRs.
//! See [`cpu_modes`](super::cpu_modes) for the banking table and mode details.
//!
//! The bank never copies values around on a mode switch: it keeps one
//! physical slot per banked register and an index of the bank that is live.
//! Switching mode is a single index change.
//!
//! ```text
//!            ┌──────┬──────┬──────┬──────┬──────┬──────┐
//!  bank      │ usr  │ fiq  │ irq  │ svc  │ abt  │ und  │
//!            ├──────┴──────┴──────┴──────┴──────┴──────┤
//!  R0-R7     │                 shared                  │
//!            ├──────┬──────────────────────────────────┤
//!  R8-R12    │ usr  │ fiq  │       usr (shared)        │
//!            ├──────┼──────┼──────┬──────┬──────┬──────┤
//!  R13-R14   │ usr  │ fiq  │ irq  │ svc  │ abt  │ und  │
//!            ├──────┴──────┴──────┴──────┴──────┴──────┤
//!  R15       │                 shared                  │
//!            ├──────┬──────┬──────┬──────┬──────┬──────┤
//!  SPSR      │  -   │ fiq  │ irq  │ svc  │ abt  │ und  │
//!            └──────┴──────┴──────┴──────┴──────┴──────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::cpu::cpu_modes::BankIndex;
use crate::cpu::psr::Psr;

pub const REG_SP: usize = 0xD;
pub const REG_LR: usize = 0xE;
pub const REG_PROGRAM_COUNTER: usize = 0xF;

const FIQ_HIGH: usize = 1;
const USER_HIGH: usize = 0;

#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBank {
    /// R0-R7, never banked.
    low: [u32; 8],

    /// R8-R12, one copy for FIQ and one for everybody else.
    high: [[u32; 5]; 2],

    /// R13 (SP) and R14 (LR) for every bank.
    banked: [[u32; 2]; BankIndex::COUNT],

    pc: u32,

    /// Indexed by [`BankIndex`]; the User slot is never read.
    spsr: [Psr; BankIndex::COUNT],

    active: BankIndex,
}

impl RegisterBank {
    /// Reads `Rn` as seen by the live bank. `R15` returns the raw PC.
    #[must_use]
    pub fn register_at(&self, reg: usize) -> u32 {
        self.read_in(self.active, reg)
    }

    pub fn set_register_at(&mut self, reg: usize, new_value: u32) {
        self.write_in(self.active, reg, new_value);
    }

    /// Reads `Rn` from the User bank whatever the live bank is (`LDM/STM` with S bit).
    #[must_use]
    pub fn user_register_at(&self, reg: usize) -> u32 {
        self.read_in(BankIndex::User, reg)
    }

    pub fn set_user_register_at(&mut self, reg: usize, new_value: u32) {
        self.write_in(BankIndex::User, reg, new_value);
    }

    #[must_use]
    pub const fn program_counter(&self) -> u32 {
        self.pc
    }

    pub const fn set_program_counter(&mut self, new_value: u32) {
        self.pc = new_value;
    }

    pub const fn advance_program_counter(&mut self, bytes: u32) {
        self.pc = self.pc.wrapping_add(bytes);
    }

    #[must_use]
    pub const fn active_bank(&self) -> BankIndex {
        self.active
    }

    /// Makes `bank` the live one. Only the CPU mode switch may call this.
    pub(crate) const fn select(&mut self, bank: BankIndex) {
        self.active = bank;
    }

    #[must_use]
    pub const fn spsr_of(&self, bank: BankIndex) -> Psr {
        self.spsr[bank.index()]
    }

    pub const fn set_spsr_of(&mut self, bank: BankIndex, value: Psr) {
        self.spsr[bank.index()] = value;
    }

    /// Writes R13 of `bank` without switching to it.
    pub const fn set_stack_pointer_of(&mut self, bank: BankIndex, value: u32) {
        self.banked[bank.index()][0] = value;
    }

    #[must_use]
    pub const fn stack_pointer_of(&self, bank: BankIndex) -> u32 {
        self.banked[bank.index()][0]
    }

    /// R0-R15 as seen by the live bank.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u32> {
        (0..=REG_PROGRAM_COUNTER)
            .map(|reg| self.register_at(reg))
            .collect()
    }

    fn read_in(&self, bank: BankIndex, reg: usize) -> u32 {
        match reg & 0xF {
            r @ 0..=7 => self.low[r],
            r @ 8..=12 => self.high[Self::high_slot(bank)][r - 8],
            r @ (REG_SP | REG_LR) => self.banked[bank.index()][r - REG_SP],
            _ => self.pc,
        }
    }

    fn write_in(&mut self, bank: BankIndex, reg: usize, new_value: u32) {
        match reg & 0xF {
            r @ 0..=7 => self.low[r] = new_value,
            r @ 8..=12 => self.high[Self::high_slot(bank)][r - 8] = new_value,
            r @ (REG_SP | REG_LR) => self.banked[bank.index()][r - REG_SP] = new_value,
            _ => self.pc = new_value,
        }
    }

    const fn high_slot(bank: BankIndex) -> usize {
        if matches!(bank, BankIndex::Fiq) {
            FIQ_HIGH
        } else {
            USER_HIGH
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn low_registers_are_shared() {
        let mut bank = RegisterBank::default();
        bank.set_register_at(3, 0xCAFE);
        bank.select(BankIndex::Fiq);
        assert_eq!(bank.register_at(3), 0xCAFE);
        bank.select(BankIndex::Irq);
        assert_eq!(bank.register_at(3), 0xCAFE);
    }

    #[test]
    fn fiq_banks_r8_to_r14() {
        let mut bank = RegisterBank::default();
        for reg in 8..=14 {
            bank.set_register_at(reg, reg as u32);
        }

        bank.select(BankIndex::Fiq);
        for reg in 8..=14 {
            assert_eq!(bank.register_at(reg), 0);
            bank.set_register_at(reg, 0x100 + reg as u32);
        }

        bank.select(BankIndex::User);
        for reg in 8..=14 {
            assert_eq!(bank.register_at(reg), reg as u32);
        }
    }

    #[test]
    fn irq_shares_r8_to_r12_but_not_sp_lr() {
        let mut bank = RegisterBank::default();
        bank.set_register_at(10, 7);
        bank.set_register_at(REG_SP, 0x0300_7F00);

        bank.select(BankIndex::Irq);
        assert_eq!(bank.register_at(10), 7);
        assert_eq!(bank.register_at(REG_SP), 0);

        bank.set_register_at(REG_LR, 0x0800_0004);
        assert_eq!(bank.user_register_at(REG_LR), 0);
        assert_eq!(bank.user_register_at(REG_SP), 0x0300_7F00);
    }

    #[test]
    fn user_access_from_fiq() {
        let mut bank = RegisterBank::default();
        bank.select(BankIndex::Fiq);
        bank.set_user_register_at(9, 0xAA);
        assert_eq!(bank.register_at(9), 0);
        bank.select(BankIndex::User);
        assert_eq!(bank.register_at(9), 0xAA);
    }

    #[test]
    fn program_counter_is_r15() {
        let mut bank = RegisterBank::default();
        bank.set_register_at(REG_PROGRAM_COUNTER, 0x0800_0000);
        assert_eq!(bank.program_counter(), 0x0800_0000);
        bank.advance_program_counter(4);
        assert_eq!(bank.register_at(REG_PROGRAM_COUNTER), 0x0800_0004);
    }

    #[test]
    fn spsr_per_bank() {
        let mut bank = RegisterBank::default();
        bank.set_spsr_of(BankIndex::Supervisor, Psr::from(0x6000_0010));
        assert_eq!(u32::from(bank.spsr_of(BankIndex::Supervisor)), 0x6000_0010);
        assert_eq!(u32::from(bank.spsr_of(BankIndex::Irq)), 0);
    }

    #[test]
    fn to_vec_sees_live_bank() {
        let mut bank = RegisterBank::default();
        bank.set_stack_pointer_of(BankIndex::Supervisor, 0x0300_7FE0);
        bank.select(BankIndex::Supervisor);
        let regs = bank.to_vec();
        assert_eq!(regs.len(), 16);
        assert_eq!(regs[REG_SP], 0x0300_7FE0);
    }
}
