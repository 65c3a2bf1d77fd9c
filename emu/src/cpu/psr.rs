//! # Program Status Registers (CPSR and SPSR)
//!
//! The PSR contains condition flags (N, Z, C, V) and control bits (mode, state, interrupts).
//!
//! ```text
//! 31 30 29 28 27 26      8 7 6 5 4   0
//! ┌──┬──┬──┬──┬──┬────────┬─┬─┬─┬─────┐
//! │N │Z │C │V │Q │Reserved│I│F│T│Mode │
//! └──┴──┴──┴──┴──┴────────┴─┴─┴─┴─────┘
//! ```
//!
//! - **Flags (28-31)**: See [`condition`](super::condition) for how these are tested
//! - **Mode (0-4)**: See [`cpu_modes`](super::cpu_modes) for operating modes
//! - **T bit (5)**: ARM (0) or Thumb (1) state
//! - **I/F bits (6-7)**: IRQ/FIQ disable
//!
//! Each exception mode has a **SPSR** to save CPSR on exception entry.
//! See [`register_bank`](super::register_bank) for SPSR storage.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::arm::alu_instruction::ArithmeticOpResult;
use crate::cpu::{condition::Condition, cpu_modes::Mode};
use crate::error::InternalError;

/// Mask of the bits MSR may touch: flags byte, control byte.
pub const PSR_FLAGS_MASK: u32 = 0xFF00_0000;
pub const PSR_CONTROL_MASK: u32 = 0x0000_00FF;

/// Program Status Register (CPSR or SPSR).
///
/// # Example
///
/// ```
/// use emu::cpu::psr::Psr;
///
/// let mut cpsr = Psr::default();
///
/// cpsr.set_zero_flag(true);
/// assert!(cpsr.zero_flag());
/// ```
#[derive(Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Psr(u32);

impl Psr {
    /// Evaluates `cond` against the N, Z, C and V flags.
    #[must_use]
    pub fn can_execute(self, cond: Condition) -> bool {
        use Condition::{AL, CC, CS, EQ, GE, GT, HI, LE, LS, LT, MI, NE, NV, PL, VC, VS};
        match cond {
            EQ => self.zero_flag(),
            NE => !self.zero_flag(),
            CS => self.carry_flag(),
            CC => !self.carry_flag(),
            MI => self.sign_flag(),
            PL => !self.sign_flag(),
            VS => self.overflow_flag(),
            VC => !self.overflow_flag(),
            HI => self.carry_flag() && !self.zero_flag(),
            LS => !self.carry_flag() || self.zero_flag(),
            GE => self.sign_flag() == self.overflow_flag(),
            LT => self.sign_flag() != self.overflow_flag(),
            GT => !self.zero_flag() && (self.sign_flag() == self.overflow_flag()),
            LE => self.zero_flag() || (self.sign_flag() != self.overflow_flag()),
            AL => true,
            NV => false,
        }
    }

    /// N => Bit 31, (0=Not Signed, 1=Signed)
    #[must_use]
    pub fn sign_flag(self) -> bool {
        self.0.get_bit(31)
    }

    /// Z => Bit 30, (0=Not Zero, 1=Zero)
    #[must_use]
    pub fn zero_flag(self) -> bool {
        self.0.get_bit(30)
    }

    /// C => Bit 29, (0=Borrow/No Carry, 1=Carry/No Borrow)
    #[must_use]
    pub fn carry_flag(self) -> bool {
        self.0.get_bit(29)
    }

    /// V => Bit 28, (0=No Overflow, 1=Overflow)
    #[must_use]
    pub fn overflow_flag(self) -> bool {
        self.0.get_bit(28)
    }

    /// I => Bit 7, (0=Enable, 1=Disable)
    #[must_use]
    pub fn irq_disable(self) -> bool {
        self.0.get_bit(7)
    }

    /// F => Bit 6, (0=Enable, 1=Disable)
    #[must_use]
    pub fn fiq_disable(self) -> bool {
        self.0.get_bit(6)
    }

    /// T => Bit 5, (0=ARM, 1=THUMB)
    #[must_use]
    pub fn state_bit(self) -> bool {
        self.0.get_bit(5)
    }

    /// M4-M0 => Bits 4-0
    ///
    /// The BIOS sometimes writes invalid mode values (like 0) to SPSR.
    /// Invalid bits resolve to Supervisor.
    #[must_use]
    pub fn mode(self) -> Mode {
        self.try_mode().unwrap_or_else(|_| {
            tracing::debug!(
                "invalid mode bits 0b{:05b} in PSR=0x{:08X}, defaulting to Supervisor",
                self.0 & 0b11111,
                self.0
            );
            Mode::Supervisor
        })
    }

    pub fn try_mode(self) -> Result<Mode, InternalError> {
        Mode::try_from(self.0 & 0b11111)
    }

    pub fn set_sign_flag(&mut self, value: bool) {
        self.0.set_bit(31, value);
    }

    pub fn set_zero_flag(&mut self, value: bool) {
        self.0.set_bit(30, value);
    }

    pub fn set_carry_flag(&mut self, value: bool) {
        self.0.set_bit(29, value);
    }

    pub fn set_overflow_flag(&mut self, value: bool) {
        self.0.set_bit(28, value);
    }

    pub fn set_flags(&mut self, op_result: &ArithmeticOpResult) {
        self.set_carry_flag(op_result.carry);
        self.set_zero_flag(op_result.zero);
        self.set_sign_flag(op_result.sign);
        self.set_overflow_flag(op_result.overflow);
    }

    /// Updates N and Z only, as multiplies and Thumb `MOV` do.
    pub fn set_sign_and_zero(&mut self, result: u32) {
        self.set_sign_flag(result.get_bit(31));
        self.set_zero_flag(result == 0);
    }

    pub fn set_irq_disable(&mut self, value: bool) {
        self.0.set_bit(7, value);
    }

    pub fn set_fiq_disable(&mut self, value: bool) {
        self.0.set_bit(6, value);
    }

    pub fn set_state_bit(&mut self, value: bool) {
        self.0.set_bit(5, value);
    }

    /// The Mode Bits M4-M0 contain the current operating mode.
    pub const fn set_mode(&mut self, m: Mode) {
        self.0 &= !0b11111;
        self.0 |= m as u32;
    }

    #[must_use]
    pub fn cpu_state(self) -> CpuState {
        self.state_bit().into()
    }

    pub fn set_cpu_state(&mut self, state: CpuState) {
        self.set_state_bit(state.into());
    }

    /// Returns a copy where only the bits selected by `mask` come from `value`.
    #[must_use]
    pub const fn with_masked(self, value: u32, mask: u32) -> Self {
        Self((self.0 & !mask) | (value & mask))
    }
}

impl From<Mode> for Psr {
    fn from(m: Mode) -> Self {
        let mut s = Self(0);
        s.set_mode(m);
        s
    }
}

impl From<u32> for Psr {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Psr> for u32 {
    fn from(p: Psr) -> Self {
        p.0
    }
}

impl fmt::Debug for Psr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "Psr(0x{:08X} {}{}{}{} {}{}{} {:?})",
            self.0,
            flag(self.sign_flag(), 'N'),
            flag(self.zero_flag(), 'Z'),
            flag(self.carry_flag(), 'C'),
            flag(self.overflow_flag(), 'V'),
            flag(self.irq_disable(), 'I'),
            flag(self.fiq_disable(), 'F'),
            flag(self.state_bit(), 'T'),
            self.try_mode().ok(),
        )
    }
}

/// The CPU execution state (ARM or Thumb).
///
/// Controlled by the T bit (bit 5) in CPSR. Switch via `BX Rn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// Thumb: 16-bit instructions.
    Thumb,
    /// ARM: 32-bit instructions.
    Arm,
}

impl CpuState {
    /// Size in bytes of one instruction.
    #[must_use]
    pub const fn instruction_size(self) -> u32 {
        match self {
            Self::Arm => 4,
            Self::Thumb => 2,
        }
    }
}

impl From<CpuState> for bool {
    fn from(state: CpuState) -> Self {
        match state {
            CpuState::Arm => false,
            CpuState::Thumb => true,
        }
    }
}

impl From<bool> for CpuState {
    fn from(state: bool) -> Self {
        if state { Self::Thumb } else { Self::Arm }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference truth table written directly from the N/Z/C/V formulas.
    fn expected(cond: Condition, n: bool, z: bool, c: bool, v: bool) -> bool {
        match cond as u8 {
            0x0 => z,
            0x1 => !z,
            0x2 => c,
            0x3 => !c,
            0x4 => n,
            0x5 => !n,
            0x6 => v,
            0x7 => !v,
            0x8 => c && !z,
            0x9 => !c || z,
            0xA => n == v,
            0xB => n != v,
            0xC => !z && n == v,
            0xD => z || n != v,
            0xE => true,
            _ => false,
        }
    }

    #[test]
    fn condition_truth_table() {
        for flags in 0..16_u32 {
            let psr = Psr(flags << 28);
            let (n, z, c, v) = (
                flags & 0b1000 != 0,
                flags & 0b0100 != 0,
                flags & 0b0010 != 0,
                flags & 0b0001 != 0,
            );
            for cond in Condition::ALL {
                assert_eq!(
                    psr.can_execute(cond),
                    expected(cond, n, z, c, v),
                    "{cond:?} with NZCV={flags:04b}"
                );
            }
        }
    }

    #[test]
    fn never_is_never_taken() {
        for flags in 0..16_u32 {
            assert!(!Psr(flags << 28).can_execute(Condition::NV));
            assert!(Psr(flags << 28).can_execute(Condition::AL));
        }
    }

    #[test]
    fn check_flags() {
        let mut cpsr = Psr(0);
        cpsr.set_sign_flag(true);
        cpsr.set_carry_flag(true);
        assert!(cpsr.sign_flag());
        assert!(!cpsr.zero_flag());
        assert!(cpsr.carry_flag());
        assert!(!cpsr.overflow_flag());
        assert_eq!(u32::from(cpsr), 0xA000_0000);
    }

    #[test]
    fn check_control_bits() {
        let mut cpsr = Psr(0);
        cpsr.set_irq_disable(true);
        cpsr.set_fiq_disable(true);
        cpsr.set_cpu_state(CpuState::Thumb);
        assert!(cpsr.irq_disable());
        assert!(cpsr.fiq_disable());
        assert_eq!(cpsr.cpu_state(), CpuState::Thumb);
        assert_eq!(u32::from(cpsr), 0b1110_0000);
    }

    #[test]
    fn check_mode() {
        let mut cpsr = Psr(0xF000_00FF);
        cpsr.set_mode(Mode::Irq);
        assert_eq!(u32::from(cpsr), 0xF000_00F2);
        assert_eq!(cpsr.mode(), Mode::Irq);
    }

    #[test]
    fn invalid_mode_defaults_to_supervisor() {
        let psr = Psr(0);
        assert_eq!(psr.mode(), Mode::Supervisor);
        assert_eq!(psr.try_mode(), Err(InternalError::InvalidMode(0)));
    }

    #[test]
    fn masked_write() {
        let psr = Psr(0x0000_001F).with_masked(0xF000_0010, PSR_FLAGS_MASK);
        assert_eq!(u32::from(psr), 0xF000_001F);
    }
}
