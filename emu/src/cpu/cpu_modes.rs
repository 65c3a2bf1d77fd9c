//! # CPU Operating Modes
//!
//! The ARM7TDMI has seven operating modes. Every privileged exception mode
//! owns a private copy of R13 (SP), R14 (LR) and an SPSR; FIQ additionally
//! owns R8-R12.
//!
//! ```text
//! ┌────────────┬───────┬───────────────────────────┬──────┐
//! │ Mode       │ Bits  │ Banked registers          │ SPSR │
//! ├────────────┼───────┼───────────────────────────┼──────┤
//! │ User       │ 10000 │ -                         │  no  │
//! │ FIQ        │ 10001 │ R8-R14                    │  yes │
//! │ IRQ        │ 10010 │ R13-R14                   │  yes │
//! │ Supervisor │ 10011 │ R13-R14                   │  yes │
//! │ Abort      │ 10111 │ R13-R14                   │  yes │
//! │ Undefined  │ 11011 │ R13-R14                   │  yes │
//! │ System     │ 11111 │ shares the User registers │  no  │
//! └────────────┴───────┴───────────────────────────┴──────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::InternalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// The normal ARM program execution state.
    User = 0b10000,

    /// Designed to support a data transfer or channel process.
    Fiq = 0b10001,

    /// Used for general-purpose interrupt handling.
    Irq = 0b10010,

    /// Protected mode for the operating system
    Supervisor = 0b10011,

    /// Entered after a data or instruction prefetch abort.
    Abort = 0b10111,

    /// Entered when an undefined instruction is executed
    Undefined = 0b11011,

    /// A privileged user mode for the operating system.
    System = 0b11111,
}

impl Mode {
    /// Index of the register bank that is live while in this mode.
    #[must_use]
    pub const fn bank_index(self) -> BankIndex {
        match self {
            Self::User | Self::System => BankIndex::User,
            Self::Fiq => BankIndex::Fiq,
            Self::Irq => BankIndex::Irq,
            Self::Supervisor => BankIndex::Supervisor,
            Self::Abort => BankIndex::Abort,
            Self::Undefined => BankIndex::Undefined,
        }
    }

    #[must_use]
    pub const fn is_privileged(self) -> bool {
        !matches!(self, Self::User)
    }

    /// User and System share registers and have no SPSR.
    #[must_use]
    pub const fn has_spsr(self) -> bool {
        !matches!(self, Self::User | Self::System)
    }
}

impl From<Mode> for u32 {
    fn from(m: Mode) -> Self {
        m as Self
    }
}

impl TryFrom<u32> for Mode {
    type Error = InternalError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        match n {
            0b10000 => Ok(Self::User),
            0b10001 => Ok(Self::Fiq),
            0b10010 => Ok(Self::Irq),
            0b10011 => Ok(Self::Supervisor),
            0b10111 => Ok(Self::Abort),
            0b11011 => Ok(Self::Undefined),
            0b11111 => Ok(Self::System),
            _ => Err(InternalError::InvalidMode(n)),
        }
    }
}

/// Physical register banks. User and System share one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankIndex {
    #[default]
    User = 0,
    Fiq = 1,
    Irq = 2,
    Supervisor = 3,
    Abort = 4,
    Undefined = 5,
}

impl BankIndex {
    pub const COUNT: usize = 6;

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}
