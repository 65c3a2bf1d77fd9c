//! # Condition codes
//!
//! Every ARM instruction carries a 4-bit condition in bits 31-28; in Thumb
//! only the conditional branch does. The condition is tested against the
//! N, Z, C and V flags of CPSR before the instruction runs. When it fails the
//! instruction behaves as a no-op that still costs its fetch.
//!
//! ```text
//! ┌──────┬────────┬──────────────────────────┬──────────────┐
//! │ Code │ Suffix │ Meaning                  │ Flags        │
//! ├──────┼────────┼──────────────────────────┼──────────────┤
//! │ 0000 │ EQ     │ equal                    │ Z=1          │
//! │ 0001 │ NE     │ not equal                │ Z=0          │
//! │ 0010 │ CS/HS  │ unsigned higher or same  │ C=1          │
//! │ 0011 │ CC/LO  │ unsigned lower           │ C=0          │
//! │ 0100 │ MI     │ negative                 │ N=1          │
//! │ 0101 │ PL     │ positive or zero         │ N=0          │
//! │ 0110 │ VS     │ overflow                 │ V=1          │
//! │ 0111 │ VC     │ no overflow              │ V=0          │
//! │ 1000 │ HI     │ unsigned higher          │ C=1 and Z=0  │
//! │ 1001 │ LS     │ unsigned lower or same   │ C=0 or Z=1   │
//! │ 1010 │ GE     │ signed greater or equal  │ N=V          │
//! │ 1011 │ LT     │ signed less than         │ N!=V         │
//! │ 1100 │ GT     │ signed greater than      │ Z=0 and N=V  │
//! │ 1101 │ LE     │ signed less or equal     │ Z=1 or N!=V  │
//! │ 1110 │ AL     │ always                   │ -            │
//! │ 1111 │ NV     │ reserved, never executes │ -            │
//! └──────┴────────┴──────────────────────────┴──────────────┘
//! ```
//!
//! The predicate itself lives in [`Psr::can_execute`](super::psr::Psr::can_execute).

use serde::{Deserialize, Serialize};

#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum Condition {
    /// Equal (Z=1)
    EQ = 0x0,
    /// Not equal (Z=0)
    NE = 0x1,
    /// Carry set, unsigned higher or same (C=1)
    CS = 0x2,
    /// Carry clear, unsigned lower (C=0)
    CC = 0x3,
    /// Negative (N=1)
    MI = 0x4,
    /// Positive or zero (N=0)
    PL = 0x5,
    /// Overflow (V=1)
    VS = 0x6,
    /// No overflow (V=0)
    VC = 0x7,
    /// Unsigned higher (C=1 and Z=0)
    HI = 0x8,
    /// Unsigned lower or same (C=0 or Z=1)
    LS = 0x9,
    /// Signed greater or equal (N=V)
    GE = 0xA,
    /// Signed less than (N!=V)
    LT = 0xB,
    /// Signed greater than (Z=0 and N=V)
    GT = 0xC,
    /// Signed less or equal (Z=1 or N!=V)
    LE = 0xD,
    /// Always
    AL = 0xE,
    /// Reserved since ARMv3. Treated as "never".
    NV = 0xF,
}

impl Condition {
    pub const ALL: [Self; 16] = [
        Self::EQ,
        Self::NE,
        Self::CS,
        Self::CC,
        Self::MI,
        Self::PL,
        Self::VS,
        Self::VC,
        Self::HI,
        Self::LS,
        Self::GE,
        Self::LT,
        Self::GT,
        Self::LE,
        Self::AL,
        Self::NV,
    ];
}

impl From<u8> for Condition {
    fn from(item: u8) -> Self {
        Self::ALL[usize::from(item & 0xF)]
    }
}

impl From<u32> for Condition {
    fn from(item: u32) -> Self {
        Self::ALL[(item & 0xF) as usize]
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EQ => f.write_str("EQ"),
            Self::NE => f.write_str("NE"),
            Self::CS => f.write_str("CS"),
            Self::CC => f.write_str("CC"),
            Self::MI => f.write_str("MI"),
            Self::PL => f.write_str("PL"),
            Self::VS => f.write_str("VS"),
            Self::VC => f.write_str("VC"),
            Self::HI => f.write_str("HI"),
            Self::LS => f.write_str("LS"),
            Self::GE => f.write_str("GE"),
            Self::LT => f.write_str("LT"),
            Self::GT => f.write_str("GT"),
            Self::LE => f.write_str("LE"),
            Self::AL => Ok(()),
            Self::NV => f.write_str("NV"),
        }
    }
}
