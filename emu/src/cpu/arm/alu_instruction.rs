//! # ALU operations and barrel shifter
//!
//! Every data processing instruction takes its second operand through the
//! barrel shifter. The shifter also produces a carry out which logical
//! operations copy into C when S is set.
//!
//! Shift amounts come from two places and they do not mean the same thing:
//!
//! ```text
//! ┌──────┬──────────────────────────────┬────────────────────────────────┐
//! │ Kind │ Immediate amount = 0         │ Register amount (Rs & 0xFF)    │
//! ├──────┼──────────────────────────────┼────────────────────────────────┤
//! │ LSL  │ no shift, C unchanged        │ 0: unchanged, 32: C=bit0, >32 0│
//! │ LSR  │ LSR#32: 0, C=bit31           │ 0: unchanged, 32: C=bit31, >32 0│
//! │ ASR  │ ASR#32: sign fill, C=bit31   │ 0: unchanged, >=32: sign fill  │
//! │ ROR  │ RRX: C:Rm >> 1, C=bit0       │ 0: unchanged, n%32=0: C=bit31  │
//! └──────┴──────────────────────────────┴────────────────────────────────┘
//! ```

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::flags::ShiftKind;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ArmModeAluInstr {
    And = 0x0,
    Eor = 0x1,
    Sub = 0x2,
    Rsb = 0x3,
    Add = 0x4,
    Adc = 0x5,
    Sbc = 0x6,
    Rsc = 0x7,
    Tst = 0x8,
    Teq = 0x9,
    Cmp = 0xA,
    Cmn = 0xB,
    Orr = 0xC,
    Mov = 0xD,
    Bic = 0xE,
    Mvn = 0xF,
}

impl Display for ArmModeAluInstr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Eor => f.write_str("EOR"),
            Self::Sub => f.write_str("SUB"),
            Self::Rsb => f.write_str("RSB"),
            Self::Add => f.write_str("ADD"),
            Self::Adc => f.write_str("ADC"),
            Self::Sbc => f.write_str("SBC"),
            Self::Rsc => f.write_str("RSC"),
            Self::Tst => f.write_str("TST"),
            Self::Teq => f.write_str("TEQ"),
            Self::Cmp => f.write_str("CMP"),
            Self::Cmn => f.write_str("CMN"),
            Self::Orr => f.write_str("ORR"),
            Self::Mov => f.write_str("MOV"),
            Self::Bic => f.write_str("BIC"),
            Self::Mvn => f.write_str("MVN"),
        }
    }
}

impl ArmModeAluInstr {
    /// TST, TEQ, CMP and CMN only update flags.
    #[must_use]
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Tst | Self::Teq | Self::Cmp | Self::Cmn)
    }
}

impl From<u32> for ArmModeAluInstr {
    fn from(alu_op_code: u32) -> Self {
        use ArmModeAluInstr::{
            Adc, Add, And, Bic, Cmn, Cmp, Eor, Mov, Mvn, Orr, Rsb, Rsc, Sbc, Sub, Teq, Tst,
        };
        match alu_op_code & 0xF {
            0x0 => And,
            0x1 => Eor,
            0x2 => Sub,
            0x3 => Rsb,
            0x4 => Add,
            0x5 => Adc,
            0x6 => Sbc,
            0x7 => Rsc,
            0x8 => Tst,
            0x9 => Teq,
            0xA => Cmp,
            0xB => Cmn,
            0xC => Orr,
            0xD => Mov,
            0xE => Bic,
            _ => Mvn,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArithmeticOpResult {
    pub result: u32,
    pub carry: bool,
    pub overflow: bool,
    pub sign: bool,
    pub zero: bool,
}

impl ArithmeticOpResult {
    fn shifted(result: u32, carry: bool) -> Self {
        Self {
            result,
            carry,
            sign: result.get_bit(31),
            zero: result == 0,
            overflow: false,
        }
    }
}

/// `op1 + op2 + carry_in`, carry out when the result does not fit 32 bits.
#[must_use]
pub fn add_inner_op(first_op: u32, second_op: u32, carry_in: bool) -> ArithmeticOpResult {
    // we do the sum in 64bits so that the 32nd bit is the carry
    let result_and_carry =
        u64::from(first_op) + u64::from(second_op) + u64::from(carry_in);
    let result = result_and_carry as u32;

    // overflow only occurs when operands have the same sign and result has the opposite one
    let overflow = (!(first_op ^ second_op) & (first_op ^ result)).get_bit(31);

    ArithmeticOpResult {
        result,
        carry: result_and_carry > 0xFFFF_FFFF,
        overflow,
        sign: result.get_bit(31),
        zero: result == 0,
    }
}

/// `op1 - op2 - !carry_in`. C is the inverted borrow: set when `op1 >= op2 + borrow`.
#[must_use]
pub fn sub_inner_op(first_op: u32, second_op: u32, carry_in: bool) -> ArithmeticOpResult {
    let borrow = u32::from(!carry_in);
    let result = first_op.wrapping_sub(second_op).wrapping_sub(borrow);

    let overflow = ((first_op ^ second_op) & (first_op ^ result)).get_bit(31);

    ArithmeticOpResult {
        result,
        carry: u64::from(first_op) >= u64::from(second_op) + u64::from(borrow),
        overflow,
        sign: result.get_bit(31),
        zero: result == 0,
    }
}

/// Shift by an amount taken from a register (already masked to 8 bits).
///
/// An amount of 0 leaves both value and carry untouched.
#[must_use]
pub fn shift(kind: ShiftKind, shift_amount: u32, rm: u32, carry: bool) -> ArithmeticOpResult {
    if shift_amount == 0 {
        return ArithmeticOpResult::shifted(rm, carry);
    }

    match kind {
        ShiftKind::Lsl => match shift_amount {
            1..=31 => ArithmeticOpResult::shifted(
                rm << shift_amount,
                rm.get_bit((32 - shift_amount) as u8),
            ),
            32 => ArithmeticOpResult::shifted(0, rm.get_bit(0)),
            _ => ArithmeticOpResult::shifted(0, false),
        },
        ShiftKind::Lsr => match shift_amount {
            1..=31 => ArithmeticOpResult::shifted(
                rm >> shift_amount,
                rm.get_bit((shift_amount - 1) as u8),
            ),
            32 => ArithmeticOpResult::shifted(0, rm.get_bit(31)),
            _ => ArithmeticOpResult::shifted(0, false),
        },
        ShiftKind::Asr => match shift_amount {
            1..=31 => ArithmeticOpResult::shifted(
                ((rm as i32) >> shift_amount) as u32,
                rm.get_bit((shift_amount - 1) as u8),
            ),
            _ => ArithmeticOpResult::shifted(((rm as i32) >> 31) as u32, rm.get_bit(31)),
        },
        ShiftKind::Ror => {
            let amount = shift_amount & 31;
            if amount == 0 {
                ArithmeticOpResult::shifted(rm, rm.get_bit(31))
            } else {
                ArithmeticOpResult::shifted(
                    rm.rotate_right(amount),
                    rm.get_bit((amount - 1) as u8),
                )
            }
        }
    }
}

/// Shift by a 5-bit amount encoded in the instruction.
///
/// `LSR #0` and `ASR #0` encode a shift by 32, `ROR #0` encodes RRX.
#[must_use]
pub fn shift_immediate(
    kind: ShiftKind,
    shift_amount: u32,
    rm: u32,
    carry: bool,
) -> ArithmeticOpResult {
    match (kind, shift_amount) {
        (ShiftKind::Lsl, 0) => ArithmeticOpResult::shifted(rm, carry),
        (ShiftKind::Lsr | ShiftKind::Asr, 0) => shift(kind, 32, rm, carry),
        (ShiftKind::Ror, 0) => {
            ArithmeticOpResult::shifted((u32::from(carry) << 31) | (rm >> 1), rm.get_bit(0))
        }
        _ => shift(kind, shift_amount, rm, carry),
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ShiftOperator {
    Immediate(u32),
    Register(u32),
}

impl Display for ShiftOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate(value) => write!(f, "#{value}"),
            Self::Register(register) => write!(f, "R{register}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AluSecondOperandInfo {
    Register {
        shift_op: ShiftOperator,
        shift_kind: ShiftKind,
        register: u32,
    },
    Immediate {
        base: u32,
        shift: u32,
    },
}

impl AluSecondOperandInfo {
    /// Decodes the 12 low bits of a data processing instruction.
    #[must_use]
    pub fn from_operand(is_immediate: bool, op2: u32) -> Self {
        if is_immediate {
            Self::Immediate {
                base: op2.get_bits(0..=7),
                shift: op2.get_bits(8..=11) * 2,
            }
        } else {
            let shift_op = if op2.get_bit(4) {
                ShiftOperator::Register(op2.get_bits(8..=11))
            } else {
                ShiftOperator::Immediate(op2.get_bits(7..=11))
            };
            Self::Register {
                shift_op,
                shift_kind: op2.get_bits(5..=6).into(),
                register: op2.get_bits(0..=3),
            }
        }
    }
}

impl Display for AluSecondOperandInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Register {
                shift_op,
                shift_kind,
                register,
            } => {
                if let ShiftOperator::Immediate(0) = shift_op {
                    return match shift_kind {
                        ShiftKind::Lsl => write!(f, "R{register}"),
                        ShiftKind::Ror => write!(f, "R{register}, RRX"),
                        ShiftKind::Lsr | ShiftKind::Asr => {
                            write!(f, "R{register}, {shift_kind} #32")
                        }
                    };
                }

                write!(f, "R{register}, {shift_kind} {shift_op}")
            }
            Self::Immediate { base, shift } => {
                write!(f, "#0x{:X}", base.rotate_right(shift))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PsrKind {
    Cpsr,
    Spsr,
}

impl From<bool> for PsrKind {
    fn from(value: bool) -> Self {
        if value { Self::Spsr } else { Self::Cpsr }
    }
}

impl Display for PsrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpsr => f.write_str("CPSR"),
            Self::Spsr => f.write_str("SPSR"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PsrOpKind {
    /// Transfer PSR contents to a register.
    Mrs { destination_register: u32 },

    /// Transfer a register or a rotated immediate to the PSR bytes selected by `field_mask`.
    Msr {
        operand: AluSecondOperandInfo,
        field_mask: u32,
    },
}

/// Expands the 4 field bits (f, s, x, c) of MSR into a byte mask.
#[must_use]
pub fn msr_field_mask(fields: u32) -> u32 {
    [0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0xFF00_0000]
        .into_iter()
        .enumerate()
        .filter(|(bit, _)| fields.get_bit(*bit as u8))
        .fold(0, |mask, (_, byte)| mask | byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_compare_and_test_skip_rd() {
        let tests: Vec<u32> = (0..16)
            .filter(|op| ArmModeAluInstr::from(*op).is_test())
            .collect();
        assert_eq!(tests, vec![8, 9, 10, 11]);
    }

    #[test]
    fn add_carry_and_overflow() {
        let r = add_inner_op(0xFFFF_FFFF, 1, false);
        assert_eq!((r.result, r.carry, r.overflow, r.zero), (0, true, false, true));

        let r = add_inner_op(0x7FFF_FFFF, 1, false);
        assert_eq!((r.result, r.carry, r.overflow, r.sign), (0x8000_0000, false, true, true));

        let r = add_inner_op(0xFFFF_FFFF, 0, true);
        assert!(r.carry);
        assert!(r.zero);
    }

    #[test]
    fn sub_carry_is_not_borrow() {
        let r = sub_inner_op(10, 10, true);
        assert_eq!((r.result, r.carry, r.zero), (0, true, true));

        let r = sub_inner_op(1, 2, true);
        assert_eq!((r.result, r.carry, r.sign), (0xFFFF_FFFF, false, true));

        let r = sub_inner_op(0x8000_0000, 1, true);
        assert!(r.overflow);

        // SBC with C clear subtracts one more.
        let r = sub_inner_op(5, 5, false);
        assert_eq!((r.result, r.carry), (0xFFFF_FFFF, false));
    }

    #[test]
    fn sub_matches_wide_reference() {
        for _ in 0..256 {
            let a: u32 = rand::random();
            let b: u32 = rand::random();
            let c: bool = rand::random();
            let r = sub_inner_op(a, b, c);
            let wide = i64::from(a) - i64::from(b) - i64::from(!c);
            assert_eq!(r.result, wide as u32);
            assert_eq!(r.carry, wide >= 0);
            let signed = i64::from(a as i32) - i64::from(b as i32) - i64::from(!c);
            assert_eq!(r.overflow, signed != i64::from(r.result as i32));
        }
    }

    #[test]
    fn add_matches_wide_reference() {
        for _ in 0..256 {
            let a: u32 = rand::random();
            let b: u32 = rand::random();
            let c: bool = rand::random();
            let r = add_inner_op(a, b, c);
            let wide = u64::from(a) + u64::from(b) + u64::from(c);
            assert_eq!(r.result, wide as u32);
            assert_eq!(r.carry, wide > u64::from(u32::MAX));
            let signed = i64::from(a as i32) + i64::from(b as i32) + i64::from(c);
            assert_eq!(r.overflow, signed != i64::from(r.result as i32));
        }
    }

    #[test]
    fn register_shift_edges() {
        let rm = 0x8000_0001;

        let r = shift(ShiftKind::Lsl, 0, rm, true);
        assert_eq!((r.result, r.carry), (rm, true));

        let r = shift(ShiftKind::Lsl, 32, rm, false);
        assert_eq!((r.result, r.carry), (0, true));

        let r = shift(ShiftKind::Lsl, 33, rm, true);
        assert_eq!((r.result, r.carry), (0, false));

        let r = shift(ShiftKind::Lsr, 32, rm, false);
        assert_eq!((r.result, r.carry), (0, true));

        let r = shift(ShiftKind::Lsr, 40, rm, true);
        assert_eq!((r.result, r.carry), (0, false));

        let r = shift(ShiftKind::Asr, 200, rm, false);
        assert_eq!((r.result, r.carry), (0xFFFF_FFFF, true));

        let r = shift(ShiftKind::Ror, 32, rm, false);
        assert_eq!((r.result, r.carry), (rm, true));

        let r = shift(ShiftKind::Ror, 4, 0xF, false);
        assert_eq!((r.result, r.carry), (0xF000_0000, true));
    }

    #[test]
    fn immediate_shift_encodings() {
        let r = shift_immediate(ShiftKind::Lsr, 0, 0x8000_0000, false);
        assert_eq!((r.result, r.carry), (0, true));

        let r = shift_immediate(ShiftKind::Asr, 0, 0x8000_0000, false);
        assert_eq!((r.result, r.carry), (0xFFFF_FFFF, true));

        let r = shift_immediate(ShiftKind::Ror, 0, 0x3, true);
        assert_eq!((r.result, r.carry), (0x8000_0001, true));

        let r = shift_immediate(ShiftKind::Lsl, 4, 0x1000_0001, false);
        assert_eq!((r.result, r.carry), (0x10, true));
    }

    #[test]
    fn msr_masks() {
        assert_eq!(msr_field_mask(0b1000), 0xFF00_0000);
        assert_eq!(msr_field_mask(0b1001), 0xFF00_00FF);
        assert_eq!(msr_field_mask(0b1111), 0xFFFF_FFFF);
        assert_eq!(msr_field_mask(0), 0);
    }

    #[test]
    fn second_operand_display() {
        let op = AluSecondOperandInfo::from_operand(true, 0x1FF);
        assert_eq!(op.to_string(), "#0xC000003F");

        let op = AluSecondOperandInfo::from_operand(false, 0x062);
        assert_eq!(op.to_string(), "R2, RRX");

        let op = AluSecondOperandInfo::from_operand(false, 0x312);
        assert_eq!(op.to_string(), "R2, LSL R3");
    }
}
