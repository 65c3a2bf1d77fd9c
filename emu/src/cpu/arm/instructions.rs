//! # ARM Instruction Decoding
//!
//! This module handles decoding 32-bit ARM instructions into their component
//! fields and classifying them by type.
//!
//! ## Instruction Categories
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    ARM Instruction Categories                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Bits 27-25 determine the basic category:                               │
//! │                                                                         │
//! │  000 + special patterns  →  Multiply, Multiply Long, SWP, BX, PSR       │
//! │  000                     →  Data Processing (register operand)          │
//! │  001                     →  Data Processing (immediate operand)         │
//! │  010                     →  Load/Store (immediate offset)               │
//! │  011                     →  Load/Store (register offset)                │
//! │  100                     →  Block Data Transfer (LDM/STM)               │
//! │  101                     →  Branch (B/BL)                               │
//! │  110                     →  Coprocessor Data Transfer                   │
//! │  111                     →  Software Interrupt / Coprocessor ops        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Decoding Priority
//!
//! Some instructions have overlapping bit patterns. The decoder checks
//! instructions in this priority order:
//!
//! 1. Software Interrupt (SWI)
//! 2. Branch (B, BL)
//! 3. Block Data Transfer (LDM, STM)
//! 4. Undefined (`011` with bit 4 set)
//! 5. Single Data Transfer (LDR, STR)
//! 6. Coprocessor operations
//! 7. Branch and Exchange (BX)
//! 8. Single Data Swap (SWP/SWPB)
//! 9. Multiply Long (UMULL, SMULL, UMLAL, SMLAL)
//! 10. Multiply (MUL, MLA)
//! 11. Halfword Data Transfer (LDRH, STRH, LDRSB, LDRSH)
//! 12. PSR Transfer (MRS, MSR)
//! 13. Data Processing (AND, ADD, etc.)
//!
//! Decoding is total: anything the ARM7TDMI does not implement turns into
//! [`ArmModeInstruction::Undefined`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::arm::alu_instruction::{
    AluSecondOperandInfo, ArmModeAluInstr, PsrKind, PsrOpKind, msr_field_mask,
};
use crate::cpu::condition::Condition;
use crate::cpu::flags::{
    HalfwordDataTransferOffsetKind, HalfwordTransferKind, Indexing, LoadStoreKind, Offsetting,
    OperandKind, ReadWriteKind, ShiftKind,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SingleDataTransferOffsetInfo {
    Immediate {
        offset: u32,
    },
    RegisterImmediate {
        shift_amount: u32,
        shift_kind: ShiftKind,
        reg_offset: u32,
    },
}

impl SingleDataTransferOffsetInfo {
    fn disassemble(self, offsetting: Offsetting) -> String {
        let sign = match offsetting {
            Offsetting::Up => "",
            Offsetting::Down => "-",
        };
        match self {
            Self::Immediate { offset: 0 } => String::new(),
            Self::Immediate { offset } => format!(", #{sign}0x{offset:X}"),
            Self::RegisterImmediate {
                shift_amount: 0,
                shift_kind: ShiftKind::Lsl,
                reg_offset,
            } => format!(", {sign}R{reg_offset}"),
            Self::RegisterImmediate {
                shift_amount,
                shift_kind,
                reg_offset,
            } => format!(", {sign}R{reg_offset}, {shift_kind} #{shift_amount}"),
        }
    }
}

/// All ARM instruction types after decoding.
///
/// The condition lives next to the instruction in
/// [`ArmModeOpcode`](super::mode::ArmModeOpcode).
///
/// | Variant                | Example Instructions      | Description                    |
/// |------------------------|---------------------------|--------------------------------|
/// | `DataProcessing`       | AND, ADD, CMP, MOV        | ALU operations                 |
/// | `Multiply`             | MUL, MLA                  | 32-bit multiply                |
/// | `MultiplyLong`         | UMULL, SMULL              | 64-bit multiply                |
/// | `PSRTransfer`          | MRS, MSR                  | Status register access         |
/// | `SingleDataSwap`       | SWP, SWPB                 | Atomic memory swap             |
/// | `BranchAndExchange`    | BX                        | Branch + possible ARM↔Thumb    |
/// | `HalfwordDataTransfer` | LDRH, STRH, LDRSB         | 16-bit and signed loads        |
/// | `SingleDataTransfer`   | LDR, STR, LDRB            | 32-bit and byte loads/stores   |
/// | `BlockDataTransfer`    | LDM, STM                  | Multiple register load/store   |
/// | `Branch`               | B, BL                     | Branch (and link)              |
/// | `Coprocessor*`         | CDP, LDC, MCR             | No coprocessor: Undefined      |
/// | `SoftwareInterrupt`    | SWI                       | BIOS call                      |
/// | `Undefined`            | -                         | Triggers undefined exception   |
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum ArmModeInstruction {
    DataProcessing {
        alu_instruction: ArmModeAluInstr,
        set_conditions: bool,
        op_kind: OperandKind,
        rn: u32,
        destination: u32,
        op2: AluSecondOperandInfo,
    },
    Multiply {
        variant: ArmModeMultiplyVariant,
        should_set_codes: bool,
        rd_destination_register: u32,
        rn_accumulate_register: u32,
        rs_operand_register: u32,
        rm_operand_register: u32,
    },
    MultiplyLong {
        variant: ArmModeMultiplyLongVariant,
        should_set_codes: bool,
        rdhi_destination_register: u32,
        rdlo_destination_register: u32,
        rs_operand_register: u32,
        rm_operand_register: u32,
    },
    PSRTransfer {
        psr_kind: PsrKind,
        kind: PsrOpKind,
    },
    SingleDataSwap {
        byte: bool, // true = byte, false = word
        rn: u32,    // base register (address)
        rd: u32,    // destination register
        rm: u32,    // source register
    },
    BranchAndExchange {
        register: u32,
    },
    HalfwordDataTransfer {
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        load_store_kind: LoadStoreKind,
        offset_kind: HalfwordDataTransferOffsetKind,
        base_register: u32,
        source_destination_register: u32,
        transfer_kind: HalfwordTransferKind,
    },
    SingleDataTransfer {
        kind: LoadStoreKind,
        quantity: ReadWriteKind,
        write_back: bool,
        indexing: Indexing,
        rd: u32,
        base_register: u32,
        offset_info: SingleDataTransferOffsetInfo,
        offsetting: Offsetting,
    },
    BlockDataTransfer {
        indexing: Indexing,
        offsetting: Offsetting,
        load_psr: bool,
        write_back: bool,
        load_store: LoadStoreKind,
        rn: u32,
        register_list: u32,
    },
    Branch {
        link: bool,
        /// Byte offset relative to the instruction address + 8.
        offset: i32,
    },
    CoprocessorDataTransfer {
        load_store: LoadStoreKind,
        cp_number: u32,
    },
    CoprocessorDataOperation {
        cp_number: u32,
    },
    CoprocessorRegisterTransfer {
        load_store: LoadStoreKind,
        cp_number: u32,
    },
    SoftwareInterrupt {
        comment: u32,
    },
    Undefined,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmModeMultiplyVariant {
    Mul,
    Mla,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmModeMultiplyLongVariant {
    Umull,
    Umlal,
    Smull,
    Smlal,
}

impl ArmModeMultiplyLongVariant {
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Smull | Self::Smlal)
    }

    #[must_use]
    pub const fn accumulates(self) -> bool {
        matches!(self, Self::Umlal | Self::Smlal)
    }
}

impl fmt::Display for ArmModeMultiplyLongVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Umull => f.write_str("UMULL"),
            Self::Umlal => f.write_str("UMLAL"),
            Self::Smull => f.write_str("SMULL"),
            Self::Smlal => f.write_str("SMLAL"),
        }
    }
}

impl From<u32> for ArmModeMultiplyVariant {
    fn from(op_code: u32) -> Self {
        if op_code.get_bit(21) { Self::Mla } else { Self::Mul }
    }
}

impl From<u32> for ArmModeMultiplyLongVariant {
    fn from(op_code: u32) -> Self {
        match op_code.get_bits(21..=22) {
            0b00 => Self::Umull,
            0b01 => Self::Umlal,
            0b10 => Self::Smull,
            _ => Self::Smlal,
        }
    }
}

pub(crate) fn signed_hex(value: i32) -> String {
    if value < 0 {
        format!("-0x{:X}", value.unsigned_abs())
    } else {
        format!("+0x{value:X}")
    }
}

pub(crate) fn register_list_string(register_list: u32) -> String {
    let mut groups: Vec<String> = Vec::new();
    let mut reg = 0_u8;
    while reg < 16 {
        if register_list.get_bit(reg) {
            let start = reg;
            while reg < 15 && register_list.get_bit(reg + 1) {
                reg += 1;
            }
            groups.push(if start == reg {
                format!("R{start}")
            } else {
                format!("R{start}-R{reg}")
            });
        }
        reg += 1;
    }
    format!("{{{}}}", groups.join(","))
}

impl ArmModeInstruction {
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn disassembler(&self, condition: Condition) -> String {
        match self {
            Self::DataProcessing {
                alu_instruction,
                set_conditions,
                rn,
                destination,
                op2,
                ..
            } => {
                let set_string = if *set_conditions { "S" } else { "" };
                match alu_instruction {
                    ArmModeAluInstr::Tst
                    | ArmModeAluInstr::Teq
                    | ArmModeAluInstr::Cmp
                    | ArmModeAluInstr::Cmn => {
                        format!("{alu_instruction}{condition} R{rn}, {op2}")
                    }
                    ArmModeAluInstr::Mov | ArmModeAluInstr::Mvn => {
                        format!("{alu_instruction}{condition}{set_string} R{destination}, {op2}")
                    }
                    _ => format!(
                        "{alu_instruction}{condition}{set_string} R{destination}, R{rn}, {op2}"
                    ),
                }
            }
            Self::Multiply {
                variant,
                should_set_codes,
                rd_destination_register,
                rn_accumulate_register,
                rs_operand_register,
                rm_operand_register,
            } => {
                let s = if *should_set_codes { "S" } else { "" };
                match variant {
                    ArmModeMultiplyVariant::Mul => format!(
                        "MUL{condition}{s} R{rd_destination_register}, R{rm_operand_register}, R{rs_operand_register}"
                    ),
                    ArmModeMultiplyVariant::Mla => format!(
                        "MLA{condition}{s} R{rd_destination_register}, R{rm_operand_register}, R{rs_operand_register}, R{rn_accumulate_register}"
                    ),
                }
            }
            Self::MultiplyLong {
                variant,
                should_set_codes,
                rdhi_destination_register,
                rdlo_destination_register,
                rs_operand_register,
                rm_operand_register,
            } => {
                let s = if *should_set_codes { "S" } else { "" };
                format!(
                    "{variant}{condition}{s} R{rdlo_destination_register}, R{rdhi_destination_register}, R{rm_operand_register}, R{rs_operand_register}"
                )
            }
            Self::PSRTransfer { psr_kind, kind } => match kind {
                PsrOpKind::Mrs {
                    destination_register,
                } => format!("MRS{condition} R{destination_register}, {psr_kind}"),
                PsrOpKind::Msr {
                    operand,
                    field_mask,
                } => {
                    let fields: String = [(0xFF00_0000, 'f'), (0x00FF_0000, 's'), (0x0000_FF00, 'x'), (0x0000_00FF, 'c')]
                        .into_iter()
                        .filter(|(mask, _)| field_mask & mask != 0)
                        .map(|(_, c)| c)
                        .collect();
                    format!("MSR{condition} {psr_kind}_{fields}, {operand}")
                }
            },
            Self::SingleDataSwap { byte, rn, rd, rm } => {
                let b = if *byte { "B" } else { "" };
                format!("SWP{condition}{b} R{rd}, R{rm}, [R{rn}]")
            }
            Self::BranchAndExchange { register } => format!("BX{condition} R{register}"),
            Self::HalfwordDataTransfer {
                indexing,
                offsetting,
                load_store_kind,
                transfer_kind,
                source_destination_register,
                offset_kind,
                base_register,
                write_back,
            } => {
                let sign = match offsetting {
                    Offsetting::Up => "",
                    Offsetting::Down => "-",
                };

                let offset = match offset_kind {
                    HalfwordDataTransferOffsetKind::Immediate { offset: 0 } => String::new(),
                    HalfwordDataTransferOffsetKind::Immediate { offset } => {
                        format!(", #{sign}0x{offset:X}")
                    }
                    HalfwordDataTransferOffsetKind::Register { register } => {
                        format!(", {sign}R{register}")
                    }
                };

                let w = if *write_back { "!" } else { "" };

                let address = match indexing {
                    Indexing::Pre => format!("[R{base_register}{offset}]{w}"),
                    Indexing::Post => format!("[R{base_register}]{offset}"),
                };

                format!(
                    "{load_store_kind}{condition}{transfer_kind} R{source_destination_register}, {address}"
                )
            }
            Self::SingleDataTransfer {
                kind,
                quantity,
                write_back,
                indexing,
                rd,
                base_register,
                offset_info,
                offsetting,
            } => {
                let b = match quantity {
                    ReadWriteKind::Word => "",
                    ReadWriteKind::Byte => "B",
                };
                let offset = offset_info.disassemble(*offsetting);
                let address = match indexing {
                    Indexing::Pre => {
                        let w = if *write_back { "!" } else { "" };
                        format!("[R{base_register}{offset}]{w}")
                    }
                    Indexing::Post => format!("[R{base_register}]{offset}"),
                };

                format!("{kind}{condition}{b} R{rd}, {address}")
            }
            Self::BlockDataTransfer {
                indexing,
                offsetting,
                load_psr,
                write_back,
                load_store,
                rn,
                register_list,
            } => {
                let op = match load_store {
                    LoadStoreKind::Store => "STM",
                    LoadStoreKind::Load => "LDM",
                };

                let offset_modifier = match offsetting {
                    Offsetting::Down => "D",
                    Offsetting::Up => "I",
                };
                let index_type = match indexing {
                    Indexing::Pre => "B",
                    Indexing::Post => "A",
                };

                let registers = register_list_string(*register_list);
                let w = if *write_back { "!" } else { "" };
                let f = if *load_psr { "^" } else { "" };
                format!("{op}{condition}{offset_modifier}{index_type} R{rn}{w}, {registers}{f}")
            }
            Self::Branch { link, offset } => {
                let link = if *link { "L" } else { "" };
                format!("B{link}{condition} {}", signed_hex(*offset))
            }
            Self::CoprocessorDataTransfer {
                load_store,
                cp_number,
            } => {
                let op = match load_store {
                    LoadStoreKind::Store => "STC",
                    LoadStoreKind::Load => "LDC",
                };
                format!("{op}{condition} p{cp_number}")
            }
            Self::CoprocessorDataOperation { cp_number } => format!("CDP{condition} p{cp_number}"),
            Self::CoprocessorRegisterTransfer {
                load_store,
                cp_number,
            } => {
                let op = match load_store {
                    LoadStoreKind::Store => "MCR",
                    LoadStoreKind::Load => "MRC",
                };
                format!("{op}{condition} p{cp_number}")
            }
            Self::SoftwareInterrupt { comment } => format!("SWI{condition} 0x{comment:06X}"),
            Self::Undefined => format!("UND{condition}"),
        }
    }
}

impl From<u32> for ArmModeInstruction {
    #[allow(clippy::too_many_lines)]
    fn from(op_code: u32) -> Self {
        // NOTE: The order is based on how many bits are already know at decoding time.
        if op_code & 0x0F00_0000 == 0x0F00_0000 {
            Self::SoftwareInterrupt {
                comment: op_code.get_bits(0..=23),
            }
        } else if op_code & 0x0E00_0000 == 0x0A00_0000 {
            let offset = op_code.get_bits(0..=23).sign_extended(24) << 2;
            Self::Branch {
                link: op_code.get_bit(24),
                offset: offset as i32,
            }
        } else if op_code & 0x0E00_0000 == 0x0800_0000 {
            Self::BlockDataTransfer {
                indexing: op_code.get_bit(24).into(),
                offsetting: op_code.get_bit(23).into(),
                load_psr: op_code.get_bit(22),
                write_back: op_code.get_bit(21),
                load_store: op_code.get_bit(20).into(),
                rn: op_code.get_bits(16..=19),
                register_list: op_code.get_bits(0..=15),
            }
        } else if op_code & 0x0E00_0010 == 0x0600_0010 {
            tracing::debug!(
                "undefined instruction decode: opcode=0x{op_code:08X}, bits[25-27]=0b011, bit[4]=1"
            );
            Self::Undefined
        } else if op_code & 0x0C00_0000 == 0x0400_0000 {
            // NOTE: This bit is negated because the meaning is inverted in SingleDataTransfer then other istructions.
            let op_kind: OperandKind = (!op_code.get_bit(25)).into();

            let offset_info = match op_kind {
                OperandKind::Immediate => SingleDataTransferOffsetInfo::Immediate {
                    offset: op_code.get_bits(0..=11),
                },
                OperandKind::Register => SingleDataTransferOffsetInfo::RegisterImmediate {
                    shift_amount: op_code.get_bits(7..=11),
                    shift_kind: op_code.get_bits(5..=6).into(),
                    reg_offset: op_code.get_bits(0..=3),
                },
            };

            Self::SingleDataTransfer {
                kind: op_code.get_bit(20).into(),
                quantity: op_code.get_bit(22).into(),
                write_back: op_code.get_bit(21),
                indexing: op_code.get_bit(24).into(),
                rd: op_code.get_bits(12..=15),
                base_register: op_code.get_bits(16..=19),
                offset_info,
                offsetting: op_code.get_bit(23).into(),
            }
        } else if op_code & 0x0E00_0000 == 0x0C00_0000 {
            Self::CoprocessorDataTransfer {
                load_store: op_code.get_bit(20).into(),
                cp_number: op_code.get_bits(8..=11),
            }
        } else if op_code & 0x0F00_0000 == 0x0E00_0000 {
            let cp_number = op_code.get_bits(8..=11);
            if op_code.get_bit(4) {
                Self::CoprocessorRegisterTransfer {
                    load_store: op_code.get_bit(20).into(),
                    cp_number,
                }
            } else {
                Self::CoprocessorDataOperation { cp_number }
            }
        } else if op_code & 0x0FFF_FFF0 == 0x012F_FF10 {
            Self::BranchAndExchange {
                register: op_code.get_bits(0..=3),
            }
        } else if op_code & 0x0FB0_0FF0 == 0x0100_0090 {
            Self::SingleDataSwap {
                byte: op_code.get_bit(22),
                rn: op_code.get_bits(16..=19),
                rd: op_code.get_bits(12..=15),
                rm: op_code.get_bits(0..=3),
            }
        } else if op_code & 0x0F80_00F0 == 0x0080_0090 {
            Self::MultiplyLong {
                variant: op_code.into(),
                should_set_codes: op_code.get_bit(20),
                rdhi_destination_register: op_code.get_bits(16..=19),
                rdlo_destination_register: op_code.get_bits(12..=15),
                rs_operand_register: op_code.get_bits(8..=11),
                rm_operand_register: op_code.get_bits(0..=3),
            }
        } else if op_code & 0x0FC0_00F0 == 0x0000_0090 {
            Self::Multiply {
                variant: op_code.into(),
                should_set_codes: op_code.get_bit(20),
                rd_destination_register: op_code.get_bits(16..=19),
                rn_accumulate_register: op_code.get_bits(12..=15),
                rs_operand_register: op_code.get_bits(8..=11),
                rm_operand_register: op_code.get_bits(0..=3),
            }
        } else if op_code & 0x0E00_0090 == 0x0000_0090 {
            decode_halfword_transfer(op_code)
        } else if op_code & 0x0D90_0000 == 0x0100_0000 {
            let psr_kind = PsrKind::from(op_code.get_bit(22));
            let kind = if op_code.get_bit(21) {
                PsrOpKind::Msr {
                    operand: AluSecondOperandInfo::from_operand(
                        op_code.get_bit(25),
                        op_code.get_bits(0..=11),
                    ),
                    field_mask: msr_field_mask(op_code.get_bits(16..=19)),
                }
            } else {
                PsrOpKind::Mrs {
                    destination_register: op_code.get_bits(12..=15),
                }
            };
            Self::PSRTransfer { psr_kind, kind }
        } else {
            let op_kind: OperandKind = op_code.get_bit(25).into();
            Self::DataProcessing {
                alu_instruction: op_code.get_bits(21..=24).into(),
                set_conditions: op_code.get_bit(20),
                op_kind,
                rn: op_code.get_bits(16..=19),
                destination: op_code.get_bits(12..=15),
                op2: AluSecondOperandInfo::from_operand(
                    op_kind == OperandKind::Immediate,
                    op_code.get_bits(0..=11),
                ),
            }
        }
    }
}

fn decode_halfword_transfer(op_code: u32) -> ArmModeInstruction {
    let load_store_kind: LoadStoreKind = op_code.get_bit(20).into();
    let transfer_kind = match (op_code.get_bits(5..=6), load_store_kind) {
        (0b01, _) => HalfwordTransferKind::UnsignedHalfwords,
        (0b10, LoadStoreKind::Load) => HalfwordTransferKind::SignedByte,
        (0b11, LoadStoreKind::Load) => HalfwordTransferKind::SignedHalfwords,
        // SH=00 is SWP/multiply space, stores with S set are LDRD/STRD on later cores.
        _ => {
            tracing::debug!("undefined halfword transfer encoding: opcode=0x{op_code:08X}");
            return ArmModeInstruction::Undefined;
        }
    };

    let offset_kind = if op_code.get_bit(22) {
        HalfwordDataTransferOffsetKind::Immediate {
            offset: (op_code.get_bits(8..=11) << 4) | op_code.get_bits(0..=3),
        }
    } else {
        HalfwordDataTransferOffsetKind::Register {
            register: op_code.get_bits(0..=3),
        }
    };

    ArmModeInstruction::HalfwordDataTransfer {
        indexing: op_code.get_bit(24).into(),
        offsetting: op_code.get_bit(23).into(),
        write_back: op_code.get_bit(21),
        load_store_kind,
        offset_kind,
        base_register: op_code.get_bits(16..=19),
        source_destination_register: op_code.get_bits(12..=15),
        transfer_kind,
    }
}

impl fmt::Display for ArmModeInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.disassembler(Condition::AL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::arm::alu_instruction::ShiftOperator;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_branch() {
        let output = ArmModeInstruction::from(0b1110_1011_0000_0000_0000_0000_0111_1111);
        assert_eq!(
            ArmModeInstruction::Branch {
                link: true,
                offset: 508,
            },
            output
        );
        assert_eq!("BL +0x1FC", output.to_string());

        let output = ArmModeInstruction::from(0b0000_1010_0000_0000_0000_0000_0111_1111);
        assert_eq!("BEQ +0x1FC", output.disassembler(Condition::EQ));

        // BNE back by four instructions.
        let output = ArmModeInstruction::from(0x1AFF_FFFC);
        assert_eq!(
            ArmModeInstruction::Branch {
                link: false,
                offset: -16,
            },
            output
        );
        assert_eq!("BNE -0x10", output.disassembler(Condition::NE));
    }

    #[test]
    fn decode_branch_and_exchange() {
        let output = ArmModeInstruction::from(0b1110_0001_0010_1111_1111_1111_0001_0001);
        assert_eq!(ArmModeInstruction::BranchAndExchange { register: 1 }, output);
        assert_eq!("BX R1", output.to_string());
        assert_eq!("BXEQ R1", output.disassembler(Condition::EQ));
    }

    #[test]
    fn decode_data_processing() {
        // MOV R0, #0
        let output = ArmModeInstruction::from(0xE3A0_0000);
        assert_eq!(
            ArmModeInstruction::DataProcessing {
                alu_instruction: ArmModeAluInstr::Mov,
                set_conditions: false,
                op_kind: OperandKind::Immediate,
                rn: 0,
                destination: 0,
                op2: AluSecondOperandInfo::Immediate { base: 0, shift: 0 },
            },
            output
        );
        assert_eq!("MOV R0, #0x0", output.to_string());

        // CMP R0, #10
        let output = ArmModeInstruction::from(0xE350_000A);
        assert_eq!("CMP R0, #0xA", output.to_string());

        // ADD R0, R1, R2, LSL #3
        let output = ArmModeInstruction::from(0xE081_0182);
        assert_eq!(
            ArmModeInstruction::DataProcessing {
                alu_instruction: ArmModeAluInstr::Add,
                set_conditions: false,
                op_kind: OperandKind::Register,
                rn: 1,
                destination: 0,
                op2: AluSecondOperandInfo::Register {
                    shift_op: ShiftOperator::Immediate(3),
                    shift_kind: ShiftKind::Lsl,
                    register: 2,
                },
            },
            output
        );
        assert_eq!("ADD R0, R1, R2, LSL #3", output.to_string());
    }

    #[test]
    fn decode_psr_transfer() {
        let output = ArmModeInstruction::from(0b1110_00_0_1011_0_1001_1111_000000001110);
        assert_eq!(
            ArmModeInstruction::PSRTransfer {
                psr_kind: PsrKind::Spsr,
                kind: PsrOpKind::Msr {
                    operand: AluSecondOperandInfo::Register {
                        shift_op: ShiftOperator::Immediate(0),
                        shift_kind: ShiftKind::Lsl,
                        register: 14,
                    },
                    field_mask: 0xFF00_00FF,
                }
            },
            output
        );
        assert_eq!("MSR SPSR_fc, R14", output.to_string());

        // MRS R0, CPSR
        let output = ArmModeInstruction::from(0xE10F_0000);
        assert_eq!(
            ArmModeInstruction::PSRTransfer {
                psr_kind: PsrKind::Cpsr,
                kind: PsrOpKind::Mrs {
                    destination_register: 0
                },
            },
            output
        );

        // MSR CPSR_f, #0xF0000000
        let output = ArmModeInstruction::from(0xE328_F20F);
        assert_eq!("MSR CPSR_f, #0xF0000000", output.to_string());
    }

    #[test]
    fn decode_half_word_data_transfer_immediate_offset() {
        let output = ArmModeInstruction::from(0b1110_0001_1100_0001_0000_0000_1011_0000);
        assert_eq!(
            ArmModeInstruction::HalfwordDataTransfer {
                indexing: Indexing::Pre,
                offsetting: Offsetting::Up,
                write_back: false,
                load_store_kind: LoadStoreKind::Store,
                offset_kind: HalfwordDataTransferOffsetKind::Immediate { offset: 0 },
                base_register: 1,
                source_destination_register: 0,
                transfer_kind: HalfwordTransferKind::UnsignedHalfwords,
            },
            output
        );
        assert_eq!("STRH R0, [R1]", output.to_string());
    }

    #[test]
    fn decode_half_word_data_transfer_register_offset() {
        let output = ArmModeInstruction::from(0b1110_0001_1000_0010_0000_0000_1011_0001);
        assert_eq!(
            ArmModeInstruction::HalfwordDataTransfer {
                indexing: Indexing::Pre,
                offsetting: Offsetting::Up,
                write_back: false,
                load_store_kind: LoadStoreKind::Store,
                offset_kind: HalfwordDataTransferOffsetKind::Register { register: 1 },
                base_register: 2,
                source_destination_register: 0,
                transfer_kind: HalfwordTransferKind::UnsignedHalfwords,
            },
            output
        );
    }

    #[test]
    fn doubleword_transfers_are_undefined() {
        // STRD R0, [R1] on ARMv5TE.
        assert_eq!(ArmModeInstruction::from(0xE1C1_00F0), ArmModeInstruction::Undefined);
        // LDRD R0, [R1] on ARMv5TE: L=0, SH=10.
        assert_eq!(ArmModeInstruction::from(0xE1C1_00D0), ArmModeInstruction::Undefined);
        // LDRSB with L=1 stays defined.
        assert!(matches!(
            ArmModeInstruction::from(0xE1D1_00D0),
            ArmModeInstruction::HalfwordDataTransfer {
                transfer_kind: HalfwordTransferKind::SignedByte,
                ..
            }
        ));
    }

    #[test]
    fn decode_single_data_transfer() {
        let output = ArmModeInstruction::from(0b11100111010100010101000000001100);
        assert_eq!(
            output,
            ArmModeInstruction::SingleDataTransfer {
                kind: LoadStoreKind::Load,
                quantity: ReadWriteKind::Byte,
                write_back: false,
                indexing: Indexing::Pre,
                rd: 5,
                base_register: 1,
                offset_info: SingleDataTransferOffsetInfo::RegisterImmediate {
                    shift_amount: 0,
                    shift_kind: ShiftKind::Lsl,
                    reg_offset: 12
                },
                offsetting: Offsetting::Down
            }
        );

        assert_eq!("LDRB R5, [R1, -R12]", output.to_string());

        // STR R0, [R1], #4
        let output = ArmModeInstruction::from(0xE481_0004);
        assert_eq!("STR R0, [R1], #0x4", output.to_string());
    }

    #[test]
    fn decode_single_data_swap() {
        let output = ArmModeInstruction::from(0b1110_0001_0000_0011_0001_0000_1001_0010);
        assert_eq!(
            output,
            ArmModeInstruction::SingleDataSwap {
                byte: false,
                rn: 3,
                rd: 1,
                rm: 2,
            }
        );
        assert_eq!("SWP R1, R2, [R3]", output.to_string());

        let output = ArmModeInstruction::from(0b1110_0001_0100_0110_0100_0000_1001_0101);
        assert_eq!("SWPB R4, R5, [R6]", output.to_string());
    }

    #[test]
    fn decode_multiply() {
        // MLA R0, R1, R2, R3
        let output = ArmModeInstruction::from(0xE020_3291);
        assert_eq!(
            output,
            ArmModeInstruction::Multiply {
                variant: ArmModeMultiplyVariant::Mla,
                should_set_codes: false,
                rd_destination_register: 0,
                rn_accumulate_register: 3,
                rs_operand_register: 2,
                rm_operand_register: 1,
            }
        );

        // SMULL R0, R1, R2, R3
        let output = ArmModeInstruction::from(0xE0C1_0392);
        assert_eq!("SMULL R0, R1, R2, R3", output.to_string());
    }

    #[test]
    fn decode_block_transfer() {
        // LDMIA R0!, {R1-R3}
        let output = ArmModeInstruction::from(0xE8B0_000E);
        assert_eq!("LDMIA R0!, {R1-R3}", output.to_string());

        // STMDB SP!, {R0,R4-R5,LR}
        let output = ArmModeInstruction::from(0xE92D_4031);
        assert_eq!("STMDB R13!, {R0,R4-R5,R14}", output.to_string());
    }

    #[test]
    fn decode_swi_coprocessor_and_undefined() {
        assert_eq!(
            ArmModeInstruction::from(0xEF00_0005),
            ArmModeInstruction::SoftwareInterrupt { comment: 5 }
        );
        assert!(matches!(
            ArmModeInstruction::from(0xEE01_0F10),
            ArmModeInstruction::CoprocessorRegisterTransfer { .. }
        ));
        assert!(matches!(
            ArmModeInstruction::from(0xED90_0000),
            ArmModeInstruction::CoprocessorDataTransfer { .. }
        ));
        assert_eq!(ArmModeInstruction::from(0xE600_0010), ArmModeInstruction::Undefined);
    }

    #[test]
    fn decoding_is_pure() {
        for _ in 0..4096 {
            let op_code: u32 = rand::random();
            assert_eq!(
                ArmModeInstruction::from(op_code),
                ArmModeInstruction::from(op_code)
            );
        }
    }
}
