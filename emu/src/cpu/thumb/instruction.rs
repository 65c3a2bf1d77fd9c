//! # Thumb instruction decoding
//!
//! Thumb instructions are 16 bits wide and fall into 19 formats. They are
//! identified by their top bits, tested in this order so that the narrower
//! encodings win over the broader ones that contain them:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────┐
//! │ Pattern (15..8)  │ Format                                       │
//! ├──────────────────┼──────────────────────────────────────────────┤
//! │ 1101 1111        │ 17 software interrupt                        │
//! │ 1110 0           │ 18 unconditional branch                      │
//! │ 1101 cccc        │ 16 conditional branch (cccc=1110 undefined)  │
//! │ 1111 H           │ 19 long branch with link, two halves         │
//! │ 1100 L           │ 15 multiple load/store                       │
//! │ 1011 L10R        │ 14 push/pop                                  │
//! │ 1011 0000        │ 13 add offset to SP                          │
//! │ 1010 S           │ 12 load address                              │
//! │ 1001 L           │ 11 SP-relative load/store                    │
//! │ 1000 L           │ 10 load/store halfword                       │
//! │ 011B L           │  9 load/store immediate offset               │
//! │ 0101 LB0 / HS1   │  7/8 register offset / sign-extended         │
//! │ 0100 1           │  6 PC-relative load                          │
//! │ 0100 01          │  5 hi register operations, BX                │
//! │ 0100 00          │  4 ALU operations                            │
//! │ 001o o           │  3 move/compare/add/subtract immediate       │
//! │ 0001 1           │  2 add/subtract                              │
//! │ 000o o           │  1 move shifted register                     │
//! └──────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Anything left over (the BLX suffix `11101`, the unused `1011` hints)
//! decodes to [`ThumbModeInstruction::Undefined`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::arm::instructions::register_list_string;
use crate::cpu::condition::Condition;
use crate::cpu::flags::{LoadStoreKind, OperandKind, ReadWriteKind, ShiftKind};
use crate::cpu::thumb::alu_instructions::{
    Operation, ThumbHighRegisterOperation, ThumbModeAluInstruction,
};

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum ThumbModeInstruction {
    MoveShiftedRegister {
        shift_operation: ShiftKind,
        offset5: u16,
        source_register: u16,
        destination_register: u16,
    },
    AddSubtract {
        operation_kind: OperandKind,
        subtract: bool,
        rn_offset3: u16,
        source_register: u16,
        destination_register: u16,
    },
    MoveCompareAddSubtractImm {
        operation: Operation,
        destination_register: u16,
        offset: u32,
    },
    AluOp {
        alu_operation: ThumbModeAluInstruction,
        source_register: u16,
        destination_register: u16,
    },
    /// Registers are the full 4-bit numbers with H1/H2 folded in.
    HiRegisterOpBX {
        register_operation: ThumbHighRegisterOperation,
        source_register: u16,
        destination_register: u16,
    },
    PCRelativeLoad {
        destination_register: u16,
        immediate_value: u16,
    },
    LoadStoreRegisterOffset {
        load_store: LoadStoreKind,
        byte_word: ReadWriteKind,
        ro: u16,
        base_register: u16,
        destination_register: u16,
    },
    LoadStoreSignExtByteHalfword {
        h: bool,
        sign_extend_flag: bool,
        offset_register: u16,
        base_register: u16,
        destination_register: u16,
    },
    /// Word offsets are already scaled by 4.
    LoadStoreImmOffset {
        load_store: LoadStoreKind,
        byte_word: ReadWriteKind,
        offset: u16,
        base_register: u16,
        destination_register: u16,
    },
    LoadStoreHalfword {
        load_store: LoadStoreKind,
        offset: u16,
        base_register: u16,
        source_destination_register: u16,
    },
    SPRelativeLoadStore {
        load_store: LoadStoreKind,
        destination_register: u16,
        word8: u16,
    },
    LoadAddress {
        sp: bool,
        destination_register: u16,
        offset: u16,
    },
    AddOffsetSP {
        negative: bool,
        word7: u16,
    },
    PushPopReg {
        load_store: LoadStoreKind,
        pc_lr: bool,
        register_list: u16,
    },
    MultipleLoadStore {
        load_store: LoadStoreKind,
        base_register: u16,
        register_list: u16,
    },
    CondBranch {
        condition: Condition,
        immediate_offset: i32,
    },
    Swi {
        comment: u8,
    },
    UncondBranch {
        offset: i32,
    },
    /// `h` is false for the first half (high part of the offset).
    LongBranchLink {
        h: bool,
        offset: u32,
    },
    Undefined,
}

impl From<u16> for ThumbModeInstruction {
    #[allow(clippy::too_many_lines)]
    fn from(op_code: u16) -> Self {
        use ThumbModeInstruction::{
            AddOffsetSP, AddSubtract, AluOp, CondBranch, HiRegisterOpBX, LoadAddress,
            LoadStoreHalfword, LoadStoreImmOffset, LoadStoreRegisterOffset,
            LoadStoreSignExtByteHalfword, LongBranchLink, MoveCompareAddSubtractImm,
            MoveShiftedRegister, MultipleLoadStore, PCRelativeLoad, PushPopReg,
            SPRelativeLoadStore, Swi, UncondBranch, Undefined,
        };

        let high_byte = op_code.get_bits(8..=15);

        if high_byte == 0b1101_1111 {
            Swi {
                comment: op_code.get_byte(0),
            }
        } else if op_code.get_bits(11..=15) == 0b11100 {
            let offset = u32::from(op_code.get_bits(0..=10)) << 1;
            UncondBranch {
                offset: offset.sign_extended(12) as i32,
            }
        } else if op_code.get_bits(12..=15) == 0b1101 {
            let condition = Condition::from(u32::from(op_code.get_bits(8..=11)));
            if condition == Condition::AL {
                return Undefined;
            }
            let offset = u32::from(op_code.get_bits(0..=7)) << 1;
            CondBranch {
                condition,
                immediate_offset: offset.sign_extended(9) as i32,
            }
        } else if op_code.get_bits(12..=15) == 0b1111 {
            LongBranchLink {
                h: op_code.get_bit(11),
                offset: u32::from(op_code.get_bits(0..=10)),
            }
        } else if op_code.get_bits(12..=15) == 0b1100 {
            MultipleLoadStore {
                load_store: op_code.get_bit(11).into(),
                base_register: op_code.get_bits(8..=10),
                register_list: op_code.get_bits(0..=7),
            }
        } else if high_byte & 0b1111_0110 == 0b1011_0100 {
            PushPopReg {
                load_store: op_code.get_bit(11).into(),
                pc_lr: op_code.get_bit(8),
                register_list: op_code.get_bits(0..=7),
            }
        } else if high_byte == 0b1011_0000 {
            AddOffsetSP {
                negative: op_code.get_bit(7),
                word7: op_code.get_bits(0..=6) << 2,
            }
        } else if op_code.get_bits(12..=15) == 0b1010 {
            LoadAddress {
                sp: op_code.get_bit(11),
                destination_register: op_code.get_bits(8..=10),
                offset: op_code.get_bits(0..=7) << 2,
            }
        } else if op_code.get_bits(12..=15) == 0b1001 {
            SPRelativeLoadStore {
                load_store: op_code.get_bit(11).into(),
                destination_register: op_code.get_bits(8..=10),
                word8: op_code.get_bits(0..=7) << 2,
            }
        } else if op_code.get_bits(12..=15) == 0b1000 {
            LoadStoreHalfword {
                load_store: op_code.get_bit(11).into(),
                offset: op_code.get_bits(6..=10) << 1,
                base_register: op_code.get_bits(3..=5),
                source_destination_register: op_code.get_bits(0..=2),
            }
        } else if op_code.get_bits(13..=15) == 0b011 {
            let byte_word = ReadWriteKind::from(op_code.get_bit(12));
            let offset = match byte_word {
                ReadWriteKind::Word => op_code.get_bits(6..=10) << 2,
                ReadWriteKind::Byte => op_code.get_bits(6..=10),
            };
            LoadStoreImmOffset {
                load_store: op_code.get_bit(11).into(),
                byte_word,
                offset,
                base_register: op_code.get_bits(3..=5),
                destination_register: op_code.get_bits(0..=2),
            }
        } else if op_code.get_bits(12..=15) == 0b0101 {
            if op_code.get_bit(9) {
                LoadStoreSignExtByteHalfword {
                    h: op_code.get_bit(11),
                    sign_extend_flag: op_code.get_bit(10),
                    offset_register: op_code.get_bits(6..=8),
                    base_register: op_code.get_bits(3..=5),
                    destination_register: op_code.get_bits(0..=2),
                }
            } else {
                LoadStoreRegisterOffset {
                    load_store: op_code.get_bit(11).into(),
                    byte_word: op_code.get_bit(10).into(),
                    ro: op_code.get_bits(6..=8),
                    base_register: op_code.get_bits(3..=5),
                    destination_register: op_code.get_bits(0..=2),
                }
            }
        } else if op_code.get_bits(11..=15) == 0b01001 {
            PCRelativeLoad {
                destination_register: op_code.get_bits(8..=10),
                immediate_value: op_code.get_bits(0..=7) << 2,
            }
        } else if op_code.get_bits(10..=15) == 0b01_0001 {
            let h1 = u16::from(op_code.get_bit(7)) << 3;
            HiRegisterOpBX {
                register_operation: op_code.get_bits(8..=9).into(),
                source_register: op_code.get_bits(3..=6),
                destination_register: op_code.get_bits(0..=2) | h1,
            }
        } else if op_code.get_bits(10..=15) == 0b01_0000 {
            AluOp {
                alu_operation: op_code.get_bits(6..=9).into(),
                source_register: op_code.get_bits(3..=5),
                destination_register: op_code.get_bits(0..=2),
            }
        } else if op_code.get_bits(13..=15) == 0b001 {
            MoveCompareAddSubtractImm {
                operation: op_code.get_bits(11..=12).into(),
                destination_register: op_code.get_bits(8..=10),
                offset: op_code.get_bits(0..=7).into(),
            }
        } else if op_code.get_bits(11..=15) == 0b00011 {
            AddSubtract {
                operation_kind: op_code.get_bit(10).into(),
                subtract: op_code.get_bit(9),
                rn_offset3: op_code.get_bits(6..=8),
                source_register: op_code.get_bits(3..=5),
                destination_register: op_code.get_bits(0..=2),
            }
        } else if op_code.get_bits(13..=15) == 0b000 {
            MoveShiftedRegister {
                shift_operation: op_code.get_bits(11..=12).into(),
                offset5: op_code.get_bits(6..=10),
                source_register: op_code.get_bits(3..=5),
                destination_register: op_code.get_bits(0..=2),
            }
        } else {
            Undefined
        }
    }
}

fn transfer_mnemonic(load_store: LoadStoreKind, byte_word: ReadWriteKind) -> &'static str {
    match (load_store, byte_word) {
        (LoadStoreKind::Load, ReadWriteKind::Byte) => "LDRB",
        (LoadStoreKind::Load, ReadWriteKind::Word) => "LDR",
        (LoadStoreKind::Store, ReadWriteKind::Byte) => "STRB",
        (LoadStoreKind::Store, ReadWriteKind::Word) => "STR",
    }
}

fn offset_string(offset: i32) -> String {
    if offset < 0 {
        format!("-0x{:X}", offset.unsigned_abs())
    } else {
        format!("+0x{offset:X}")
    }
}

impl ThumbModeInstruction {
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn disassembler(&self) -> String {
        match self {
            Self::MoveShiftedRegister {
                shift_operation,
                offset5,
                source_register,
                destination_register,
            } => format!("{shift_operation} R{destination_register}, R{source_register}, #{offset5}"),
            Self::AddSubtract {
                operation_kind,
                subtract,
                rn_offset3,
                source_register,
                destination_register,
            } => {
                let op = if *subtract { "SUB" } else { "ADD" };
                let operand = match operation_kind {
                    OperandKind::Immediate => format!("#{rn_offset3}"),
                    OperandKind::Register => format!("R{rn_offset3}"),
                };
                format!("{op} R{destination_register}, R{source_register}, {operand}")
            }
            Self::MoveCompareAddSubtractImm {
                operation,
                destination_register,
                offset,
            } => format!("{operation} R{destination_register}, #0x{offset:X}"),
            Self::AluOp {
                alu_operation,
                source_register,
                destination_register,
            } => format!("{alu_operation} R{destination_register}, R{source_register}"),
            Self::HiRegisterOpBX {
                register_operation: ThumbHighRegisterOperation::Bx,
                source_register,
                ..
            } => format!("BX R{source_register}"),
            Self::HiRegisterOpBX {
                register_operation,
                source_register,
                destination_register,
            } => format!("{register_operation} R{destination_register}, R{source_register}"),
            Self::PCRelativeLoad {
                destination_register,
                immediate_value,
            } => format!("LDR R{destination_register}, [PC, #0x{immediate_value:X}]"),
            Self::LoadStoreRegisterOffset {
                load_store,
                byte_word,
                ro,
                base_register,
                destination_register,
            } => format!(
                "{} R{destination_register}, [R{base_register}, R{ro}]",
                transfer_mnemonic(*load_store, *byte_word)
            ),
            Self::LoadStoreSignExtByteHalfword {
                h,
                sign_extend_flag,
                offset_register,
                base_register,
                destination_register,
            } => {
                let op = match (sign_extend_flag, h) {
                    (false, false) => "STRH",
                    (false, true) => "LDRH",
                    (true, false) => "LDSB",
                    (true, true) => "LDSH",
                };
                format!("{op} R{destination_register}, [R{base_register}, R{offset_register}]")
            }
            Self::LoadStoreImmOffset {
                load_store,
                byte_word,
                offset,
                base_register,
                destination_register,
            } => format!(
                "{} R{destination_register}, [R{base_register}, #0x{offset:X}]",
                transfer_mnemonic(*load_store, *byte_word)
            ),
            Self::LoadStoreHalfword {
                load_store,
                offset,
                base_register,
                source_destination_register,
            } => format!(
                "{load_store}H R{source_destination_register}, [R{base_register}, #0x{offset:X}]"
            ),
            Self::SPRelativeLoadStore {
                load_store,
                destination_register,
                word8,
            } => format!("{load_store} R{destination_register}, [SP, #0x{word8:X}]"),
            Self::LoadAddress {
                sp,
                destination_register,
                offset,
            } => {
                let source = if *sp { "SP" } else { "PC" };
                format!("ADD R{destination_register}, {source}, #0x{offset:X}")
            }
            Self::AddOffsetSP { negative, word7 } => {
                let op = if *negative { "SUB" } else { "ADD" };
                format!("{op} SP, #0x{word7:X}")
            }
            Self::PushPopReg {
                load_store,
                pc_lr,
                register_list,
            } => {
                let mut list = u32::from(*register_list);
                let op = match load_store {
                    LoadStoreKind::Load => {
                        list.set_bit(15, *pc_lr);
                        "POP"
                    }
                    LoadStoreKind::Store => {
                        list.set_bit(14, *pc_lr);
                        "PUSH"
                    }
                };
                format!("{op} {}", register_list_string(list))
            }
            Self::MultipleLoadStore {
                load_store,
                base_register,
                register_list,
            } => {
                let op = match load_store {
                    LoadStoreKind::Load => "LDMIA",
                    LoadStoreKind::Store => "STMIA",
                };
                format!(
                    "{op} R{base_register}!, {}",
                    register_list_string(u32::from(*register_list))
                )
            }
            Self::CondBranch {
                condition,
                immediate_offset,
            } => format!("B{condition} {}", offset_string(*immediate_offset)),
            Self::Swi { comment } => format!("SWI 0x{comment:02X}"),
            Self::UncondBranch { offset } => format!("B {}", offset_string(*offset)),
            Self::LongBranchLink { h: false, offset } => format!("BL (hi) 0x{offset:03X}"),
            Self::LongBranchLink { h: true, offset } => format!("BL (lo) 0x{offset:03X}"),
            Self::Undefined => "UNDEFINED".to_owned(),
        }
    }
}

impl fmt::Display for ThumbModeInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.disassembler())
    }
}
