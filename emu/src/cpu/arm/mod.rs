//! # ARM instruction set (32-bit)
//!
//! Every ARM instruction is conditional.
//!
//! ```text
//! 31-28   27-25   24-0
//! [Cond] [Class] [Instruction-specific]
//! ```
//!
//! | Bits 27-25 | Class                 | Examples               |
//! |------------|-----------------------|------------------------|
//! | 00x        | Data processing, PSR  | AND, ADD, MRS, MSR     |
//! | 000        | Multiply, swap, BX    | MUL, UMULL, SWP, BX    |
//! | 01x        | Single data transfer  | LDR, STRB              |
//! | 100        | Block data transfer   | LDMIA, STMDB           |
//! | 101        | Branch                | B, BL                  |
//! | 11x        | Coprocessor, SWI      | CDP, MCR, SWI          |
//!
//! Operand 2 of data processing goes through the barrel shifter: LSL, LSR,
//! ASR, ROR and RRX. A shift amount taken from a register costs one extra
//! internal cycle.
//!
//! - [`instructions`] decodes (`From<u32>`) and disassembles
//! - [`operations`] executes
//! - [`alu_instruction`] holds the ALU and the barrel shifter
//! - [`mode`] pairs a raw opcode with its decoded form

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
pub mod alu_instruction;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::similar_names)]
pub mod instructions;

pub mod mode;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
#[allow(clippy::similar_names)]
pub mod operations;
