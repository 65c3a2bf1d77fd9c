//! # Thumb instruction set (16-bit)
//!
//! Thumb is a compressed encoding of a subset of ARM. Only the conditional
//! branch carries a condition, most formats only reach R0-R7, and every
//! operation executes through the same ALU, shifter and load/store helpers
//! as its ARM counterpart.
//!
//! - [`instruction`] decodes (`From<u16>`) and disassembles
//! - [`operations`] executes
//! - [`alu_instructions`] holds the format 3, 4 and 5 operation enums

pub mod alu_instructions;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
pub mod instruction;
pub mod mode;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
pub mod operations;
