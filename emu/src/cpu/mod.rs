//! The ARM7TDMI: decoders for both instruction sets, the register file and
//! the interpreter that drives them.

pub mod arm;

#[allow(clippy::cast_lossless)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::module_name_repetitions)]
pub mod arm7tdmi;
pub mod condition;
pub mod cpu_modes;
pub mod exception;

#[allow(clippy::cast_possible_truncation)]
pub mod flags;

#[allow(clippy::cast_possible_truncation)]
pub mod hardware;
pub mod psr;
pub mod register_bank;
pub mod thumb;
