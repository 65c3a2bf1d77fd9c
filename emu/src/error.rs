//! Fatal errors of the emulator core.
//!
//! Everything the emulated program can trigger (undefined instructions,
//! software interrupts, IRQs) goes through the exception entry of the CPU
//! and never shows up here. An [`InternalError`] means the core itself
//! reached a state it should never be in.

use thiserror::Error;

use crate::cpu::cpu_modes::{BankIndex, Mode};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InternalError {
    /// The live register bank does not belong to the mode stored in CPSR.
    #[error("register bank {active:?} is live but CPSR mode is {mode:?}")]
    BankMismatch { mode: Mode, active: BankIndex },

    #[error("invalid mode bits 0b{0:05b}")]
    InvalidMode(u32),

    /// A peripheral tried to claim I/O addresses that already have an owner.
    #[error("I/O range 0x{start:08X}..=0x{end:08X} overlaps an already mapped device")]
    RegionOverlap { start: u32, end: u32 },

    #[error("I/O range 0x{start:08X}..=0x{end:08X} is outside the I/O window")]
    RegionOutsideIo { start: u32, end: u32 },

    #[error("cycle counter overflowed")]
    CycleOverflow,
}

/// Errors while restoring a save state.
#[derive(Debug, Error)]
pub enum SaveStateError {
    #[error("malformed save state: {0}")]
    Json(#[from] serde_json::Error),

    #[error("save state version {found} is not supported (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("save state {region} is {found} bytes long, expected {expected}")]
    SizeMismatch {
        region: &'static str,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Internal(#[from] InternalError),
}
