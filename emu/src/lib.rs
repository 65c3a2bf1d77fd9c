#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
mod bitwise;

#[allow(clippy::missing_panics_doc)]
#[allow(clippy::cast_lossless)]
#[allow(clippy::large_stack_frames)]
#[allow(clippy::unreadable_literal)]
pub mod bus;
pub mod cpu;
pub mod error;
#[allow(clippy::missing_errors_doc)]
pub mod gba;
#[allow(clippy::missing_errors_doc)]
pub mod savestate;
pub mod scheduler;
