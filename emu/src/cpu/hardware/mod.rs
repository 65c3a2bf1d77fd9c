//! # Memory and I/O devices
//!
//! Everything the [`Bus`](crate::bus::Bus) routes accesses to: the on-board
//! memories, the cartridge and the peripherals living in the I/O window
//! (`0x04000000..=0x040003FF`).
//!
//! Peripherals implement [`BusDevice`]. They are registered on the bus for an
//! offset range inside the I/O window and see offsets relative to its base.
//! Registers on this hardware are 16 bits wide, so a device only has to
//! answer halfword accesses; byte and word accesses are built on top.

use crate::bitwise::Bits;
use crate::bus::Width;

pub mod gamepak;

#[allow(clippy::cast_possible_truncation)]
pub mod internal_memory;
pub mod interrupt_control;
pub mod system_control;

pub trait BusDevice {
    /// Reads the halfword register at `offset` (always even).
    fn read_half(&self, offset: u32) -> u16;

    /// Writes the bits of `value` selected by `mask` into the halfword
    /// register at `offset` (always even).
    fn write_half(&mut self, offset: u32, value: u16, mask: u16);

    fn read(&self, offset: u32, width: Width) -> u32 {
        match width {
            Width::Byte => {
                u32::from(self.read_half(offset & !1).get_byte((offset & 1) as u8))
            }
            Width::HalfWord => u32::from(self.read_half(offset & !1)),
            Width::Word => {
                let base = offset & !3;
                u32::from(self.read_half(base)) | (u32::from(self.read_half(base + 2)) << 16)
            }
        }
    }

    fn write(&mut self, offset: u32, width: Width, value: u32) {
        match width {
            Width::Byte => {
                let shift = (offset & 1) * 8;
                let byte = (value & 0xFF) as u16;
                self.write_half(offset & !1, byte << shift, 0xFF << shift);
            }
            Width::HalfWord => self.write_half(offset & !1, value as u16, 0xFFFF),
            Width::Word => {
                let base = offset & !3;
                self.write_half(base, value as u16, 0xFFFF);
                self.write_half(base + 2, (value >> 16) as u16, 0xFFFF);
            }
        }
    }
}
