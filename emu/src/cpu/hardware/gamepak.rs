//! Cartridge: ROM in the three wait state regions and the backup medium.
//!
//! ```text
//! 0x08000000-0x09FFFFFF  ROM, wait state 0
//! 0x0A000000-0x0BFFFFFF  ROM, wait state 1
//! 0x0C000000-0x0DFFFFFF  ROM, wait state 2
//! 0x0E000000-0x0E00FFFF  backup (SRAM), 8-bit bus, mirrored up to 0x0FFFFFFF
//! ```

use crate::bitwise::Bits;
use crate::bus::Width;

pub const ROM_MIRROR_MASK: u32 = 0x01FF_FFFF;
pub const SRAM_SIZE: usize = 0x1_0000;

/// Save medium on the 8-bit cartridge bus.
///
/// Detecting which kind a cartridge carries and persisting it to the host is
/// up to the front-end; the bus only needs byte access.
pub trait CartridgeBackup {
    fn read_byte(&self, offset: u32) -> u8;
    fn write_byte(&mut self, offset: u32, value: u8);
}

/// Plain battery backed SRAM.
#[derive(Debug, Clone)]
pub struct Sram {
    data: Vec<u8>,
}

impl Default for Sram {
    fn default() -> Self {
        Self {
            data: vec![0xFF; SRAM_SIZE],
        }
    }
}

impl CartridgeBackup for Sram {
    fn read_byte(&self, offset: u32) -> u8 {
        self.data
            .get(offset as usize % SRAM_SIZE)
            .copied()
            .unwrap_or(0xFF)
    }

    fn write_byte(&mut self, offset: u32, value: u8) {
        if let Some(byte) = self.data.get_mut(offset as usize % SRAM_SIZE) {
            *byte = value;
        }
    }
}

pub struct GamePak {
    rom: Vec<u8>,
    backup: Box<dyn CartridgeBackup>,
}

impl Default for GamePak {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl std::fmt::Debug for GamePak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GamePak")
            .field("rom", &self.rom.len())
            .finish_non_exhaustive()
    }
}

impl GamePak {
    #[must_use]
    pub fn new(rom: Vec<u8>) -> Self {
        Self::with_backup(rom, Box::new(Sram::default()))
    }

    #[must_use]
    pub fn with_backup(rom: Vec<u8>, backup: Box<dyn CartridgeBackup>) -> Self {
        Self { rom, backup }
    }

    fn rom_byte(&self, offset: usize) -> u8 {
        self.rom.get(offset).copied().unwrap_or_else(|| {
            // Nothing drives the data lines past the end of the ROM, so they
            // still hold the low 16 bits of the halfword address.
            (((offset >> 1) & 0xFFFF) as u16).get_byte((offset & 1) as u8)
        })
    }

    /// `address` is aligned to `width`.
    #[must_use]
    pub fn read_rom(&self, address: u32, width: Width) -> u32 {
        let offset = (address & ROM_MIRROR_MASK) as usize;
        (0..width.bytes()).fold(0, |value, i| {
            value | (u32::from(self.rom_byte(offset + i)) << (8 * i))
        })
    }

    /// The backup is 8 bits wide: wider reads see the byte repeated.
    #[must_use]
    pub fn read_backup(&self, address: u32, width: Width) -> u32 {
        let byte = u32::from(self.backup.read_byte(address & 0xFFFF));
        match width {
            Width::Byte => byte,
            Width::HalfWord => byte * 0x0101,
            Width::Word => byte * 0x0101_0101,
        }
    }

    /// Stores the byte of `value` selected by the low bits of the unaligned
    /// `address`.
    pub fn write_backup(&mut self, address: u32, width: Width, value: u32) {
        let lane = match width {
            Width::Byte => 0,
            Width::HalfWord => address & 1,
            Width::Word => address & 3,
        };
        self.backup
            .write_byte(address & 0xFFFF, (value >> (lane * 8)) as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_rom() {
        let pak = GamePak::new(vec![1, 2, 3, 4]);
        assert_eq!(pak.read_rom(0x0800_0000, Width::Byte), 1);
        assert_eq!(pak.read_rom(0x0A00_0000, Width::Word), 0x0403_0201);
        assert_eq!(pak.read_rom(0x0C00_0002, Width::HalfWord), 0x0403);
    }

    #[test]
    fn test_read_past_rom_end() {
        let pak = GamePak::new(vec![1, 2, 3, 4]);
        assert_eq!(pak.read_rom(0x09FF_FFFF, Width::Byte), 0xFF);
        assert_eq!(pak.read_rom(0x09FF_FFEE, Width::Byte), 0xF7);
        assert_eq!(pak.read_rom(0x09FF_FFEF, Width::Byte), 0xFF);
        assert_eq!(pak.read_rom(0x0800_0100, Width::Word), 0x0081_0080);
    }

    #[test]
    fn test_backup_is_byte_wide() {
        let mut pak = GamePak::default();
        pak.write_backup(0x0E00_0002, Width::Word, 0x4433_2211);
        assert_eq!(pak.read_backup(0x0E00_0002, Width::Byte), 0x33);
        assert_eq!(pak.read_backup(0x0E00_0002, Width::Word), 0x3333_3333);

        pak.write_backup(0x0E00_0005, Width::HalfWord, 0xBBAA);
        assert_eq!(pak.read_backup(0x0E01_0005, Width::HalfWord), 0xBBBB);
    }

    #[test]
    fn test_fresh_sram_reads_erased() {
        let pak = GamePak::default();
        assert_eq!(pak.read_backup(0x0E00_1234, Width::Byte), 0xFF);
    }
}
