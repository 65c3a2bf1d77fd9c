//! On-board memories.
//!
//! ```text
//! 0x00000000  BIOS    16KB              read only
//! 0x02000000  EWRAM   256KB  mirrored   16-bit bus, 2 wait states
//! 0x03000000  IWRAM   32KB   mirrored   32-bit bus
//! 0x05000000  PALRAM  1KB    mirrored   16-bit bus
//! 0x06000000  VRAM    96KB   128KB fold 16-bit bus
//! 0x07000000  OAM     1KB    mirrored   32-bit bus
//! ```
//!
//! Addresses given to this module are already aligned to the access width.

use serde::{Deserialize, Serialize};

use crate::bus::Width;
use crate::error::SaveStateError;

pub const BIOS_SIZE: usize = 0x4000;
pub const EWRAM_SIZE: usize = 0x4_0000;
pub const IWRAM_SIZE: usize = 0x8000;
pub const PALRAM_SIZE: usize = 0x400;
pub const VRAM_SIZE: usize = 0x1_8000;
pub const OAM_SIZE: usize = 0x400;

#[derive(Clone, Serialize, Deserialize)]
pub struct InternalMemory {
    /// Loaded from the host, never part of a snapshot.
    #[serde(skip)]
    bios: Vec<u8>,
    ewram: Vec<u8>,
    iwram: Vec<u8>,
    palram: Vec<u8>,
    vram: Vec<u8>,
    oam: Vec<u8>,
}

impl Default for InternalMemory {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl std::fmt::Debug for InternalMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalMemory")
            .field("bios", &self.bios.len())
            .finish_non_exhaustive()
    }
}

const fn vram_offset(address: u32) -> usize {
    let offset = (address & 0x1_FFFF) as usize;
    if offset >= 0x1_8000 {
        offset - 0x8000
    } else {
        offset
    }
}

fn load(memory: &[u8], offset: usize, width: Width) -> u32 {
    (0..width.bytes()).fold(0, |value, i| {
        value | (u32::from(memory.get(offset + i).copied().unwrap_or(0)) << (8 * i))
    })
}

fn store(memory: &mut [u8], offset: usize, width: Width, value: u32) {
    for i in 0..width.bytes() {
        if let Some(byte) = memory.get_mut(offset + i) {
            *byte = (value >> (8 * i)) as u8;
        }
    }
}

fn check_size(region: &'static str, memory: &[u8], expected: usize) -> Result<(), SaveStateError> {
    if memory.len() == expected {
        Ok(())
    } else {
        Err(SaveStateError::SizeMismatch {
            region,
            expected,
            found: memory.len(),
        })
    }
}

impl InternalMemory {
    /// A shorter BIOS image is padded with zeroes, a longer one truncated.
    #[must_use]
    pub fn new(bios: &[u8]) -> Self {
        let mut bios_system_rom = vec![0; BIOS_SIZE];
        let len = bios.len().min(BIOS_SIZE);
        bios_system_rom[..len].copy_from_slice(&bios[..len]);

        Self {
            bios: bios_system_rom,
            ewram: vec![0; EWRAM_SIZE],
            iwram: vec![0; IWRAM_SIZE],
            palram: vec![0; PALRAM_SIZE],
            vram: vec![0; VRAM_SIZE],
            oam: vec![0; OAM_SIZE],
        }
    }

    fn backing(&self, address: u32) -> Option<(&[u8], usize)> {
        match address >> 24 {
            0x00 if (address as usize) < BIOS_SIZE => Some((&self.bios, address as usize)),
            0x02 => Some((&self.ewram, (address & 0x3_FFFF) as usize)),
            0x03 => Some((&self.iwram, (address & 0x7FFF) as usize)),
            0x05 => Some((&self.palram, (address & 0x3FF) as usize)),
            0x06 => Some((&self.vram, vram_offset(address))),
            0x07 => Some((&self.oam, (address & 0x3FF) as usize)),
            _ => None,
        }
    }

    #[must_use]
    pub fn read(&self, address: u32, width: Width) -> u32 {
        self.backing(address)
            .map_or(0, |(memory, offset)| load(memory, offset, width))
    }

    pub fn write(&mut self, address: u32, width: Width, value: u32) {
        let (memory, offset, width, value) = match (address >> 24, width) {
            (0x00, _) => {
                tracing::debug!("write of 0x{value:X} to BIOS at 0x{address:08X} ignored");
                return;
            }
            (0x07, Width::Byte) => {
                tracing::debug!("byte write to OAM at 0x{address:08X} ignored");
                return;
            }
            // Byte writes land on both halves of the halfword.
            (0x05, Width::Byte) => (
                &mut self.palram,
                (address & 0x3FE) as usize,
                Width::HalfWord,
                (value & 0xFF) * 0x101,
            ),
            (0x06, Width::Byte) => (
                &mut self.vram,
                vram_offset(address & !1),
                Width::HalfWord,
                (value & 0xFF) * 0x101,
            ),
            (0x02, _) => (&mut self.ewram, (address & 0x3_FFFF) as usize, width, value),
            (0x03, _) => (&mut self.iwram, (address & 0x7FFF) as usize, width, value),
            (0x05, _) => (&mut self.palram, (address & 0x3FF) as usize, width, value),
            (0x06, _) => (&mut self.vram, vram_offset(address), width, value),
            (0x07, _) => (&mut self.oam, (address & 0x3FF) as usize, width, value),
            _ => return,
        };
        store(memory, offset, width, value);
    }

    /// Replaces the RAM contents with those of `snapshot`, keeping the BIOS.
    pub fn restore(&mut self, snapshot: Self) -> Result<(), SaveStateError> {
        check_size("EWRAM", &snapshot.ewram, EWRAM_SIZE)?;
        check_size("IWRAM", &snapshot.iwram, IWRAM_SIZE)?;
        check_size("PALRAM", &snapshot.palram, PALRAM_SIZE)?;
        check_size("VRAM", &snapshot.vram, VRAM_SIZE)?;
        check_size("OAM", &snapshot.oam, OAM_SIZE)?;

        self.ewram = snapshot.ewram;
        self.iwram = snapshot.iwram;
        self.palram = snapshot.palram;
        self.vram = snapshot.vram;
        self.oam = snapshot.oam;
        Ok(())
    }
}
