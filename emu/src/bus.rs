//! # System bus
//!
//! Routes every CPU access to the region selected by the top byte of the
//! address and reports how many cycles the access took.
//!
//! ```text
//! ┌──────┬───────────┬────────────────────┬──────────────┬──────────┐
//! │ Id   │ Region    │ Backing            │ 8/16-bit     │ 32-bit   │
//! ├──────┼───────────┼────────────────────┼──────────────┼──────────┤
//! │ 0x00 │ BIOS      │ InternalMemory     │ 1            │ 1        │
//! │ 0x02 │ EWRAM     │ InternalMemory     │ 3            │ 6        │
//! │ 0x03 │ IWRAM     │ InternalMemory     │ 1            │ 1        │
//! │ 0x04 │ I/O       │ BusDevice map      │ 1            │ 1        │
//! │ 0x05 │ PALRAM    │ InternalMemory     │ 1            │ 2        │
//! │ 0x06 │ VRAM      │ InternalMemory     │ 1            │ 2        │
//! │ 0x07 │ OAM       │ InternalMemory     │ 1            │ 1        │
//! │ 0x08 │ ROM WS0   │ GamePak            │ N or S       │ N+S, S+S │
//! │ 0x0A │ ROM WS1   │ GamePak            │ N or S       │ N+S, S+S │
//! │ 0x0C │ ROM WS2   │ GamePak            │ N or S       │ N+S, S+S │
//! │ 0x0E │ SRAM      │ GamePak backup     │ WAITCNT      │ WAITCNT  │
//! └──────┴───────────┴────────────────────┴──────────────┴──────────┘
//! ```
//!
//! Anything else is open bus: reads return the last fetched opcode and
//! writes are dropped.
//!
//! Misaligned reads are rotated the way the hardware returns them, writes
//! are forced to the aligned address.

use std::cell::RefCell;
use std::ops::RangeInclusive;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::cpu::hardware::BusDevice;
use crate::cpu::hardware::gamepak::GamePak;
use crate::cpu::hardware::internal_memory::{BIOS_SIZE, InternalMemory};
use crate::cpu::hardware::interrupt_control::InterruptControl;
use crate::cpu::hardware::system_control::SystemControl;
use crate::error::InternalError;

/// Size of the I/O register window at 0x04000000.
pub const IO_WINDOW_SIZE: u32 = 0x400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Width {
    Byte,
    HalfWord,
    Word,
}

impl Width {
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::HalfWord => 2,
            Self::Word => 4,
        }
    }

    #[must_use]
    pub const fn align(self, address: u32) -> u32 {
        match self {
            Self::Byte => address,
            Self::HalfWord => address & !1,
            Self::Word => address & !3,
        }
    }
}

/// Whether an access directly follows the previous one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryAccess {
    #[default]
    NonSequential,
    Sequential,
}

/// Result of a read: the value and the cycles it cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub value: u32,
    pub cycles: u32,
}

/// Values latched on the bus by instruction fetches.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusLatches {
    /// Returned by open bus reads.
    pub last_fetched: u32,

    /// Returned by BIOS reads while executing outside of it.
    pub last_bios_opcode: u32,

    pub executing_bios: bool,
}

struct MappedDevice {
    start: u32,
    end: u32,
    device: Rc<RefCell<dyn BusDevice>>,
}

pub struct Bus {
    pub(crate) memory: InternalMemory,
    gamepak: GamePak,
    interrupt_control: Rc<RefCell<InterruptControl>>,
    system_control: Rc<RefCell<SystemControl>>,
    devices: Vec<MappedDevice>,
    pub(crate) latches: BusLatches,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(&[], GamePak::default())
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("memory", &self.memory)
            .field("gamepak", &self.gamepak)
            .field("devices", &self.devices.len())
            .field("latches", &self.latches)
            .finish_non_exhaustive()
    }
}

/// Picks the lanes of `word` an aligned `width` access at `address` sees.
const fn lanes(word: u32, address: u32, width: Width) -> u32 {
    match width {
        Width::Byte => (word >> ((address & 3) * 8)) & 0xFF,
        Width::HalfWord => (word >> ((address & 2) * 8)) & 0xFFFF,
        Width::Word => word,
    }
}

impl Bus {
    #[must_use]
    pub fn new(bios: &[u8], gamepak: GamePak) -> Self {
        let interrupt_control = Rc::new(RefCell::new(InterruptControl::default()));
        let system_control = Rc::new(RefCell::new(SystemControl::default()));

        let mut devices: Vec<MappedDevice> = Vec::new();
        for (start, end) in [(0x200, 0x203), (0x208, 0x20B)] {
            devices.push(MappedDevice {
                start,
                end,
                device: interrupt_control.clone(),
            });
        }
        for (start, end) in [(0x204, 0x207), (0x300, 0x303)] {
            devices.push(MappedDevice {
                start,
                end,
                device: system_control.clone(),
            });
        }

        Self {
            memory: InternalMemory::new(bios),
            gamepak,
            interrupt_control,
            system_control,
            devices,
            latches: BusLatches::default(),
        }
    }

    #[must_use]
    pub fn interrupt_control(&self) -> Rc<RefCell<InterruptControl>> {
        Rc::clone(&self.interrupt_control)
    }

    #[must_use]
    pub fn system_control(&self) -> Rc<RefCell<SystemControl>> {
        Rc::clone(&self.system_control)
    }

    /// Maps `device` on the I/O offsets `range` (relative to 0x04000000).
    pub fn register_device(
        &mut self,
        range: RangeInclusive<u32>,
        device: Rc<RefCell<dyn BusDevice>>,
    ) -> Result<(), InternalError> {
        let (start, end) = (*range.start(), *range.end());
        if start > end || end >= IO_WINDOW_SIZE {
            return Err(InternalError::RegionOutsideIo { start, end });
        }
        if self
            .devices
            .iter()
            .any(|mapped| mapped.start <= end && start <= mapped.end)
        {
            return Err(InternalError::RegionOverlap { start, end });
        }

        tracing::debug!("mapped I/O device on 0x{start:03X}..=0x{end:03X}");
        self.devices.push(MappedDevice { start, end, device });
        Ok(())
    }

    fn device_index(&self, offset: u32) -> Option<usize> {
        self.devices
            .iter()
            .position(|mapped| (mapped.start..=mapped.end).contains(&offset))
    }

    /// Cycles taken by an access, without performing it.
    #[must_use]
    pub fn access_cycles(&self, address: u32, width: Width, access: MemoryAccess) -> u32 {
        let is_word = width == Width::Word;
        match address >> 24 {
            0x02 => {
                if is_word {
                    6
                } else {
                    3
                }
            }
            0x05 | 0x06 => {
                if is_word {
                    2
                } else {
                    1
                }
            }
            region @ 0x08..=0x0D => {
                let ws = ((region - 0x08) / 2) as usize;
                let system_control = self.system_control.borrow();
                let sequential = system_control.gamepak_sequential_cycles(ws);
                // Crossing a 128KB page always restarts a non-sequential burst.
                let first = if access == MemoryAccess::Sequential && address & 0x1_FFFF != 0 {
                    sequential
                } else {
                    system_control.gamepak_non_sequential_cycles(ws)
                };
                if is_word { first + sequential } else { first }
            }
            0x0E | 0x0F => self.system_control.borrow().sram_cycles(),
            _ => 1,
        }
    }

    fn open_bus(&self, address: u32, width: Width) -> u32 {
        lanes(self.latches.last_fetched, address, width)
    }

    fn io_read(&self, offset: u32, width: Width) -> u32 {
        if width == Width::Word {
            let low = self.device_index(offset);
            if low.is_some() && low == self.device_index(offset + 2) {
                return low.map_or(0, |i| self.devices[i].device.borrow().read(offset, width));
            }
            return self.io_read(offset, Width::HalfWord)
                | (self.io_read(offset + 2, Width::HalfWord) << 16);
        }

        match self.device_index(offset) {
            Some(i) => self.devices[i].device.borrow().read(offset, width),
            None => {
                tracing::debug!("read from unmapped I/O register 0x{:08X}", 0x0400_0000 | offset);
                self.open_bus(offset, width)
            }
        }
    }

    fn io_write(&mut self, offset: u32, width: Width, value: u32) {
        if width == Width::Word {
            let low = self.device_index(offset);
            if low.is_some() && low == self.device_index(offset + 2) {
                if let Some(i) = low {
                    self.devices[i].device.borrow_mut().write(offset, width, value);
                }
                return;
            }
            self.io_write(offset, Width::HalfWord, value & 0xFFFF);
            self.io_write(offset + 2, Width::HalfWord, value >> 16);
            return;
        }

        match self.device_index(offset) {
            Some(i) => self.devices[i].device.borrow_mut().write(offset, width, value),
            None => tracing::debug!(
                "write of 0x{value:X} to unmapped I/O register 0x{:08X} ignored",
                0x0400_0000 | offset
            ),
        }
    }

    /// `address` is aligned to `width`.
    fn read_aligned(&self, address: u32, width: Width) -> u32 {
        match address >> 24 {
            0x00 if (address as usize) < BIOS_SIZE => {
                if self.latches.executing_bios {
                    self.memory.read(address, width)
                } else {
                    tracing::debug!("BIOS read at 0x{address:08X} from outside the BIOS");
                    lanes(self.latches.last_bios_opcode, address, width)
                }
            }
            0x02 | 0x03 | 0x05..=0x07 => self.memory.read(address, width),
            0x04 if address & 0x00FF_FFFF < IO_WINDOW_SIZE => {
                self.io_read(address & (IO_WINDOW_SIZE - 1), width)
            }
            0x08..=0x0D => self.gamepak.read_rom(address, width),
            _ => {
                tracing::debug!("open bus read at 0x{address:08X}");
                self.open_bus(address, width)
            }
        }
    }

    fn write_aligned(&mut self, address: u32, width: Width, value: u32) {
        match address >> 24 {
            0x00 | 0x02 | 0x03 | 0x05..=0x07 => self.memory.write(address, width, value),
            0x04 if address & 0x00FF_FFFF < IO_WINDOW_SIZE => {
                self.io_write(address & (IO_WINDOW_SIZE - 1), width, value);
            }
            0x08..=0x0D => {
                tracing::debug!("write of 0x{value:X} to ROM at 0x{address:08X} ignored");
            }
            _ => tracing::debug!("write of 0x{value:X} to unmapped 0x{address:08X} ignored"),
        }
    }

    /// Data read. Misaligned words are rotated by `(address & 3) * 8`,
    /// misaligned halfwords by 8.
    pub fn read(&mut self, address: u32, width: Width, access: MemoryAccess) -> Transfer {
        let cycles = self.access_cycles(address, width, access);

        let value = if matches!(address >> 24, 0x0E | 0x0F) {
            self.gamepak.read_backup(address, width)
        } else {
            let raw = self.read_aligned(width.align(address), width);
            match width {
                Width::Word => raw.rotate_right((address & 3) * 8),
                Width::HalfWord if address & 1 == 1 => raw.rotate_right(8),
                Width::HalfWord | Width::Byte => raw,
            }
        };

        Transfer { value, cycles }
    }

    /// Data write. Returns the cycles taken.
    pub fn write(&mut self, address: u32, width: Width, value: u32, access: MemoryAccess) -> u32 {
        let cycles = self.access_cycles(address, width, access);

        if matches!(address >> 24, 0x0E | 0x0F) {
            self.gamepak.write_backup(address, width, value);
        } else {
            self.write_aligned(width.align(address), width, value);
        }

        cycles
    }

    /// Instruction fetch. Latches the opcode for open bus and BIOS reads.
    pub fn fetch(&mut self, address: u32, width: Width, access: MemoryAccess) -> Transfer {
        let address = width.align(address);
        self.latches.executing_bios = (address as usize) < BIOS_SIZE;

        let cycles = self.access_cycles(address, width, access);
        let value = self.read_aligned(address, width);

        let latched = match width {
            Width::HalfWord => value | (value << 16),
            Width::Byte | Width::Word => value,
        };
        self.latches.last_fetched = latched;
        if self.latches.executing_bios {
            self.latches.last_bios_opcode = latched;
        }

        Transfer { value, cycles }
    }
}
