//! Interrupt controller registers.
//!
//! ```text
//! 0x200  IE   interrupt enable
//! 0x202  IF   interrupt request, writing 1 acknowledges
//! 0x208  IME  interrupt master enable (bit 0)
//! ```

use serde::{Deserialize, Serialize};

use crate::cpu::hardware::BusDevice;

/// Interrupt sources, by IE/IF bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank = 1 << 0,
    HBlank = 1 << 1,
    VCount = 1 << 2,
    Timer0 = 1 << 3,
    Timer1 = 1 << 4,
    Timer2 = 1 << 5,
    Timer3 = 1 << 6,
    Serial = 1 << 7,
    Dma0 = 1 << 8,
    Dma1 = 1 << 9,
    Dma2 = 1 << 10,
    Dma3 = 1 << 11,
    Keypad = 1 << 12,
    GamePak = 1 << 13,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptControl {
    pub interrupt_enable: u16,
    pub interrupt_request: u16,
    pub interrupt_master_enable: u16,
}

impl InterruptControl {
    /// Raises `interrupt` in IF. Peripherals call this.
    pub fn signal(&mut self, interrupt: Interrupt) {
        self.interrupt_request |= interrupt as u16;
    }

    /// An enabled interrupt is requested, regardless of IME.
    #[must_use]
    pub const fn pending(&self) -> bool {
        self.interrupt_enable & self.interrupt_request & 0x3FFF != 0
    }

    /// The IRQ input of the CPU.
    #[must_use]
    pub const fn irq_line(&self) -> bool {
        self.interrupt_master_enable & 1 != 0 && self.pending()
    }
}

impl BusDevice for InterruptControl {
    fn read_half(&self, offset: u32) -> u16 {
        match offset {
            0x200 => self.interrupt_enable,
            0x202 => self.interrupt_request,
            0x208 => self.interrupt_master_enable,
            _ => 0,
        }
    }

    fn write_half(&mut self, offset: u32, value: u16, mask: u16) {
        match offset {
            0x200 => {
                self.interrupt_enable = (self.interrupt_enable & !mask) | (value & mask & 0x3FFF);
            }
            0x202 => self.interrupt_request &= !(value & mask),
            0x208 => {
                self.interrupt_master_enable =
                    (self.interrupt_master_enable & !mask) | (value & mask & 1);
            }
            _ => {}
        }
    }
}
