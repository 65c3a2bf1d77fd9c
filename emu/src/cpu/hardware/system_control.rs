//! System control registers: WAITCNT, POSTFLG and HALTCNT.
//!
//! WAITCNT (0x204) selects the cartridge access timings:
//!
//! ```text
//! bits 0-1   SRAM           N and S: 4,3,2,8
//! bits 2-3   WS0 first      N: 4,3,2,8
//! bit  4     WS0 second     S: 2,1
//! bits 5-6   WS1 first      N: 4,3,2,8
//! bit  7     WS1 second     S: 4,1
//! bits 8-9   WS2 first      N: 4,3,2,8
//! bit  10    WS2 second     S: 8,1
//! bit  14    prefetch buffer enable
//! bit  15    cartridge type, read only
//! ```
//!
//! The values are wait states; every access costs one cycle more.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::hardware::BusDevice;

const NON_SEQUENTIAL_WAIT: [u32; 4] = [4, 3, 2, 8];
const SEQUENTIAL_WAIT: [[u32; 2]; 3] = [[2, 1], [4, 1], [8, 1]];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerDownMode {
    Halt,
    Stop,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemControl {
    pub wait_state_control: u16,
    pub post_boot_flag: u8,
    power_down_request: Option<PowerDownMode>,
}

impl SystemControl {
    /// Access cost of an 8-bit SRAM access.
    #[must_use]
    pub fn sram_cycles(&self) -> u32 {
        1 + NON_SEQUENTIAL_WAIT[usize::from(self.wait_state_control.get_bits(0..=1))]
    }

    /// Cost of a non-sequential 16-bit access to wait state region `ws` (0..=2).
    #[must_use]
    pub fn gamepak_non_sequential_cycles(&self, ws: usize) -> u32 {
        let first_bit = 2 + 3 * ws as u8;
        let select = self.wait_state_control.get_bits(first_bit..=first_bit + 1);
        1 + NON_SEQUENTIAL_WAIT[usize::from(select)]
    }

    /// Cost of a sequential 16-bit access to wait state region `ws` (0..=2).
    #[must_use]
    pub fn gamepak_sequential_cycles(&self, ws: usize) -> u32 {
        let select = self.wait_state_control.get_bit(4 + 3 * ws as u8);
        1 + SEQUENTIAL_WAIT[ws][usize::from(select)]
    }

    /// Returns and clears the pending HALTCNT write.
    pub fn take_power_down_request(&mut self) -> Option<PowerDownMode> {
        self.power_down_request.take()
    }
}

impl BusDevice for SystemControl {
    fn read_half(&self, offset: u32) -> u16 {
        match offset {
            0x204 => self.wait_state_control,
            // HALTCNT is write only.
            0x300 => u16::from(self.post_boot_flag),
            _ => 0,
        }
    }

    fn write_half(&mut self, offset: u32, value: u16, mask: u16) {
        match offset {
            0x204 => {
                let mask = mask & 0x7FFF;
                self.wait_state_control = (self.wait_state_control & !mask) | (value & mask);
            }
            0x300 => {
                if mask & 0x00FF != 0 {
                    self.post_boot_flag = (value & 1) as u8;
                }
                if mask & 0xFF00 != 0 {
                    let mode = if value.get_bit(15) {
                        PowerDownMode::Stop
                    } else {
                        PowerDownMode::Halt
                    };
                    tracing::debug!("HALTCNT write, entering {mode:?}");
                    self.power_down_request = Some(mode);
                }
            }
            _ => {}
        }
    }
}
