//! Snapshot of the whole machine as a flat, versioned JSON document.
//!
//! The BIOS image, the cartridge ROM and its backup medium are loaded from
//! the host and are not part of a snapshot: restoring one requires a machine
//! built from the same images.

use serde::{Deserialize, Serialize};

use crate::bus::{BusLatches, MemoryAccess};
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::hardware::internal_memory::InternalMemory;
use crate::cpu::hardware::interrupt_control::InterruptControl;
use crate::cpu::hardware::system_control::SystemControl;
use crate::cpu::psr::Psr;
use crate::cpu::register_bank::RegisterBank;
use crate::error::{InternalError, SaveStateError};
use crate::scheduler::Scheduler;

pub const SAVE_STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,

    pub cpsr: Psr,
    pub registers: RegisterBank,
    pub halted: bool,
    pub stepping: bool,
    pub pending_exceptions: u8,
    pub next_fetch_access: MemoryAccess,

    pub memory: InternalMemory,
    pub latches: BusLatches,
    pub system_control: SystemControl,
    pub interrupt_control: InterruptControl,

    pub scheduler: Scheduler,
}

/// Only the version is read first, so that an old snapshot is reported as
/// such instead of as malformed.
#[derive(Deserialize)]
struct Header {
    version: u32,
}

impl SaveState {
    #[must_use]
    pub fn capture(cpu: &Arm7tdmi, scheduler: &Scheduler) -> Self {
        Self {
            version: SAVE_STATE_VERSION,
            cpsr: cpu.cpsr,
            registers: cpu.registers.clone(),
            halted: cpu.halted,
            stepping: cpu.stepping,
            pending_exceptions: cpu.pending,
            next_fetch_access: cpu.next_fetch_access,
            memory: cpu.bus.memory.clone(),
            latches: cpu.bus.latches,
            system_control: cpu.bus.system_control().borrow().clone(),
            interrupt_control: cpu.bus.interrupt_control().borrow().clone(),
            scheduler: scheduler.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, SaveStateError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SaveStateError> {
        let header: Header = serde_json::from_str(json)?;
        if header.version != SAVE_STATE_VERSION {
            return Err(SaveStateError::VersionMismatch {
                expected: SAVE_STATE_VERSION,
                found: header.version,
            });
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Overwrites the machine with this snapshot. Nothing is touched when
    /// the snapshot is rejected.
    pub fn restore(
        self,
        cpu: &mut Arm7tdmi,
        scheduler: &mut Scheduler,
    ) -> Result<(), SaveStateError> {
        let mode = self.cpsr.try_mode()?;
        let active = self.registers.active_bank();
        if mode.bank_index() != active {
            return Err(InternalError::BankMismatch { mode, active }.into());
        }
        cpu.bus.memory.restore(self.memory)?;

        cpu.cpsr = self.cpsr;
        cpu.registers = self.registers;
        cpu.halted = self.halted;
        cpu.stepping = self.stepping;
        cpu.pending = self.pending_exceptions;
        cpu.next_fetch_access = self.next_fetch_access;

        cpu.bus.latches = self.latches;
        *cpu.bus.system_control().borrow_mut() = self.system_control;
        *cpu.bus.interrupt_control().borrow_mut() = self.interrupt_control;

        *scheduler = self.scheduler;

        tracing::debug!("save state restored at cycle {}", scheduler.cycles());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Width;
    use crate::cpu::cpu_modes::Mode;
    use pretty_assertions::assert_eq;

    #[test]
    fn version_mismatch_is_rejected() {
        let mut state = SaveState::capture(&Arm7tdmi::default(), &Scheduler::default());
        state.version = 0;
        let json = state.to_json().unwrap();

        assert!(matches!(
            SaveState::from_json(&json),
            Err(SaveStateError::VersionMismatch {
                expected: SAVE_STATE_VERSION,
                found: 0
            })
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            SaveState::from_json("{\"version\": 1}"),
            Err(SaveStateError::Json(_))
        ));
        assert!(matches!(
            SaveState::from_json("not json"),
            Err(SaveStateError::Json(_))
        ));
    }

    #[test]
    fn inconsistent_bank_is_rejected() {
        let mut state = SaveState::capture(&Arm7tdmi::default(), &Scheduler::default());
        state.cpsr.set_mode(Mode::Fiq);

        let mut cpu = Arm7tdmi::default();
        let mut scheduler = Scheduler::default();
        assert!(matches!(
            state.restore(&mut cpu, &mut scheduler),
            Err(SaveStateError::Internal(InternalError::BankMismatch { .. }))
        ));
    }

    #[test]
    fn restore_brings_back_memory_and_registers() {
        let mut cpu = Arm7tdmi::default();
        let mut scheduler = Scheduler::default();
        cpu.registers.set_register_at(3, 0x1234);
        cpu.bus
            .write(0x0200_0000, Width::Word, 0xABCD_EF01, MemoryAccess::NonSequential);
        cpu.bus.system_control().borrow_mut().wait_state_control = 0x4317;
        scheduler.add_cycles(77).unwrap();

        let json = SaveState::capture(&cpu, &scheduler).to_json().unwrap();

        let mut other = Arm7tdmi::default();
        let mut other_scheduler = Scheduler::default();
        SaveState::from_json(&json)
            .unwrap()
            .restore(&mut other, &mut other_scheduler)
            .unwrap();

        assert_eq!(other.registers, cpu.registers);
        assert_eq!(other.cpsr, cpu.cpsr);
        assert_eq!(other_scheduler.cycles(), 77);
        assert_eq!(
            other
                .bus
                .read(0x0200_0000, Width::Word, MemoryAccess::NonSequential)
                .value,
            0xABCD_EF01
        );
        assert_eq!(
            other.bus.system_control().borrow().wait_state_control,
            0x4317
        );
    }
}
