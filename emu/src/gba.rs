use std::cell::RefCell;
use std::ops::RangeInclusive;
use std::rc::Rc;

use crate::{
    bus::{Bus, MemoryAccess, Width},
    cpu::{
        arm7tdmi::Arm7tdmi,
        cpu_modes::{BankIndex, Mode},
        hardware::{BusDevice, gamepak::GamePak},
        psr::CpuState,
    },
    error::{InternalError, SaveStateError},
    savestate::SaveState,
    scheduler::Scheduler,
};

/// Entry point of the cartridge image.
pub const ROM_ENTRY_POINT: u32 = 0x0800_0000;

const STACK_USER: u32 = 0x0300_7F00;
const STACK_IRQ: u32 = 0x0300_7FA0;
const STACK_SUPERVISOR: u32 = 0x0300_7FE0;

const ARM_IDLE_LOOP: u32 = 0xEAFF_FFFE;
const THUMB_IDLE_LOOP: u32 = 0xE7FE;

pub struct Gba {
    pub cpu: Arm7tdmi,
    pub scheduler: Scheduler,
}

impl Default for Gba {
    fn default() -> Self {
        Self::new(&[], Vec::new())
    }
}

impl Gba {
    #[must_use]
    pub fn new(bios: &[u8], rom: Vec<u8>) -> Self {
        let bus = Bus::new(bios, GamePak::new(rom));

        Self {
            cpu: Arm7tdmi::new(bus),
            scheduler: Scheduler::default(),
        }
    }

    /// Leaves the machine the way the BIOS boot code hands it over to the
    /// cartridge: stacks set up, System mode, PC at the ROM entry point.
    pub fn skip_bios(&mut self) {
        let registers = &mut self.cpu.registers;
        for bank in [
            BankIndex::User,
            BankIndex::Fiq,
            BankIndex::Abort,
            BankIndex::Undefined,
        ] {
            registers.set_stack_pointer_of(bank, STACK_USER);
        }
        registers.set_stack_pointer_of(BankIndex::Irq, STACK_IRQ);
        registers.set_stack_pointer_of(BankIndex::Supervisor, STACK_SUPERVISOR);

        self.cpu.switch_mode(Mode::System);
        self.cpu.registers.set_program_counter(ROM_ENTRY_POINT);
        self.cpu.refill_pipeline();
        tracing::info!("BIOS skipped, starting at 0x{ROM_ENTRY_POINT:08X}");
    }

    pub fn register_device(
        &mut self,
        range: RangeInclusive<u32>,
        device: Rc<RefCell<dyn BusDevice>>,
    ) -> Result<(), InternalError> {
        self.cpu.bus.register_device(range, device)
    }

    pub fn step(&mut self) -> Result<u32, InternalError> {
        self.cpu.step(&mut self.scheduler)
    }

    /// Steps until at least `cycles` cycles went by. Returns the cycles
    /// actually run, which may overshoot by the last instruction.
    pub fn run_for(&mut self, cycles: u64) -> Result<u64, InternalError> {
        let start = self.scheduler.cycles();
        let target = start.saturating_add(cycles);

        while self.scheduler.cycles() < target {
            self.step()?;
            if self.cpu.stepping {
                break;
            }
        }
        Ok(self.scheduler.cycles() - start)
    }

    /// Steps until the program parks itself, either on a branch to itself or
    /// by halting, or until `max_cycles` went by. Returns whether it parked.
    pub fn run_until_idle(&mut self, max_cycles: u64) -> Result<bool, InternalError> {
        let target = self.scheduler.cycles().saturating_add(max_cycles);

        loop {
            if self.is_idle() {
                tracing::debug!(
                    "idle at 0x{:08X} after {} cycles",
                    self.cpu.registers.program_counter(),
                    self.scheduler.cycles()
                );
                return Ok(true);
            }
            if self.scheduler.cycles() >= target {
                return Ok(false);
            }
            self.step()?;
            if self.cpu.stepping {
                return Ok(self.is_idle());
            }
        }
    }

    /// The next instruction branches to itself, or the CPU is halted.
    pub fn is_idle(&mut self) -> bool {
        if self.cpu.halted {
            return true;
        }

        let pc = self.cpu.registers.program_counter();
        let (width, idle_loop) = match self.cpu.cpsr.cpu_state() {
            CpuState::Arm => (Width::Word, ARM_IDLE_LOOP),
            CpuState::Thumb => (Width::HalfWord, THUMB_IDLE_LOOP),
        };
        self.cpu
            .bus
            .read(pc, width, MemoryAccess::NonSequential)
            .value
            == idle_loop
    }

    pub fn save_state(&self) -> Result<String, SaveStateError> {
        SaveState::capture(&self.cpu, &self.scheduler).to_json()
    }

    pub fn load_state(&mut self, json: &str) -> Result<(), SaveStateError> {
        SaveState::from_json(json)?.restore(&mut self.cpu, &mut self.scheduler)
    }
}
