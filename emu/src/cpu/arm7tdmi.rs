//! # ARM7TDMI interpreter
//!
//! One call to [`Arm7tdmi::step`] runs one instruction:
//!
//! ```text
//!  ┌──────────────┐   ┌───────┐   ┌────────┐   ┌───────────┐   ┌─────────┐
//!  │ exception    │──▶│ fetch │──▶│ decode │──▶│ condition │──▶│ execute │
//!  │ at boundary? │   └───────┘   └────────┘   └─────┬─────┘   └────┬────┘
//!  └──────────────┘                                  │ fails        │
//!                                                    ▼              ▼
//!                                         advance PC, fetch    advance PC or
//!                                         cost only            refill pipeline
//! ```
//!
//! The three stage pipeline is not modelled as stored opcodes. While an
//! instruction executes `PC` holds its own address; reading R15 as an
//! operand yields that address plus 8 (ARM) or 4 (Thumb) as the hardware
//! does. Any write to R15 flushes the pipeline, which costs one
//! non-sequential and one sequential fetch at the new address.

use crate::bus::{Bus, MemoryAccess, Width};
use crate::cpu::arm::mode::ArmModeOpcode;
use crate::cpu::cpu_modes::Mode;
use crate::cpu::exception::ExceptionKind;
use crate::cpu::hardware::system_control::PowerDownMode;
use crate::cpu::psr::{CpuState, Psr};
use crate::cpu::register_bank::{REG_LR, REG_PROGRAM_COUNTER, RegisterBank};
use crate::cpu::thumb::mode::ThumbModeOpcode;
use crate::error::InternalError;
use crate::scheduler::Scheduler;

/// What the next call to [`Arm7tdmi::step`] will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Running,

    /// Waiting for an enabled interrupt after a HALTCNT write.
    Halted,

    /// An exception is taken before the next fetch.
    ExceptionEntry,

    /// The host asked to regain control after every instruction.
    Stepping,
}

pub struct Arm7tdmi {
    pub bus: Bus,
    pub cpsr: Psr,
    pub registers: RegisterBank,

    pub(crate) halted: bool,
    pub(crate) stepping: bool,

    /// One bit per [`ExceptionKind`], raised by the host.
    pub(crate) pending: u8,

    pub(crate) next_fetch_access: MemoryAccess,
    pipeline_flushed: bool,

    /// Cycles spent by the instruction being executed.
    instruction_cycles: u32,
}

impl Default for Arm7tdmi {
    fn default() -> Self {
        Self::new(Bus::default())
    }
}

impl std::fmt::Debug for Arm7tdmi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arm7tdmi")
            .field("cpsr", &self.cpsr)
            .field("registers", &self.registers)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Arm7tdmi {
    #[must_use]
    pub fn new(bus: Bus) -> Self {
        let mut cpu = Self {
            bus,
            cpsr: Psr::default(),
            registers: RegisterBank::default(),
            halted: false,
            stepping: false,
            pending: 0,
            next_fetch_access: MemoryAccess::NonSequential,
            pipeline_flushed: false,
            instruction_cycles: 0,
        };
        cpu.reset();
        cpu
    }

    /// Power-on state: Supervisor mode, IRQ and FIQ masked, ARM state, PC at
    /// the reset vector. Registers are cleared.
    pub fn reset(&mut self) {
        self.registers = RegisterBank::default();
        let mut cpsr = Psr::from(Mode::Supervisor);
        cpsr.set_irq_disable(true);
        cpsr.set_fiq_disable(true);
        cpsr.set_cpu_state(CpuState::Arm);
        self.write_cpsr(cpsr);
        self.registers
            .set_program_counter(ExceptionKind::Reset.vector());

        self.halted = false;
        self.pending = 0;
        self.next_fetch_access = MemoryAccess::NonSequential;
        self.pipeline_flushed = false;
        self.instruction_cycles = 0;
    }

    #[must_use]
    pub fn state(&self) -> ExecutionState {
        if self.halted {
            ExecutionState::Halted
        } else if self.next_exception().is_some() {
            ExecutionState::ExceptionEntry
        } else if self.stepping {
            ExecutionState::Stepping
        } else {
            ExecutionState::Running
        }
    }

    pub const fn set_stepping(&mut self, stepping: bool) {
        self.stepping = stepping;
    }

    /// Raises `kind` at the next instruction boundary.
    pub fn request_exception(&mut self, kind: ExceptionKind) {
        tracing::debug!("{kind:?} requested");
        self.pending |= kind.pending_bit();
    }

    fn next_exception(&self) -> Option<ExceptionKind> {
        let irq_line = self.bus.interrupt_control().borrow().irq_line();
        ExceptionKind::BY_PRIORITY
            .into_iter()
            .find(|kind| match kind {
                ExceptionKind::Irq => {
                    (irq_line || self.pending & kind.pending_bit() != 0)
                        && !self.cpsr.irq_disable()
                }
                ExceptionKind::Fiq => {
                    self.pending & kind.pending_bit() != 0 && !self.cpsr.fiq_disable()
                }
                _ => self.pending & kind.pending_bit() != 0,
            })
    }

    /// Reads a register as an instruction operand: R15 is ahead by two
    /// instructions.
    #[must_use]
    pub fn read_register(&self, reg: usize) -> u32 {
        if reg == REG_PROGRAM_COUNTER {
            let size = self.cpsr.cpu_state().instruction_size();
            self.registers.program_counter().wrapping_add(2 * size)
        } else {
            self.registers.register_at(reg)
        }
    }

    /// Writes a register. Writing R15 branches.
    pub fn write_register(&mut self, reg: usize, value: u32) {
        if reg == REG_PROGRAM_COUNTER {
            self.registers.set_program_counter(value);
            self.pipeline_flushed = true;
        } else {
            self.registers.set_register_at(reg, value);
        }
    }

    /// Changes the mode bits and makes the mode's registers live.
    pub fn switch_mode(&mut self, mode: Mode) {
        self.cpsr.set_mode(mode);
        self.registers.select(mode.bank_index());
    }

    /// Replaces CPSR. Invalid mode bits fall back to Supervisor.
    pub fn write_cpsr(&mut self, psr: Psr) {
        let mode = psr.mode();
        let mut psr = psr;
        psr.set_mode(mode);
        self.cpsr = psr;
        self.registers.select(mode.bank_index());
    }

    /// `CPSR = SPSR_<mode>`, as done by `MOVS PC, LR` and `LDM {..., PC}^`.
    pub fn restore_cpsr_from_spsr(&mut self) {
        let mode = self.cpsr.mode();
        if mode.has_spsr() {
            let spsr = self.registers.spsr_of(mode.bank_index());
            self.write_cpsr(spsr);
        } else {
            tracing::debug!("no SPSR in {mode:?}, CPSR left unchanged");
        }
    }

    /// SPSR of the current mode. Modes without one see CPSR.
    #[must_use]
    pub fn spsr(&self) -> Psr {
        let mode = self.cpsr.mode();
        if mode.has_spsr() {
            self.registers.spsr_of(mode.bank_index())
        } else {
            self.cpsr
        }
    }

    /// Enters `kind` as if raised by the instruction at `instruction_address`.
    pub fn enter_exception(&mut self, kind: ExceptionKind, instruction_address: u32) {
        tracing::debug!(
            "entering {kind:?} from 0x{instruction_address:08X} in {:?}",
            self.cpsr.mode()
        );

        let target = kind.mode();
        if kind == ExceptionKind::Reset {
            self.switch_mode(target);
        } else {
            let return_address =
                instruction_address.wrapping_add(kind.return_offset(self.cpsr.cpu_state()));
            self.registers.set_spsr_of(target.bank_index(), self.cpsr);
            self.switch_mode(target);
            self.registers.set_register_at(REG_LR, return_address);
        }

        self.cpsr.set_cpu_state(CpuState::Arm);
        self.cpsr.set_irq_disable(true);
        if kind.disables_fiq() {
            self.cpsr.set_fiq_disable(true);
        }
        self.write_register(REG_PROGRAM_COUNTER, kind.vector());
    }

    /// Aligns PC to the current state and charges the two fetches that
    /// refill the pipeline.
    pub fn refill_pipeline(&mut self) {
        let (width, size) = match self.cpsr.cpu_state() {
            CpuState::Arm => (Width::Word, 4),
            CpuState::Thumb => (Width::HalfWord, 2),
        };
        let pc = width.align(self.registers.program_counter());
        self.registers.set_program_counter(pc);

        self.instruction_cycles += self
            .bus
            .access_cycles(pc, width, MemoryAccess::NonSequential)
            + self
                .bus
                .access_cycles(pc.wrapping_add(size), width, MemoryAccess::Sequential);
        self.next_fetch_access = MemoryAccess::Sequential;
        self.pipeline_flushed = false;
    }

    pub(crate) fn read_data(&mut self, address: u32, width: Width, access: MemoryAccess) -> u32 {
        let transfer = self.bus.read(address, width, access);
        self.instruction_cycles += transfer.cycles;
        self.next_fetch_access = MemoryAccess::NonSequential;
        transfer.value
    }

    pub(crate) fn write_data(
        &mut self,
        address: u32,
        width: Width,
        value: u32,
        access: MemoryAccess,
    ) {
        self.instruction_cycles += self.bus.write(address, width, value, access);
        self.next_fetch_access = MemoryAccess::NonSequential;
    }

    pub(crate) const fn internal_cycles(&mut self, cycles: u32) {
        self.instruction_cycles += cycles;
    }

    fn check_bank(&self) -> Result<(), InternalError> {
        let mode = self.cpsr.try_mode()?;
        let active = self.registers.active_bank();
        if active == mode.bank_index() {
            Ok(())
        } else {
            Err(InternalError::BankMismatch { mode, active })
        }
    }

    /// Runs one instruction (or one idle period while halted) and reports
    /// its cost to `scheduler`.
    pub fn step(&mut self, scheduler: &mut Scheduler) -> Result<u32, InternalError> {
        self.check_bank()?;
        self.instruction_cycles = 0;

        if self.halted {
            let wake = self.bus.interrupt_control().borrow().pending() || self.pending != 0;
            if !wake {
                let skipped = scheduler.idle_until_next_event(u32::MAX);
                if skipped == 0 {
                    scheduler.add_cycles(1)?;
                    return Ok(1);
                }
                return Ok(skipped);
            }
            tracing::debug!("leaving halt");
            self.halted = false;
        }

        if let Some(kind) = self.next_exception() {
            self.pending &= !kind.pending_bit();

            let state = self.cpsr.cpu_state();
            let pc = self.registers.program_counter();
            // The fetch at PC is discarded.
            let width = match state {
                CpuState::Arm => Width::Word,
                CpuState::Thumb => Width::HalfWord,
            };
            self.instruction_cycles += self.bus.access_cycles(pc, width, self.next_fetch_access);

            let instruction_address = match kind {
                ExceptionKind::Swi | ExceptionKind::Undefined => {
                    pc.wrapping_sub(state.instruction_size())
                }
                _ => pc,
            };
            self.enter_exception(kind, instruction_address);
            self.refill_pipeline();
        }

        let pc = self.registers.program_counter();
        let access = std::mem::replace(&mut self.next_fetch_access, MemoryAccess::Sequential);
        self.pipeline_flushed = false;

        let state = self.cpsr.cpu_state();
        match state {
            CpuState::Arm => {
                let fetched = self.bus.fetch(pc, Width::Word, access);
                self.instruction_cycles += fetched.cycles;

                let op = ArmModeOpcode::from(fetched.value);
                tracing::trace!("0x{pc:08X} {op}");
                if self.cpsr.can_execute(op.condition) {
                    self.execute_arm(op);
                }
            }
            CpuState::Thumb => {
                let fetched = self.bus.fetch(pc, Width::HalfWord, access);
                self.instruction_cycles += fetched.cycles;

                let op = ThumbModeOpcode::from(fetched.value as u16);
                tracing::trace!("0x{pc:08X} {op}");
                self.execute_thumb(op);
            }
        }

        if self.pipeline_flushed {
            self.refill_pipeline();
        } else {
            self.registers
                .advance_program_counter(state.instruction_size());
        }

        if let Some(mode) = self.bus.system_control().borrow_mut().take_power_down_request() {
            if mode == PowerDownMode::Stop {
                tracing::warn!("STOP mode is emulated as HALT");
            }
            self.halted = true;
        }

        scheduler.add_cycles(self.instruction_cycles)?;
        Ok(self.instruction_cycles)
    }
}
