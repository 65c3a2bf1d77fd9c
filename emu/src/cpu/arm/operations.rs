//! ARM state execution.
//!
//! The helpers that Thumb instructions reduce to (ALU, block transfers,
//! multiply timing) live here too and are `pub(crate)`.

use crate::bitwise::Bits;
use crate::bus::{MemoryAccess, Width};
use crate::cpu::arm::alu_instruction::{
    AluSecondOperandInfo, ArithmeticOpResult, ArmModeAluInstr, PsrKind, PsrOpKind, ShiftOperator,
    add_inner_op, shift, shift_immediate, sub_inner_op,
};
use crate::cpu::arm::instructions::{
    ArmModeInstruction, ArmModeMultiplyLongVariant, ArmModeMultiplyVariant,
    SingleDataTransferOffsetInfo,
};
use crate::cpu::arm::mode::ArmModeOpcode;
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::exception::ExceptionKind;
use crate::cpu::flags::{
    HalfwordDataTransferOffsetKind, HalfwordTransferKind, Indexing, LoadStoreKind, Offsetting,
    ReadWriteKind,
};
use crate::cpu::psr::{CpuState, PSR_CONTROL_MASK, PSR_FLAGS_MASK};
use crate::cpu::register_bank::{REG_LR, REG_PROGRAM_COUNTER};

/// Internal cycles of a multiply by `rs`: one per significant byte.
///
/// The multiplier stops early once the remaining upper bytes are all zero,
/// or all one for signed multiplies.
#[must_use]
pub(crate) fn multiply_cycles(rs: u32, signed: bool) -> u32 {
    (1..4)
        .find(|bytes| {
            let upper = rs >> (8 * bytes);
            upper == 0 || (signed && ((rs as i32) >> (8 * bytes)) == -1)
        })
        .unwrap_or(4)
}

const fn offset_address(base: u32, offset: u32, offsetting: Offsetting) -> u32 {
    match offsetting {
        Offsetting::Up => base.wrapping_add(offset),
        Offsetting::Down => base.wrapping_sub(offset),
    }
}

/// Post-indexed transfers always write the base back.
const fn writes_back(indexing: Indexing, write_back: bool) -> bool {
    matches!(indexing, Indexing::Post) || write_back
}

impl Arm7tdmi {
    pub(crate) fn execute_arm(&mut self, op_code: ArmModeOpcode) {
        match op_code.instruction {
            ArmModeInstruction::DataProcessing {
                alu_instruction,
                set_conditions,
                op_kind: _,
                rn,
                destination,
                op2,
            } => self.data_processing(alu_instruction, set_conditions, rn, destination, op2),
            ArmModeInstruction::Multiply {
                variant,
                should_set_codes,
                rd_destination_register,
                rn_accumulate_register,
                rs_operand_register,
                rm_operand_register,
            } => self.multiply(
                variant,
                should_set_codes,
                rd_destination_register as usize,
                rn_accumulate_register as usize,
                rs_operand_register as usize,
                rm_operand_register as usize,
            ),
            ArmModeInstruction::MultiplyLong {
                variant,
                should_set_codes,
                rdhi_destination_register,
                rdlo_destination_register,
                rs_operand_register,
                rm_operand_register,
            } => self.multiply_long(
                variant,
                should_set_codes,
                rdhi_destination_register as usize,
                rdlo_destination_register as usize,
                rs_operand_register as usize,
                rm_operand_register as usize,
            ),
            ArmModeInstruction::PSRTransfer { psr_kind, kind } => {
                self.psr_transfer(psr_kind, kind);
            }
            ArmModeInstruction::SingleDataSwap { byte, rn, rd, rm } => {
                self.single_data_swap(byte, rn as usize, rd as usize, rm as usize);
            }
            ArmModeInstruction::BranchAndExchange { register } => {
                self.branch_and_exchange(register as usize);
            }
            ArmModeInstruction::HalfwordDataTransfer {
                indexing,
                offsetting,
                write_back,
                load_store_kind,
                offset_kind,
                base_register,
                source_destination_register,
                transfer_kind,
            } => {
                let offset = match offset_kind {
                    HalfwordDataTransferOffsetKind::Immediate { offset } => offset,
                    HalfwordDataTransferOffsetKind::Register { register } => {
                        self.read_register(register as usize)
                    }
                };
                self.halfword_data_transfer(
                    indexing,
                    offsetting,
                    writes_back(indexing, write_back),
                    load_store_kind,
                    offset,
                    base_register as usize,
                    source_destination_register as usize,
                    transfer_kind,
                );
            }
            ArmModeInstruction::SingleDataTransfer {
                kind,
                quantity,
                write_back,
                indexing,
                rd,
                base_register,
                offset_info,
                offsetting,
            } => {
                let offset = match offset_info {
                    SingleDataTransferOffsetInfo::Immediate { offset } => offset,
                    SingleDataTransferOffsetInfo::RegisterImmediate {
                        shift_amount,
                        shift_kind,
                        reg_offset,
                    } => {
                        let rm = self.read_register(reg_offset as usize);
                        let carry = self.cpsr.carry_flag();
                        shift_immediate(shift_kind, shift_amount, rm, carry).result
                    }
                };
                self.single_data_transfer(
                    kind,
                    quantity,
                    writes_back(indexing, write_back),
                    indexing,
                    rd as usize,
                    base_register as usize,
                    offset,
                    offsetting,
                );
            }
            ArmModeInstruction::BlockDataTransfer {
                indexing,
                offsetting,
                load_psr,
                write_back,
                load_store,
                rn,
                register_list,
            } => self.block_data_transfer(
                indexing,
                offsetting,
                load_psr,
                write_back,
                load_store,
                rn as usize,
                register_list,
            ),
            ArmModeInstruction::Branch { link, offset } => self.branch(link, offset),
            ArmModeInstruction::CoprocessorDataTransfer { cp_number, .. }
            | ArmModeInstruction::CoprocessorDataOperation { cp_number }
            | ArmModeInstruction::CoprocessorRegisterTransfer { cp_number, .. } => {
                tracing::debug!("no coprocessor {cp_number}: {op_code}");
                self.undefined_instruction();
            }
            ArmModeInstruction::SoftwareInterrupt { comment } => {
                tracing::debug!("SWI 0x{comment:06X}");
                self.software_interrupt();
            }
            ArmModeInstruction::Undefined => {
                tracing::debug!("undefined instruction {op_code}");
                self.undefined_instruction();
            }
        }
    }

    pub(crate) fn undefined_instruction(&mut self) {
        let pc = self.registers.program_counter();
        self.enter_exception(ExceptionKind::Undefined, pc);
    }

    pub(crate) fn software_interrupt(&mut self) {
        let pc = self.registers.program_counter();
        self.enter_exception(ExceptionKind::Swi, pc);
    }

    /// Second operand through the barrel shifter, with the shifter carry out.
    fn alu_second_operand(&mut self, op2: AluSecondOperandInfo) -> (u32, bool) {
        let carry = self.cpsr.carry_flag();
        match op2 {
            AluSecondOperandInfo::Immediate { base, shift } => {
                let value = base.rotate_right(shift);
                if shift == 0 {
                    (value, carry)
                } else {
                    (value, value.get_bit(31))
                }
            }
            AluSecondOperandInfo::Register {
                shift_op: ShiftOperator::Immediate(amount),
                shift_kind,
                register,
            } => {
                let rm = self.read_register(register as usize);
                let shifted = shift_immediate(shift_kind, amount, rm, carry);
                (shifted.result, shifted.carry)
            }
            AluSecondOperandInfo::Register {
                shift_op: ShiftOperator::Register(rs),
                shift_kind,
                register,
            } => {
                // The shift amount is read in an extra cycle, by then PC has
                // moved one more word.
                self.internal_cycles(1);
                let rm = self.shift_by_register_operand(register as usize);
                let amount = self.read_register(rs as usize) & 0xFF;
                let shifted = shift(shift_kind, amount, rm, carry);
                (shifted.result, shifted.carry)
            }
        }
    }

    fn shift_by_register_operand(&self, reg: usize) -> u32 {
        let value = self.read_register(reg);
        if reg == REG_PROGRAM_COUNTER {
            value.wrapping_add(4)
        } else {
            value
        }
    }

    fn data_processing(
        &mut self,
        alu_instruction: ArmModeAluInstr,
        set_conditions: bool,
        rn: u32,
        destination: u32,
        op2: AluSecondOperandInfo,
    ) {
        let rn = rn as usize;
        let op1 = match op2 {
            AluSecondOperandInfo::Register {
                shift_op: ShiftOperator::Register(_),
                ..
            } => self.shift_by_register_operand(rn),
            _ => self.read_register(rn),
        };
        let (op2, shifter_carry) = self.alu_second_operand(op2);

        self.alu_operation(
            alu_instruction,
            set_conditions,
            destination as usize,
            op1,
            op2,
            shifter_carry,
        );
    }

    /// Performs `alu_instruction` and writes back its result and flags.
    ///
    /// With S set and `rd` = R15 the flags are not touched: CPSR is restored
    /// from the SPSR instead (exception return).
    pub(crate) fn alu_operation(
        &mut self,
        alu_instruction: ArmModeAluInstr,
        set_conditions: bool,
        rd: usize,
        op1: u32,
        op2: u32,
        shifter_carry: bool,
    ) {
        use ArmModeAluInstr::{
            Adc, Add, And, Bic, Cmn, Cmp, Eor, Mov, Mvn, Orr, Rsb, Rsc, Sbc, Sub, Teq, Tst,
        };

        let carry_in = self.cpsr.carry_flag();
        let overflow = self.cpsr.overflow_flag();
        let logical = |result: u32| ArithmeticOpResult {
            result,
            carry: shifter_carry,
            overflow,
            sign: result.get_bit(31),
            zero: result == 0,
        };

        let result = match alu_instruction {
            And | Tst => logical(op1 & op2),
            Eor | Teq => logical(op1 ^ op2),
            Orr => logical(op1 | op2),
            Bic => logical(op1 & !op2),
            Mov => logical(op2),
            Mvn => logical(!op2),
            Sub | Cmp => sub_inner_op(op1, op2, true),
            Rsb => sub_inner_op(op2, op1, true),
            Sbc => sub_inner_op(op1, op2, carry_in),
            Rsc => sub_inner_op(op2, op1, carry_in),
            Add | Cmn => add_inner_op(op1, op2, false),
            Adc => add_inner_op(op1, op2, carry_in),
        };

        let is_test = alu_instruction.is_test();
        if !is_test {
            self.write_register(rd, result.result);
        }

        if set_conditions {
            if rd == REG_PROGRAM_COUNTER && !is_test {
                self.restore_cpsr_from_spsr();
            } else {
                self.cpsr.set_flags(&result);
            }
        }
    }

    fn multiply(
        &mut self,
        variant: ArmModeMultiplyVariant,
        set_conditions: bool,
        rd: usize,
        rn: usize,
        rs: usize,
        rm: usize,
    ) {
        let rs_value = self.read_register(rs);
        let mut result = self.read_register(rm).wrapping_mul(rs_value);
        let mut cycles = multiply_cycles(rs_value, true);
        if variant == ArmModeMultiplyVariant::Mla {
            result = result.wrapping_add(self.read_register(rn));
            cycles += 1;
        }
        self.internal_cycles(cycles);

        self.write_register(rd, result);
        if set_conditions {
            self.cpsr.set_sign_and_zero(result);
        }
    }

    fn multiply_long(
        &mut self,
        variant: ArmModeMultiplyLongVariant,
        set_conditions: bool,
        rd_hi: usize,
        rd_lo: usize,
        rs: usize,
        rm: usize,
    ) {
        let rs_value = self.read_register(rs);
        let rm_value = self.read_register(rm);
        let mut result = if variant.is_signed() {
            (i64::from(rm_value as i32) * i64::from(rs_value as i32)) as u64
        } else {
            u64::from(rm_value) * u64::from(rs_value)
        };

        let mut cycles = multiply_cycles(rs_value, variant.is_signed()) + 1;
        if variant.accumulates() {
            let accumulator =
                (u64::from(self.read_register(rd_hi)) << 32) | u64::from(self.read_register(rd_lo));
            result = result.wrapping_add(accumulator);
            cycles += 1;
        }
        self.internal_cycles(cycles);

        self.write_register(rd_lo, result as u32);
        self.write_register(rd_hi, (result >> 32) as u32);
        if set_conditions {
            self.cpsr.set_sign_flag(result.get_bit(63));
            self.cpsr.set_zero_flag(result == 0);
        }
    }

    fn psr_transfer(&mut self, psr_kind: PsrKind, kind: PsrOpKind) {
        let mode = self.cpsr.mode();
        match kind {
            PsrOpKind::Mrs {
                destination_register,
            } => {
                let psr = match psr_kind {
                    PsrKind::Cpsr => self.cpsr,
                    PsrKind::Spsr => self.spsr(),
                };
                self.write_register(destination_register as usize, psr.into());
            }
            PsrOpKind::Msr {
                operand,
                field_mask,
            } => {
                let value = match operand {
                    AluSecondOperandInfo::Immediate { base, shift } => base.rotate_right(shift),
                    AluSecondOperandInfo::Register { register, .. } => {
                        self.read_register(register as usize)
                    }
                };
                // User mode can only reach the condition flags.
                let mask = if mode.is_privileged() {
                    field_mask
                } else {
                    field_mask & PSR_FLAGS_MASK
                };

                match psr_kind {
                    PsrKind::Cpsr => {
                        if mask & PSR_CONTROL_MASK != 0 && value.get_bit(5) != self.cpsr.state_bit()
                        {
                            tracing::warn!("MSR cannot change the T bit, value 0x{value:08X}");
                        }
                        let cpsr = self.cpsr.with_masked(value, mask & !(1 << 5));
                        self.write_cpsr(cpsr);
                    }
                    PsrKind::Spsr if mode.has_spsr() => {
                        let bank = mode.bank_index();
                        let spsr = self.registers.spsr_of(bank).with_masked(value, mask);
                        self.registers.set_spsr_of(bank, spsr);
                    }
                    PsrKind::Spsr => {
                        tracing::debug!("MSR to SPSR in {mode:?} ignored");
                    }
                }
            }
        }
    }

    fn single_data_swap(&mut self, byte: bool, rn: usize, rd: usize, rm: usize) {
        let width = if byte { Width::Byte } else { Width::Word };
        let address = self.read_register(rn);

        let old = self.read_data(address, width, MemoryAccess::NonSequential);
        let value = self.read_register(rm);
        self.write_data(address, width, value, MemoryAccess::NonSequential);
        self.internal_cycles(1);

        self.write_register(rd, old);
    }

    fn branch_and_exchange(&mut self, register: usize) {
        let target = self.read_register(register);
        let state = if target.get_bit(0) {
            CpuState::Thumb
        } else {
            CpuState::Arm
        };
        self.cpsr.set_cpu_state(state);
        self.write_register(REG_PROGRAM_COUNTER, target & !1);
    }

    fn branch(&mut self, link: bool, offset: i32) {
        if link {
            let return_address = self.registers.program_counter().wrapping_add(4);
            self.write_register(REG_LR, return_address);
        }
        let target = self
            .read_register(REG_PROGRAM_COUNTER)
            .wrapping_add_signed(offset);
        self.write_register(REG_PROGRAM_COUNTER, target);
    }

    /// Value stored for `rd` by STR/STRH/STM: R15 is one word further
    /// ahead than as an ALU operand.
    pub(crate) fn store_value(&self, rd: usize) -> u32 {
        let value = self.read_register(rd);
        if rd == REG_PROGRAM_COUNTER {
            value.wrapping_add(4)
        } else {
            value
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn single_data_transfer(
        &mut self,
        kind: LoadStoreKind,
        quantity: ReadWriteKind,
        write_back: bool,
        indexing: Indexing,
        rd: usize,
        base_register: usize,
        offset: u32,
        offsetting: Offsetting,
    ) {
        let base = self.read_register(base_register);
        let offset_address = offset_address(base, offset, offsetting);
        let address = match indexing {
            Indexing::Pre => offset_address,
            Indexing::Post => base,
        };
        let width = match quantity {
            ReadWriteKind::Word => Width::Word,
            ReadWriteKind::Byte => Width::Byte,
        };

        match kind {
            LoadStoreKind::Load => {
                let value = self.read_data(address, width, MemoryAccess::NonSequential);
                self.internal_cycles(1);
                // Rd wins when it is also the base.
                if write_back {
                    self.write_register(base_register, offset_address);
                }
                self.write_register(rd, value);
            }
            LoadStoreKind::Store => {
                let value = self.store_value(rd);
                self.write_data(address, width, value, MemoryAccess::NonSequential);
                if write_back {
                    self.write_register(base_register, offset_address);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn halfword_data_transfer(
        &mut self,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        load_store_kind: LoadStoreKind,
        offset: u32,
        base_register: usize,
        rd: usize,
        transfer_kind: HalfwordTransferKind,
    ) {
        let base = self.read_register(base_register);
        let offset_address = offset_address(base, offset, offsetting);
        let address = match indexing {
            Indexing::Pre => offset_address,
            Indexing::Post => base,
        };

        match load_store_kind {
            LoadStoreKind::Load => {
                let value = match transfer_kind {
                    HalfwordTransferKind::UnsignedHalfwords => {
                        self.read_data(address, Width::HalfWord, MemoryAccess::NonSequential)
                    }
                    HalfwordTransferKind::SignedByte => self
                        .read_data(address, Width::Byte, MemoryAccess::NonSequential)
                        .sign_extended(8),
                    // A misaligned LDRSH only reads the addressed byte.
                    HalfwordTransferKind::SignedHalfwords if address.get_bit(0) => self
                        .read_data(address, Width::Byte, MemoryAccess::NonSequential)
                        .sign_extended(8),
                    HalfwordTransferKind::SignedHalfwords => self
                        .read_data(address, Width::HalfWord, MemoryAccess::NonSequential)
                        .sign_extended(16),
                };
                self.internal_cycles(1);
                if write_back {
                    self.write_register(base_register, offset_address);
                }
                self.write_register(rd, value);
            }
            LoadStoreKind::Store => {
                let value = self.store_value(rd);
                self.write_data(address, Width::HalfWord, value, MemoryAccess::NonSequential);
                if write_back {
                    self.write_register(base_register, offset_address);
                }
            }
        }
    }

    /// LDM/STM, also used by Thumb PUSH, POP, LDMIA and STMIA.
    ///
    /// Registers are always transferred lowest first to the lowest address,
    /// so decrementing modes start from the bottom of the block.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn block_data_transfer(
        &mut self,
        indexing: Indexing,
        offsetting: Offsetting,
        load_psr: bool,
        write_back: bool,
        load_store: LoadStoreKind,
        rn: usize,
        register_list: u32,
    ) {
        let base = self.read_register(rn);

        // An empty list transfers R15 but moves the base as if all sixteen
        // registers were transferred.
        let (register_list, block_size) = if register_list & 0xFFFF == 0 {
            (1 << REG_PROGRAM_COUNTER, 0x40)
        } else {
            let list = register_list & 0xFFFF;
            (list, list.count_ones() * 4)
        };

        let (start, new_base) = match offsetting {
            Offsetting::Up => (base, base.wrapping_add(block_size)),
            Offsetting::Down => {
                let lowest = base.wrapping_sub(block_size);
                (lowest, lowest)
            }
        };
        let increment_before = matches!(
            (indexing, offsetting),
            (Indexing::Pre, Offsetting::Up) | (Indexing::Post, Offsetting::Down)
        );

        let loads_pc = load_store == LoadStoreKind::Load && register_list.get_bit(15);
        let user_bank = load_psr && !loads_pc;

        if write_back && load_store == LoadStoreKind::Load {
            self.write_register(rn, new_base);
        }

        let mut address = start & !3;
        let mut access = MemoryAccess::NonSequential;
        let registers = (0..16).filter(|reg| register_list.get_bit(*reg as u8));
        for (i, reg) in registers.enumerate() {
            if increment_before {
                address = address.wrapping_add(4);
            }

            match load_store {
                LoadStoreKind::Load => {
                    let value = self.read_data(address, Width::Word, access);
                    if user_bank {
                        self.registers.set_user_register_at(reg, value);
                    } else {
                        self.write_register(reg, value);
                    }
                }
                LoadStoreKind::Store => {
                    let value = if user_bank && reg != REG_PROGRAM_COUNTER {
                        self.registers.user_register_at(reg)
                    } else {
                        self.store_value(reg)
                    };
                    self.write_data(address, Width::Word, value, access);
                    // The base is updated after the first store: only a base
                    // listed first is stored unchanged.
                    if i == 0 && write_back {
                        self.write_register(rn, new_base);
                    }
                }
            }

            if !increment_before {
                address = address.wrapping_add(4);
            }
            access = MemoryAccess::Sequential;
        }

        if load_store == LoadStoreKind::Load {
            self.internal_cycles(1);
            if load_psr && loads_pc {
                self.restore_cpsr_from_spsr();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::cpu_modes::Mode;
    use crate::cpu::register_bank::REG_SP;
    use pretty_assertions::assert_eq;

    const IWRAM: u32 = 0x0300_0000;

    fn cpu_at(pc: u32) -> Arm7tdmi {
        let mut cpu = Arm7tdmi::default();
        cpu.switch_mode(Mode::System);
        cpu.registers.set_program_counter(pc);
        cpu
    }

    fn execute(cpu: &mut Arm7tdmi, raw: u32) {
        cpu.execute_arm(ArmModeOpcode::from(raw));
    }

    fn read_word(cpu: &mut Arm7tdmi, address: u32) -> u32 {
        cpu.bus
            .read(address, Width::Word, MemoryAccess::NonSequential)
            .value
    }

    fn write_word(cpu: &mut Arm7tdmi, address: u32, value: u32) {
        cpu.bus
            .write(address, Width::Word, value, MemoryAccess::NonSequential);
    }

    #[test]
    fn multiply_cycles_by_significant_bytes() {
        assert_eq!(multiply_cycles(0x0000_00FF, false), 1);
        assert_eq!(multiply_cycles(0x0000_FF00, false), 2);
        assert_eq!(multiply_cycles(0x00FF_0000, false), 3);
        assert_eq!(multiply_cycles(0xFF00_0000, false), 4);
        assert_eq!(multiply_cycles(0xFFFF_FFFF, false), 4);
        assert_eq!(multiply_cycles(0xFFFF_FFFF, true), 1);
        assert_eq!(multiply_cycles(0xFFFF_8000, true), 2);
    }

    #[test]
    fn check_adds() {
        let mut cpu = cpu_at(IWRAM);
        cpu.registers.set_register_at(1, 0xFFFF_FFFF);
        cpu.registers.set_register_at(2, 1);

        // ADDS R0, R1, R2
        execute(&mut cpu, 0xE091_0002);
        assert_eq!(cpu.registers.register_at(0), 0);
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());
        assert!(!cpu.cpsr.overflow_flag());
        assert!(!cpu.cpsr.sign_flag());
    }

    #[test]
    fn check_subs_borrow() {
        let mut cpu = cpu_at(IWRAM);

        // SUBS R0, R1, #1 with R1 = 0
        execute(&mut cpu, 0xE251_0001);
        assert_eq!(cpu.registers.register_at(0), 0xFFFF_FFFF);
        assert!(cpu.cpsr.sign_flag());
        assert!(!cpu.cpsr.carry_flag());
        assert!(!cpu.cpsr.zero_flag());
    }

    #[test]
    fn check_logical_keeps_overflow_and_takes_shifter_carry() {
        let mut cpu = cpu_at(IWRAM);
        cpu.cpsr.set_overflow_flag(true);
        cpu.registers.set_register_at(1, 0x8000_0001);

        // MOVS R0, R1, LSR #1
        execute(&mut cpu, 0xE1B0_00A1);
        assert_eq!(cpu.registers.register_at(0), 0x4000_0000);
        assert!(cpu.cpsr.carry_flag());
        assert!(cpu.cpsr.overflow_flag());

        // TST R0, #0 leaves R0 and sets Z
        execute(&mut cpu, 0xE310_0000);
        assert_eq!(cpu.registers.register_at(0), 0x4000_0000);
        assert!(cpu.cpsr.zero_flag());
    }

    #[test]
    fn check_rotated_immediate_carry() {
        let mut cpu = cpu_at(IWRAM);

        // MOVS R0, #0x80000000 (0x02 ror 2)
        execute(&mut cpu, 0xE3B0_0102);
        assert_eq!(cpu.registers.register_at(0), 0x8000_0000);
        assert!(cpu.cpsr.carry_flag());
        assert!(cpu.cpsr.sign_flag());
    }

    #[test]
    fn check_pc_operand_with_register_shift() {
        let mut cpu = cpu_at(IWRAM);
        cpu.registers.set_register_at(1, 1);
        cpu.registers.set_register_at(2, 2);

        // ADD R0, PC, R1, LSL R2
        execute(&mut cpu, 0xE08F_0211);
        assert_eq!(cpu.registers.register_at(0), IWRAM + 12 + 4);
    }

    #[test]
    fn check_movs_pc_lr_returns_from_exception() {
        let mut cpu = cpu_at(IWRAM);
        cpu.switch_mode(Mode::User);
        cpu.cpsr.set_cpu_state(CpuState::Thumb);
        let user_cpsr = cpu.cpsr;
        cpu.enter_exception(ExceptionKind::Swi, 0x0800_0000);
        assert_eq!(cpu.cpsr.mode(), Mode::Supervisor);

        // MOVS PC, LR
        execute(&mut cpu, 0xE1B0_F00E);
        assert_eq!(cpu.cpsr, user_cpsr);
        assert_eq!(cpu.registers.program_counter(), 0x0800_0002);
    }

    #[test]
    fn check_mul_and_long_multiplies() {
        let mut cpu = cpu_at(IWRAM);
        cpu.registers.set_register_at(1, 7);
        cpu.registers.set_register_at(2, 6);

        // MUL R0, R1, R2
        execute(&mut cpu, 0xE000_0291);
        assert_eq!(cpu.registers.register_at(0), 42);

        cpu.registers.set_register_at(2, 0xFFFF_FFFF);
        cpu.registers.set_register_at(3, 2);
        // UMULL R0, R1, R2, R3
        execute(&mut cpu, 0xE081_0392);
        assert_eq!(cpu.registers.register_at(0), 0xFFFF_FFFE);
        assert_eq!(cpu.registers.register_at(1), 1);

        // SMULL R0, R1, R2, R3: -1 * 2
        execute(&mut cpu, 0xE0C1_0392);
        assert_eq!(cpu.registers.register_at(0), 0xFFFF_FFFE);
        assert_eq!(cpu.registers.register_at(1), 0xFFFF_FFFF);
    }

    #[test]
    fn check_psr_transfer() {
        let mut cpu = cpu_at(IWRAM);

        // MSR CPSR_f, #0xF0000000
        execute(&mut cpu, 0xE328_F4F0);
        assert!(cpu.cpsr.sign_flag());
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());
        assert!(cpu.cpsr.overflow_flag());
        assert_eq!(cpu.cpsr.mode(), Mode::System);

        // MRS R0, CPSR
        execute(&mut cpu, 0xE10F_0000);
        assert_eq!(cpu.registers.register_at(0), u32::from(cpu.cpsr));

        // MSR CPSR_c, R1 with R1 = IRQ mode
        cpu.registers.set_register_at(1, 0b10010);
        execute(&mut cpu, 0xE121_F001);
        assert_eq!(cpu.cpsr.mode(), Mode::Irq);
        assert_eq!(cpu.registers.active_bank(), Mode::Irq.bank_index());
    }

    #[test]
    fn user_mode_msr_only_reaches_flags() {
        let mut cpu = cpu_at(IWRAM);
        cpu.switch_mode(Mode::User);
        cpu.registers.set_register_at(1, 0x8000_001F);

        // MSR CPSR_fc, R1
        execute(&mut cpu, 0xE129_F001);
        assert_eq!(cpu.cpsr.mode(), Mode::User);
        assert!(cpu.cpsr.sign_flag());
    }

    #[test]
    fn spsr_access_without_spsr() {
        let mut cpu = cpu_at(IWRAM);
        cpu.cpsr.set_carry_flag(true);

        // MRS R0, SPSR in System mode reads CPSR
        execute(&mut cpu, 0xE14F_0000);
        assert_eq!(cpu.registers.register_at(0), u32::from(cpu.cpsr));

        // MSR SPSR_f, R1 is ignored
        cpu.registers.set_register_at(1, 0xF000_0000);
        let before = cpu.cpsr;
        execute(&mut cpu, 0xE168_F001);
        assert_eq!(cpu.cpsr, before);
    }

    #[test]
    fn msr_cannot_switch_state() {
        let mut cpu = cpu_at(IWRAM);
        cpu.registers.set_register_at(1, 0b11_1111);

        // MSR CPSR_c, R1 with T set
        execute(&mut cpu, 0xE121_F001);
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Arm);
        assert_eq!(cpu.cpsr.mode(), Mode::System);
    }

    #[test]
    fn check_branch_with_link() {
        let mut cpu = cpu_at(0x100);

        // BL +0x10
        execute(&mut cpu, 0xEB00_0004);
        assert_eq!(cpu.registers.register_at(REG_LR), 0x104);
        assert_eq!(cpu.registers.program_counter(), 0x118);
    }

    #[test]
    fn check_bx_to_thumb() {
        let mut cpu = cpu_at(IWRAM);
        cpu.registers.set_register_at(0, 0x0300_0201);

        // BX R0
        execute(&mut cpu, 0xE12F_FF10);
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Thumb);
        assert_eq!(cpu.registers.program_counter(), 0x0300_0200);
    }

    #[test]
    fn check_ldr_pre_and_post_indexed() {
        let mut cpu = cpu_at(IWRAM);
        write_word(&mut cpu, IWRAM + 0x104, 0xCAFE_BABE);
        write_word(&mut cpu, IWRAM + 0x100, 0x1234_5678);
        cpu.registers.set_register_at(1, IWRAM + 0x100);

        // LDR R0, [R1, #4]!
        execute(&mut cpu, 0xE5B1_0004);
        assert_eq!(cpu.registers.register_at(0), 0xCAFE_BABE);
        assert_eq!(cpu.registers.register_at(1), IWRAM + 0x104);

        // LDR R0, [R1], #4
        cpu.registers.set_register_at(1, IWRAM + 0x100);
        execute(&mut cpu, 0xE491_0004);
        assert_eq!(cpu.registers.register_at(0), 0x1234_5678);
        assert_eq!(cpu.registers.register_at(1), IWRAM + 0x104);
    }

    #[test]
    fn misaligned_ldr_rotates() {
        let mut cpu = cpu_at(IWRAM);
        write_word(&mut cpu, IWRAM + 0x100, 0x1122_3344);
        cpu.registers.set_register_at(1, IWRAM + 0x101);

        // LDR R0, [R1]
        execute(&mut cpu, 0xE591_0000);
        assert_eq!(cpu.registers.register_at(0), 0x4411_2233);
    }

    #[test]
    fn ldr_into_base_keeps_loaded_value() {
        let mut cpu = cpu_at(IWRAM);
        write_word(&mut cpu, IWRAM + 0x100, 0xAAAA_5555);
        cpu.registers.set_register_at(1, IWRAM + 0x100);

        // LDR R1, [R1], #4
        execute(&mut cpu, 0xE491_1004);
        assert_eq!(cpu.registers.register_at(1), 0xAAAA_5555);
    }

    #[test]
    fn str_pc_stores_pc_plus_12() {
        let mut cpu = cpu_at(IWRAM);
        cpu.registers.set_register_at(1, IWRAM + 0x200);

        // STR PC, [R1]
        execute(&mut cpu, 0xE581_F000);
        assert_eq!(read_word(&mut cpu, IWRAM + 0x200), IWRAM + 12);
    }

    #[test]
    fn check_halfword_transfers() {
        let mut cpu = cpu_at(IWRAM);
        cpu.registers.set_register_at(1, IWRAM + 0x100);
        cpu.registers.set_register_at(0, 0xFFFF_8081);

        // STRH R0, [R1]
        execute(&mut cpu, 0xE1C1_00B0);
        assert_eq!(read_word(&mut cpu, IWRAM + 0x100), 0x8081);

        // LDRH R0, [R1]
        execute(&mut cpu, 0xE1D1_00B0);
        assert_eq!(cpu.registers.register_at(0), 0x8081);

        // LDRSH R0, [R1]
        execute(&mut cpu, 0xE1D1_00F0);
        assert_eq!(cpu.registers.register_at(0), 0xFFFF_8081);

        // LDRSB R0, [R1]
        execute(&mut cpu, 0xE1D1_00D0);
        assert_eq!(cpu.registers.register_at(0), 0xFFFF_FF81);

        // LDRSH R0, [R1] at an odd address reads one signed byte
        cpu.registers.set_register_at(1, IWRAM + 0x101);
        execute(&mut cpu, 0xE1D1_00F0);
        assert_eq!(cpu.registers.register_at(0), 0xFFFF_FF80);
    }

    #[test]
    fn check_swap() {
        let mut cpu = cpu_at(IWRAM);
        write_word(&mut cpu, IWRAM + 0x100, 0x1111_1111);
        cpu.registers.set_register_at(1, IWRAM + 0x100);
        cpu.registers.set_register_at(2, 0x2222_2222);

        // SWP R0, R2, [R1]
        execute(&mut cpu, 0xE101_0092);
        assert_eq!(cpu.registers.register_at(0), 0x1111_1111);
        assert_eq!(read_word(&mut cpu, IWRAM + 0x100), 0x2222_2222);
    }

    #[test]
    fn check_push_pop() {
        let mut cpu = cpu_at(IWRAM);
        cpu.registers.set_register_at(REG_SP, IWRAM + 0x200);
        cpu.registers.set_register_at(0, 0xAAAA);
        cpu.registers.set_register_at(REG_LR, IWRAM + 0x40);

        // STMDB SP!, {R0, LR}
        execute(&mut cpu, 0xE92D_4001);
        assert_eq!(cpu.registers.register_at(REG_SP), IWRAM + 0x1F8);
        assert_eq!(read_word(&mut cpu, IWRAM + 0x1F8), 0xAAAA);
        assert_eq!(read_word(&mut cpu, IWRAM + 0x1FC), IWRAM + 0x40);

        // LDMIA SP!, {R0, PC}
        cpu.registers.set_register_at(0, 0);
        execute(&mut cpu, 0xE8BD_8001);
        assert_eq!(cpu.registers.register_at(0), 0xAAAA);
        assert_eq!(cpu.registers.program_counter(), IWRAM + 0x40);
        assert_eq!(cpu.registers.register_at(REG_SP), IWRAM + 0x200);
    }

    #[test]
    fn stm_stores_base_listed_first_unchanged() {
        let mut cpu = cpu_at(IWRAM);
        cpu.registers.set_register_at(0, IWRAM + 0x100);
        cpu.registers.set_register_at(1, IWRAM + 0x100);

        // STMIA R0!, {R0, R1}
        execute(&mut cpu, 0xE8A0_0003);
        assert_eq!(read_word(&mut cpu, IWRAM + 0x100), IWRAM + 0x100);
        assert_eq!(cpu.registers.register_at(0), IWRAM + 0x108);

        // STMIA R1!, {R0, R1}: R1 is not first, the new base is stored
        cpu.registers.set_register_at(1, IWRAM + 0x200);
        execute(&mut cpu, 0xE8A1_0003);
        assert_eq!(read_word(&mut cpu, IWRAM + 0x204), IWRAM + 0x208);
    }

    #[test]
    fn empty_register_list_transfers_pc() {
        let mut cpu = cpu_at(IWRAM);
        cpu.registers.set_register_at(0, IWRAM + 0x100);

        // STMIA R0!, {}
        execute(&mut cpu, 0xE8A0_0000);
        assert_eq!(read_word(&mut cpu, IWRAM + 0x100), IWRAM + 12);
        assert_eq!(cpu.registers.register_at(0), IWRAM + 0x140);
    }

    #[test]
    fn stm_with_s_bit_stores_user_registers() {
        let mut cpu = cpu_at(IWRAM);
        cpu.registers.set_register_at(REG_LR, 0x1111);
        cpu.switch_mode(Mode::Irq);
        cpu.registers.set_register_at(REG_LR, 0x2222);
        cpu.registers.set_register_at(0, IWRAM + 0x100);

        // STMIA R0, {LR}^
        execute(&mut cpu, 0xE8C0_4000);
        assert_eq!(read_word(&mut cpu, IWRAM + 0x100), 0x1111);
    }

    #[test]
    fn software_interrupt_and_undefined() {
        let mut cpu = cpu_at(0x0800_0100);

        // SWI 0x05
        execute(&mut cpu, 0xEF00_0005);
        assert_eq!(cpu.cpsr.mode(), Mode::Supervisor);
        assert_eq!(cpu.registers.register_at(REG_LR), 0x0800_0104);
        assert_eq!(cpu.registers.program_counter(), 0x08);
        assert_eq!(cpu.spsr().mode(), Mode::System);

        cpu.registers.set_program_counter(0x0800_0200);
        execute(&mut cpu, 0xE600_0010);
        assert_eq!(cpu.cpsr.mode(), Mode::Undefined);
        assert_eq!(cpu.registers.register_at(REG_LR), 0x0800_0204);
        assert_eq!(cpu.registers.program_counter(), 0x04);
    }
}
