use crate::bitwise::Bits;
use crate::bus::{MemoryAccess, Width};
use crate::cpu::arm::alu_instruction::{ArmModeAluInstr, shift, shift_immediate};
use crate::cpu::arm::operations::multiply_cycles;
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::flags::{
    HalfwordTransferKind, Indexing, LoadStoreKind, Offsetting, OperandKind, ReadWriteKind,
    ShiftKind,
};
use crate::cpu::psr::CpuState;
use crate::cpu::register_bank::{REG_LR, REG_PROGRAM_COUNTER, REG_SP};
use crate::cpu::thumb::alu_instructions::{
    Operation, ThumbHighRegisterOperation, ThumbModeAluInstruction,
};
use crate::cpu::thumb::instruction::ThumbModeInstruction;
use crate::cpu::thumb::mode::ThumbModeOpcode;

impl Arm7tdmi {
    #[allow(clippy::too_many_lines)]
    pub(crate) fn execute_thumb(&mut self, op_code: ThumbModeOpcode) {
        match op_code.instruction {
            ThumbModeInstruction::MoveShiftedRegister {
                shift_operation,
                offset5,
                source_register,
                destination_register,
            } => self.move_shifted_reg(
                shift_operation,
                offset5,
                source_register,
                destination_register,
            ),
            ThumbModeInstruction::AddSubtract {
                operation_kind,
                subtract,
                rn_offset3,
                source_register,
                destination_register,
            } => self.add_subtract(
                operation_kind,
                subtract,
                rn_offset3,
                source_register,
                destination_register,
            ),
            ThumbModeInstruction::MoveCompareAddSubtractImm {
                operation,
                destination_register,
                offset,
            } => self.move_compare_add_sub_imm(operation, destination_register, offset),
            ThumbModeInstruction::AluOp {
                alu_operation,
                source_register,
                destination_register,
            } => self.alu_op(alu_operation, source_register, destination_register),
            ThumbModeInstruction::HiRegisterOpBX {
                register_operation,
                source_register,
                destination_register,
            } => self.hi_reg_operation_branch_ex(
                register_operation,
                source_register,
                destination_register,
            ),
            ThumbModeInstruction::PCRelativeLoad {
                destination_register,
                immediate_value,
            } => self.pc_relative_load(destination_register, immediate_value),
            ThumbModeInstruction::LoadStoreRegisterOffset {
                load_store,
                byte_word,
                ro,
                base_register,
                destination_register,
            } => {
                let offset = self.read_register(ro.into());
                self.single_data_transfer(
                    load_store,
                    byte_word,
                    false,
                    Indexing::Pre,
                    destination_register.into(),
                    base_register.into(),
                    offset,
                    Offsetting::Up,
                );
            }
            ThumbModeInstruction::LoadStoreSignExtByteHalfword {
                h,
                sign_extend_flag,
                offset_register,
                base_register,
                destination_register,
            } => {
                let (load_store, transfer_kind) = match (sign_extend_flag, h) {
                    (false, false) => (LoadStoreKind::Store, HalfwordTransferKind::UnsignedHalfwords),
                    (false, true) => (LoadStoreKind::Load, HalfwordTransferKind::UnsignedHalfwords),
                    (true, false) => (LoadStoreKind::Load, HalfwordTransferKind::SignedByte),
                    (true, true) => (LoadStoreKind::Load, HalfwordTransferKind::SignedHalfwords),
                };
                let offset = self.read_register(offset_register.into());
                self.halfword_data_transfer(
                    Indexing::Pre,
                    Offsetting::Up,
                    false,
                    load_store,
                    offset,
                    base_register.into(),
                    destination_register.into(),
                    transfer_kind,
                );
            }
            ThumbModeInstruction::LoadStoreImmOffset {
                load_store,
                byte_word,
                offset,
                base_register,
                destination_register,
            } => self.single_data_transfer(
                load_store,
                byte_word,
                false,
                Indexing::Pre,
                destination_register.into(),
                base_register.into(),
                offset.into(),
                Offsetting::Up,
            ),
            ThumbModeInstruction::LoadStoreHalfword {
                load_store,
                offset,
                base_register,
                source_destination_register,
            } => self.halfword_data_transfer(
                Indexing::Pre,
                Offsetting::Up,
                false,
                load_store,
                offset.into(),
                base_register.into(),
                source_destination_register.into(),
                HalfwordTransferKind::UnsignedHalfwords,
            ),
            ThumbModeInstruction::SPRelativeLoadStore {
                load_store,
                destination_register,
                word8,
            } => self.single_data_transfer(
                load_store,
                ReadWriteKind::Word,
                false,
                Indexing::Pre,
                destination_register.into(),
                REG_SP,
                word8.into(),
                Offsetting::Up,
            ),
            ThumbModeInstruction::LoadAddress {
                sp,
                destination_register,
                offset,
            } => {
                let base = if sp {
                    self.read_register(REG_SP)
                } else {
                    self.read_register(REG_PROGRAM_COUNTER) & !2
                };
                self.write_register(
                    destination_register.into(),
                    base.wrapping_add(offset.into()),
                );
            }
            ThumbModeInstruction::AddOffsetSP { negative, word7 } => {
                let sp = self.read_register(REG_SP);
                let sp = if negative {
                    sp.wrapping_sub(word7.into())
                } else {
                    sp.wrapping_add(word7.into())
                };
                self.write_register(REG_SP, sp);
            }
            ThumbModeInstruction::PushPopReg {
                load_store,
                pc_lr,
                register_list,
            } => self.push_pop_register(load_store, pc_lr, register_list),
            ThumbModeInstruction::MultipleLoadStore {
                load_store,
                base_register,
                register_list,
            } => self.block_data_transfer(
                Indexing::Post,
                Offsetting::Up,
                false,
                true,
                load_store,
                base_register.into(),
                register_list.into(),
            ),
            ThumbModeInstruction::CondBranch {
                condition,
                immediate_offset,
            } => {
                if self.cpsr.can_execute(condition) {
                    self.relative_branch(immediate_offset);
                }
            }
            ThumbModeInstruction::Swi { comment } => {
                tracing::debug!("SWI 0x{comment:02X}");
                self.software_interrupt();
            }
            ThumbModeInstruction::UncondBranch { offset } => self.relative_branch(offset),
            ThumbModeInstruction::LongBranchLink { h, offset } => {
                self.long_branch_link(h, offset);
            }
            ThumbModeInstruction::Undefined => {
                tracing::debug!("undefined instruction {op_code}");
                self.undefined_instruction();
            }
        }
    }

    fn move_shifted_reg(&mut self, op: ShiftKind, offset5: u16, rs: u16, rd: u16) {
        let source = self.read_register(rs.into());
        let shifted = shift_immediate(op, offset5.into(), source, self.cpsr.carry_flag());
        self.alu_operation(
            ArmModeAluInstr::Mov,
            true,
            rd.into(),
            0,
            shifted.result,
            shifted.carry,
        );
    }

    fn add_subtract(
        &mut self,
        operation_kind: OperandKind,
        subtract: bool,
        rn_offset3: u16,
        rs: u16,
        rd: u16,
    ) {
        let op1 = self.read_register(rs.into());
        let op2 = match operation_kind {
            OperandKind::Immediate => u32::from(rn_offset3),
            OperandKind::Register => self.read_register(rn_offset3.into()),
        };
        let alu_instruction = if subtract {
            ArmModeAluInstr::Sub
        } else {
            ArmModeAluInstr::Add
        };
        let carry = self.cpsr.carry_flag();
        self.alu_operation(alu_instruction, true, rd.into(), op1, op2, carry);
    }

    fn move_compare_add_sub_imm(&mut self, operation: Operation, rd: u16, offset: u32) {
        let alu_instruction = match operation {
            Operation::Mov => ArmModeAluInstr::Mov,
            Operation::Cmp => ArmModeAluInstr::Cmp,
            Operation::Add => ArmModeAluInstr::Add,
            Operation::Sub => ArmModeAluInstr::Sub,
        };
        let op1 = self.read_register(rd.into());
        let carry = self.cpsr.carry_flag();
        self.alu_operation(alu_instruction, true, rd.into(), op1, offset, carry);
    }

    fn alu_op(&mut self, operation: ThumbModeAluInstruction, rs: u16, rd: u16) {
        let rd = usize::from(rd);
        let op1 = self.read_register(rd);
        let op2 = self.read_register(rs.into());
        let carry = self.cpsr.carry_flag();

        let (alu_instruction, op1, op2, shifter_carry) = match operation {
            ThumbModeAluInstruction::Lsl
            | ThumbModeAluInstruction::Lsr
            | ThumbModeAluInstruction::Asr
            | ThumbModeAluInstruction::Ror => {
                let kind = match operation {
                    ThumbModeAluInstruction::Lsl => ShiftKind::Lsl,
                    ThumbModeAluInstruction::Lsr => ShiftKind::Lsr,
                    ThumbModeAluInstruction::Asr => ShiftKind::Asr,
                    _ => ShiftKind::Ror,
                };
                self.internal_cycles(1);
                let shifted = shift(kind, op2 & 0xFF, op1, carry);
                (ArmModeAluInstr::Mov, 0, shifted.result, shifted.carry)
            }
            ThumbModeAluInstruction::Mul => {
                self.internal_cycles(multiply_cycles(op1, true));
                let result = op1.wrapping_mul(op2);
                self.write_register(rd, result);
                self.cpsr.set_sign_and_zero(result);
                return;
            }
            // RSB Rd, Rs, #0
            ThumbModeAluInstruction::Neg => (ArmModeAluInstr::Rsb, op2, 0, carry),
            ThumbModeAluInstruction::And => (ArmModeAluInstr::And, op1, op2, carry),
            ThumbModeAluInstruction::Eor => (ArmModeAluInstr::Eor, op1, op2, carry),
            ThumbModeAluInstruction::Adc => (ArmModeAluInstr::Adc, op1, op2, carry),
            ThumbModeAluInstruction::Sbc => (ArmModeAluInstr::Sbc, op1, op2, carry),
            ThumbModeAluInstruction::Tst => (ArmModeAluInstr::Tst, op1, op2, carry),
            ThumbModeAluInstruction::Cmp => (ArmModeAluInstr::Cmp, op1, op2, carry),
            ThumbModeAluInstruction::Cmn => (ArmModeAluInstr::Cmn, op1, op2, carry),
            ThumbModeAluInstruction::Orr => (ArmModeAluInstr::Orr, op1, op2, carry),
            ThumbModeAluInstruction::Bic => (ArmModeAluInstr::Bic, op1, op2, carry),
            ThumbModeAluInstruction::Mvn => (ArmModeAluInstr::Mvn, op1, op2, carry),
        };

        self.alu_operation(alu_instruction, true, rd, op1, op2, shifter_carry);
    }

    fn hi_reg_operation_branch_ex(
        &mut self,
        op: ThumbHighRegisterOperation,
        rs: u16,
        rd: u16,
    ) {
        let rd = usize::from(rd);
        let source = self.read_register(rs.into());

        match op {
            // ADD and MOV on high registers leave the flags alone.
            ThumbHighRegisterOperation::Add => {
                let result = self.read_register(rd).wrapping_add(source);
                self.write_register(rd, result);
            }
            ThumbHighRegisterOperation::Cmp => {
                let op1 = self.read_register(rd);
                let carry = self.cpsr.carry_flag();
                self.alu_operation(ArmModeAluInstr::Cmp, true, rd, op1, source, carry);
            }
            ThumbHighRegisterOperation::Mov => self.write_register(rd, source),
            ThumbHighRegisterOperation::Bx => {
                let state = if source.get_bit(0) {
                    CpuState::Thumb
                } else {
                    CpuState::Arm
                };
                self.cpsr.set_cpu_state(state);
                self.write_register(REG_PROGRAM_COUNTER, source & !1);
            }
        }
    }

    fn pc_relative_load(&mut self, rd: u16, offset: u16) {
        // Bit 1 of PC is forced to zero so the load is word aligned.
        let address = (self.read_register(REG_PROGRAM_COUNTER) & !2).wrapping_add(offset.into());
        let value = self.read_data(address, Width::Word, MemoryAccess::NonSequential);
        self.internal_cycles(1);
        self.write_register(rd.into(), value);
    }

    /// PUSH is `STMDB SP!` with LR, POP is `LDMIA SP!` with PC.
    fn push_pop_register(&mut self, load_store: LoadStoreKind, pc_lr: bool, register_list: u16) {
        let register_list = u32::from(register_list);
        match load_store {
            LoadStoreKind::Store => self.block_data_transfer(
                Indexing::Pre,
                Offsetting::Down,
                false,
                true,
                load_store,
                REG_SP,
                register_list | (u32::from(pc_lr) << REG_LR),
            ),
            LoadStoreKind::Load => self.block_data_transfer(
                Indexing::Post,
                Offsetting::Up,
                false,
                true,
                load_store,
                REG_SP,
                register_list | (u32::from(pc_lr) << REG_PROGRAM_COUNTER),
            ),
        }
    }

    fn relative_branch(&mut self, offset: i32) {
        let target = self
            .read_register(REG_PROGRAM_COUNTER)
            .wrapping_add_signed(offset);
        self.write_register(REG_PROGRAM_COUNTER, target);
    }

    /// BL is split in two halfwords. The first one parks the upper part of
    /// the target in LR, the second one jumps and leaves the return address
    /// (with bit 0 set) in LR.
    fn long_branch_link(&mut self, h: bool, offset: u32) {
        if h {
            let target = self
                .read_register(REG_LR)
                .wrapping_add(offset << 1);
            let return_address = self.registers.program_counter().wrapping_add(2) | 1;
            self.write_register(REG_LR, return_address);
            self.write_register(REG_PROGRAM_COUNTER, target);
        } else {
            let upper = (offset << 12).sign_extended(23);
            let lr = self.read_register(REG_PROGRAM_COUNTER).wrapping_add(upper);
            self.write_register(REG_LR, lr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::cpu_modes::Mode;
    use crate::cpu::exception::ExceptionKind;
    use pretty_assertions::assert_eq;

    const IWRAM: u32 = 0x0300_0000;

    fn thumb_cpu_at(pc: u32) -> Arm7tdmi {
        let mut cpu = Arm7tdmi::default();
        cpu.switch_mode(Mode::System);
        cpu.cpsr.set_cpu_state(CpuState::Thumb);
        cpu.registers.set_program_counter(pc);
        cpu
    }

    fn execute(cpu: &mut Arm7tdmi, raw: u16) {
        cpu.execute_thumb(ThumbModeOpcode::from(raw));
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
    fn check_mov_immediate_keeps_carry() {
        let mut cpu = thumb_cpu_at(IWRAM);
        cpu.cpsr.set_carry_flag(true);

        // MOV R0, #0
        execute(&mut cpu, 0x2000);
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());

        // MOV R0, #0x80
        execute(&mut cpu, 0x2080);
        assert_eq!(cpu.registers.register_at(0), 0x80);
        assert!(!cpu.cpsr.zero_flag());
        assert!(!cpu.cpsr.sign_flag());
    }

    #[test]
    fn check_add_subtract() {
        let mut cpu = thumb_cpu_at(IWRAM);
        cpu.registers.set_register_at(0, 0x7FFF_FFFF);
        cpu.registers.set_register_at(1, 1);

        // ADD R2, R0, R1
        execute(&mut cpu, 0x1842);
        assert_eq!(cpu.registers.register_at(2), 0x8000_0000);
        assert!(cpu.cpsr.overflow_flag());
        assert!(cpu.cpsr.sign_flag());

        // SUB R2, R0, #1
        execute(&mut cpu, 0x1E42);
        assert_eq!(cpu.registers.register_at(2), 0x7FFF_FFFE);
        assert!(cpu.cpsr.carry_flag());
        assert!(!cpu.cpsr.overflow_flag());
    }

    #[test]
    fn check_shift_by_register() {
        let mut cpu = thumb_cpu_at(IWRAM);
        cpu.registers.set_register_at(0, 0x8000_0001);
        cpu.registers.set_register_at(1, 1);

        // LSL R0, R1
        execute(&mut cpu, 0x4088);
        assert_eq!(cpu.registers.register_at(0), 2);
        assert!(cpu.cpsr.carry_flag());
    }

    #[test]
    fn check_neg_and_mul() {
        let mut cpu = thumb_cpu_at(IWRAM);
        cpu.registers.set_register_at(1, 5);

        // NEG R0, R1
        execute(&mut cpu, 0x4248);
        assert_eq!(cpu.registers.register_at(0), (-5_i32) as u32);
        assert!(cpu.cpsr.sign_flag());
        assert!(!cpu.cpsr.carry_flag());

        // MUL R0, R1
        execute(&mut cpu, 0x4348);
        assert_eq!(cpu.registers.register_at(0), (-25_i32) as u32);
    }

    #[test]
    fn check_high_registers() {
        let mut cpu = thumb_cpu_at(IWRAM);
        cpu.registers.set_register_at(0, 3);
        cpu.registers.set_register_at(8, 4);
        cpu.cpsr.set_zero_flag(true);

        // ADD R8, R0
        execute(&mut cpu, 0x4480);
        assert_eq!(cpu.registers.register_at(8), 7);
        assert!(cpu.cpsr.zero_flag());

        // MOV R0, R8
        execute(&mut cpu, 0x4640);
        assert_eq!(cpu.registers.register_at(0), 7);

        // CMP R0, R8
        execute(&mut cpu, 0x4540);
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());
    }

    #[test]
    fn check_bx_to_arm() {
        let mut cpu = thumb_cpu_at(IWRAM);
        cpu.registers.set_register_at(0, IWRAM + 0x100);

        // BX R0
        execute(&mut cpu, 0x4700);
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Arm);
        assert_eq!(cpu.registers.program_counter(), IWRAM + 0x100);
    }

    #[test]
    fn pc_relative_load_is_word_aligned() {
        let mut cpu = thumb_cpu_at(IWRAM + 2);
        write_word(&mut cpu, IWRAM + 8, 0xDEAD_BEEF);

        // LDR R0, [PC, #4]
        execute(&mut cpu, 0x4801);
        assert_eq!(cpu.registers.register_at(0), 0xDEAD_BEEF);
    }

    #[test]
    fn check_sign_extended_loads() {
        let mut cpu = thumb_cpu_at(IWRAM);
        cpu.registers.set_register_at(0, 0x0000_F0F0);
        cpu.registers.set_register_at(1, IWRAM + 0x100);
        cpu.registers.set_register_at(2, 2);

        // STRH R0, [R1, R2]
        execute(&mut cpu, 0x5288);
        assert_eq!(read_word(&mut cpu, IWRAM + 0x100), 0xF0F0_0000);

        // LDSH R0, [R1, R2]
        execute(&mut cpu, 0x5E88);
        assert_eq!(cpu.registers.register_at(0), 0xFFFF_F0F0);

        // LDSB R0, [R1, R2]
        execute(&mut cpu, 0x5688);
        assert_eq!(cpu.registers.register_at(0), 0xFFFF_FFF0);
    }

    #[test]
    fn check_push_pop() {
        let mut cpu = thumb_cpu_at(IWRAM);
        cpu.registers.set_register_at(REG_SP, IWRAM + 0x200);
        cpu.registers.set_register_at(0, 0x55);
        cpu.registers.set_register_at(REG_LR, IWRAM + 0x41);

        // PUSH {R0, LR}
        execute(&mut cpu, 0xB501);
        assert_eq!(cpu.registers.register_at(REG_SP), IWRAM + 0x1F8);
        assert_eq!(read_word(&mut cpu, IWRAM + 0x1F8), 0x55);
        assert_eq!(read_word(&mut cpu, IWRAM + 0x1FC), IWRAM + 0x41);

        // POP {R0, PC}
        cpu.registers.set_register_at(0, 0);
        execute(&mut cpu, 0xBD01);
        assert_eq!(cpu.registers.register_at(0), 0x55);
        assert_eq!(cpu.registers.register_at(REG_SP), IWRAM + 0x200);
        assert_eq!(cpu.registers.program_counter(), IWRAM + 0x41);
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Thumb);
    }

    #[test]
    fn check_ldmia() {
        let mut cpu = thumb_cpu_at(IWRAM);
        write_word(&mut cpu, IWRAM + 0x100, 1);
        write_word(&mut cpu, IWRAM + 0x104, 2);
        cpu.registers.set_register_at(1, IWRAM + 0x100);

        // LDMIA R1!, {R0, R2}
        execute(&mut cpu, 0xC905);
        assert_eq!(cpu.registers.register_at(0), 1);
        assert_eq!(cpu.registers.register_at(2), 2);
        assert_eq!(cpu.registers.register_at(1), IWRAM + 0x108);
    }

    #[test]
    fn check_sp_arithmetic_and_load_address() {
        let mut cpu = thumb_cpu_at(IWRAM);
        cpu.registers.set_register_at(REG_SP, IWRAM + 0x100);

        // ADD SP, #-8
        execute(&mut cpu, 0xB082);
        assert_eq!(cpu.registers.register_at(REG_SP), IWRAM + 0xF8);

        // ADD R0, SP, #8
        execute(&mut cpu, 0xA802);
        assert_eq!(cpu.registers.register_at(0), IWRAM + 0x100);
    }

    #[test]
    fn check_conditional_branch() {
        let mut cpu = thumb_cpu_at(IWRAM);

        // BEQ +4 with Z clear
        execute(&mut cpu, 0xD002);
        assert_eq!(cpu.registers.program_counter(), IWRAM);

        cpu.cpsr.set_zero_flag(true);
        execute(&mut cpu, 0xD002);
        assert_eq!(cpu.registers.program_counter(), IWRAM + 8);
    }

    #[test]
    fn check_long_branch_link() {
        let mut cpu = thumb_cpu_at(IWRAM);

        // BL +0x100, first half
        execute(&mut cpu, 0xF000);
        assert_eq!(cpu.registers.register_at(REG_LR), IWRAM + 4);

        // second half, one instruction later
        cpu.registers.set_program_counter(IWRAM + 2);
        execute(&mut cpu, 0xF880);
        assert_eq!(cpu.registers.program_counter(), IWRAM + 0x104);
        assert_eq!(cpu.registers.register_at(REG_LR), (IWRAM + 4) | 1);
    }

    #[test]
    fn long_branch_link_backwards() {
        let mut cpu = thumb_cpu_at(IWRAM + 0x1000);

        // First half with offset -1 (0x7FF)
        execute(&mut cpu, 0xF7FF);
        assert_eq!(
            cpu.registers.register_at(REG_LR),
            (IWRAM + 0x1004).wrapping_sub(0x1000)
        );
    }

    #[test]
    fn swi_from_thumb() {
        let mut cpu = thumb_cpu_at(0x0800_0100);

        // SWI 0x10
        execute(&mut cpu, 0xDF10);
        assert_eq!(cpu.cpsr.mode(), ExceptionKind::Swi.mode());
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Arm);
        assert_eq!(cpu.registers.register_at(REG_LR), 0x0800_0102);
        assert_eq!(cpu.registers.program_counter(), 0x08);
    }
}
