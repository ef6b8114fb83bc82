//! One handler per instruction: mutates the register file, PC, CSRs, and memory.
//!
//! Each handler returns the address of the next instruction, or raises an [`Exception`] that the
//! driver loop turns into a trap.

use log::trace;

use crate::cpu::Cpu;
use crate::decode::{
    BranchCondition, CsrOp, Instruction, LoadWidth, RegImmOp, RegRegOp, RegShiftImmOp, StoreWidth,
};
use crate::exception::{Exception, ExecutionResult};
use crate::registers::Specifier;

/// Dispatches a decoded instruction and returns the next PC, or an [`Exception`] to raise.
pub(crate) fn execute(cpu: &mut Cpu, instruction: Instruction) -> ExecutionResult<u32> {
    match instruction {
        Instruction::OpImm {
            op,
            dest,
            src,
            immediate,
        } => reg_imm_op(cpu, op, dest, src, immediate),
        Instruction::OpShiftImm {
            op,
            dest,
            src,
            shift_amount_u5,
        } => reg_shift_imm_op(cpu, op, dest, src, shift_amount_u5),
        Instruction::Auipc { dest, immediate } => {
            let value = cpu.pc().wrapping_add_signed(immediate);
            cpu.registers.set_x(dest, value);
            increment_pc(cpu)
        }
        Instruction::Lui { dest, immediate } => {
            cpu.registers.set_x(dest, immediate as u32);
            increment_pc(cpu)
        }
        Instruction::Op {
            op,
            dest,
            src1,
            src2,
        } => reg_reg_op(cpu, op, dest, src1, src2),
        Instruction::Jal { dest, offset } => {
            let return_address = cpu.pc().wrapping_add(4);
            let target = cpu.pc().wrapping_add_signed(offset);
            cpu.registers.set_x(dest, return_address);
            jump_op(target)
        }
        Instruction::Jalr {
            dest,
            base,
            offset,
        } => {
            let return_address = cpu.pc().wrapping_add(4);
            let target = cpu.registers.x(base).wrapping_add_signed(offset) & !1;
            cpu.registers.set_x(dest, return_address);
            jump_op(target)
        }
        Instruction::Branch {
            condition,
            src1,
            src2,
            offset,
        } => cond_branch(cpu, condition, src1, src2, offset),
        Instruction::Load {
            width,
            dest,
            base,
            offset,
        } => load_op(cpu, width, dest, base, offset),
        Instruction::Store {
            width,
            src,
            base,
            offset,
        } => store_op(cpu, width, src, base, offset),
        Instruction::Fence | Instruction::SfenceVma => increment_pc(cpu),
        Instruction::Ecall => {
            trace!("ECALL");
            Err(match cpu.privilege() {
                crate::PrivilegeLevel::User => Exception::EcallFromUMode,
                crate::PrivilegeLevel::Supervisor => Exception::EcallFromSMode,
                crate::PrivilegeLevel::Machine => Exception::EcallFromMMode,
            })
        }
        Instruction::Ebreak => {
            trace!("EBREAK");
            Err(Exception::Breakpoint)
        }
        Instruction::Mret => {
            trace!("MRET");
            Ok(cpu.mret())
        }
        Instruction::Sret => {
            trace!("SRET");
            Ok(cpu.sret())
        }
        Instruction::Csr {
            op,
            dest,
            csr,
            src,
        } => csr_reg_op(cpu, op, dest, csr, src),
        Instruction::Csri {
            op,
            dest,
            csr,
            immediate,
        } => csr_imm_op(cpu, op, dest, csr, immediate),
    }
}

fn increment_pc(cpu: &Cpu) -> ExecutionResult<u32> {
    Ok(cpu.pc().wrapping_add(4))
}

/// Checks the word-alignment invariant that applies to every control-transfer target: without
/// the compressed extension, an instruction address must be a multiple of 4.
fn jump_op(target: u32) -> ExecutionResult<u32> {
    if target % 4 != 0 {
        Err(Exception::InstructionAddressMisaligned(target))
    } else {
        Ok(target)
    }
}

fn reg_imm_op(
    cpu: &mut Cpu,
    op: RegImmOp,
    dest: Specifier,
    src: Specifier,
    immediate: i32,
) -> ExecutionResult<u32> {
    let a = cpu.registers.x(src);
    trace!(op:?, dest:?, src:?, immediate; "OP-IMM");
    let result = match op {
        RegImmOp::Addi => a.wrapping_add_signed(immediate),
        RegImmOp::Slti => ((a as i32) < immediate) as u32,
        RegImmOp::Sltiu => (a < (immediate as u32)) as u32,
        RegImmOp::Xori => a ^ (immediate as u32),
        RegImmOp::Ori => a | (immediate as u32),
        RegImmOp::Andi => a & (immediate as u32),
    };
    cpu.registers.set_x(dest, result);
    increment_pc(cpu)
}

fn reg_shift_imm_op(
    cpu: &mut Cpu,
    op: RegShiftImmOp,
    dest: Specifier,
    src: Specifier,
    shift_amount_u5: u32,
) -> ExecutionResult<u32> {
    let a = cpu.registers.x(src);
    trace!(op:?, dest:?, src:?, shift_amount_u5; "OP-SHIFT-IMM");
    let result = match op {
        RegShiftImmOp::Slli => a.wrapping_shl(shift_amount_u5),
        RegShiftImmOp::Srli => a.wrapping_shr(shift_amount_u5),
        RegShiftImmOp::Srai => ((a as i32).wrapping_shr(shift_amount_u5)) as u32,
    };
    cpu.registers.set_x(dest, result);
    increment_pc(cpu)
}

fn reg_reg_op(
    cpu: &mut Cpu,
    op: RegRegOp,
    dest: Specifier,
    src1: Specifier,
    src2: Specifier,
) -> ExecutionResult<u32> {
    let a = cpu.registers.x(src1);
    let b = cpu.registers.x(src2);
    trace!(op:?, dest:?, src1:?, src2:?; "OP");
    let result = match op {
        RegRegOp::Add => a.wrapping_add(b),
        RegRegOp::Sub => a.wrapping_sub(b),
        RegRegOp::Sll => a.wrapping_shl(b & 0x1F),
        RegRegOp::Slt => ((a as i32) < (b as i32)) as u32,
        RegRegOp::Sltu => (a < b) as u32,
        RegRegOp::Xor => a ^ b,
        RegRegOp::Srl => a.wrapping_shr(b & 0x1F),
        RegRegOp::Sra => ((a as i32).wrapping_shr(b & 0x1F)) as u32,
        RegRegOp::Or => a | b,
        RegRegOp::And => a & b,
        // M extension. DIV/REM follow the RISC-V-specified sentinels rather than raising on
        // division by zero.
        RegRegOp::Mul => a.wrapping_mul(b),
        RegRegOp::Mulh => (((a as i32) as i64).wrapping_mul((b as i32) as i64) >> 32) as u32,
        RegRegOp::Mulhsu => (((a as i32) as i64).wrapping_mul(b as i64) >> 32) as u32,
        RegRegOp::Mulhu => ((a as u64).wrapping_mul(b as u64) >> 32) as u32,
        RegRegOp::Div => {
            if b == 0 {
                0xFFFF_FFFF
            } else {
                (a as i32).overflowing_div(b as i32).0 as u32
            }
        }
        RegRegOp::Divu => {
            if b == 0 {
                0xFFFF_FFFF
            } else {
                a / b
            }
        }
        RegRegOp::Rem => {
            if b == 0 {
                a
            } else {
                (a as i32).overflowing_rem(b as i32).0 as u32
            }
        }
        RegRegOp::Remu => {
            if b == 0 {
                a
            } else {
                a % b
            }
        }
    };
    cpu.registers.set_x(dest, result);
    increment_pc(cpu)
}

fn cond_branch(
    cpu: &mut Cpu,
    condition: BranchCondition,
    src1: Specifier,
    src2: Specifier,
    offset: i32,
) -> ExecutionResult<u32> {
    let a = cpu.registers.x(src1);
    let b = cpu.registers.x(src2);
    let taken = match condition {
        BranchCondition::Beq => a == b,
        BranchCondition::Bne => a != b,
        BranchCondition::Blt => (a as i32) < (b as i32),
        BranchCondition::Bge => (a as i32) >= (b as i32),
        BranchCondition::Bltu => a < b,
        BranchCondition::Bgeu => a >= b,
    };
    trace!(condition:?, taken; "BRANCH");
    if taken {
        jump_op(cpu.pc().wrapping_add_signed(offset))
    } else {
        increment_pc(cpu)
    }
}

fn load_op(
    cpu: &mut Cpu,
    width: LoadWidth,
    dest: Specifier,
    base: Specifier,
    offset: i32,
) -> ExecutionResult<u32> {
    let address = cpu.registers.x(base).wrapping_add_signed(offset);
    trace!(width:?, dest:?, address; "LOAD");
    let (size, sign_extend) = match width {
        LoadWidth::Lb => (8, true),
        LoadWidth::Lh => (16, true),
        LoadWidth::Lw => (32, false),
        LoadWidth::Lbu => (8, false),
        LoadWidth::Lhu => (16, false),
    };
    let raw = cpu
        .bus
        .load(address, size)
        .map_err(|_| map_load_fault(address, size))?;
    let value = if sign_extend {
        match size {
            8 => raw as i8 as i32 as u32,
            16 => raw as i16 as i32 as u32,
            _ => raw,
        }
    } else {
        raw
    };
    cpu.registers.set_x(dest, value);
    increment_pc(cpu)
}

fn store_op(
    cpu: &mut Cpu,
    width: StoreWidth,
    src: Specifier,
    base: Specifier,
    offset: i32,
) -> ExecutionResult<u32> {
    let address = cpu.registers.x(base).wrapping_add_signed(offset);
    let value = cpu.registers.x(src);
    trace!(width:?, address, value; "STORE");
    let size = match width {
        StoreWidth::Sb => 8,
        StoreWidth::Sh => 16,
        StoreWidth::Sw => 32,
    };
    cpu.bus
        .store(address, value, size)
        .map_err(|_| Exception::StoreOrAmoAccessFault(address))?;
    increment_pc(cpu)
}

/// The bus only ever raises `LoadAccessFault`/`StoreOrAmoAccessFault`; this just documents the
/// single call site where a load's bus error becomes the load-specific variant.
fn map_load_fault(address: u32, _size: u32) -> Exception {
    Exception::LoadAccessFault(address)
}

fn csr_reg_op(
    cpu: &mut Cpu,
    op: CsrOp,
    dest: Specifier,
    csr: u16,
    src: Specifier,
) -> ExecutionResult<u32> {
    let csr = u32::from(csr);
    let old = cpu.csrs.load(csr);
    // Per the RISC-V spec, a CSRRS/CSRRC with `rs1 == x0` must not perform the write at all (no
    // side effects), even though a CSRRW always writes.
    let skip_write = src == Specifier::X0 && !matches!(op, CsrOp::ReadWrite);
    if !skip_write {
        let rs1 = cpu.registers.x(src);
        let new = match op {
            CsrOp::ReadWrite => rs1,
            CsrOp::ReadSet => old | rs1,
            CsrOp::ReadClear => old & !rs1,
        };
        cpu.csrs.store(csr, new);
    }
    cpu.registers.set_x(dest, old);
    increment_pc(cpu)
}

fn csr_imm_op(
    cpu: &mut Cpu,
    op: CsrOp,
    dest: Specifier,
    csr: u16,
    immediate: u32,
) -> ExecutionResult<u32> {
    let csr = u32::from(csr);
    let old = cpu.csrs.load(csr);
    let skip_write = immediate == 0 && !matches!(op, CsrOp::ReadWrite);
    if !skip_write {
        let new = match op {
            CsrOp::ReadWrite => immediate,
            CsrOp::ReadSet => old | immediate,
            CsrOp::ReadClear => old & !immediate,
        };
        cpu.csrs.store(csr, new);
    }
    cpu.registers.set_x(dest, old);
    increment_pc(cpu)
}
