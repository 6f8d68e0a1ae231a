/*
  hdw/ops/control.rs
  Info: Control-flow instruction semantics - conditions, jumps, calls, returns, RST
  Description: Conditional jump/call/return opcodes are laid out in the same NZ, Z,
              NC, C order the CPU's own encoding uses (bits 4-3 of the opcode), so
              `condition` takes that same 0..=3 index straight from the opcode's
              position in its family rather than re-deriving it from scratch.
*/

use crate::hdw::cpu::Cpu;

/// Evaluates one of the four branch conditions, indexed NZ=0, Z=1, NC=2, C=3 -
/// the order the opcode map itself uses for JR/JP/CALL/RET's conditional rows.
pub fn condition(cpu: &Cpu, index: u8) -> bool {
    match index {
        0 => !cpu.regs.f.zero,
        1 => cpu.regs.f.zero,
        2 => !cpu.regs.f.carry,
        3 => cpu.regs.f.carry,
        _ => unreachable!("condition index out of range: {}", index),
    }
}

/// `RST n`: maps RST's 3-bit encoding (0..=7) to its fixed handler address.
pub fn rst_vector(index: u8) -> u16 {
    (index as u16) * 8
}
