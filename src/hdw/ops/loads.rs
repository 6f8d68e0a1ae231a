/*
  hdw/ops/loads.rs
  Info: Load instruction helpers for the HL-post-modify addressing forms
  Description: `LD A,(HL+)`/`LD (HL+),A` and their `HL-` counterparts share the same
              "read/write through HL, then adjust HL" shape; these two helpers
              capture that so `ops::execute` just calls them instead of repeating
              the increment/decrement inline at each of the four opcodes.
*/

use crate::hdw::cpu::Cpu;

/// Returns HL's current value and leaves it incremented by one.
pub fn hl_post_inc(cpu: &mut Cpu) -> u16 {
    let hl = cpu.regs.get_hl();
    cpu.regs.set_hl(hl.wrapping_add(1));
    hl
}

/// Returns HL's current value and leaves it decremented by one.
pub fn hl_post_dec(cpu: &mut Cpu) -> u16 {
    let hl = cpu.regs.get_hl();
    cpu.regs.set_hl(hl.wrapping_sub(1));
    hl
}
