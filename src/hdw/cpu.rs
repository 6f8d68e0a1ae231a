/*
  hdw/cpu.rs
  Info: Sharp LR35902 CPU interpreter - tick orchestration and interrupt dispatch
  Description: Owns the register file, stack pointer, program counter, and the
              HALT/STOP state the address space doesn't, and drives the per-tick
              control flow: service DMA, advance the timer, dispatch an interrupt if
              one is pending and enabled, otherwise fetch-decode-execute one
              instruction (or simply burn down `owed_cycles` if the previous
              instruction hasn't finished paying for itself yet).

  Tick Order (see SPEC_FULL.md §2):
    1. DMA transfer, if armed
    2. timer/divider advance (may raise a TIMER interrupt)
    3. interrupt dispatch, if IME and a source is both enabled and pending -
       including a source that was *just* raised by step 2, since dispatch is
       not a subroutine call deferred to a later tick; it is in-line within the
       same tick immediately after timer update (see DESIGN.md)
    4. early return if HALTed or STOPped
    5. early return (decrementing owed_cycles) if the last instruction hasn't
       finished paying for its declared cycle cost
    6. fetch-decode-execute one instruction
*/

use crate::hdw::address_space::AddressSpace;
use crate::hdw::decode::{self, OperandWidth};
use crate::hdw::errors::EmuError;
use crate::hdw::interrupts::Interrupts;
use crate::hdw::ops;
use crate::hdw::registers::Registers;

/// The LR35902 core: register file, stack/program counters, and run state.
pub struct Cpu {
    pub regs: Registers,
    pub sp: u16,
    pub pc: u16,
    pub halted: bool,
    pub stopped: bool,
    /// Monotonically increasing M-cycle counter, fed to the timer.
    pub cycle: u64,
    /// T-states still owed by the instruction most recently executed.
    pub owed_cycles: u32,
    /// Count of instructions fetch-decode-executed so far. The cycle pacer
    /// (§4.8) counts one "cycle" per instruction retired here, not per
    /// M-cycle tick - a host loop compares this before/after `tick` to know
    /// whether to advance the pacer.
    pub instructions_retired: u64,
}

impl Cpu {
    pub fn new() -> Self {
        Cpu {
            regs: Registers::default(),
            sp: 0,
            pc: 0,
            halted: false,
            stopped: false,
            cycle: 0,
            owed_cycles: 0,
            instructions_retired: 0,
        }
    }

    /// Advances the core by one M-cycle's worth of work.
    pub fn tick(&mut self, bus: &mut AddressSpace) -> Result<(), EmuError> {
        bus.tick_dma();

        self.cycle = self.cycle.wrapping_add(1);
        bus.tick_timer(self.cycle);

        // A pending-and-enabled interrupt wakes HALT/STOP regardless of IME.
        if bus.interrupts.has_any_pending() {
            self.halted = false;
            self.stopped = false;
        }

        if bus.interrupts.master_enabled {
            if let Some((source, vector)) = bus.interrupts.pending() {
                self.dispatch_interrupt(bus, source, vector);
                return Ok(());
            }
        }

        if self.halted || self.stopped {
            return Ok(());
        }

        if self.owed_cycles > 0 {
            self.owed_cycles = self.owed_cycles.saturating_sub(4);
            return Ok(());
        }

        self.step(bus)
    }

    fn dispatch_interrupt(&mut self, bus: &mut AddressSpace, source: Interrupts, vector: u16) {
        let return_pc = self.pc;
        self.push_u16(bus, return_pc);
        bus.interrupts.begin_dispatch(source);
        self.pc = vector;
    }

    /// Fetches, decodes, and executes exactly one instruction, advancing PC
    /// and arming `owed_cycles` with the instruction's remaining cost.
    fn step(&mut self, bus: &mut AddressSpace) -> Result<(), EmuError> {
        let first_byte = bus.read(self.pc);
        let is_cb = first_byte == 0xCB;
        let opcode = if is_cb { bus.read(self.pc.wrapping_add(1)) } else { first_byte };
        let info = if is_cb { decode::cb_op_info(opcode) } else { decode::op_info(opcode) };

        let prefix_len: u16 = if is_cb { 2 } else { 1 };
        let operand_addr = self.pc.wrapping_add(prefix_len);
        let operand: u16 = match info.width {
            OperandWidth::None => 0,
            OperandWidth::Byte | OperandWidth::SignedByte => bus.read(operand_addr) as u16,
            OperandWidth::Word => {
                let lo = bus.read(operand_addr) as u16;
                let hi = bus.read(operand_addr.wrapping_add(1)) as u16;
                lo | (hi << 8)
            }
        };
        self.pc = operand_addr.wrapping_add(info.width.len());

        if is_cb {
            ops::execute_cb(self, bus, opcode)?;
        } else {
            ops::execute(self, bus, opcode, operand)?;
        }

        self.owed_cycles = (info.cycles as u32).saturating_sub(4);
        self.instructions_retired = self.instructions_retired.wrapping_add(1);
        Ok(())
    }

    /// Pushes a 16-bit value: SP -= 2, low byte at SP, high byte at SP+1.
    pub fn push_u16(&mut self, bus: &mut AddressSpace, value: u16) {
        self.sp = self.sp.wrapping_sub(2);
        bus.write(self.sp, (value & 0xFF) as u8);
        bus.write(self.sp.wrapping_add(1), (value >> 8) as u8);
    }

    /// Pops a 16-bit value: low byte at SP, high byte at SP+1, SP += 2.
    pub fn pop_u16(&mut self, bus: &mut AddressSpace) -> u16 {
        let lo = bus.read(self.sp) as u16;
        let hi = bus.read(self.sp.wrapping_add(1)) as u16;
        self.sp = self.sp.wrapping_add(2);
        lo | (hi << 8)
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_n(cpu: &mut Cpu, bus: &mut AddressSpace, n: usize) {
        for _ in 0..n {
            cpu.tick(bus).unwrap();
        }
    }

    #[test]
    fn reset_and_three_nops() {
        let mut bus = AddressSpace::new();
        bus.load_rom(&[0x00, 0x00, 0x00]);
        let mut cpu = Cpu::new();
        run_n(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.pc, 3);
        assert_eq!(cpu.cycle, 3);
    }

    #[test]
    fn load_immediate_into_a() {
        let mut bus = AddressSpace::new();
        bus.load_rom(&[0x3E, 0x42]);
        let mut cpu = Cpu::new();
        run_n(&mut cpu, &mut bus, 2); // LD A,n costs 8T = 2 ticks
        assert_eq!(cpu.regs.a, 0x42);
        assert_eq!(cpu.pc, 2);
    }

    #[test]
    fn call_then_ret_round_trips_pc_and_sp() {
        let mut bus = AddressSpace::new();
        let mut rom = [0u8; 0x8000];
        rom[0x0100] = 0xCD;
        rom[0x0101] = 0x00;
        rom[0x0102] = 0x20;
        bus.load_rom(&rom);
        let mut cpu = Cpu::new();
        cpu.pc = 0x0100;
        cpu.sp = 0xFFFE;
        run_n(&mut cpu, &mut bus, 6); // CALL nn costs 24T = 6 ticks
        assert_eq!(cpu.pc, 0x2000);
        assert_eq!(cpu.sp, 0xFFFC);
        assert_eq!(bus.read(0xFFFD), 0x01);
        assert_eq!(bus.read(0xFFFC), 0x03);

        bus.write(0x2000, 0xC9); // RET
        run_n(&mut cpu, &mut bus, 4); // RET costs 16T = 4 ticks
        assert_eq!(cpu.pc, 0x0103);
        assert_eq!(cpu.sp, 0xFFFE);
    }

    #[test]
    fn timer_overflow_dispatches_within_the_same_tick() {
        let mut bus = AddressSpace::new();
        bus.timer.tac = 0x05; // enabled, period 4
        bus.timer.tima = 0xFF;
        bus.timer.tma = 0x80;
        bus.interrupts.master_enabled = true;
        bus.interrupts.ie_register = 0x04;
        let mut cpu = Cpu::new();
        cpu.pc = 0x0150;
        cpu.sp = 0xFFFE;

        // Three ticks land short of the period-4 boundary: no overflow yet.
        run_n(&mut cpu, &mut bus, 3);
        assert_eq!(bus.timer.tima, 0);
        assert_eq!(cpu.pc, 0x0150);

        // The 4th tick crosses the boundary and dispatches in the same call.
        cpu.tick(&mut bus).unwrap();
        assert_eq!(bus.timer.tima, 0x80);
        assert_eq!(cpu.pc, 0x0050);
        assert_eq!(bus.interrupts.get_int_flags() & 0x04, 0);
        assert!(!bus.interrupts.master_enabled);
        assert_eq!(bus.read(cpu.sp), 0x50);
        assert_eq!(bus.read(cpu.sp.wrapping_add(1)), 0x01);
    }
}
