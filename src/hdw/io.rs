/*
  hdw/io.rs
  Info: I/O register interface for Game Boy hardware components
  Description: Memory-mapped I/O register storage for the 0xFF00-0xFF7F page. The core
              owns DIV/TIMA/TMA/TAC (via `Timer`), IF (via `InterruptController`), and
              SB/SC (via `SerialPort`) directly; everything else in this page belongs to
              an external collaborator (joypad matrix, PPU, APU) that this core does not
              implement. Those registers are still accepted and stored so that a
              collaborator wired in later observes whatever the CPU last wrote, per
              spec.md §4.1.

  I/O Register Map:
    FF00      : Joypad - stored passthrough byte, no button-matrix logic
    FF01-FF02 : Serial Data - routed to `SerialPort`
    FF04-FF07 : Timer Registers - routed to `Timer`
    FF0F      : Interrupt Flags - routed to `InterruptController`
    FF10-FF3F : Audio Registers - passthrough storage only
    FF40-FF4B : LCD Registers - passthrough storage only
    FF4C-FF7F : Unused - reads return 0xFF (open bus), writes are ignored
*/

const SOUND_LEN: usize = 0xFF40 - 0xFF10;
const LCD_LEN: usize = 0xFF4C - 0xFF40;

/// Passthrough storage for the I/O registers this core does not itself interpret.
pub struct IoRegisters {
    pub joypad: u8,
    sound: [u8; SOUND_LEN],
    lcd: [u8; LCD_LEN],
}

impl IoRegisters {
    pub fn new() -> Self {
        IoRegisters {
            joypad: 0xFF,
            sound: [0; SOUND_LEN],
            lcd: [0; LCD_LEN],
        }
    }

    pub fn read(&self, address: u16) -> u8 {
        match address {
            0xFF00 => self.joypad,
            0xFF10..=0xFF3F => self.sound[(address - 0xFF10) as usize],
            0xFF40..=0xFF4B => self.lcd[(address - 0xFF40) as usize],
            0xFF4C..=0xFF7F => 0xFF,
            _ => {
                log::warn!("io read not implemented for address {:#06X}", address);
                0xFF
            }
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            0xFF00 => self.joypad = value,
            0xFF10..=0xFF3F => self.sound[(address - 0xFF10) as usize] = value,
            0xFF40..=0xFF4B => self.lcd[(address - 0xFF40) as usize] = value,
            0xFF4C..=0xFF7F => {}
            _ => log::warn!("io write not implemented for address {:#06X}", address),
        }
    }
}

impl Default for IoRegisters {
    fn default() -> Self {
        Self::new()
    }
}
