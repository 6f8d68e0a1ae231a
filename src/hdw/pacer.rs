/*
  hdw/pacer.rs
  Info: Cycle Pacer - frame-rate clock, turbo bypass, profile-mode exit
  Description: The source counts one "cycle" per executed instruction rather than per
              M-cycle - retained here for behavior compatibility even though the rest
              of the core now ticks at M-cycle granularity (see `Cpu::tick`). The
              pacer is driven by the host loop once per completed instruction, not
              once per `Cpu::tick` call, so it advances at the same rate the original
              timing comment describes.

  Frame Boundary:
    Every 17,556 counted cycles constitutes one frame. At `cycle % 17556 == 20`:
      1. measure elapsed wall-clock since the previous boundary
      2. sleep for the rest of a 1/60s slot, unless turbo is active
      3. if a frame-profile limit is configured and now exceeded, report Timeout
*/

use std::time::{Duration, Instant};

use crate::hdw::errors::EmuError;

const CYCLES_PER_FRAME: u64 = 17_556;
const BOUNDARY_OFFSET: u64 = 20;
const FRAME_SLOT: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Drives the 1/60s frame cadence the reference implementation's main loop uses,
/// without itself touching CPU or bus state.
pub struct CyclePacer {
    cycle: u64,
    frame: u32,
    turbo: bool,
    profile_frames: Option<u32>,
    last_boundary: Instant,
    run_start: Instant,
}

impl CyclePacer {
    pub fn new(turbo: bool, profile_frames: Option<u32>) -> Self {
        let now = Instant::now();
        CyclePacer {
            cycle: 0,
            frame: 0,
            turbo,
            profile_frames,
            last_boundary: now,
            run_start: now,
        }
    }

    /// Call once per completed instruction. Sleeps (unless turbo) at each
    /// frame boundary and returns `Timeout` once the configured profile-frame
    /// limit is exceeded.
    pub fn on_instruction_completed(&mut self) -> Result<(), EmuError> {
        self.cycle = self.cycle.wrapping_add(1);
        if self.cycle % CYCLES_PER_FRAME != BOUNDARY_OFFSET {
            return Ok(());
        }

        self.frame += 1;
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_boundary);
        self.last_boundary = now;

        if !self.turbo {
            if let Some(remaining) = FRAME_SLOT.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }

        if let Some(limit) = self.profile_frames {
            if self.frame >= limit {
                return Err(EmuError::Timeout {
                    frame: self.frame,
                    wall_seconds: self.run_start.elapsed().as_secs_f64(),
                });
            }
        }

        Ok(())
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_boundary_fires_at_the_configured_offset() {
        let mut pacer = CyclePacer::new(true, None);
        for _ in 0..BOUNDARY_OFFSET - 1 {
            pacer.on_instruction_completed().unwrap();
        }
        assert_eq!(pacer.frame(), 0);
        pacer.on_instruction_completed().unwrap();
        assert_eq!(pacer.frame(), 1);
    }

    #[test]
    fn subsequent_boundaries_are_17556_cycles_apart() {
        let mut pacer = CyclePacer::new(true, None);
        for _ in 0..BOUNDARY_OFFSET {
            pacer.on_instruction_completed().unwrap();
        }
        assert_eq!(pacer.frame(), 1);
        for _ in 0..CYCLES_PER_FRAME - 1 {
            pacer.on_instruction_completed().unwrap();
        }
        assert_eq!(pacer.frame(), 1);
        pacer.on_instruction_completed().unwrap();
        assert_eq!(pacer.frame(), 2);
    }

    #[test]
    fn profile_limit_terminates_with_timeout() {
        let mut pacer = CyclePacer::new(true, Some(2));
        let mut last = Ok(());
        for _ in 0..(BOUNDARY_OFFSET + CYCLES_PER_FRAME) {
            last = pacer.on_instruction_completed();
        }
        assert!(matches!(last, Err(EmuError::Timeout { frame: 2, .. })));
    }
}
