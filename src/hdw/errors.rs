/*
  hdw/errors.rs
  Info: Structured terminal conditions surfaced by the core
  Description: Every way a `tick` can stop the emulation run is represented here instead
              of as a bare panic or exit code, so a hosting loop can match on the cause
              and decide how to report it. State at the moment of failure is left intact -
              callers that need to dump registers/memory for debugging do so before this
              error unwinds further.
*/

use thiserror::Error;

/// A fatal, structured termination of the emulation run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmuError {
    /// Opcode 0xFC executed - the test-harness "unit test passed" sentinel.
    #[error("unit test passed")]
    UnitTestPassed,

    /// Opcode 0xFD executed - the test-harness "unit test failed" sentinel.
    #[error("unit test failed")]
    UnitTestFailed,

    /// The decoded opcode has no defined LR35902 semantics (D3, DB, DD, E3, E4,
    /// EB, EC, ED, F4).
    #[error("unimplemented opcode: {0:#04X}")]
    UnimplementedOpcode(u8),

    /// The cycle pacer's configured frame-profile limit was exceeded.
    #[error("profile timeout after {frame} frames ({wall_seconds:.3}s)")]
    Timeout { frame: u32, wall_seconds: f64 },
}
