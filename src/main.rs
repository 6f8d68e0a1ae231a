use std::process::ExitCode;

use clap::Parser;

use dmg_core::hdw::address_space::AddressSpace;
use dmg_core::hdw::cpu::Cpu;
use dmg_core::hdw::errors::EmuError;
use dmg_core::hdw::pacer::CyclePacer;

/// Game Boy (DMG) CPU core - runs a ROM image until a test sentinel, an
/// unimplemented opcode, or a profile-mode frame limit ends the run.
#[derive(Parser, Debug)]
#[command(name = "dmg-core", version, about)]
struct Args {
    /// Path to the ROM image to load at 0x0000.
    rom: String,

    /// Run at full speed, skipping the pacer's frame-rate sleep.
    #[arg(long)]
    turbo: bool,

    /// Terminate after this many frames, reporting a timing summary.
    #[arg(long, value_name = "FRAMES")]
    profile: Option<u32>,

    /// Log level override if RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level)).init();

    let rom = match std::fs::read(&args.rom) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!("failed to read ROM {}: {}", args.rom, e);
            return ExitCode::FAILURE;
        }
    };

    let mut bus = AddressSpace::new();
    bus.load_rom(&rom);
    let mut cpu = Cpu::new();
    let mut pacer = CyclePacer::new(args.turbo, args.profile);

    loop {
        let retired_before = cpu.instructions_retired;
        if let Err(e) = cpu.tick(&mut bus) {
            return report(e);
        }
        if cpu.instructions_retired != retired_before {
            if let Err(e) = pacer.on_instruction_completed() {
                return report(e);
            }
        }
    }
}

fn report(err: EmuError) -> ExitCode {
    match &err {
        EmuError::UnitTestPassed => {
            log::info!("{}", err);
            ExitCode::SUCCESS
        }
        EmuError::UnitTestFailed => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
        EmuError::UnimplementedOpcode(_) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
        EmuError::Timeout { .. } => {
            log::info!("{}", err);
            ExitCode::SUCCESS
        }
    }
}
