use std::{
    error,
    fs::{self, File},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use emu::gba::Gba;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Roughly one second of emulated time.
const DEFAULT_CYCLES: u64 = 16_777_216;

#[derive(Parser, Debug)]
#[command(version, about = "Runs a cartridge on the ARM7TDMI core, without video or audio.")]
struct Args {
    /// Cartridge image
    rom: PathBuf,

    /// BIOS image. Without one the BIOS area reads as zeroes
    #[arg(short, long)]
    bios: Option<PathBuf>,

    /// Start at the cartridge entry point, as the BIOS boot code would
    #[arg(long, default_value_t = false)]
    skip_bios: bool,

    /// Cycle budget
    #[arg(short, long, default_value_t = DEFAULT_CYCLES)]
    cycles: u64,

    /// Stop as soon as the program parks itself on a branch to itself or halts
    #[arg(long, default_value_t = false)]
    until_idle: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write a save state to this file when the run ends
    #[arg(long)]
    save_state: Option<PathBuf>,

    /// Print the registers when the run ends
    #[arg(long, default_value_t = false)]
    dump_registers: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let _guard = match init_logging(args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("cannot set up logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>, Box<dyn error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(File::create(path)?);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn error::Error>> {
    tracing::info!("satsuma v{}", env!("CARGO_PKG_VERSION"));

    let rom = fs::read(&args.rom)?;
    tracing::info!("loaded {} ({} bytes)", args.rom.display(), rom.len());
    let bios = match &args.bios {
        Some(path) => fs::read(path)?,
        None => {
            tracing::warn!("no BIOS image, the BIOS area reads as zeroes");
            Vec::new()
        }
    };

    let mut gba = Gba::new(&bios, rom);
    if args.skip_bios || args.bios.is_none() {
        gba.skip_bios();
    }

    if args.until_idle {
        if gba.run_until_idle(args.cycles)? {
            tracing::info!("program went idle");
        } else {
            tracing::warn!("cycle budget ran out before the program went idle");
        }
    } else {
        gba.run_for(args.cycles)?;
    }
    tracing::info!("stopped after {} cycles", gba.scheduler.cycles());

    if args.dump_registers {
        print_registers(&gba);
    }

    if let Some(path) = &args.save_state {
        fs::write(path, gba.save_state()?)?;
        tracing::info!("save state written to {}", path.display());
    }

    Ok(())
}

fn print_registers(gba: &Gba) {
    for (reg, value) in gba.cpu.registers.to_vec().iter().enumerate() {
        println!("r{reg:<2} 0x{value:08X}");
    }
    println!("cpsr {:?}", gba.cpu.cpsr);
    println!("cycles {}", gba.scheduler.cycles());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["satsuma", "game.gba"]).unwrap();
        assert_eq!(args.rom, PathBuf::from("game.gba"));
        assert_eq!(args.cycles, DEFAULT_CYCLES);
        assert_eq!(args.bios, None);
        assert!(!args.skip_bios);
        assert!(!args.until_idle);
    }

    #[test]
    fn all_flags() {
        let args = Args::try_parse_from([
            "satsuma",
            "game.gba",
            "--bios",
            "gba_bios.bin",
            "--skip-bios",
            "--cycles",
            "1000",
            "--until-idle",
            "--save-state",
            "state.json",
            "--dump-registers",
        ])
        .unwrap();
        assert_eq!(args.bios, Some(PathBuf::from("gba_bios.bin")));
        assert_eq!(args.cycles, 1000);
        assert_eq!(args.save_state, Some(PathBuf::from("state.json")));
        assert!(args.skip_bios && args.until_idle && args.dump_registers);
    }

    #[test]
    fn rom_is_required() {
        assert!(Args::try_parse_from(["satsuma"]).is_err());
    }
}
