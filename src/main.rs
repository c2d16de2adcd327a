//! Thin CLI over the bridge: open the adapter, run one command, render the
//! structured results.  All protocol logic lives in the library.
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};

use jtag_axi::cable::mpsse::Digilent;
use jtag_axi::session::DeviceSession;
use jtag_axi::Error;

/// LED patterns swept by `test`, with human-readable names.
const PATTERNS: [(u8, &str); 8] = [
    (0x0, "off"),
    (0xF, "all-on"),
    (0xA, "alt1"),
    (0x5, "alt2"),
    (0x1, "led0"),
    (0x2, "led1"),
    (0x4, "led2"),
    (0x8, "led3"),
];

#[derive(Parser, Debug)]
#[command(name = "jtag-axi", version, about = "LED control over a JTAG-AXI bridge")]
struct Cli {
    /// FTDI description string of the JTAG adapter.
    #[arg(long, default_value = "Digilent USB Device A")]
    cable: String,

    /// TCK frequency in hertz.
    #[arg(long, default_value_t = 1_000_000)]
    clock: u32,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep the built-in LED patterns and verify each read-back.
    Test,
    /// Drive a 4-bit LED pattern.
    Write { pattern: u8 },
    /// Read the current LED pattern.
    Read,
    /// Write a 32-bit word to an arbitrary bridge address.
    Poke {
        #[arg(value_parser = parse_word)]
        addr: u32,
        #[arg(value_parser = parse_word)]
        data: u32,
    },
    /// Read a 32-bit word from an arbitrary bridge address.
    Peek {
        #[arg(value_parser = parse_word)]
        addr: u32,
    },
}

/// Accepts decimal or 0x-prefixed hex.
fn parse_word(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    u32::from_str_radix(digits, radix).map_err(|e| e.to_string())
}

fn run_sweep(session: &mut DeviceSession<Box<Digilent>>) -> Result<(), Error> {
    let mut failures = 0;
    for (pattern, name) in PATTERNS {
        match session.verify_led(pattern) {
            Ok(()) => log::info!("pattern {name} (0b{pattern:04b}) verified"),
            Err(Error::VerificationMismatch { wrote, read }) => {
                log::warn!("pattern {name} failed: wrote {wrote:#03x}, read {read:#03x}");
                failures += 1;
            }
            Err(err) => return Err(err),
        }
        // Leave each pattern visible on the board for a moment.
        thread::sleep(Duration::from_millis(200));
    }

    if failures == 0 {
        log::info!("all LED patterns verified");
    } else {
        log::warn!("{failures} pattern(s) failed verification");
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let cable = match Digilent::new(&cli.cable, cli.clock) {
        Ok(cable) => cable,
        Err(err) => {
            log::error!("failed to open JTAG adapter: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut session = match DeviceSession::open(Box::new(cable)) {
        Ok(session) => session,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Test) {
        Command::Test => run_sweep(&mut session),
        Command::Write { pattern } => session.write_led(pattern),
        Command::Read => session.read_led().map(|pattern| {
            println!("{pattern:#03x} (0b{pattern:04b})");
        }),
        Command::Poke { addr, data } => session.write_word(addr, data),
        Command::Peek { addr } => session.read_word(addr).map(|data| {
            println!("{data:#010x}");
        }),
    };
    session.close();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
