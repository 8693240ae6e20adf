use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use chip8vm::config::DEFAULT_CLOCK_HZ;
use chip8vm::display::{Display, MonoTermDisplay};
use chip8vm::input::{Keyboard, TermKeyboard};
use chip8vm::sound::{Mute, SimpleBeep, Sound, SIMPLEBEEP_PITCH};
use chip8vm::timer::TIMER_HZ;
use chip8vm::{Chip8Error, Chip8Interpreter, Config};

#[derive(Parser)]
#[command(version, about = "Run a CHIP-8 program in the terminal")]
struct Args {
    /// CHIP-8 program image, loaded at 0x200
    rom: PathBuf,
    /// Instructions per second
    #[arg(long, default_value_t = DEFAULT_CLOCK_HZ)]
    clock_hz: u32,
    /// Timer countdown rate
    #[arg(long, default_value_t = TIMER_HZ)]
    timer_hz: u32,
    /// Beep pitch in Hz
    #[arg(long, default_value_t = SIMPLEBEEP_PITCH)]
    pitch: u16,
    /// How long a key press counts as held, in milliseconds
    #[arg(long, default_value_t = 150)]
    key_hold_ms: u64,
    /// Stop after this many cycles
    #[arg(long)]
    max_cycles: Option<u64>,
    /// No sound
    #[arg(short, long)]
    mute: bool,
    /// Write every executed instruction and the cpu state to this file
    #[arg(long)]
    trace: Option<PathBuf>,
    /// Write the cpu state and a hex dump of memory to this file when the run ends
    #[arg(long)]
    dump: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            clock_hz: self.clock_hz,
            timer_hz: self.timer_hz,
            beep_pitch: self.pitch,
            key_hold: Duration::from_millis(self.key_hold_ms),
            max_cycles: self.max_cycles,
            ..Config::default()
        }
    }
}

/// a failed run, with the cpu state if the error was fatal
struct Failure {
    error: Chip8Error,
    state: Option<Vec<u8>>,
}

impl From<Chip8Error> for Failure {
    fn from(error: Chip8Error) -> Self {
        Failure { error, state: None }
    }
}

fn run<'a>(
    display: &'a mut dyn Display,
    keyboard: &'a mut dyn Keyboard,
    sound: Box<dyn Sound + Send>,
    config: Config,
    trace: Option<Box<dyn io::Write>>,
    dump: Option<File>,
    rom: &mut File,
) -> Result<u64, Failure> {
    let max_cycles = config.max_cycles;
    let mut interpreter = Chip8Interpreter::new(display, keyboard, sound, config)?;
    if let Some(out) = trace {
        interpreter = interpreter.with_trace(out);
    }
    interpreter.load_program(rom)?;
    let result = interpreter.main_loop(max_cycles);

    if let Some(file) = dump {
        let mut out = BufWriter::new(file);
        interpreter.log(&mut out).map_err(Chip8Error::from)?;
        interpreter.dump_memory(&mut out).map_err(Chip8Error::from)?;
        out.flush().map_err(Chip8Error::from)?;
    }
    result.map_err(|error| {
        let mut state = Vec::new();
        let logged = error.is_fatal() && interpreter.log(&mut state).is_ok();
        Failure {
            state: logged.then_some(state),
            error,
        }
    })
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = Args::parse();
    let config = args.config();

    let mut rom = File::open(&args.rom)?;
    let trace: Option<Box<dyn io::Write>> = match &args.trace {
        Some(path) => Some(Box::new(BufWriter::new(File::create(path)?))),
        None => None,
    };
    let dump = args.dump.as_ref().map(File::create).transpose()?;
    let sound: Box<dyn Sound + Send> = if args.mute {
        Box::new(Mute::new())
    } else {
        Box::new(SimpleBeep::new(config.beep_pitch))
    };

    // the terminal is restored when these go out of scope
    let result = {
        let mut display = MonoTermDisplay::new()?;
        let mut keyboard = TermKeyboard::new(config.key_hold)?;
        run(&mut display, &mut keyboard, sound, config, trace, dump, &mut rom)
    };

    match result {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(Failure { error, state }) => {
            if error.is_fatal() {
                eprintln!("Fatal: {}", error);
            } else {
                eprintln!("Error: {}", error);
            }
            if let Some(state) = state {
                eprint!("{}", String::from_utf8_lossy(&state));
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
