/// # interpreter
///
/// Drives a `Cpu`: fetch the word at PC, decode, execute, at `clock_hz`
/// instructions a second. The timers count down on their own thread, started
/// here and stopped when the interpreter is dropped.
///
/// While the cpu is suspended on FX0A each step only polls the keyboard;
/// nothing is fetched until a key turns up.
use std::io;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::cpu::{Cpu, Snapshot, Step};
use crate::display::Display;
use crate::error::Result;
use crate::input::Keyboard;
use crate::memory::Chip8MemoryMap;
use crate::sound::Sound;
use crate::timer::{TimerTicker, Timers};

pub struct Chip8Interpreter<'a> {
    cpu: Cpu<'a>,
    config: Config,
    trace: Option<Box<dyn io::Write + 'a>>,
    _ticker: TimerTicker,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        display: &'a mut dyn Display,
        keyboard: &'a mut dyn Keyboard,
        sound: Box<dyn Sound + Send>,
        config: Config,
    ) -> Result<Chip8Interpreter<'a>> {
        let mut memory = Chip8MemoryMap::new()?;
        memory.program_addr = config.entry_point;
        let timers = Arc::new(Timers::default());
        let ticker = TimerTicker::start(Arc::clone(&timers), sound, config.timer_hz)?;
        let cpu = Cpu::new(
            memory,
            display,
            keyboard,
            timers,
            Snapshot::at(config.entry_point),
        )?;
        Ok(Chip8Interpreter {
            cpu,
            config,
            trace: None,
            _ticker: ticker,
        })
    }

    /// write every executed instruction and the state after it to `out`
    pub fn with_trace(mut self, out: Box<dyn io::Write + 'a>) -> Self {
        self.trace = Some(out);
        self
    }

    /// load a chip8 program at the entry point, returning its size
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        self.cpu.memory_mut().load_program(reader)
    }

    pub fn cpu(&self) -> &Cpu<'a> {
        &self.cpu
    }

    /// one fetch/decode/execute, or one keyboard poll while waiting on FX0A
    pub fn step(&mut self) -> Result<Step> {
        if !self.cpu.can_proceed()? {
            return Ok(Step::Waiting);
        }
        let pc = self.cpu.pc();
        let op = self.cpu.fetch()?;
        let step = self.cpu.execute(op)?;
        if let Some(out) = self.trace.as_mut() {
            writeln!(out, "{:03x}: {}", pc, op)?;
            self.cpu.log(out)?;
        }
        Ok(step)
    }

    /// Run until `max_cycles` steps have been taken (forever with None), the
    /// keyboard asks to quit, or a step fails. Returns the number of steps
    /// taken. Each step is padded out to the configured cycle time.
    pub fn main_loop(&mut self, max_cycles: Option<u64>) -> Result<u64> {
        let cycle_time = self.config.cycle_time();
        let mut cycles = 0;
        let mut next_cycle = Instant::now();
        while max_cycles.map_or(true, |max| cycles < max) {
            if self.cpu.quit_requested() {
                break;
            }
            self.step()?;
            cycles += 1;

            next_cycle += cycle_time;
            let now = Instant::now();
            if now < next_cycle {
                spin_sleep::sleep(next_cycle - now);
            } else {
                // running behind; don't try to catch up
                next_cycle = now;
            }
        }
        Ok(cycles)
    }

    /// write the cpu state to `out`
    pub fn log(&self, out: &mut impl io::Write) -> io::Result<()> {
        self.cpu.log(out)
    }

    /// hex dump of the whole of memory to `out`
    pub fn dump_memory(&self, out: &mut impl io::Write) -> io::Result<()> {
        self.cpu.memory().dump(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::HeadlessDisplay;
    use crate::error::Chip8Error;
    use crate::input::ScriptedKeyboard;
    use crate::memory::MemoryMap;
    use crate::sound::Mute;
    use std::thread;
    use std::time::Duration;

    fn fast() -> Config {
        Config {
            clock_hz: 100_000,
            ..Config::default()
        }
    }

    #[test]
    fn test_program_load_ok() -> Result<()> {
        let mut display = HeadlessDisplay::new();
        let mut keyboard = ScriptedKeyboard::new(&[]);
        let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), fast())?;
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(i.load_program(&mut prog)?, 2);
        assert_eq!(i.step()?, Step::Executed);
        assert_eq!(i.cpu().pc(), 0x202);
        drop(i);
        assert_eq!(display.clears, 1);
        Ok(())
    }

    #[test]
    fn test_program_too_large() -> Result<()> {
        let mut display = HeadlessDisplay::new();
        let mut keyboard = ScriptedKeyboard::new(&[]);
        let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), fast())?;
        let prog = vec![0u8; 0xE01];
        assert!(matches!(
            i.load_program(&mut &prog[..]),
            Err(Chip8Error::ProgramTooLarge { size: 0xE01, max: 0xE00 })
        ));
        Ok(())
    }

    #[test]
    fn test_main_loop_runs_budget() -> Result<()> {
        let mut display = HeadlessDisplay::new();
        let mut keyboard = ScriptedKeyboard::new(&[]);
        let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), fast())?;
        // V0 = 5; loop { V0 += 1 }
        let mut prog: &[u8] = &[0x60, 0x05, 0x70, 0x01, 0x12, 0x02];
        i.load_program(&mut prog)?;
        assert_eq!(i.main_loop(Some(9))?, 9);
        // one load, then four trips round the loop
        assert_eq!(i.cpu().registers()[0], 9);
        Ok(())
    }

    #[test]
    fn test_main_loop_stops_on_unknown_opcode() -> Result<()> {
        let mut display = HeadlessDisplay::new();
        let mut keyboard = ScriptedKeyboard::new(&[]);
        let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), fast())?;
        let mut prog: &[u8] = &[0x60, 0x05, 0x51, 0x23];
        i.load_program(&mut prog)?;
        match i.main_loop(Some(100)) {
            Err(e @ Chip8Error::UnknownOpcode { opcode: 0x5123 }) => assert!(e.is_fatal()),
            other => panic!("expected UnknownOpcode, got {:?}", other),
        }
        assert_eq!(i.cpu().pc(), 0x202);
        Ok(())
    }

    #[test]
    fn test_wait_for_key_blocks_fetch() -> Result<()> {
        let mut display = HeadlessDisplay::new();
        let mut keyboard = ScriptedKeyboard::new(&[None, None, Some(0x3)]);
        let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), fast())?;
        // V0 = key; V1 = V0
        let mut prog: &[u8] = &[0xF0, 0x0A, 0x81, 0x00];
        i.load_program(&mut prog)?;
        assert_eq!(i.step()?, Step::Waiting);
        assert_eq!(i.step()?, Step::Waiting);
        assert_eq!(i.cpu().pc(), 0x200);
        // the key finishes FX0A and the next instruction runs
        assert_eq!(i.step()?, Step::Executed);
        assert_eq!(i.cpu().pc(), 0x204);
        assert_eq!(i.cpu().registers()[..2], [0x3, 0x3]);
        drop(i);
        assert_eq!(keyboard.polls, 3);
        Ok(())
    }

    #[test]
    fn test_trace_records_each_step() -> Result<()> {
        let mut display = HeadlessDisplay::new();
        let mut keyboard = ScriptedKeyboard::new(&[]);
        let mut out: Vec<u8> = Vec::new();
        {
            let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), fast())?
                .with_trace(Box::new(&mut out));
            let mut prog: &[u8] = &[0x6A, 0x42, 0xA1, 0x23];
            i.load_program(&mut prog)?;
            i.main_loop(Some(2))?;
        }
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("200: 6A42\n"));
        assert!(text.contains("202: A123\n"));
        assert!(text.contains("register[a] = 42\n"));
        assert!(text.contains("i = 123\n"));
        Ok(())
    }

    /// poll `done` until it holds or a generous deadline passes
    fn eventually(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    #[test]
    fn test_timers_count_down_in_background() -> Result<()> {
        let mut display = HeadlessDisplay::new();
        let mut keyboard = ScriptedKeyboard::new(&[]);
        let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), fast())?;
        // DT = 0xFF
        let mut prog: &[u8] = &[0x60, 0xFF, 0xF0, 0x15];
        i.load_program(&mut prog)?;
        i.step()?;
        i.step()?;
        let timers = Arc::clone(i.cpu().timers());
        assert!(eventually(|| timers.delay() < 0xFF));
        Ok(())
    }

    #[test]
    fn test_timers_keep_running_while_waiting_for_key() -> Result<()> {
        let mut display = HeadlessDisplay::new();
        let mut keyboard = ScriptedKeyboard::new(&[]);
        let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), fast())?;
        // DT = 0xFF; V1 = key
        let mut prog: &[u8] = &[0x60, 0xFF, 0xF0, 0x15, 0xF1, 0x0A];
        i.load_program(&mut prog)?;
        i.step()?;
        i.step()?;
        assert_eq!(i.step()?, Step::Waiting);
        let timers = Arc::clone(i.cpu().timers());
        let start = timers.delay();

        let mut polls = 0;
        assert!(eventually(|| {
            polls += 1;
            matches!(i.step(), Ok(Step::Waiting)) && start.saturating_sub(timers.delay()) >= 2
        }));
        assert!(polls > 0);
        assert!(i.cpu().is_waiting());
        assert_eq!(i.cpu().pc(), 0x204);
        Ok(())
    }

    #[test]
    fn test_entry_point_past_memory_is_an_error() -> Result<()> {
        let mut display = HeadlessDisplay::new();
        let mut keyboard = ScriptedKeyboard::new(&[]);
        let config = Config {
            entry_point: 0x2000,
            ..fast()
        };
        let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), config)?;
        let mut prog: &[u8] = &[0x61, 0x01];
        assert!(matches!(
            i.load_program(&mut prog),
            Err(Chip8Error::OutOfRangeAddress { addr: 0x2000, len: 2 })
        ));
        assert!(matches!(
            i.step(),
            Err(Chip8Error::OutOfRangeAddress { addr: 0x2000, len: 2 })
        ));
        Ok(())
    }

    #[test]
    fn test_log_and_dump_memory() -> Result<()> {
        let mut display = HeadlessDisplay::new();
        let mut keyboard = ScriptedKeyboard::new(&[]);
        let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), fast())?;
        let mut prog: &[u8] = &[0x6A, 0x42];
        i.load_program(&mut prog)?;
        i.step()?;

        let mut out = Vec::new();
        i.log(&mut out)?;
        i.dump_memory(&mut out)?;
        let text = String::from_utf8_lossy(&out);
        assert!(text.starts_with("pc = 202\n"));
        assert!(text.contains("register[a] = 42\n"));
        assert!(text.contains("\n000: f0 90 90 90 f0 20 60 20"));
        assert!(text.contains("\n200: 6a 42 00"));
        assert_eq!(text.lines().filter(|l| l.contains(':')).count(), 0x100);
        Ok(())
    }

    #[test]
    fn test_entry_point_is_configurable() -> Result<()> {
        let mut display = HeadlessDisplay::new();
        let mut keyboard = ScriptedKeyboard::new(&[]);
        let config = Config {
            entry_point: 0x600,
            ..fast()
        };
        let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), config)?;
        let mut prog: &[u8] = &[0x61, 0x01];
        i.load_program(&mut prog)?;
        assert_eq!(i.cpu().memory().get_ro_slice(0x600, 2)?, &[0x61, 0x01]);
        i.step()?;
        assert_eq!(i.cpu().pc(), 0x602);
        Ok(())
    }
}
