use std::time::Duration;

use crate::memory::CHIP8_PROGRAM_ADDR;
use crate::sound::SIMPLEBEEP_PITCH;
use crate::timer::TIMER_HZ;

/// instructions per second, roughly what COSMAC VIP programs expect
pub const DEFAULT_CLOCK_HZ: u32 = 500;

/// How a machine is set up and paced
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// instructions executed per second by the main loop
    pub clock_hz: u32,
    /// countdown rate of DT and ST
    pub timer_hz: u32,
    /// initial PC
    pub entry_point: u16,
    /// tone for the sound timer, in Hz
    pub beep_pitch: u16,
    /// how long a terminal key press counts as held
    pub key_hold: Duration,
    /// stop after this many cycles; None runs until an error or quit
    pub max_cycles: Option<u64>,
}

impl Config {
    /// time budget for one instruction
    pub fn cycle_time(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.clock_hz.max(1)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            clock_hz: DEFAULT_CLOCK_HZ,
            timer_hz: TIMER_HZ,
            entry_point: CHIP8_PROGRAM_ADDR,
            beep_pitch: SIMPLEBEEP_PITCH,
            key_hold: Duration::from_millis(150),
            max_cycles: None,
        }
    }
}
