//! # timers
//!
//! The delay (DT) and sound (ST) timers count down at 60Hz on their own
//! thread, independent of how fast instructions run. The cpu and the ticker
//! share one `Timers`; each timer is a single atomic byte so a read, a write
//! and a clamped decrement are each indivisible. DT and ST are never updated
//! together.
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::sound::Sound;

/// how often the timers count down
pub const TIMER_HZ: u32 = 60;

#[derive(Debug, Default)]
pub struct Timers {
    delay: AtomicU8,
    sound: AtomicU8,
}

impl Timers {
    pub fn new(delay: u8, sound: u8) -> Self {
        Timers {
            delay: AtomicU8::new(delay),
            sound: AtomicU8::new(sound),
        }
    }

    pub fn delay(&self) -> u8 {
        self.delay.load(Ordering::SeqCst)
    }

    pub fn sound(&self) -> u8 {
        self.sound.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, value: u8) {
        self.delay.store(value, Ordering::SeqCst)
    }

    pub fn set_sound(&self, value: u8) {
        self.sound.store(value, Ordering::SeqCst)
    }

    /// Count both timers down by one, stopping at zero. Returns true only
    /// when this tick took ST from 1 to 0.
    pub fn tick(&self) -> bool {
        let countdown = |v: u8| v.checked_sub(1);
        // Err means it was already 0, which is fine
        let _ = self
            .delay
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, countdown);
        matches!(
            self.sound
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, countdown),
            Ok(1)
        )
    }
}

/// Background thread ticking a shared `Timers` at a fixed rate. Beeps once
/// when ST runs out and silences the beep on the following tick. Dropping the
/// ticker stops the thread.
pub struct TimerTicker {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TimerTicker {
    pub fn start(
        timers: Arc<Timers>,
        mut sound: Box<dyn Sound + Send>,
        rate_hz: u32,
    ) -> Result<Self, io::Error> {
        let period = Duration::from_secs_f64(1.0 / f64::from(rate_hz.max(1)));
        let stop = Arc::new(AtomicBool::new(false));
        let stopped = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("chip8-timers".into())
            .spawn(move || {
                let mut next_tick = Instant::now() + period;
                let mut beeping = false;
                while !stopped.load(Ordering::SeqCst) {
                    let now = Instant::now();
                    if now < next_tick {
                        spin_sleep::sleep(next_tick - now);
                    }
                    next_tick += period;

                    if beeping {
                        if let Err(e) = sound.stop() {
                            eprintln!("Warning: couldn't stop beep: {}", e);
                        }
                        beeping = false;
                    }
                    if timers.tick() {
                        match sound.beep() {
                            Ok(()) => beeping = true,
                            Err(e) => eprintln!("Warning: couldn't beep: {}", e),
                        }
                    }
                }
                if beeping {
                    if let Err(e) = sound.stop() {
                        eprintln!("Warning: couldn't stop beep: {}", e);
                    }
                }
            })?;

        Ok(TimerTicker {
            stop,
            handle: Some(handle),
        })
    }

    /// stop ticking and wait for the thread to finish
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                eprintln!("Warning: timer thread panicked");
            }
        }
    }
}

impl Drop for TimerTicker {
    fn drop(&mut self) {
        self.stop()
    }
}
