//! # chip8vm
//!
//! A CHIP-8 virtual machine: 4KiB of memory, sixteen 8-bit registers, a
//! 16-deep call stack, a 64x32 monochrome screen, a 16-key hex keypad and two
//! 60Hz countdown timers.
//!
//! ## Design
//!
//! * instructions run as fast as possible then sleep, to match the clock
//!   rate; so not quite authentic
//! * timers tick on their own thread so they keep 60Hz whatever the clock
//! * abstract display so can plug alternatives; starting with TUI in-console
//! * input device, with trait for reading key-presses
//! * audio device, with trait for making beeps
//!
//! Model
//!
//! ```text
//! main
//!  |-- display, keyboard, sound, config
//!  |-- interpreter(display, keyboard, sound, config)
//!  |    |-- cpu(memory, display, keyboard, timers)
//!  |    |    `-- instruction decoder
//!  |    `-- timer ticker(timers, sound)
//!  `-- main loop
//!       |-- if waiting on FX0A: poll keyboard, go round again
//!       |-- fetch 2 bytes at PC, decode, execute
//!       `-- sleep off the rest of the cycle
//! ```
pub mod config;
pub mod cpu;
pub mod display;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod sound;
pub mod timer;

pub use config::Config;
pub use cpu::{Cpu, Snapshot, Step};
pub use error::{Chip8Error, Result};
pub use instruction::Instruction;
pub use interpreter::Chip8Interpreter;
