use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Chip8Error>;

/// Everything that can stop an instruction from completing
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("malformed instruction: expected 2 bytes, got {len}")]
    MalformedInstruction { len: usize },

    #[error("unknown opcode {opcode:#06X}")]
    UnknownOpcode { opcode: u16 },

    #[error("address out of range: {addr:#06X} (+{len} bytes)")]
    OutOfRangeAddress { addr: u16, len: usize },

    #[error("stack overflow calling from {pc:#06X}")]
    StackOverflow { pc: u16 },

    #[error("stack underflow returning from {pc:#06X}")]
    StackUnderflow { pc: u16 },

    #[error("program is too large ({size} bytes), max size is {max} bytes")]
    ProgramTooLarge { size: usize, max: usize },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("sound error: {0}")]
    Sound(String),
}

impl Chip8Error {
    /// fatal errors end the current run; the machine state is no longer
    /// meaningful past them
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Chip8Error::UnknownOpcode { .. }
                | Chip8Error::StackOverflow { .. }
                | Chip8Error::StackUnderflow { .. }
                | Chip8Error::MalformedInstruction { .. }
        )
    }
}
