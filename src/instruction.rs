//! # Instructions
//!
//! CHIP-8 instructions are 2 bytes, stored big-endian. Their behaviour is
//! selected by some combination of:
//! - `(n, _, _, _)` the class; applies to all instructions
//! - `(_, _, _, n)` the sub-class, within overloaded classes (5, 8, 9)
//! - `(_, _, n, n)` the whole low byte, within classes 0, E and F
//!
//! Nibbles not used for selection usually carry operands:
//! - `(_, n, n, n)` NNN, a 12-bit address
//! - `(_, _, n, n)` NN, an immediate byte
//! - `(_, n, _, _)` X, a register (or the last of a range V0..VX)
//! - `(_, _, n, _)` Y, a register
//! - `(_, _, _, n)` N, a 4-bit immediate (sprite height)
//!
//! Decoding only checks the width. Whether a class/sub-class pair means
//! anything is up to the cpu.
use std::fmt;

use crate::error::{Chip8Error, Result};

/// size of one instruction, in bytes
pub const INSTRUCTION_WIDTH: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    hi: u8,
    lo: u8,
}

impl Instruction {
    /// decode a raw instruction; anything other than exactly two bytes is
    /// rejected
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        match *bytes {
            [hi, lo] => Ok(Instruction { hi, lo }),
            _ => Err(Chip8Error::MalformedInstruction { len: bytes.len() }),
        }
    }

    /// the full 16-bit word
    pub fn word(&self) -> u16 {
        u16::from(self.hi) << 8 | u16::from(self.lo)
    }

    /// `[c___]`
    pub fn class(&self) -> u8 {
        self.hi >> 4
    }

    /// `[___s]`
    pub fn sub_class(&self) -> u8 {
        self.lo & 0x0F
    }

    /// `[_x__]`
    pub fn x(&self) -> u8 {
        self.hi & 0x0F
    }

    /// `[__y_]`
    pub fn y(&self) -> u8 {
        self.lo >> 4
    }

    /// `[___n]`
    pub fn n(&self) -> u8 {
        self.lo & 0x0F
    }

    /// `[__nn]`
    pub fn nn(&self) -> u8 {
        self.lo
    }

    /// `[_nnn]`
    pub fn nnn(&self) -> u16 {
        u16::from(self.hi & 0x0F) << 8 | u16::from(self.lo)
    }

    /// all four nibbles, most significant first
    pub fn nibbles(&self) -> (u8, u8, u8, u8) {
        (self.class(), self.x(), self.y(), self.sub_class())
    }
}

impl TryFrom<&[u8]> for Instruction {
    type Error = Chip8Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Instruction::decode(bytes)
    }
}

impl From<u16> for Instruction {
    fn from(word: u16) -> Self {
        let [hi, lo] = word.to_be_bytes();
        Instruction { hi, lo }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04X}", self.word())
    }
}
