use std::io;

use crate::error::{Chip8Error, Result};
use crate::instruction::{Instruction, INSTRUCTION_WIDTH};

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the addressable memory. Every access is bounds checked: an
/// address range that leaves memory is an error, never wrapped or clamped.
pub trait MemoryMap {
    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) -> Result<()> {
        self.get_rw_slice(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// fill `buf` from memory starting at `addr`
    fn read(&self, buf: &mut [u8], addr: u16) -> Result<()> {
        buf.copy_from_slice(self.get_ro_slice(addr, buf.len())?);
        Ok(())
    }

    /// the instruction at `addr`
    fn fetch(&self, addr: u16) -> Result<Instruction> {
        Instruction::decode(self.get_ro_slice(addr, INSTRUCTION_WIDTH as usize)?)
    }

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8]>;

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8]>;
}

/// The CHIP-8 memory map, 4K configuration:
///   0x0000-0x004f  font
///   0x0050-0x01ff  unused (the interpreter lived here)
///   0x0200-0x0fff  program
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
    pub program_addr: u16,
    pub font_addr: u16,
}

impl MemoryMap for Chip8MemoryMap {
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8]> {
        let range = self.range(addr, len)?;
        Ok(&mut self.bytes[range])
    }

    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8]> {
        let range = self.range(addr, len)?;
        Ok(&self.bytes[range])
    }
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// bytes per font glyph
const CHIP8_GLYPH_SIZE: u16 = 5;

impl Chip8MemoryMap {
    /// zeroed memory with the font baked in at 0x000
    pub fn new() -> Result<Self> {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice(),
            program_addr: CHIP8_PROGRAM_ADDR,
            font_addr: CHIP8_FONT_ADDR,
        };
        mm.write(&CHIP8_FONT, CHIP8_FONT_ADDR)?;
        Ok(mm)
    }

    /// load a CHIP-8 program at `program_addr`, returning its size. The image is
    /// copied verbatim, so an odd trailing byte is kept.
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let max = CHIP8_RAM_SIZE_BYTES
            .checked_sub(self.program_addr as usize)
            .ok_or(Chip8Error::OutOfRangeAddress {
                addr: self.program_addr,
                len: buf.len(),
            })?;
        if buf.len() > max {
            return Err(Chip8Error::ProgramTooLarge {
                size: buf.len(),
                max,
            });
        }
        self.write(&buf, self.program_addr)?;
        Ok(buf.len())
    }

    /// store V0..VX starting at `addr`
    pub fn save(&mut self, registers: &[u8], addr: u16) -> Result<()> {
        self.write(registers, addr)
    }

    /// fill V0..VX from memory starting at `addr`
    pub fn load(&self, registers: &mut [u8], addr: u16) -> Result<()> {
        self.read(registers, addr)
    }

    /// store the hundreds, tens and ones of `value` at addr, addr+1, addr+2
    pub fn save_bcd(&mut self, value: u8, addr: u16) -> Result<()> {
        self.write(&[value / 100, value / 10 % 10, value % 10], addr)
    }

    /// address of the glyph for a hex digit. Anything above 0xF gets glyph 0.
    pub fn glyph_addr(&self, digit: u8) -> u16 {
        match digit {
            0x0..=0xF => self.font_addr + u16::from(digit) * CHIP8_GLYPH_SIZE,
            _ => self.font_addr,
        }
    }

    /// hex dump of the whole address space, 16 bytes a line
    pub fn dump(&self, out: &mut impl io::Write) -> io::Result<()> {
        for (line, chunk) in self.bytes.chunks(16).enumerate() {
            write!(out, "{:03x}:", line * 16)?;
            for b in chunk {
                write!(out, " {:02x}", b)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn range(&self, addr: u16, len: usize) -> Result<std::ops::Range<usize>> {
        let a = addr as usize;
        match a.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(a..end),
            _ => Err(Chip8Error::OutOfRangeAddress { addr, len }),
        }
    }
}

const CHIP8_FONT_ADDR: u16 = 0x000;
const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
