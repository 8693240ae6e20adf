//! # cpu
//!
//! The execution engine. Owns the registers, stack, PC, I and memory, and is
//! wired to a display and keyboard it doesn't own. Each call to `execute`
//! runs exactly one decoded instruction:
//!
//! - VF (register 0xF) is the carry/borrow/collision flag, and is always
//!   written after the result, so an instruction with X = 0xF ends with the
//!   flag in VF
//! - every instruction that doesn't jump, skip or wait moves PC on by one
//!   instruction width as its last step
//! - FX0A is the only instruction that can suspend; while suspended the cpu
//!   refuses further instructions until `can_proceed` sees a key
//!
//! The stack holds 16 return addresses. A 17th call is `StackOverflow`, a
//! return with nothing on the stack is `StackUnderflow`; in both cases the
//! cpu is left untouched.
use std::fmt;
use std::io;
use std::sync::Arc;

use crate::display::Display;
use crate::error::{Chip8Error, Result};
use crate::input::Keyboard;
use crate::instruction::{Instruction, INSTRUCTION_WIDTH};
use crate::memory::{Chip8MemoryMap, MemoryMap, CHIP8_PROGRAM_ADDR};
use crate::timer::Timers;

pub const REGISTER_COUNT: usize = 16;
pub const STACK_DEPTH: usize = 16;

/// VF
const FLAG: usize = 0xF;

/// FX1E sets VF when I passes the top of memory
const I_LIMIT: u32 = 0xFFF;

/// What `execute` did with the instruction it was given
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// ran to completion; PC has moved on
    Executed,
    /// waiting for a key (FX0A); PC hasn't moved
    Waiting,
}

/// what an instruction does to PC
enum Advance {
    Next,
    SkipIf(bool),
    Jump(u16),
    Wait,
}

/// A copy of everything the cpu tracks apart from memory: used for the
/// diagnostic dump and to give the cpu its starting values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub pc: u16,
    pub sp: u8,
    pub dt: u8,
    pub st: u8,
    pub i: u16,
    pub stack: [u16; STACK_DEPTH],
    pub registers: [u8; REGISTER_COUNT],
}

impl Snapshot {
    /// everything zeroed, PC at `pc`
    pub fn at(pc: u16) -> Self {
        Snapshot {
            pc,
            sp: 0,
            dt: 0,
            st: 0,
            i: 0,
            stack: [0; STACK_DEPTH],
            registers: [0; REGISTER_COUNT],
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::at(CHIP8_PROGRAM_ADDR)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "pc = {:x}", self.pc)?;
        writeln!(f, "sp = {:x}", self.sp)?;
        writeln!(f, "dt = {:x}", self.dt)?;
        writeln!(f, "st = {:x}", self.st)?;
        writeln!(f, "i = {:x}", self.i)?;
        writeln!(f, "stack = {:x?}", self.stack)?;
        for (n, v) in self.registers.iter().enumerate() {
            writeln!(f, "register[{:x}] = {:x}", n, v)?;
        }
        Ok(())
    }
}

pub struct Cpu<'a> {
    memory: Chip8MemoryMap,
    display: &'a mut dyn Display,
    keyboard: &'a mut dyn Keyboard,
    timers: Arc<Timers>,
    registers: [u8; REGISTER_COUNT],
    stack: [u16; STACK_DEPTH],
    sp: u8,
    pc: u16,
    i: u16,
    /// register FX0A will write the key into, while suspended
    awaiting_key: Option<u8>,
}

impl<'a> Cpu<'a> {
    /// A cpu starting from `start`. DT and ST from `start` are written into
    /// the shared timers.
    pub fn new(
        memory: Chip8MemoryMap,
        display: &'a mut dyn Display,
        keyboard: &'a mut dyn Keyboard,
        timers: Arc<Timers>,
        start: Snapshot,
    ) -> Result<Self> {
        if start.sp as usize > STACK_DEPTH {
            return Err(Chip8Error::StackOverflow { pc: start.pc });
        }
        timers.set_delay(start.dt);
        timers.set_sound(start.st);
        Ok(Cpu {
            memory,
            display,
            keyboard,
            timers,
            registers: start.registers,
            stack: start.stack,
            sp: start.sp,
            pc: start.pc,
            i: start.i,
            awaiting_key: None,
        })
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Chip8MemoryMap {
        &mut self.memory
    }

    pub fn timers(&self) -> &Arc<Timers> {
        &self.timers
    }

    /// true while suspended on FX0A
    pub fn is_waiting(&self) -> bool {
        self.awaiting_key.is_some()
    }

    /// the keyboard asked to stop the machine
    pub fn quit_requested(&self) -> bool {
        self.keyboard.quit_requested()
    }

    /// the instruction at PC
    pub fn fetch(&self) -> Result<Instruction> {
        self.memory.fetch(self.pc)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pc: self.pc,
            sp: self.sp,
            dt: self.timers.delay(),
            st: self.timers.sound(),
            i: self.i,
            stack: self.stack,
            registers: self.registers,
        }
    }

    /// write the diagnostic dump to `out`
    pub fn log(&self, out: &mut impl io::Write) -> io::Result<()> {
        write!(out, "{}", self.snapshot())
    }

    /// Whether the cpu will accept an instruction. Only false while FX0A is
    /// waiting; each call polls the keyboard once, and a key finishes the
    /// FX0A (VX = key, PC moves on).
    pub fn can_proceed(&mut self) -> Result<bool> {
        let x = match self.awaiting_key {
            Some(x) => x,
            None => return Ok(true),
        };
        match self.keyboard.key_down()? {
            Some(key) => {
                self.registers[x as usize] = key;
                self.awaiting_key = None;
                self.pc = self.pc.wrapping_add(INSTRUCTION_WIDTH);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run one instruction. While suspended on FX0A nothing happens and
    /// `Step::Waiting` comes back.
    pub fn execute(&mut self, op: Instruction) -> Result<Step> {
        if self.awaiting_key.is_some() {
            return Ok(Step::Waiting);
        }

        let x = op.x() as usize;
        let y = op.y() as usize;
        let advance = match op.nibbles() {
            (0x0, _, 0xE, 0x0) => self.cls()?,
            (0x0, _, 0xE, 0xE) => self.ret()?,
            (0x1, ..) => Advance::Jump(op.nnn()),
            (0x2, ..) => self.call(op.nnn())?,
            (0x3, ..) => Advance::SkipIf(self.registers[x] == op.nn()),
            (0x4, ..) => Advance::SkipIf(self.registers[x] != op.nn()),
            (0x5, .., 0x0) => Advance::SkipIf(self.registers[x] == self.registers[y]),
            (0x6, ..) => {
                self.registers[x] = op.nn();
                Advance::Next
            }
            (0x7, ..) => {
                self.registers[x] = self.registers[x].wrapping_add(op.nn());
                Advance::Next
            }
            (0x8, .., 0x0) => {
                self.registers[x] = self.registers[y];
                Advance::Next
            }
            (0x8, .., 0x1) => {
                self.registers[x] |= self.registers[y];
                Advance::Next
            }
            (0x8, .., 0x2) => {
                self.registers[x] &= self.registers[y];
                Advance::Next
            }
            (0x8, .., 0x3) => {
                self.registers[x] ^= self.registers[y];
                Advance::Next
            }
            (0x8, .., 0x4) => self.add(x, y),
            (0x8, .., 0x5) => self.sub(x, y),
            (0x8, .., 0x6) => self.shr(x),
            (0x8, .., 0x7) => self.subn(x, y),
            (0x8, .., 0xE) => self.shl(x),
            (0x9, .., 0x0) => Advance::SkipIf(self.registers[x] != self.registers[y]),
            (0xA, ..) => {
                self.i = op.nnn();
                Advance::Next
            }
            (0xB, ..) => Advance::Jump(op.nnn().wrapping_add(u16::from(self.registers[0]))),
            (0xC, ..) => {
                self.registers[x] = rand::random::<u8>() & op.nn();
                Advance::Next
            }
            (0xD, ..) => self.drw(x, y, op.n())?,
            (0xE, _, 0x9, 0xE) => Advance::SkipIf(self.keyboard.key_down()? == Some(self.registers[x])),
            (0xE, _, 0xA, 0x1) => Advance::SkipIf(self.keyboard.key_down()? != Some(self.registers[x])),
            (0xF, _, 0x0, 0x7) => {
                self.registers[x] = self.timers.delay();
                Advance::Next
            }
            (0xF, _, 0x0, 0xA) => self.wait_for_key(x)?,
            (0xF, _, 0x1, 0x5) => {
                self.timers.set_delay(self.registers[x]);
                Advance::Next
            }
            (0xF, _, 0x1, 0x8) => {
                self.timers.set_sound(self.registers[x]);
                Advance::Next
            }
            (0xF, _, 0x1, 0xE) => self.addi(x),
            (0xF, _, 0x2, 0x9) => {
                self.i = self.memory.glyph_addr(self.registers[x]);
                Advance::Next
            }
            (0xF, _, 0x3, 0x3) => {
                self.memory.save_bcd(self.registers[x], self.i)?;
                Advance::Next
            }
            (0xF, _, 0x5, 0x5) => {
                self.memory.save(&self.registers[..=x], self.i)?;
                Advance::Next
            }
            (0xF, _, 0x6, 0x5) => {
                self.memory.load(&mut self.registers[..=x], self.i)?;
                Advance::Next
            }
            _ => return Err(Chip8Error::UnknownOpcode { opcode: op.word() }),
        };

        let next = match advance {
            Advance::Next => self.pc.wrapping_add(INSTRUCTION_WIDTH),
            Advance::SkipIf(false) => self.pc.wrapping_add(INSTRUCTION_WIDTH),
            Advance::SkipIf(true) => self.pc.wrapping_add(2 * INSTRUCTION_WIDTH),
            Advance::Jump(addr) => addr,
            Advance::Wait => return Ok(Step::Waiting),
        };
        self.pc = next;
        Ok(Step::Executed)
    }

    /// store an arithmetic result, then the flag
    fn set_with_flag(&mut self, x: usize, value: u8, flag: bool) -> Advance {
        self.registers[x] = value;
        self.registers[FLAG] = u8::from(flag);
        Advance::Next
    }

    /// clear
    fn cls(&mut self) -> Result<Advance> {
        self.display.clear();
        self.display.flush()?;
        Ok(Advance::Next)
    }

    /// PC = STACK.pop()
    fn ret(&mut self) -> Result<Advance> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow { pc: self.pc });
        }
        self.sp -= 1;
        Ok(Advance::Jump(self.stack[self.sp as usize]))
    }

    /// STACK.push(PC + 2); PC = addr
    fn call(&mut self, addr: u16) -> Result<Advance> {
        if self.sp as usize >= STACK_DEPTH {
            return Err(Chip8Error::StackOverflow { pc: self.pc });
        }
        self.stack[self.sp as usize] = self.pc.wrapping_add(INSTRUCTION_WIDTH);
        self.sp += 1;
        Ok(Advance::Jump(addr))
    }

    /// Vx += Vy; VF = carry
    fn add(&mut self, x: usize, y: usize) -> Advance {
        let (sum, carry) = self.registers[x].overflowing_add(self.registers[y]);
        self.set_with_flag(x, sum, carry)
    }

    /// Vx -= Vy; VF = !borrow
    fn sub(&mut self, x: usize, y: usize) -> Advance {
        let (diff, borrow) = self.registers[x].overflowing_sub(self.registers[y]);
        self.set_with_flag(x, diff, !borrow)
    }

    /// Vx = Vy - Vx; VF = !borrow
    fn subn(&mut self, x: usize, y: usize) -> Advance {
        let (diff, borrow) = self.registers[y].overflowing_sub(self.registers[x]);
        self.set_with_flag(x, diff, !borrow)
    }

    /// Vx >>= 1; VF = old lsb
    fn shr(&mut self, x: usize) -> Advance {
        let vx = self.registers[x];
        self.set_with_flag(x, vx >> 1, vx & 0x01 != 0)
    }

    /// Vx <<= 1; VF = old msb
    fn shl(&mut self, x: usize) -> Advance {
        let vx = self.registers[x];
        self.set_with_flag(x, vx << 1, vx & 0x80 != 0)
    }

    /// I += Vx; VF = I went past 0xFFF
    fn addi(&mut self, x: usize) -> Advance {
        let vx = self.registers[x];
        let overflow = u32::from(self.i) + u32::from(vx) > I_LIMIT;
        self.i = self.i.wrapping_add(u16::from(vx));
        self.registers[FLAG] = u8::from(overflow);
        Advance::Next
    }

    /// draw_sprite(x=Vx y=Vy size=n)
    /// XORs the n-byte sprite at I onto the screen, one byte per row, and
    /// flushes once at the end. VF = any row collided.
    fn drw(&mut self, x: usize, y: usize, n: u8) -> Result<Advance> {
        // read the whole sprite first so a bad I leaves the screen alone
        let mut sprite = [0u8; 0xF];
        let sprite = &mut sprite[..n as usize];
        self.memory.read(sprite, self.i)?;

        let (vx, vy) = (self.registers[x], self.registers[y]);
        let mut collision = false;
        for (row, byte) in sprite.iter().enumerate() {
            collision |= self.display.draw(vx, vy.wrapping_add(row as u8), *byte);
        }
        self.registers[FLAG] = u8::from(collision);
        self.display.flush()?;
        Ok(Advance::Next)
    }

    /// Vx = key, once one is down
    fn wait_for_key(&mut self, x: usize) -> Result<Advance> {
        match self.keyboard.key_down()? {
            Some(key) => {
                self.registers[x] = key;
                Ok(Advance::Next)
            }
            None => {
                self.awaiting_key = Some(x as u8);
                Ok(Advance::Wait)
            }
        }
    }
}

impl fmt::Debug for Cpu<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.snapshot())
            .field("awaiting_key", &self.awaiting_key)
            .finish()
    }
}
