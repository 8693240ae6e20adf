use crossterm::event::{poll, read, Event, KeyCode};
use crossterm::terminal;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::{Duration, Instant};

/// map of characters read from a byte stream to what the chip8 expects,
/// where '1' => 0x01 and 'A' => 0x0a
const CHIP8_LITERAL_KEYMAP: [(char, u8); 16] = [
    ('0', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('4', 0x04),
    ('5', 0x05),
    ('6', 0x06),
    ('7', 0x07),
    ('8', 0x08),
    ('9', 0x09),
    ('A', 0x0a),
    ('B', 0x0b),
    ('C', 0x0c),
    ('D', 0x0d),
    ('E', 0x0e),
    ('F', 0x0f),
];

/// ditto using left-hand side of qwerty keyboard
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// The hex keypad. There's no queue and no edge detection: callers poll
/// whenever they want to know what's held.
pub trait Keyboard {
    /// the key (0x0-0xf) currently held down, or None
    fn key_down(&mut self) -> Result<Option<u8>, io::Error>;

    /// true once the user has asked to stop the machine
    fn quit_requested(&self) -> bool {
        false
    }
}

/// keypad read from terminal key events, using crossterm. Terminals only
/// report presses, so a key counts as held for `hold` after its last event.
pub struct TermKeyboard {
    keymap: HashMap<char, u8>,
    held: Option<(u8, Instant)>,
    hold: Duration,
    quit: bool,
}

impl TermKeyboard {
    pub fn new(hold: Duration) -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermKeyboard {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            held: None,
            hold,
            quit: false,
        })
    }

    fn read_events(&mut self) -> Result<(), io::Error> {
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => match evt.code {
                    KeyCode::Char(key) => match self.keymap.get(&key.to_ascii_lowercase()) {
                        Some(mapped_key) => self.held = Some((*mapped_key, Instant::now())),
                        None => {
                            eprintln!("Warning: can't map {:?} to a CHIP-8 key", key);
                        }
                    },
                    KeyCode::Esc => self.quit = true,
                    _ => {
                        eprintln!("Warning: unknown key event received");
                    }
                },
                Event::Resize(..) => {}
                _ => {
                    eprintln!("Warning: unknown event received");
                }
            }
        }
        Ok(())
    }
}

impl Drop for TermKeyboard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Warning: couldn't leave raw mode: {}", e);
        }
    }
}

impl Keyboard for TermKeyboard {
    fn key_down(&mut self) -> Result<Option<u8>, io::Error> {
        self.read_events()?;
        Ok(match self.held {
            Some((key, at)) if at.elapsed() < self.hold => Some(key),
            _ => None,
        })
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}

/// keypad fed from a byte stream, one byte per poll. An empty read or an
/// unmapped byte means no key.
pub struct ReaderKeyboard<R: io::Read> {
    input: R,
    keymap: HashMap<char, u8>,
}

impl<R: io::Read> ReaderKeyboard<R> {
    pub fn new(input: R) -> Self {
        ReaderKeyboard {
            input,
            keymap: HashMap::from(CHIP8_LITERAL_KEYMAP),
        }
    }
}

impl<R: io::Read> Keyboard for ReaderKeyboard<R> {
    fn key_down(&mut self) -> Result<Option<u8>, io::Error> {
        let mut buf = [0u8; 1];
        match self.input.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(self.keymap.get(&char::from(buf[0])).copied()),
        }
    }
}

/// keypad that replays a fixed sequence of polls, then reports nothing;
/// for testing
pub struct ScriptedKeyboard {
    script: VecDeque<Option<u8>>,
    pub polls: usize,
}

impl ScriptedKeyboard {
    pub fn new(script: &[Option<u8>]) -> Self {
        ScriptedKeyboard {
            script: script.iter().copied().collect(),
            polls: 0,
        }
    }

    /// `key` held for the next `polls` polls
    pub fn held(key: u8, polls: usize) -> Self {
        Self::new(&vec![Some(key); polls])
    }
}

impl Keyboard for ScriptedKeyboard {
    fn key_down(&mut self) -> Result<Option<u8>, io::Error> {
        self.polls += 1;
        Ok(self.script.pop_front().flatten())
    }
}
