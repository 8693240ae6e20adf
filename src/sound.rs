use crate::error::{Chip8Error, Result};

/// The audio sink driven by the sound timer. `beep` starts a tone, `stop`
/// ends it; both may be called when there's nothing to do.
pub trait Sound {
    fn beep(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
}

/// C7
pub const SIMPLEBEEP_PITCH: u16 = 2093;

/// tone on the PC speaker
pub struct SimpleBeep {
    pitch: u16,
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new(pitch: u16) -> Self {
        SimpleBeep {
            pitch,
            is_beeping: false,
        }
    }

    fn tone(hertz: u16) -> Result<()> {
        beep::beep(hertz).map_err(|e| Chip8Error::Sound(e.to_string()))
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new(SIMPLEBEEP_PITCH)
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<()> {
        Self::tone(self.pitch)?;
        self.is_beeping = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.is_beeping {
            Self::tone(0)?;
            self.is_beeping = false;
        }
        Ok(())
    }
}

/// silence
#[derive(Default)]
pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}
