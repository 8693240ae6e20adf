use std::fmt;
use std::io;

use crossterm::{cursor, execute, terminal};
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Display is used by the cpu to draw things on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work.
pub trait Display {
    /// switch every pixel off
    fn clear(&mut self);

    /// XOR one sprite row onto the screen with its left edge at (x, y);
    /// coordinates wrap. Returns true if any lit pixel was switched off.
    fn draw(&mut self, x: u8, y: u8, sprite: u8) -> bool;

    /// push the current pixels out to wherever they're being shown
    fn flush(&mut self) -> Result<(), io::Error>;
}

/// The 64x32 monochrome pixel grid. Each row is a u64, column 0 in the most
/// significant bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    rows: [u64; DISPLAY_HEIGHT],
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer {
            rows: [0; DISPLAY_HEIGHT],
        }
    }

    pub fn clear(&mut self) {
        self.rows = [0; DISPLAY_HEIGHT];
    }

    /// unpack `sprite` msb first and XOR it in at column x+bit, row y
    pub fn draw(&mut self, x: u8, y: u8, sprite: u8) -> bool {
        let row = &mut self.rows[y as usize % DISPLAY_HEIGHT];
        let mut collision = false;
        for bit in 0..8 {
            if sprite & (0x80 >> bit) == 0 {
                continue;
            }
            let col = (x as usize + bit) % DISPLAY_WIDTH;
            let mask = 1u64 << (DISPLAY_WIDTH - 1 - col);
            collision |= *row & mask != 0;
            *row ^= mask;
        }
        collision
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.rows[y % DISPLAY_HEIGHT] & (1u64 << (DISPLAY_WIDTH - 1 - x % DISPLAY_WIDTH)) != 0
    }

    /// (x, y) of every pixel that is on (`lit`) or off, in canvas coordinates
    /// where y grows upwards
    fn bitplane(&self, lit: bool) -> impl std::iter::Iterator<Item = (f64, f64)> + '_ {
        let mut count = DISPLAY_WIDTH * DISPLAY_HEIGHT;
        std::iter::from_fn(move || {
            while count > 0 {
                count -= 1;
                let (x, y) = (count % DISPLAY_WIDTH, count / DISPLAY_WIDTH);
                if self.pixel(x, y) == lit {
                    return Some((x as f64, -1.0 * y as f64));
                }
            }
            None
        })
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                f.write_str(if self.pixel(x, y) { "■" } else { "□" })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// store useful metadata about the terminal
struct Resolution(usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
    frame: FrameBuffer,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let mut stdout = io::stdout();
        execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(DISPLAY_WIDTH, DISPLAY_HEIGHT),
            frame: FrameBuffer::new(),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        if let Err(e) = execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen) {
            eprintln!("Warning: couldn't restore terminal: {}", e);
        }
    }
}

impl Display for MonoTermDisplay {
    fn clear(&mut self) {
        self.frame.clear()
    }

    fn draw(&mut self, x: u8, y: u8, sprite: u8) -> bool {
        self.frame.draw(x, y, sprite)
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        let frame = &self.frame;
        let resolution = &self.resolution;
        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, 2 + resolution.0 as u16, 2 + resolution.1 as u16);

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &frame.bitplane(false).collect::<Vec<_>>(),
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &frame.bitplane(true).collect::<Vec<_>>(),
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// writes each flushed frame as text, one character per pixel
pub struct WriterDisplay<W: io::Write> {
    out: W,
    frame: FrameBuffer,
}

impl<W: io::Write> WriterDisplay<W> {
    pub fn new(out: W) -> Self {
        WriterDisplay {
            out,
            frame: FrameBuffer::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: io::Write> Display for WriterDisplay<W> {
    fn clear(&mut self) {
        self.frame.clear()
    }

    fn draw(&mut self, x: u8, y: u8, sprite: u8) -> bool {
        self.frame.draw(x, y, sprite)
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        write!(self.out, "{}", self.frame)?;
        self.out.flush()
    }
}

/// keeps the pixels and counts calls; useful for testing and headless runs
#[derive(Default)]
pub struct HeadlessDisplay {
    pub frame: FrameBuffer,
    pub clears: usize,
    pub draws: usize,
    pub flushes: usize,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for HeadlessDisplay {
    fn clear(&mut self) {
        self.clears += 1;
        self.frame.clear()
    }

    fn draw(&mut self, x: u8, y: u8, sprite: u8) -> bool {
        self.draws += 1;
        self.frame.draw(x, y, sprite)
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        self.flushes += 1;
        Ok(())
    }
}
