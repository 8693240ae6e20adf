use chip8vm::display::{FrameBuffer, HeadlessDisplay, WriterDisplay};
use chip8vm::input::{ReaderKeyboard, ScriptedKeyboard};
use chip8vm::sound::Mute;
use chip8vm::{Chip8Error, Chip8Interpreter, Config, Result};

fn config() -> Config {
    Config {
        clock_hz: 100_000,
        ..Config::default()
    }
}

/// run `program` for `cycles` steps, returning registers and the display
fn run(program: &[u8], keys: &[Option<u8>], cycles: u64) -> Result<([u8; 16], u16, HeadlessDisplay)> {
    let mut display = HeadlessDisplay::new();
    let mut keyboard = ScriptedKeyboard::new(keys);
    let (registers, pc) = {
        let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), config())?;
        i.load_program(&mut &program[..])?;
        assert_eq!(i.main_loop(Some(cycles))?, cycles);
        (*i.cpu().registers(), i.cpu().pc())
    };
    Ok((registers, pc, display))
}

#[test]
fn test_bcd_round_trip_through_memory() -> Result<()> {
    let program = [
        0x60, 0x98, // V0 = 152
        0xA3, 0x00, // I = 0x300
        0xF0, 0x33, // BCD V0
        0xF2, 0x65, // V0..V2 = [I]
        0x12, 0x08, // halt
    ];
    let (v, pc, _) = run(&program, &[], 5)?;
    assert_eq!(v[..3], [1, 5, 2]);
    assert_eq!(pc, 0x208);
    Ok(())
}

#[test]
fn test_call_and_return() -> Result<()> {
    let program = [
        0x22, 0x06, // call 0x206
        0x61, 0x02, // V1 = 2
        0x12, 0x04, // halt
        0x60, 0x01, // V0 = 1
        0x00, 0xEE, // return
    ];
    let (v, pc, _) = run(&program, &[], 5)?;
    assert_eq!((v[0], v[1]), (1, 2));
    assert_eq!(pc, 0x204);
    Ok(())
}

#[test]
fn test_draw_font_glyph() -> Result<()> {
    let program = [
        0x60, 0x0A, // V0 = 0xA
        0xF0, 0x29, // I = glyph V0
        0x61, 0x0A, // V1 = 10
        0x62, 0x05, // V2 = 5
        0xD1, 0x25, // draw 5 rows at (V1, V2)
        0x12, 0x0A, // halt
    ];
    let (v, _, display) = run(&program, &[], 6)?;
    assert_eq!(v[0xF], 0);
    let frame = display.frame;
    // A: F0 90 F0 90 90
    for x in 10..14 {
        assert!(frame.pixel(x, 5));
        assert!(frame.pixel(x, 7));
    }
    assert!(!frame.pixel(14, 5));
    assert!(frame.pixel(10, 6) && frame.pixel(13, 6));
    assert!(!frame.pixel(11, 6) && !frame.pixel(12, 6));
    assert!(frame.pixel(10, 9) && !frame.pixel(11, 9));
    assert!(!frame.pixel(10, 10));
    assert_eq!(display.flushes, 1);
    Ok(())
}

#[test]
fn test_draw_wraps_at_edges() -> Result<()> {
    let program = [
        0x61, 0x3E, // V1 = 62
        0x62, 0x1E, // V2 = 30
        0xD1, 0x25, // draw glyph 0 (I = 0)
        0x12, 0x06, // halt
    ];
    let (_, _, display) = run(&program, &[], 4)?;
    let frame = display.frame;
    // top row F0 straddles the right edge
    for x in [62, 63, 0, 1] {
        assert!(frame.pixel(x, 30), "({}, 30)", x);
    }
    // third row 90 lands on y = 0
    assert!(frame.pixel(62, 0) && frame.pixel(1, 0));
    assert!(!frame.pixel(63, 0) && !frame.pixel(0, 0));
    Ok(())
}

#[test]
fn test_redraw_collides_and_erases() -> Result<()> {
    let program = [
        0xD0, 0x05, // draw glyph 0 at (V0, V0)
        0xD0, 0x05, // and again
        0x12, 0x04, // halt
    ];
    let (v, _, display) = run(&program, &[], 3)?;
    assert_eq!(v[0xF], 1);
    assert_eq!(display.frame, FrameBuffer::new());
    assert_eq!(display.flushes, 2);
    Ok(())
}

#[test]
fn test_wait_for_key_then_skip_if_held() -> Result<()> {
    let program = [
        0xF0, 0x0A, // V0 = key
        0xE0, 0x9E, // skip if V0 held
        0x61, 0x05, // V1 = 5
        0x62, 0x06, // V2 = 6
        0x12, 0x08, // halt
    ];
    let (v, pc, _) = run(&program, &[None, Some(0x7), Some(0x7)], 4)?;
    assert_eq!((v[0], v[1], v[2]), (0x7, 0x0, 0x6));
    assert_eq!(pc, 0x208);
    Ok(())
}

#[test]
fn test_reader_keyboard_feeds_wait_for_key() -> Result<()> {
    let mut display = HeadlessDisplay::new();
    let mut keyboard = ReaderKeyboard::new(&b"5"[..]);
    let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), config())?;
    i.load_program(&mut &[0xF3u8, 0x0A][..])?;
    i.step()?;
    assert_eq!(i.cpu().registers()[3], 0x5);
    assert_eq!(i.cpu().pc(), 0x202);
    Ok(())
}

#[test]
fn test_writer_display_prints_frame() -> Result<()> {
    let mut display = WriterDisplay::new(Vec::new());
    let mut keyboard = ScriptedKeyboard::new(&[]);
    {
        let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), config())?;
        // draw the top row of glyph 0 at (0, 0)
        i.load_program(&mut &[0xD0u8, 0x01][..])?;
        i.step()?;
    }
    let text = String::from_utf8(display.into_inner()).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    let first = text.lines().next().unwrap_or_default();
    assert!(first.starts_with("■■■■□"));
    assert_eq!(text.lines().count(), 32);
    Ok(())
}

#[test]
fn test_stack_overflow_stops_run() -> Result<()> {
    let mut display = HeadlessDisplay::new();
    let mut keyboard = ScriptedKeyboard::new(&[]);
    let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), config())?;
    // recurse forever
    i.load_program(&mut &[0x22u8, 0x00][..])?;
    match i.main_loop(None) {
        Err(e @ Chip8Error::StackOverflow { pc: 0x200 }) => assert!(e.is_fatal()),
        other => panic!("expected StackOverflow, got {:?}", other),
    }
    let state = i.cpu().snapshot();
    assert_eq!(state.sp, 16);
    assert!(state.stack.iter().all(|ret| *ret == 0x202));
    Ok(())
}

#[test]
fn test_running_off_the_end_of_memory() -> Result<()> {
    let mut display = HeadlessDisplay::new();
    let mut keyboard = ScriptedKeyboard::new(&[]);
    let mut i = Chip8Interpreter::new(&mut display, &mut keyboard, Box::new(Mute::new()), config())?;
    // jump to the last byte; a 2-byte fetch there is out of range
    i.load_program(&mut &[0x1Fu8, 0xFF][..])?;
    match i.main_loop(Some(10)) {
        Err(e @ Chip8Error::OutOfRangeAddress { addr: 0xFFF, len: 2 }) => assert!(!e.is_fatal()),
        other => panic!("expected OutOfRangeAddress, got {:?}", other),
    }
    Ok(())
}
