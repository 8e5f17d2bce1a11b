//! Framebuffer text console backed by a PSF1 font.
//!
//! The font arrives as a bootloader module and stays borrowed for the
//! kernel's lifetime; the console never copies glyph data.

use ember_abi::font::{Psf1Error, Psf1Font};
use ember_lib::klog_info;
use spin::Mutex;

use crate::framebuffer;

pub const BLACK: u32 = 0x0000_0000;
pub const WHITE: u32 = 0x00FF_FFFF;
pub const RED: u32 = 0x00FF_0000;
pub const GREEN: u32 = 0x0000_FF00;
pub const GRAY: u32 = 0x00AA_AAAA;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    NoFramebuffer,
    BadFont(Psf1Error),
}

struct ConsoleState {
    font: Option<Psf1Font<'static>>,
    cursor_x: u32,
    cursor_y: u32,
    fg: u32,
    bg: u32,
}

impl ConsoleState {
    const fn new() -> Self {
        Self {
            font: None,
            cursor_x: 0,
            cursor_y: 0,
            fg: WHITE,
            bg: BLACK,
        }
    }
}

static CONSOLE: Mutex<ConsoleState> = Mutex::new(ConsoleState::new());

/// Parse the font and bind the console to the framebuffer.
pub fn init(font_data: &'static [u8]) -> Result<(), ConsoleError> {
    if !framebuffer::is_initialized() {
        return Err(ConsoleError::NoFramebuffer);
    }
    let font = Psf1Font::parse(font_data).map_err(ConsoleError::BadFont)?;
    klog_info!(
        "console: {}x{} font, {} glyphs",
        font.width(),
        font.height(),
        font.glyph_count()
    );
    let mut console = CONSOLE.lock();
    console.font = Some(font);
    console.cursor_x = 0;
    console.cursor_y = 0;
    Ok(())
}

pub fn is_initialized() -> bool {
    CONSOLE.lock().font.is_some()
}

pub fn set_colors(fg: u32, bg: u32) {
    let mut console = CONSOLE.lock();
    console.fg = fg;
    console.bg = bg;
}

/// Erase the screen to the background color and home the cursor.
pub fn clear() {
    let mut console = CONSOLE.lock();
    framebuffer::clear(console.bg);
    console.cursor_x = 0;
    console.cursor_y = 0;
}

fn draw_glyph(font: &Psf1Font<'static>, x: u32, y: u32, ch: u8, fg: u32, bg: u32) {
    let glyph = font.glyph(ch as usize);
    for (row, bits) in glyph.iter().copied().enumerate() {
        for col in 0..font.width() {
            let color = if bits & (0x80 >> col) != 0 { fg } else { bg };
            framebuffer::set_pixel(x + col as u32, y + row as u32, color);
        }
    }
}

fn putc(console: &mut ConsoleState, ch: u8) {
    let Some(font) = console.font else {
        return;
    };
    let glyph_w = font.width() as u32;
    let glyph_h = font.height() as u32;
    let fb_w = framebuffer::width();
    let fb_h = framebuffer::height();

    match ch {
        b'\n' => {
            console.cursor_x = 0;
            console.cursor_y += glyph_h;
        }
        b'\r' => {
            console.cursor_x = 0;
        }
        b'\t' => {
            let tab = 4 * glyph_w;
            console.cursor_x = (console.cursor_x / tab + 1) * tab;
            if console.cursor_x + glyph_w > fb_w {
                console.cursor_x = 0;
                console.cursor_y += glyph_h;
            }
        }
        _ => {
            draw_glyph(
                &font,
                console.cursor_x,
                console.cursor_y,
                ch,
                console.fg,
                console.bg,
            );
            console.cursor_x += glyph_w;
            if console.cursor_x + glyph_w > fb_w {
                console.cursor_x = 0;
                console.cursor_y += glyph_h;
            }
        }
    }

    if console.cursor_y + glyph_h > fb_h {
        framebuffer::scroll_up(glyph_h, console.bg);
        console.cursor_y = fb_h.saturating_sub(glyph_h);
    }
}

/// Render text at the cursor in the current colors. Non-ASCII bytes map
/// straight to glyph indices, which is what PSF1 expects.
pub fn write(text: &str) {
    let mut console = CONSOLE.lock();
    for byte in text.bytes() {
        putc(&mut console, byte);
    }
}

/// Render text in a one-off foreground color.
pub fn write_colored(text: &str, fg: u32) {
    let mut console = CONSOLE.lock();
    let saved = console.fg;
    console.fg = fg;
    for byte in text.bytes() {
        putc(&mut console, byte);
    }
    console.fg = saved;
}

pub fn write_line(text: &str) {
    write(text);
    write("\n");
}
