//! Linear framebuffer access over the bootloader-provided mapping.
//!
//! All pixel traffic goes through volatile writes; the buffer is device
//! memory the compiler must not elide or reorder stores to.

use core::ptr;

use ember_lib::{klog_debug, FramebufferInfo};
use spin::Mutex;

const MIN_WIDTH: u32 = 320;
const MIN_HEIGHT: u32 = 240;
const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramebufferError {
    NullAddress,
    BadGeometry,
    UnsupportedDepth,
}

#[derive(Clone, Copy)]
pub(crate) struct FbState {
    pub(crate) base: *mut u8,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) pitch: u32,
    pub(crate) bytes_pp: usize,
}

// The base pointer targets the bootloader's higher-half framebuffer
// mapping, valid for the lifetime of the kernel.
unsafe impl Send for FbState {}

static FRAMEBUFFER: Mutex<Option<FbState>> = Mutex::new(None);

/// Validate and adopt the bootloader framebuffer.
pub fn init(info: FramebufferInfo) -> Result<(), FramebufferError> {
    if info.address.is_null() {
        return Err(FramebufferError::NullAddress);
    }
    let width = info.width as u32;
    let height = info.height as u32;
    let pitch = info.pitch as u32;
    if width < MIN_WIDTH || height < MIN_HEIGHT || pitch < width {
        return Err(FramebufferError::BadGeometry);
    }
    if pitch as usize * height as usize > MAX_BUFFER_SIZE {
        return Err(FramebufferError::BadGeometry);
    }
    let bytes_pp = match info.bpp {
        24 => 3,
        32 => 4,
        _ => return Err(FramebufferError::UnsupportedDepth),
    };

    *FRAMEBUFFER.lock() = Some(FbState {
        base: info.address,
        width,
        height,
        pitch,
        bytes_pp,
    });
    klog_debug!(
        "framebuffer: {}x{} pitch={} bpp={} at {:p}",
        width,
        height,
        pitch,
        info.bpp,
        info.address
    );
    Ok(())
}

pub fn is_initialized() -> bool {
    FRAMEBUFFER.lock().is_some()
}

pub fn width() -> u32 {
    FRAMEBUFFER.lock().map(|fb| fb.width).unwrap_or(0)
}

pub fn height() -> u32 {
    FRAMEBUFFER.lock().map(|fb| fb.height).unwrap_or(0)
}

pub(crate) fn snapshot() -> Option<FbState> {
    *FRAMEBUFFER.lock()
}

#[inline]
unsafe fn write_pixel_raw(fb: &FbState, offset: usize, color: u32) {
    unsafe {
        let pixel = fb.base.add(offset);
        match fb.bytes_pp {
            3 => {
                ptr::write_volatile(pixel, (color & 0xFF) as u8);
                ptr::write_volatile(pixel.add(1), ((color >> 8) & 0xFF) as u8);
                ptr::write_volatile(pixel.add(2), ((color >> 16) & 0xFF) as u8);
            }
            4 => ptr::write_volatile(pixel.cast::<u32>(), color),
            _ => {}
        }
    }
}

/// Plot one pixel in 0x00RRGGBB. Out-of-bounds coordinates are dropped.
pub fn set_pixel(x: u32, y: u32, color: u32) {
    let Some(fb) = snapshot() else {
        return;
    };
    if x >= fb.width || y >= fb.height {
        return;
    }
    let offset = y as usize * fb.pitch as usize + x as usize * fb.bytes_pp;
    unsafe { write_pixel_raw(&fb, offset, color) }
}

/// Read one pixel back as 0x00RRGGBB; 0 when out of bounds or uninitialized.
pub fn get_pixel(x: u32, y: u32) -> u32 {
    let Some(fb) = snapshot() else {
        return 0;
    };
    if x >= fb.width || y >= fb.height {
        return 0;
    }
    let offset = y as usize * fb.pitch as usize + x as usize * fb.bytes_pp;
    unsafe {
        let pixel = fb.base.add(offset);
        match fb.bytes_pp {
            3 => {
                let b = ptr::read_volatile(pixel) as u32;
                let g = ptr::read_volatile(pixel.add(1)) as u32;
                let r = ptr::read_volatile(pixel.add(2)) as u32;
                (r << 16) | (g << 8) | b
            }
            4 => ptr::read_volatile(pixel.cast::<u32>()) & 0x00FF_FFFF,
            _ => 0,
        }
    }
}

/// Fill a clipped rectangle.
pub fn fill_rect(x: u32, y: u32, w: u32, h: u32, color: u32) {
    let Some(fb) = snapshot() else {
        return;
    };
    if x >= fb.width || y >= fb.height {
        return;
    }
    let x_end = (x + w).min(fb.width);
    let y_end = (y + h).min(fb.height);
    for py in y..y_end {
        let row = py as usize * fb.pitch as usize;
        for px in x..x_end {
            unsafe { write_pixel_raw(&fb, row + px as usize * fb.bytes_pp, color) }
        }
    }
}

pub fn clear(color: u32) {
    let Some(fb) = snapshot() else {
        return;
    };
    fill_rect(0, 0, fb.width, fb.height, color);
}

/// Shift the whole buffer up by `rows` pixel rows and repaint the exposed
/// band at the bottom.
pub fn scroll_up(rows: u32, fill_color: u32) {
    let Some(fb) = snapshot() else {
        return;
    };
    if rows == 0 {
        return;
    }
    if rows >= fb.height {
        clear(fill_color);
        return;
    }
    let pitch = fb.pitch as usize;
    let src_offset = rows as usize * pitch;
    let copy_bytes = (fb.height - rows) as usize * pitch;
    unsafe {
        ptr::copy(fb.base.add(src_offset), fb.base, copy_bytes);
    }
    fill_rect(0, fb.height - rows, fb.width, rows, fill_color);
}
