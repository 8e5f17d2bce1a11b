//! PS/2 keyboard scancode drain.
//!
//! Set-1 scancodes are read from the controller data port whenever the
//! status register reports a full output buffer. At this stage the bytes
//! are only logged; no layout translation happens here.

use core::sync::atomic::{AtomicU64, Ordering};

use ember_abi::arch::x86_64::ports::{PortAddr, PS2_SCANCODE_RELEASE, PS2_STATUS_OUTPUT_FULL};
use ember_lib::io::Port;
use ember_lib::klog_debug;

const DATA: Port<u8> = Port::new(PortAddr::PS2_DATA);
const STATUS: Port<u8> = Port::new(PortAddr::PS2_STATUS);

static SCANCODES_SEEN: AtomicU64 = AtomicU64::new(0);

/// Drain every pending scancode from the controller output buffer.
///
/// The keyboard interrupt does not fire again while a byte sits unread in
/// the buffer, so the handler must loop until the status bit clears.
pub fn service() {
    unsafe {
        while STATUS.read() & PS2_STATUS_OUTPUT_FULL != 0 {
            let code = DATA.read();
            SCANCODES_SEEN.fetch_add(1, Ordering::Relaxed);
            if code & PS2_SCANCODE_RELEASE != 0 {
                klog_debug!("keyboard: release 0x{:02x}", code & !PS2_SCANCODE_RELEASE);
            } else {
                klog_debug!("keyboard: press 0x{:02x}", code);
            }
        }
    }
}

pub fn scancodes_seen() -> u64 {
    SCANCODES_SEEN.load(Ordering::Relaxed)
}
