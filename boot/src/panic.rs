//! Kernel panic path.
//!
//! All panics flow through `panic_handler_impl`: dump the message and a
//! register snapshot to serial, paint a red banner on the console when one
//! exists, then halt. A recursion guard keeps a panic inside the panic
//! path from looping forever.

use core::fmt::Write;
use core::panic::PanicInfo;
use core::sync::atomic::{AtomicBool, Ordering};

use ember_drivers::{serial, serial_println};
use ember_lib::cpu;
use ember_video::console;

static PANIC_IN_PROGRESS: AtomicBool = AtomicBool::new(false);

fn read_rsp() -> u64 {
    let rsp: u64;
    unsafe {
        core::arch::asm!("mov {}, rsp", out(reg) rsp, options(nomem, nostack, preserves_flags));
    }
    rsp
}

fn read_cr0() -> u64 {
    let value: u64;
    unsafe {
        core::arch::asm!("mov {}, cr0", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}

fn read_cr3() -> u64 {
    let value: u64;
    unsafe {
        core::arch::asm!("mov {}, cr3", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}

/// Core panic implementation, called by the kernel's `#[panic_handler]`.
pub fn panic_handler_impl(info: &PanicInfo) -> ! {
    cpu::disable_interrupts();

    if PANIC_IN_PROGRESS.swap(true, Ordering::SeqCst) {
        serial::write_line("\n!!! recursive panic, halting !!!");
        cpu::halt_loop();
    }

    serial::write_line("\n\n=== KERNEL PANIC ===");

    let mut message = MessageBuffer::new();
    if let Some(location) = info.location() {
        let _ = write!(
            message,
            "{}:{}:{}: ",
            location.file(),
            location.line(),
            location.column()
        );
    }
    let _ = write!(message, "{}", info.message());
    serial::write_line(message.as_str());

    serial::write_line("Register snapshot:");
    serial_println!("RSP: 0x{:016x}", read_rsp());
    serial_println!("CR0: 0x{:016x}", read_cr0());
    serial_println!("CR3: 0x{:016x}", read_cr3());

    if console::is_initialized() {
        console::write_colored("\nKERNEL PANIC\n", console::RED);
        console::write_colored(message.as_str(), console::RED);
        console::write("\n");
    }

    serial::write_line("===================");
    serial::write_line("System halted.");
    cpu::halt_loop();
}

struct MessageBuffer {
    buf: [u8; 512],
    len: usize,
}

impl MessageBuffer {
    const fn new() -> Self {
        Self {
            buf: [0u8; 512],
            len: 0,
        }
    }

    fn as_str(&self) -> &str {
        // Only valid UTF-8 arrives through the Write impl.
        unsafe { core::str::from_utf8_unchecked(&self.buf[..self.len]) }
    }
}

impl Write for MessageBuffer {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let available = self.buf.len() - self.len;
        let to_copy = bytes.len().min(available);
        self.buf[self.len..self.len + to_copy].copy_from_slice(&bytes[..to_copy]);
        self.len += to_copy;
        Ok(())
    }
}
