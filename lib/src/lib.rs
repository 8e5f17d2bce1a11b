#![no_std]
#![allow(unsafe_op_in_unsafe_fn)]

pub mod cpu {
    use core::arch::asm;

    #[inline(always)]
    pub fn hlt() {
        unsafe {
            asm!("hlt", options(nomem, nostack, preserves_flags));
        }
    }

    #[inline(always)]
    pub fn enable_interrupts() {
        unsafe {
            asm!("sti", options(nomem, nostack));
        }
    }

    #[inline(always)]
    pub fn disable_interrupts() {
        unsafe {
            asm!("cli", options(nomem, nostack));
        }
    }

    #[inline(always)]
    pub fn read_rflags() -> u64 {
        let rflags: u64;
        unsafe {
            asm!("pushfq; pop {}", out(reg) rflags, options(nomem, preserves_flags));
        }
        rflags
    }

    /// Interrupt flag (bit 9) of RFLAGS.
    #[inline(always)]
    pub fn interrupts_enabled() -> bool {
        read_rflags() & (1 << 9) != 0
    }

    #[inline(always)]
    pub fn halt_loop() -> ! {
        loop {
            hlt();
        }
    }

    /// Halt catch fire: interrupts off, then hlt forever. The terminal
    /// response to a boot precondition failure before any console exists.
    #[inline(always)]
    pub fn hcf() -> ! {
        disable_interrupts();
        halt_loop()
    }

    #[inline(always)]
    pub fn int3() {
        unsafe {
            asm!("int3", options(nomem, nostack));
        }
    }
}

pub mod frame;
pub mod init_flag;
pub mod io;
pub mod klog;

pub use frame::InterruptFrame;
pub use init_flag::InitFlag;
pub use klog::{klog_attach_serial, klog_get_level, klog_init, klog_set_level, KlogLevel};

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FramebufferInfo {
    pub address: *mut u8,
    pub width: u64,
    pub height: u64,
    pub pitch: u64,
    pub bpp: u16,
}
