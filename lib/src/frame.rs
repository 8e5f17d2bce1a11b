//! Interrupt frame layout and diagnostics.

use crate::klog::KlogLevel;
use crate::{klog, klog_info};

/// Register state as pushed by the interrupt stubs plus the CPU's own
/// frame. The field order mirrors the stub's push sequence exactly: 15
/// general-purpose registers, then the vector and error code the stub
/// supplies, then the five CPU-pushed words.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct InterruptFrame {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub vector: u64,
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

/// Architectural name of a CPU exception vector.
pub fn exception_name(vector: u8) -> &'static str {
    match vector {
        0 => "Divide Error",
        1 => "Debug",
        2 => "Non-Maskable Interrupt",
        3 => "Breakpoint",
        4 => "Overflow",
        5 => "Bound Range Exceeded",
        6 => "Invalid Opcode",
        7 => "Device Not Available",
        8 => "Double Fault",
        10 => "Invalid TSS",
        11 => "Segment Not Present",
        12 => "Stack Segment Fault",
        13 => "General Protection Fault",
        14 => "Page Fault",
        16 => "x87 FPU Error",
        17 => "Alignment Check",
        18 => "Machine Check",
        19 => "SIMD Floating-Point Exception",
        _ => "Unknown",
    }
}

/// Dump a saved frame to the kernel log.
pub fn dump_interrupt_frame(frame: &InterruptFrame) {
    if !klog::is_enabled_level(KlogLevel::Info) {
        return;
    }
    klog_info!("=== INTERRUPT FRAME DUMP ===");
    klog_info!(
        "Vector: {} ({}) Error Code: 0x{:x}",
        frame.vector,
        exception_name(frame.vector as u8),
        frame.error_code
    );
    klog_info!(
        "RIP: 0x{:x}  CS: 0x{:x}  RFLAGS: 0x{:x}",
        frame.rip,
        frame.cs,
        frame.rflags
    );
    klog_info!("RSP: 0x{:x}  SS: 0x{:x}", frame.rsp, frame.ss);
    klog_info!(
        "RAX: 0x{:x}  RBX: 0x{:x}  RCX: 0x{:x}",
        frame.rax,
        frame.rbx,
        frame.rcx
    );
    klog_info!(
        "RDX: 0x{:x}  RSI: 0x{:x}  RDI: 0x{:x}",
        frame.rdx,
        frame.rsi,
        frame.rdi
    );
    klog_info!(
        "RBP: 0x{:x}  R8: 0x{:x}  R9: 0x{:x}",
        frame.rbp,
        frame.r8,
        frame.r9
    );
    klog_info!(
        "R10: 0x{:x}  R11: 0x{:x}  R12: 0x{:x}",
        frame.r10,
        frame.r11,
        frame.r12
    );
    klog_info!(
        "R13: 0x{:x}  R14: 0x{:x}  R15: 0x{:x}",
        frame.r13,
        frame.r14,
        frame.r15
    );
    klog_info!("=== END INTERRUPT FRAME DUMP ===");
}
