//! IDT construction and the common interrupt dispatcher.
//!
//! All 256 vectors route through assembly stubs into `interrupt_dispatch`,
//! which splits traffic between the exception path and the hardware IRQ
//! path. Gates default to trap type; the remapped IRQ window uses
//! interrupt gates so delivery stays off while a line is serviced.

#![allow(static_mut_refs)]

use core::arch::{asm, global_asm};
use core::mem::size_of;
use core::sync::atomic::{AtomicU64, Ordering};

use ember_abi::arch::x86_64::descriptor::{gate_type_for_vector, GateBits};
use ember_abi::arch::x86_64::gdt::SegmentSelector;
use ember_abi::arch::x86_64::pic::{DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET};
use ember_drivers::irq;
use ember_lib::frame::{dump_interrupt_frame, exception_name};
use ember_lib::{klog_debug, klog_info, InterruptFrame};

global_asm!(include_str!("idt_stubs.s"));

pub const IDT_ENTRIES: usize = 256;
pub const IRQ_BASE_VECTOR: u8 = 32;

pub const EXCEPTION_DEBUG: u8 = 1;
pub const EXCEPTION_BREAKPOINT: u8 = 3;
pub const EXCEPTION_OVERFLOW: u8 = 4;
pub const EXCEPTION_BOUND_RANGE: u8 = 5;
pub const EXCEPTION_DEVICE_NOT_AVAIL: u8 = 7;
pub const EXCEPTION_PAGE_FAULT: u8 = 14;
pub const EXCEPTION_FPU_ERROR: u8 = 16;
pub const EXCEPTION_ALIGNMENT_CHECK: u8 = 17;
pub const EXCEPTION_SIMD_FP: u8 = 19;

#[repr(C, packed)]
#[derive(Copy, Clone)]
struct IdtEntry {
    offset_low: u16,
    selector: u16,
    ist: u8,
    type_attr: u8,
    offset_mid: u16,
    offset_high: u32,
    zero: u32,
}

impl IdtEntry {
    const MISSING: Self = Self {
        offset_low: 0,
        selector: 0,
        ist: 0,
        type_attr: 0,
        offset_mid: 0,
        offset_high: 0,
        zero: 0,
    };

    const fn from_gate(gate: GateBits) -> Self {
        Self {
            offset_low: gate.offset_low,
            selector: gate.selector,
            ist: gate.ist,
            type_attr: gate.type_attr,
            offset_mid: gate.offset_mid,
            offset_high: gate.offset_high,
            zero: 0,
        }
    }
}

#[repr(C, packed)]
struct IdtPtr {
    limit: u16,
    base: u64,
}

static mut IDT: [IdtEntry; IDT_ENTRIES] = [IdtEntry::MISSING; IDT_ENTRIES];
static mut IDT_POINTER: IdtPtr = IdtPtr { limit: 0, base: 0 };

static BREAKPOINT_HITS: AtomicU64 = AtomicU64::new(0);

unsafe extern "C" {
    static isr_stub_table: [u64; IDT_ENTRIES];
}

fn stub_address(vector: usize) -> u64 {
    unsafe { isr_stub_table[vector] }
}

/// Install a gate for one vector, always against the kernel code segment.
pub fn set_gate(vector: u8, handler: u64, gate_type: u8, dpl: u8) {
    let gate = GateBits::new(
        handler,
        SegmentSelector::KERNEL_CODE.bits(),
        0,
        gate_type,
        dpl,
    );
    unsafe {
        IDT[vector as usize] = IdtEntry::from_gate(gate);
    }
}

/// Decoded view of one installed gate, for diagnostics.
pub fn gate(vector: u8) -> GateBits {
    let entry = unsafe { IDT[vector as usize] };
    GateBits {
        offset_low: entry.offset_low,
        selector: entry.selector,
        ist: entry.ist,
        type_attr: entry.type_attr,
        offset_mid: entry.offset_mid,
        offset_high: entry.offset_high,
    }
}

/// Bind every vector to its stub: trap gates everywhere, interrupt gates
/// across the remapped IRQ window.
pub fn init() {
    for vector in 0..IDT_ENTRIES {
        let gate_type =
            gate_type_for_vector(vector as u8, DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET);
        set_gate(vector as u8, stub_address(vector), gate_type, 0);
    }
    klog_debug!(
        "IDT: {} vectors bound, IRQ window starts at 0x{:02x}",
        IDT_ENTRIES,
        IRQ_BASE_VECTOR
    );
}

/// Activate the table with `lidt`.
pub fn load() {
    unsafe {
        IDT_POINTER.limit = (size_of::<IdtEntry>() * IDT_ENTRIES - 1) as u16;
        IDT_POINTER.base = IDT.as_ptr() as u64;
        let idtr = &raw const IDT_POINTER;
        asm!("lidt [{}]", in(reg) idtr, options(nostack, preserves_flags));
    }
    let base = unsafe { IDT_POINTER.base };
    let limit = unsafe { IDT_POINTER.limit };
    klog_debug!("IDT: loaded base=0x{:x} limit=0x{:x}", base, limit);
}

/// Breakpoint exceptions observed since boot.
pub fn breakpoint_hits() -> u64 {
    BREAKPOINT_HITS.load(Ordering::Relaxed)
}

fn read_cr2() -> u64 {
    let cr2: u64;
    unsafe {
        asm!("mov {}, cr2", out(reg) cr2, options(nomem, nostack, preserves_flags));
    }
    cr2
}

/// Exceptions execution can continue past after logging.
fn is_recoverable(vector: u8) -> bool {
    matches!(
        vector,
        EXCEPTION_DEBUG
            | EXCEPTION_BREAKPOINT
            | EXCEPTION_OVERFLOW
            | EXCEPTION_BOUND_RANGE
            | EXCEPTION_DEVICE_NOT_AVAIL
            | EXCEPTION_FPU_ERROR
            | EXCEPTION_ALIGNMENT_CHECK
            | EXCEPTION_SIMD_FP
    )
}

fn handle_exception(frame: &mut InterruptFrame) {
    let vector = frame.vector as u8;

    if vector == EXCEPTION_BREAKPOINT {
        BREAKPOINT_HITS.fetch_add(1, Ordering::Relaxed);
        klog_info!("EXCEPTION: breakpoint at rip=0x{:x}, resuming", frame.rip);
        return;
    }

    klog_info!(
        "EXCEPTION: vector {} ({}) rip=0x{:x} err=0x{:x}",
        vector,
        exception_name(vector),
        frame.rip,
        frame.error_code
    );

    if vector == EXCEPTION_PAGE_FAULT {
        let cr2 = read_cr2();
        let err = frame.error_code;
        klog_info!(
            "EXCEPTION: fault address 0x{:x} ({}, {}, {})",
            cr2,
            if err & 1 != 0 { "present" } else { "not present" },
            if err & 2 != 0 { "write" } else { "read" },
            if err & 4 != 0 { "user" } else { "supervisor" }
        );
    }

    dump_interrupt_frame(frame);

    if !is_recoverable(vector) {
        panic!(
            "unrecoverable exception {} ({})",
            vector,
            exception_name(vector)
        );
    }
}

/// Rust-side landing point for every interrupt stub.
#[unsafe(no_mangle)]
extern "C" fn interrupt_dispatch(frame: *mut InterruptFrame) {
    let frame = unsafe { &mut *frame };
    let vector = frame.vector as u8;
    if vector < IRQ_BASE_VECTOR {
        handle_exception(frame);
    } else {
        irq::dispatch(frame);
    }
}
