//! Hardware interrupt dispatch.
//!
//! Owns the per-line handler table, routes remapped vectors back to IRQ
//! lines, filters spurious interrupts, and acknowledges every serviced
//! line before returning to the stub.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use ember_abi::arch::x86_64::pic::{
    irq_for_vector, DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET, IRQ_LINE_COUNT,
};
use ember_lib::{klog_info, klog_warn, InterruptFrame};

use crate::{keyboard, pic, pit};

pub const TIMER_LINE: u8 = 0;
pub const KEYBOARD_LINE: u8 = 1;

pub type IrqHandler = fn(u8, &mut InterruptFrame);

struct LineState {
    handler: Option<IrqHandler>,
    count: u64,
    reported_unhandled: bool,
}

struct IrqTable(UnsafeCell<[LineState; IRQ_LINE_COUNT as usize]>);

// Written only during single-threaded bring-up and from dispatch, which
// runs through interrupt gates with delivery disabled on one CPU.
unsafe impl Sync for IrqTable {}

const EMPTY_LINE: LineState = LineState {
    handler: None,
    count: 0,
    reported_unhandled: false,
};

static TABLE: IrqTable = IrqTable(UnsafeCell::new([EMPTY_LINE; IRQ_LINE_COUNT as usize]));

static MASTER_OFFSET: AtomicU8 = AtomicU8::new(DEFAULT_MASTER_OFFSET);
static SLAVE_OFFSET: AtomicU8 = AtomicU8::new(DEFAULT_SLAVE_OFFSET);
static SPURIOUS_COUNT: AtomicU64 = AtomicU64::new(0);

#[allow(clippy::mut_from_ref)]
fn table() -> &'static mut [LineState; IRQ_LINE_COUNT as usize] {
    unsafe { &mut *TABLE.0.get() }
}

/// Bind a handler to one IRQ line. Replaces any previous binding.
pub fn register(line: u8, handler: IrqHandler) {
    if line >= IRQ_LINE_COUNT {
        klog_warn!("irq: register for bad line {}", line);
        return;
    }
    let slot = &mut table()[line as usize];
    slot.handler = Some(handler);
    slot.reported_unhandled = false;
}

/// Vector bases currently programmed into the controllers, master first.
pub fn vector_offsets() -> (u8, u8) {
    (
        MASTER_OFFSET.load(Ordering::Relaxed),
        SLAVE_OFFSET.load(Ordering::Relaxed),
    )
}

/// Times the given line has been serviced.
pub fn line_count(line: u8) -> u64 {
    if line >= IRQ_LINE_COUNT {
        return 0;
    }
    table()[line as usize].count
}

pub fn spurious_count() -> u64 {
    SPURIOUS_COUNT.load(Ordering::Relaxed)
}

fn timer_handler(_line: u8, _frame: &mut InterruptFrame) {
    pit::timer_tick();
}

fn keyboard_handler(_line: u8, _frame: &mut InterruptFrame) {
    keyboard::service();
}

/// Remap the cascade away from the exception range, bind the timer and
/// keyboard handlers, and open only those two lines.
///
/// Interrupt delivery stays disabled; the caller runs `sti` once the IDT
/// is in place.
pub fn init() {
    pic::remap(DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET);
    MASTER_OFFSET.store(DEFAULT_MASTER_OFFSET, Ordering::Relaxed);
    SLAVE_OFFSET.store(DEFAULT_SLAVE_OFFSET, Ordering::Relaxed);

    register(TIMER_LINE, timer_handler);
    register(KEYBOARD_LINE, keyboard_handler);

    pic::set_masks(!((1 << TIMER_LINE) | (1 << KEYBOARD_LINE)));

    klog_info!(
        "irq: vectors 0x{:02x}/0x{:02x}, masks 0x{:04x}",
        DEFAULT_MASTER_OFFSET,
        DEFAULT_SLAVE_OFFSET,
        pic::read_masks()
    );
}

/// A raised line with no in-service bit is spurious: the request dropped
/// between the controller raising INT and the CPU acknowledging it. The
/// lowest-priority line of the affected controller reports these.
fn is_spurious(irq: u8) -> bool {
    match irq {
        7 => pic::read_isr() & (1 << 7) == 0,
        15 => pic::read_isr() & (1 << 15) == 0,
        _ => false,
    }
}

/// Entry point from the interrupt stubs for remapped hardware vectors.
pub fn dispatch(frame: &mut InterruptFrame) {
    let vector = frame.vector as u8;
    let (master, slave) = vector_offsets();
    let Some(irq) = irq_for_vector(vector, master, slave) else {
        klog_warn!(
            "irq: vector 0x{:02x} outside both windows (irr=0x{:04x} isr=0x{:04x})",
            vector,
            pic::read_irr(),
            pic::read_isr()
        );
        pic::send_eoi(0);
        return;
    };

    if is_spurious(irq) {
        SPURIOUS_COUNT.fetch_add(1, Ordering::Relaxed);
        if irq >= 8 {
            pic::send_master_eoi();
        }
        return;
    }

    let slot = &mut table()[irq as usize];
    slot.count += 1;
    match slot.handler {
        Some(handler) => handler(irq, frame),
        None => {
            if !slot.reported_unhandled {
                slot.reported_unhandled = true;
                klog_warn!(
                    "irq: line {} has no handler (irr=0x{:04x} isr=0x{:04x})",
                    irq,
                    pic::read_irr(),
                    pic::read_isr()
                );
            }
        }
    }

    pic::send_eoi(irq);
}
