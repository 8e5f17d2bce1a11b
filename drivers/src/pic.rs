//! Legacy 8259 cascade driver: remap, per-line masking, EOI, and
//! IRR/ISR introspection.
//!
//! The power-on mapping routes IRQ 0-7 onto vectors 8-15, colliding with
//! CPU exceptions; `remap` moves both controllers to caller-chosen bases
//! before interrupt delivery is ever enabled.

use ember_abi::arch::x86_64::pic::{
    is_slave_line, with_line_masked, with_line_unmasked, EOI, ICW1_INIT_ICW4,
    ICW3_MASTER_CASCADE, ICW3_SLAVE_IDENTITY, ICW4_8086, IRQ_LINE_COUNT, OCW3_READ_IRR,
    OCW3_READ_ISR,
};
use ember_abi::arch::x86_64::ports::PortAddr;
use ember_lib::io::{io_wait, Port};
use ember_lib::klog_debug;

const MASTER_COMMAND: Port<u8> = Port::new(PortAddr::PIC1_COMMAND);
const MASTER_DATA: Port<u8> = Port::new(PortAddr::PIC1_DATA);
const SLAVE_COMMAND: Port<u8> = Port::new(PortAddr::PIC2_COMMAND);
const SLAVE_DATA: Port<u8> = Port::new(PortAddr::PIC2_DATA);

/// Remap both controllers to the given vector bases.
///
/// Runs the four initialization command words in lock-step across master
/// and slave with an I/O delay after each write, then restores the mask
/// registers that were in effect before the sequence.
pub fn remap(master_offset: u8, slave_offset: u8) {
    unsafe {
        let saved_master_mask = MASTER_DATA.read();
        let saved_slave_mask = SLAVE_DATA.read();

        MASTER_COMMAND.write(ICW1_INIT_ICW4);
        io_wait();
        SLAVE_COMMAND.write(ICW1_INIT_ICW4);
        io_wait();

        MASTER_DATA.write(master_offset);
        io_wait();
        SLAVE_DATA.write(slave_offset);
        io_wait();

        MASTER_DATA.write(ICW3_MASTER_CASCADE);
        io_wait();
        SLAVE_DATA.write(ICW3_SLAVE_IDENTITY);
        io_wait();

        MASTER_DATA.write(ICW4_8086);
        io_wait();
        SLAVE_DATA.write(ICW4_8086);
        io_wait();

        MASTER_DATA.write(saved_master_mask);
        SLAVE_DATA.write(saved_slave_mask);
    }

    klog_debug!(
        "PIC: remapped to vectors 0x{:02x}/0x{:02x}",
        master_offset,
        slave_offset
    );
}

/// Suppress delivery of one IRQ line.
pub fn mask_line(irq: u8) {
    if irq >= IRQ_LINE_COUNT {
        return;
    }
    let data = if is_slave_line(irq) { SLAVE_DATA } else { MASTER_DATA };
    unsafe {
        let mask = data.read();
        data.write(with_line_masked(mask, irq));
    }
}

/// Allow delivery of one IRQ line.
pub fn unmask_line(irq: u8) {
    if irq >= IRQ_LINE_COUNT {
        return;
    }
    let data = if is_slave_line(irq) { SLAVE_DATA } else { MASTER_DATA };
    unsafe {
        let mask = data.read();
        data.write(with_line_unmasked(mask, irq));
    }
}

/// Write both mask registers at once, slave byte high.
pub fn set_masks(masks: u16) {
    unsafe {
        MASTER_DATA.write((masks & 0xFF) as u8);
        SLAVE_DATA.write((masks >> 8) as u8);
    }
}

/// Read both mask registers, slave byte high.
pub fn read_masks() -> u16 {
    unsafe { (MASTER_DATA.read() as u16) | ((SLAVE_DATA.read() as u16) << 8) }
}

/// Acknowledge a serviced IRQ.
///
/// Lines at or above 8 require the slave acknowledgment first; the master
/// sees only the cascade line and is always acknowledged. Skipping the
/// slave write would leave that controller with the interrupt in service
/// and block further delivery from it.
pub fn send_eoi(irq: u8) {
    unsafe {
        if is_slave_line(irq) {
            SLAVE_COMMAND.write(EOI);
        }
        MASTER_COMMAND.write(EOI);
    }
}

/// Acknowledge only the master controller.
///
/// A spurious interrupt on the slave raises the cascade line on the
/// master, which did latch it in service and still needs the EOI; the
/// slave has nothing in service and must not receive one.
pub fn send_master_eoi() {
    unsafe {
        MASTER_COMMAND.write(EOI);
    }
}

fn read_register(ocw3: u8) -> u16 {
    unsafe {
        MASTER_COMMAND.write(ocw3);
        SLAVE_COMMAND.write(ocw3);
        (MASTER_COMMAND.read() as u16) | ((SLAVE_COMMAND.read() as u16) << 8)
    }
}

/// Interrupt request register across the cascade, slave byte high.
pub fn read_irr() -> u16 {
    read_register(OCW3_READ_IRR)
}

/// In-service register across the cascade, slave byte high.
pub fn read_isr() -> u16 {
    read_register(OCW3_READ_ISR)
}
