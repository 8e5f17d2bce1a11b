//! GDT and TSS bring-up.
//!
//! Builds the flat long-mode descriptor table through the packed encoders,
//! points ring-0 stack switches at a dedicated interrupt stack, and swaps
//! the bootloader's table out with `lgdt` plus a far-return CS reload.

#![allow(static_mut_refs)]

use core::arch::asm;
use core::mem::size_of;

use ember_abi::arch::x86_64::descriptor::{
    encode, encode_system, DescriptorAccess, DescriptorFlags,
};
use ember_abi::arch::x86_64::gdt::{SegmentSelector, GDT_SLOT_COUNT};
use ember_lib::{cpu, klog_debug};

/// Flat segments cover the full 4 GiB limit field; in long mode the limit
/// is ignored but the canonical encoding keeps the table recognizable.
const FLAT_LIMIT: u32 = 0x000F_FFFF;

const INTERRUPT_STACK_SIZE: usize = 16 * 1024;

#[repr(C, packed)]
struct Tss {
    reserved0: u32,
    rsp0: u64,
    rsp1: u64,
    rsp2: u64,
    reserved1: u64,
    ist: [u64; 7],
    reserved2: u64,
    reserved3: u16,
    iomap_base: u16,
}

#[repr(C, packed)]
struct GdtDescriptor {
    limit: u16,
    base: u64,
}

#[repr(C, align(16))]
struct InterruptStack([u8; INTERRUPT_STACK_SIZE]);

static mut GDT_TABLE: [u64; GDT_SLOT_COUNT] = [0; GDT_SLOT_COUNT];

static mut KERNEL_TSS: Tss = Tss {
    reserved0: 0,
    rsp0: 0,
    rsp1: 0,
    rsp2: 0,
    reserved1: 0,
    ist: [0; 7],
    reserved2: 0,
    reserved3: 0,
    iomap_base: 0,
};

static mut INTERRUPT_STACK: InterruptStack = InterruptStack([0; INTERRUPT_STACK_SIZE]);

fn interrupt_stack_top() -> u64 {
    let base = unsafe { INTERRUPT_STACK.0.as_ptr() } as u64;
    base + INTERRUPT_STACK_SIZE as u64
}

unsafe fn load_gdt(descriptor: &GdtDescriptor) {
    unsafe { asm!("lgdt [{0}]", in(reg) descriptor, options(nostack, preserves_flags)) };

    // CS cannot be moved into directly; the far return reloads it.
    unsafe {
        asm!(
            "pushq ${code}",
            "lea 2f(%rip), %rax",
            "pushq %rax",
            "lretq",
            "2:",
            "movw ${data}, %ax",
            "movw %ax, %ds",
            "movw %ax, %es",
            "movw %ax, %ss",
            "movw %ax, %fs",
            "movw %ax, %gs",
            code = const SegmentSelector::KERNEL_CODE.bits() as usize,
            data = const SegmentSelector::KERNEL_DATA.bits() as usize,
            out("rax") _,
            options(att_syntax, nostack)
        );
    }
}

unsafe fn load_tss() {
    let selector = SegmentSelector::TSS.bits();
    unsafe { asm!("ltr {0:x}", in(reg) selector, options(nostack, preserves_flags)) };
}

/// Build and activate the kernel descriptor table.
///
/// Slot layout: null, kernel code, kernel data, user code, user data, then
/// the 16-byte TSS descriptor across the last two slots.
pub fn init() {
    klog_debug!("GDT: building {} slot table", GDT_SLOT_COUNT);

    let were_enabled = cpu::interrupts_enabled();
    cpu::disable_interrupts();

    unsafe {
        let flags = DescriptorFlags::LONG_4K;
        GDT_TABLE[0] = 0;
        GDT_TABLE[SegmentSelector::KERNEL_CODE.index() as usize] =
            encode(0, FLAT_LIMIT, DescriptorAccess::KERNEL_CODE, flags);
        GDT_TABLE[SegmentSelector::KERNEL_DATA.index() as usize] =
            encode(0, FLAT_LIMIT, DescriptorAccess::KERNEL_DATA, flags);
        GDT_TABLE[SegmentSelector::USER_CODE.index() as usize] =
            encode(0, FLAT_LIMIT, DescriptorAccess::USER_CODE, flags);
        GDT_TABLE[SegmentSelector::USER_DATA.index() as usize] =
            encode(0, FLAT_LIMIT, DescriptorAccess::USER_DATA, flags);

        KERNEL_TSS.iomap_base = size_of::<Tss>() as u16;
        KERNEL_TSS.rsp0 = interrupt_stack_top();

        let tss_base = &raw const KERNEL_TSS as u64;
        let tss_limit = (size_of::<Tss>() - 1) as u32;
        let [tss_low, tss_high] = encode_system(
            tss_base,
            tss_limit,
            DescriptorAccess::TSS_AVAILABLE,
            DescriptorFlags::empty(),
        );
        let tss_index = SegmentSelector::TSS.index() as usize;
        GDT_TABLE[tss_index] = tss_low;
        GDT_TABLE[tss_index + 1] = tss_high;

        let descriptor = GdtDescriptor {
            limit: (size_of::<[u64; GDT_SLOT_COUNT]>() - 1) as u16,
            base: GDT_TABLE.as_ptr() as u64,
        };

        load_gdt(&descriptor);
        load_tss();
    }

    if were_enabled {
        cpu::enable_interrupts();
    }

    klog_debug!(
        "GDT: active, cs=0x{:02x} tr=0x{:02x} rsp0=0x{:x}",
        SegmentSelector::KERNEL_CODE.bits(),
        SegmentSelector::TSS.bits(),
        interrupt_stack_top()
    );
}

/// Raw descriptor for one slot, for diagnostics.
pub fn descriptor(index: usize) -> u64 {
    if index >= GDT_SLOT_COUNT {
        return 0;
    }
    unsafe { GDT_TABLE[index] }
}

/// Stack the CPU switches to on a ring 3 to ring 0 transition.
pub fn set_kernel_rsp0(rsp0: u64) {
    unsafe {
        KERNEL_TSS.rsp0 = rsp0;
    }
}
