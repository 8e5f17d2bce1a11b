#![no_std]
#![no_main]
#![forbid(unsafe_op_in_unsafe_fn)]

use core::panic::PanicInfo;

use ember_abi::arch::x86_64::gdt::SegmentSelector;
use ember_boot as boot;
use ember_drivers::{irq, keyboard, pic, pit, serial, serial_println};
use ember_lib::{cpu, klog_error, klog_info, klog_init, klog_set_level, KlogLevel};
use ember_video::{console, framebuffer};

const FONT_MODULE_SUFFIX: &str = "zap-light16.psf";
const TIMER_HZ: u32 = 1000;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial::init();
    boot::panic_handler_impl(info)
}

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    serial::init();
    klog_init();
    klog_set_level(KlogLevel::Debug);
    serial_println!("EmberOS coming up");

    if let Err(err) = boot::limine_protocol::init() {
        klog_error!("boot protocol rejected: {:?}", err);
        cpu::hcf();
    }
    let boot_info = boot::boot_info();

    boot::gdt::init();
    boot::idt::init();
    boot::idt::load();

    irq::init();
    pit::init(TIMER_HZ);
    cpu::enable_interrupts();
    klog_info!("interrupts enabled, timer at {} Hz", pit::frequency());

    let Some(fb) = boot_info.framebuffer else {
        klog_error!("no framebuffer from bootloader");
        cpu::hcf();
    };
    if let Err(err) = framebuffer::init(fb) {
        klog_error!("framebuffer rejected: {:?}", err);
        cpu::hcf();
    }
    let Some(font_data) = boot::limine_protocol::module_by_path_suffix(FONT_MODULE_SUFFIX) else {
        klog_error!("font module \"{}\" not found", FONT_MODULE_SUFFIX);
        cpu::hcf();
    };
    if let Err(err) = console::init(font_data) {
        klog_error!("console rejected font: {:?}", err);
        cpu::hcf();
    }

    console::clear();
    console::write_colored("EmberOS\n", console::WHITE);
    console::set_colors(console::GRAY, console::BLACK);
    console::write("protection and interrupt bring-up\n\n");
    console::set_colors(console::WHITE, console::BLACK);

    report_memory(&boot_info);
    run_smoke_checks();

    console::write("\nidle: timer ticking, keyboard live\n");
    klog_info!("bring-up complete at tick {}", pit::ticks());
    cpu::halt_loop()
}

fn report_memory(boot_info: &boot::BootInfo) {
    klog_info!(
        "memory: {} map entries, {} MB total, {} MB usable",
        boot_info.memmap_entries,
        boot_info.total_memory / (1024 * 1024),
        boot_info.usable_memory / (1024 * 1024)
    );
    for index in 0..boot_info.memmap_entries as usize {
        if let Some(entry) = boot::limine_protocol::memmap_entry(index) {
            klog_info!(
                "memory: [{:2}] base=0x{:012x} len=0x{:010x} type={}",
                index,
                entry.base,
                entry.length,
                entry.typ
            );
        }
    }
    console::write("memory map logged to serial\n");
}

/// Exercise the freshly installed tables and report on both sinks.
fn run_smoke_checks() {
    // The kernel code descriptor must match the canonical flat long-mode
    // pattern or the far-return reload would have faulted already.
    let kcode = boot::gdt::descriptor(SegmentSelector::KERNEL_CODE.index() as usize);
    klog_info!("gdt: kernel code descriptor 0x{:016x}", kcode);

    let before = boot::idt::breakpoint_hits();
    cpu::int3();
    if boot::idt::breakpoint_hits() == before + 1 {
        console::write_colored("breakpoint handler: ok\n", console::GREEN);
    } else {
        console::write_colored("breakpoint handler: MISSED\n", console::RED);
        klog_error!("int3 did not reach the breakpoint handler");
    }

    // Write and read back one pixel in the bottom-right corner, away from
    // the console text.
    let x = framebuffer::width() - 1;
    let y = framebuffer::height() - 1;
    framebuffer::set_pixel(x, y, 0x0012_3456);
    if framebuffer::get_pixel(x, y) == 0x0012_3456 {
        console::write_colored("framebuffer readback: ok\n", console::GREEN);
    } else {
        console::write_colored("framebuffer readback: BAD\n", console::RED);
        klog_error!("framebuffer pixel readback mismatch at ({}, {})", x, y);
    }

    let start = pit::ticks();
    pit::sleep_ms(100);
    let elapsed = pit::ticks() - start;
    klog_info!("timer: slept 100 ms, {} ticks elapsed", elapsed);
    if elapsed >= 100 {
        console::write_colored("timer sleep: ok\n", console::GREEN);
    } else {
        console::write_colored("timer sleep: short\n", console::RED);
    }

    klog_info!(
        "pic: masks=0x{:04x} irr=0x{:04x} isr=0x{:04x} timer_irqs={} spurious={} scancodes={}",
        pic::read_masks(),
        pic::read_irr(),
        pic::read_isr(),
        irq::line_count(irq::TIMER_LINE),
        irq::spurious_count(),
        keyboard::scancodes_seen()
    );
    console::write("pic state logged to serial\n");
}
