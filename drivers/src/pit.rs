//! 8254 PIT timer service: channel-0 programming and a tick-countdown
//! blocking delay.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use ember_abi::arch::x86_64::pit::{
    actual_frequency, divisor_for_frequency, PIT_COMMAND_ACCESS_LOHI, PIT_COMMAND_BINARY,
    PIT_COMMAND_CHANNEL0, PIT_COMMAND_MODE_SQUARE, PIT_DEFAULT_FREQUENCY_HZ,
};
use ember_abi::arch::x86_64::ports::PortAddr;
use ember_lib::io::{io_wait, Port};
use ember_lib::{cpu, klog_info, klog_warn};

const CHANNEL0: Port<u8> = Port::new(PortAddr::PIT_CHANNEL0);
const COMMAND: Port<u8> = Port::new(PortAddr::PIT_COMMAND);

static CURRENT_FREQUENCY_HZ: AtomicU32 = AtomicU32::new(0);

/// Monotonic count of timer interrupts since boot.
static TICK_COUNT: AtomicU64 = AtomicU64::new(0);

/// Ticks remaining before a pending `sleep` returns. Written by the timer
/// handler (single decrementing store per interrupt), armed by `sleep`.
static SLEEP_COUNTDOWN: AtomicU64 = AtomicU64::new(0);

/// Program channel 0 for a periodic square wave at the given rate.
pub fn set_frequency(frequency_hz: u32) {
    let divisor = divisor_for_frequency(frequency_hz);
    unsafe {
        COMMAND.write(
            PIT_COMMAND_CHANNEL0
                | PIT_COMMAND_ACCESS_LOHI
                | PIT_COMMAND_MODE_SQUARE
                | PIT_COMMAND_BINARY,
        );
        CHANNEL0.write((divisor & 0xFF) as u8);
        CHANNEL0.write((divisor >> 8) as u8);
        io_wait();
    }
    CURRENT_FREQUENCY_HZ.store(actual_frequency(divisor), Ordering::SeqCst);
}

pub fn init(frequency_hz: u32) {
    let freq = if frequency_hz == 0 {
        PIT_DEFAULT_FREQUENCY_HZ
    } else {
        frequency_hz
    };
    klog_info!("PIT: programming channel 0 at {} Hz", freq);
    set_frequency(freq);
}

pub fn frequency() -> u32 {
    let freq = CURRENT_FREQUENCY_HZ.load(Ordering::SeqCst);
    if freq == 0 {
        PIT_DEFAULT_FREQUENCY_HZ
    } else {
        freq
    }
}

/// Called by the timer interrupt handler once per tick.
pub(crate) fn timer_tick() {
    TICK_COUNT.fetch_add(1, Ordering::Relaxed);
    let remaining = SLEEP_COUNTDOWN.load(Ordering::Relaxed);
    if remaining > 0 {
        SLEEP_COUNTDOWN.store(remaining - 1, Ordering::Relaxed);
    }
}

pub fn ticks() -> u64 {
    TICK_COUNT.load(Ordering::Relaxed)
}

/// Block until `ticks` timer interrupts have occurred.
///
/// Requires interrupts enabled and the timer vector wired; never legal
/// from interrupt context, where the countdown could not advance past the
/// blocked handler's own unacknowledged interrupt.
pub fn sleep_ticks(ticks: u64) {
    if ticks == 0 {
        return;
    }
    if !cpu::interrupts_enabled() {
        klog_warn!("PIT: sleep requested with interrupts disabled, skipping");
        return;
    }
    SLEEP_COUNTDOWN.store(ticks, Ordering::SeqCst);
    while SLEEP_COUNTDOWN.load(Ordering::SeqCst) > 0 {
        cpu::hlt();
    }
}

/// Block for approximately `ms` milliseconds at the current tick rate.
pub fn sleep_ms(ms: u64) {
    let ticks = (ms * frequency() as u64).div_ceil(1000);
    sleep_ticks(ticks.max(1));
}
