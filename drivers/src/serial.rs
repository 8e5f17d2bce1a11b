//! 16550 UART driver for COM1.
//!
//! Configured once at boot for 115200 baud 8N1 with the FIFO enabled.
//! Output only; input at this stage comes from the PS/2 keyboard.

use core::fmt::{self, Write};

use ember_abi::arch::x86_64::ports::{
    PortAddr, UART_FCR_ENABLE_CLEAR, UART_LCR_8N1, UART_LCR_DLAB, UART_LSR_TX_EMPTY,
    UART_MCR_READY, UART_REG_FCR, UART_REG_IER, UART_REG_LCR, UART_REG_LSR, UART_REG_MCR,
    UART_REG_THR,
};
use ember_lib::io::Port;
use ember_lib::{klog_attach_serial, InitFlag};
use spin::Mutex;

static SERIAL: Mutex<SerialPort> = Mutex::new(SerialPort::new(PortAddr::COM1));
static SERIAL_INIT: InitFlag = InitFlag::new();

struct SerialPort {
    base: PortAddr,
}

impl SerialPort {
    const fn new(base: PortAddr) -> Self {
        Self { base }
    }

    #[inline]
    const fn reg(&self, offset: u16) -> Port<u8> {
        Port::new(self.base.offset(offset))
    }

    unsafe fn init(&mut self) {
        unsafe {
            // Interrupts off; this driver polls the line status register.
            self.reg(UART_REG_IER).write(0x00);
            // Divisor latch: divisor 1 = 115200 baud.
            self.reg(UART_REG_LCR).write(UART_LCR_DLAB);
            self.reg(UART_REG_THR).write(0x01);
            self.reg(UART_REG_IER).write(0x00);
            self.reg(UART_REG_LCR).write(UART_LCR_8N1);
            self.reg(UART_REG_FCR).write(UART_FCR_ENABLE_CLEAR);
            self.reg(UART_REG_MCR).write(UART_MCR_READY);
        }
    }

    fn write_byte(&mut self, byte: u8) {
        unsafe {
            while self.reg(UART_REG_LSR).read() & UART_LSR_TX_EMPTY == 0 {
                core::hint::spin_loop();
            }
            self.reg(UART_REG_THR).write(byte);
        }
    }
}

impl Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            match b {
                b'\n' => {
                    self.write_byte(b'\r');
                    self.write_byte(b'\n');
                }
                _ => self.write_byte(b),
            }
        }
        Ok(())
    }
}

/// Initialize COM1. Safe to call more than once.
pub fn init() {
    if !SERIAL_INIT.init_once() {
        return;
    }
    let mut port = SERIAL.lock();
    unsafe {
        port.init();
    }
    klog_attach_serial();
}

pub fn write_str(s: &str) {
    let _ = SERIAL.lock().write_str(s);
}

pub fn write_line(s: &str) {
    let mut guard = SERIAL.lock();
    let _ = guard.write_str(s);
    let _ = guard.write_str("\n");
}

pub fn print_args(args: fmt::Arguments<'_>) {
    let _ = SERIAL.lock().write_fmt(args);
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {{
        $crate::serial::print_args(core::format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! serial_println {
    () => {
        $crate::serial::write_line("");
    };
    ($fmt:expr) => {
        $crate::serial::write_line($fmt);
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::serial::print_args(core::format_args!(concat!($fmt, "\n"), $($arg)*));
    };
}
