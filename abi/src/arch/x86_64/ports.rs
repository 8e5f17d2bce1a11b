//! x86 I/O port addresses.
//!
//! A type-safe `PortAddr` newtype grouping every port the bring-up sequence
//! touches, so raw u16 values never masquerade as port numbers.

/// x86 I/O port address.
///
/// Ports are accessed via IN/OUT instructions. This newtype groups all
/// known port addresses used by EmberOS.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PortAddr(pub u16);

impl PortAddr {
    /// COM1 serial port base address.
    pub const COM1: Self = Self(0x3F8);

    /// PIT channel 0 data port.
    pub const PIT_CHANNEL0: Self = Self(0x40);

    /// PIT command/mode register port.
    pub const PIT_COMMAND: Self = Self(0x43);

    /// PS/2 data port, scancodes are read here.
    pub const PS2_DATA: Self = Self(0x60);

    /// PS/2 status port (read) / command port (write).
    pub const PS2_STATUS: Self = Self(0x64);

    /// Master PIC command port.
    pub const PIC1_COMMAND: Self = Self(0x20);

    /// Master PIC data port.
    pub const PIC1_DATA: Self = Self(0x21);

    /// Slave PIC command port.
    pub const PIC2_COMMAND: Self = Self(0xA0);

    /// Slave PIC data port.
    pub const PIC2_DATA: Self = Self(0xA1);

    /// POST diagnostic port, writes are used as an I/O delay.
    pub const POST_DELAY: Self = Self(0x80);

    /// Get the raw port number for IN/OUT instructions.
    #[inline]
    pub const fn number(self) -> u16 {
        self.0
    }

    /// Create an offset port (e.g. COM1 + register offset).
    #[inline]
    pub const fn offset(self, off: u16) -> Self {
        Self(self.0 + off)
    }
}

// =============================================================================
// UART register offsets (relative to the COM base)
// =============================================================================

/// Receiver Buffer Register (read) / Transmitter Holding Register (write).
pub const UART_REG_THR: u16 = 0;
/// Interrupt Enable Register.
pub const UART_REG_IER: u16 = 1;
/// FIFO Control Register (write).
pub const UART_REG_FCR: u16 = 2;
/// Line Control Register.
pub const UART_REG_LCR: u16 = 3;
/// Modem Control Register.
pub const UART_REG_MCR: u16 = 4;
/// Line Status Register.
pub const UART_REG_LSR: u16 = 5;

/// Divisor Latch Access Bit (LCR).
pub const UART_LCR_DLAB: u8 = 0x80;
/// 8 data bits, no parity, 1 stop bit (LCR).
pub const UART_LCR_8N1: u8 = 0x03;
/// Enable FIFO, clear both queues (FCR).
pub const UART_FCR_ENABLE_CLEAR: u8 = 0x07;
/// Transmitter holding register empty (LSR).
pub const UART_LSR_TX_EMPTY: u8 = 0x20;
/// Data Terminal Ready + Request To Send + AUX2 (MCR).
pub const UART_MCR_READY: u8 = 0x0B;

// =============================================================================
// PS/2 controller bits
// =============================================================================

/// Output buffer full: a scancode is waiting at the data port.
pub const PS2_STATUS_OUTPUT_FULL: u8 = 0x01;
/// Scancode bit set when the byte reports a key release.
pub const PS2_SCANCODE_RELEASE: u8 = 0x80;
