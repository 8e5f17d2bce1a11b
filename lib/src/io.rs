//! Type-safe x86 I/O port access.

use core::arch::asm;
use core::marker::PhantomData;

use ember_abi::arch::x86_64::ports::PortAddr;

mod private {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
}

/// Trait for value widths that can cross an I/O port.
/// Sealed: only implemented for `u8` and `u16`.
pub trait PortValue: private::Sealed + Copy {
    /// # Safety
    /// Port I/O can have arbitrary side effects on hardware state.
    unsafe fn read_from_port(port: u16) -> Self;

    /// # Safety
    /// Port I/O can have arbitrary side effects on hardware state.
    unsafe fn write_to_port(port: u16, value: Self);
}

impl PortValue for u8 {
    #[inline(always)]
    unsafe fn read_from_port(port: u16) -> u8 {
        let value: u8;
        unsafe {
            asm!(
                "in al, dx",
                out("al") value,
                in("dx") port,
                options(nomem, nostack, preserves_flags)
            );
        }
        value
    }

    #[inline(always)]
    unsafe fn write_to_port(port: u16, value: u8) {
        unsafe {
            asm!(
                "out dx, al",
                in("dx") port,
                in("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
    }
}

impl PortValue for u16 {
    #[inline(always)]
    unsafe fn read_from_port(port: u16) -> u16 {
        let value: u16;
        unsafe {
            asm!(
                "in ax, dx",
                out("ax") value,
                in("dx") port,
                options(nomem, nostack, preserves_flags)
            );
        }
        value
    }

    #[inline(always)]
    unsafe fn write_to_port(port: u16, value: u16) {
        unsafe {
            asm!(
                "out dx, ax",
                in("dx") port,
                in("ax") value,
                options(nomem, nostack, preserves_flags)
            );
        }
    }
}

/// Typed I/O port bound to an address from the `ember-abi` catalogue.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Port<T: PortValue> {
    addr: PortAddr,
    _phantom: PhantomData<T>,
}

impl<T: PortValue> Port<T> {
    #[inline]
    pub const fn new(addr: PortAddr) -> Self {
        Self {
            addr,
            _phantom: PhantomData,
        }
    }

    #[inline]
    pub const fn address(&self) -> u16 {
        self.addr.number()
    }

    #[inline]
    pub const fn offset(self, off: u16) -> Self {
        Self::new(self.addr.offset(off))
    }

    /// # Safety
    /// Port I/O can have arbitrary side effects on hardware state.
    #[inline(always)]
    pub unsafe fn read(&self) -> T {
        unsafe { T::read_from_port(self.addr.number()) }
    }

    /// # Safety
    /// Port I/O can have arbitrary side effects on hardware state.
    #[inline(always)]
    pub unsafe fn write(&self, value: T) {
        unsafe { T::write_to_port(self.addr.number(), value) }
    }
}

impl<T: PortValue> core::fmt::Debug for Port<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Port")
            .field("address", &format_args!("0x{:04x}", self.addr.number()))
            .field("size", &core::mem::size_of::<T>())
            .finish()
    }
}

/// I/O delay via the POST diagnostic port. The 8259 needs a breather
/// between initialization command words on old hardware.
///
/// # Safety
/// Should only be called in contexts where port I/O is appropriate.
#[inline(always)]
pub unsafe fn io_wait() {
    const DELAY_PORT: Port<u8> = Port::new(PortAddr::POST_DELAY);
    unsafe { DELAY_PORT.write(0) }
}
