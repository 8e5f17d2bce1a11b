//! EmberOS hardware layout definitions.
//!
//! Pure, host-testable encodings of the binary structures the bring-up
//! sequence hands to the CPU and the legacy platform devices: segment and
//! gate descriptors, I/O port addresses, PIC vector mapping, PIT divisor
//! math, and the PSF1 font format. Nothing in here touches hardware.

#![no_std]
#![forbid(unsafe_code)]

pub mod arch;
pub mod font;

pub use arch::x86_64::SegmentSelector;
