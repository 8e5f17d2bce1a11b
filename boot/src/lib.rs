#![no_std]

pub mod gdt;
pub mod idt;
pub mod limine_protocol;
pub mod panic;

pub use limine_protocol::{boot_info, BootInfo, MemmapEntry};
pub use panic::panic_handler_impl;
