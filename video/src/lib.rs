#![no_std]
#![forbid(unsafe_op_in_unsafe_fn)]

pub mod console;
pub mod framebuffer;
