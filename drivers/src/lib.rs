#![no_std]
#![forbid(unsafe_op_in_unsafe_fn)]

pub mod irq;
pub mod keyboard;
pub mod pic;
pub mod pit;
pub mod serial;
