pub mod descriptor;
pub mod gdt;
pub mod pic;
pub mod pit;
pub mod ports;

pub use gdt::SegmentSelector;
