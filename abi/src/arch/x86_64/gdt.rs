//! Segment selector encoding and the GDT slot assignment.
//!
//! Selectors pack the descriptor index, table indicator (GDT/LDT), and
//! requested privilege level into 16 bits. The slot constants fix the table
//! order the loader installs: null, kernel code/data, user code/data, then
//! the two-slot TSS descriptor.

/// x86_64 segment selector.
///
/// Layout (16 bits):
/// - Bits 0-1: Requested Privilege Level (RPL)
/// - Bit 2: Table Indicator (0 = GDT, 1 = LDT)
/// - Bits 3-15: Descriptor index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SegmentSelector(pub u16);

impl SegmentSelector {
    /// Null selector (index 0, GDT, RPL 0).
    pub const NULL: Self = Self(0);

    /// Kernel code segment (GDT index 1, RPL 0) = 0x08.
    pub const KERNEL_CODE: Self = Self::new(1, false, 0);

    /// Kernel data segment (GDT index 2, RPL 0) = 0x10.
    pub const KERNEL_DATA: Self = Self::new(2, false, 0);

    /// User code segment (GDT index 3, RPL 3) = 0x1B.
    pub const USER_CODE: Self = Self::new(3, false, 3);

    /// User data segment (GDT index 4, RPL 3) = 0x23.
    pub const USER_DATA: Self = Self::new(4, false, 3);

    /// TSS descriptor (GDT index 5, RPL 0) = 0x28. Spans slots 5 and 6.
    pub const TSS: Self = Self::new(5, false, 0);

    /// Create a new segment selector.
    #[inline]
    pub const fn new(index: u16, ldt: bool, rpl: u8) -> Self {
        let ti = if ldt { 1 << 2 } else { 0 };
        Self((index << 3) | ti | (rpl as u16 & 0x3))
    }

    /// Descriptor table index.
    #[inline]
    pub const fn index(self) -> u16 {
        self.0 >> 3
    }

    /// Whether the selector references the LDT.
    #[inline]
    pub const fn is_ldt(self) -> bool {
        self.0 & (1 << 2) != 0
    }

    /// Requested privilege level (0-3).
    #[inline]
    pub const fn rpl(self) -> u8 {
        (self.0 & 0x3) as u8
    }

    /// Raw selector value for loading into a segment register.
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

/// Number of `u64` slots in the GDT: null + 4 segments + 2 for the TSS.
pub const GDT_SLOT_COUNT: usize = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_values() {
        assert_eq!(SegmentSelector::NULL.bits(), 0x00);
        assert_eq!(SegmentSelector::KERNEL_CODE.bits(), 0x08);
        assert_eq!(SegmentSelector::KERNEL_DATA.bits(), 0x10);
        assert_eq!(SegmentSelector::USER_CODE.bits(), 0x1B);
        assert_eq!(SegmentSelector::USER_DATA.bits(), 0x23);
        assert_eq!(SegmentSelector::TSS.bits(), 0x28);
    }

    #[test]
    fn selector_decomposition() {
        let sel = SegmentSelector::USER_CODE;
        assert_eq!(sel.index(), 3);
        assert_eq!(sel.rpl(), 3);
        assert!(!sel.is_ldt());
    }

    #[test]
    fn tss_occupies_last_two_slots() {
        let tss_index = SegmentSelector::TSS.index() as usize;
        assert_eq!(tss_index + 2, GDT_SLOT_COUNT);
    }
}
