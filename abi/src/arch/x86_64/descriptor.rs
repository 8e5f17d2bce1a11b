//! Descriptor bit packing for the GDT and IDT.
//!
//! The hardware formats are represented as explicit shift/mask packing over
//! fixed-width integers rather than `#[repr(C)]` structs, so the binary
//! contract never depends on field layout or padding. Each encoder has a
//! matching decoder; the pair round-trips exactly for inputs within the
//! documented bit widths.
//!
//! Segment descriptor (8 bytes):
//!
//! ```text
//! 63      56 55  52 51    48 47      40 39      32 31      16 15       0
//! base[31:24] flags limit[19:16] access  base[23:16] base[15:0] limit[15:0]
//! ```

use bitflags::bitflags;

bitflags! {
    /// Access byte of a segment descriptor (bits 40..48).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DescriptorAccess: u8 {
        /// Accessed (set by the CPU).
        const ACCESSED    = 1 << 0;
        /// Readable for code segments, writable for data segments.
        const RW          = 1 << 1;
        /// Direction for data, conforming for code.
        const DC          = 1 << 2;
        /// Executable: code segment when set, data when clear.
        const EXECUTABLE  = 1 << 3;
        /// Descriptor type: code/data segment when set, system when clear.
        const SEGMENT     = 1 << 4;
        /// DPL low bit (bits 5..6 together encode the privilege level).
        const DPL_LOW     = 1 << 5;
        /// DPL high bit.
        const DPL_HIGH    = 1 << 6;
        /// Present.
        const PRESENT     = 1 << 7;
    }
}

bitflags! {
    /// Flag nibble of a segment descriptor (bits 52..56).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DescriptorFlags: u8 {
        /// Available for system software.
        const AVAILABLE   = 1 << 0;
        /// Long mode (64-bit code segment).
        const LONG_MODE   = 1 << 1;
        /// Default operand size (must be clear when LONG_MODE is set).
        const SIZE_32     = 1 << 2;
        /// Granularity: limit counted in 4 KiB units.
        const GRANULARITY = 1 << 3;
    }
}

impl DescriptorAccess {
    /// Ring-0 execute/read code segment.
    pub const KERNEL_CODE: Self = Self::PRESENT
        .union(Self::SEGMENT)
        .union(Self::EXECUTABLE)
        .union(Self::RW);

    /// Ring-0 read/write data segment.
    pub const KERNEL_DATA: Self = Self::PRESENT.union(Self::SEGMENT).union(Self::RW);

    /// Ring-3 execute/read code segment.
    pub const USER_CODE: Self = Self::KERNEL_CODE.union(Self::DPL_LOW).union(Self::DPL_HIGH);

    /// Ring-3 read/write data segment.
    pub const USER_DATA: Self = Self::KERNEL_DATA.union(Self::DPL_LOW).union(Self::DPL_HIGH);

    /// 64-bit available TSS system descriptor (type 0x9, present).
    pub const TSS_AVAILABLE: Self = Self::PRESENT
        .union(Self::EXECUTABLE)
        .union(Self::ACCESSED);

    /// Privilege level encoded in bits 5..6.
    #[inline]
    pub const fn dpl(self) -> u8 {
        (self.bits() >> 5) & 0x3
    }
}

impl DescriptorFlags {
    /// 4 KiB granular long-mode segment.
    pub const LONG_4K: Self = Self::GRANULARITY.union(Self::LONG_MODE);
}

/// Pack a segment descriptor. `base` uses all 32 bits, `limit` the low 20.
#[inline]
pub const fn encode(base: u32, limit: u32, access: DescriptorAccess, flags: DescriptorFlags) -> u64 {
    let base = base as u64;
    let limit = (limit & 0x000F_FFFF) as u64;

    (limit & 0xFFFF)
        | ((base & 0xFFFF) << 16)
        | (((base >> 16) & 0xFF) << 32)
        | ((access.bits() as u64) << 40)
        | (((limit >> 16) & 0xF) << 48)
        | (((flags.bits() & 0xF) as u64) << 52)
        | (((base >> 24) & 0xFF) << 56)
}

/// Unpack a segment descriptor into (base, limit, access, flags).
#[inline]
pub const fn decode(raw: u64) -> (u32, u32, DescriptorAccess, DescriptorFlags) {
    let limit = ((raw & 0xFFFF) | (((raw >> 48) & 0xF) << 16)) as u32;
    let base = (((raw >> 16) & 0xFFFF) | (((raw >> 32) & 0xFF) << 16) | (((raw >> 56) & 0xFF) << 24))
        as u32;
    let access = DescriptorAccess::from_bits_retain(((raw >> 40) & 0xFF) as u8);
    let flags = DescriptorFlags::from_bits_retain(((raw >> 52) & 0xF) as u8);
    (base, limit, access, flags)
}

/// Pack a 16-byte system descriptor (TSS/LDT) spanning two table slots.
///
/// The low slot matches `encode` applied to the low 32 base bits; the high
/// slot carries base bits 32..64 with the reserved half zero.
#[inline]
pub const fn encode_system(
    base: u64,
    limit: u32,
    access: DescriptorAccess,
    flags: DescriptorFlags,
) -> [u64; 2] {
    [
        encode(base as u32, limit, access, flags),
        (base >> 32) & 0xFFFF_FFFF,
    ]
}

/// Interrupt gate type nibble: further interrupts auto-disabled on entry.
pub const GATE_TYPE_INTERRUPT: u8 = 0xE;
/// Trap gate type nibble: interrupt flag left unchanged on entry.
pub const GATE_TYPE_TRAP: u8 = 0xF;
/// Present bit of the gate type/attribute byte.
pub const GATE_PRESENT: u8 = 0x80;

/// Gate type for one vector: remapped hardware IRQ windows get interrupt
/// gates so delivery stays masked while a line is serviced, every other
/// vector keeps trap semantics.
#[inline]
pub const fn gate_type_for_vector(vector: u8, master_offset: u8, slave_offset: u8) -> u8 {
    match crate::arch::x86_64::pic::irq_for_vector(vector, master_offset, slave_offset) {
        Some(_) => GATE_TYPE_INTERRUPT,
        None => GATE_TYPE_TRAP,
    }
}

/// Decomposed 16-byte IDT gate, field for field as the CPU reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateBits {
    pub offset_low: u16,
    pub selector: u16,
    pub ist: u8,
    pub type_attr: u8,
    pub offset_mid: u16,
    pub offset_high: u32,
}

impl GateBits {
    /// Split a handler address across the three offset fields and assemble
    /// the type/attribute byte from gate type, DPL, and the present bit.
    #[inline]
    pub const fn new(handler: u64, selector: u16, ist: u8, gate_type: u8, dpl: u8) -> Self {
        Self {
            offset_low: (handler & 0xFFFF) as u16,
            selector,
            ist: ist & 0x7,
            type_attr: (gate_type & 0xF) | GATE_PRESENT | ((dpl & 0x3) << 5),
            offset_mid: ((handler >> 16) & 0xFFFF) as u16,
            offset_high: (handler >> 32) as u32,
        }
    }

    /// Reassemble the handler address from the three offset fields.
    #[inline]
    pub const fn handler(&self) -> u64 {
        (self.offset_low as u64) | ((self.offset_mid as u64) << 16) | ((self.offset_high as u64) << 32)
    }

    #[inline]
    pub const fn gate_type(&self) -> u8 {
        self.type_attr & 0xF
    }

    #[inline]
    pub const fn dpl(&self) -> u8 {
        (self.type_attr >> 5) & 0x3
    }

    #[inline]
    pub const fn present(&self) -> bool {
        self.type_attr & GATE_PRESENT != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_code_matches_known_pattern() {
        // base=0, limit=0xFFFFF, ring-0 execute/read, 4K granular long mode.
        let packed = encode(
            0,
            0x000F_FFFF,
            DescriptorAccess::KERNEL_CODE,
            DescriptorFlags::LONG_4K,
        );
        assert_eq!(packed, 0x00AF_9A00_0000_FFFF);
    }

    #[test]
    fn flat_descriptor_family() {
        let limit = 0x000F_FFFF;
        let flags = DescriptorFlags::LONG_4K;
        assert_eq!(
            encode(0, limit, DescriptorAccess::KERNEL_DATA, flags),
            0x00AF_9200_0000_FFFF
        );
        assert_eq!(
            encode(0, limit, DescriptorAccess::USER_CODE, flags),
            0x00AF_FA00_0000_FFFF
        );
        assert_eq!(
            encode(0, limit, DescriptorAccess::USER_DATA, flags),
            0x00AF_F200_0000_FFFF
        );
    }

    #[test]
    fn descriptor_round_trips() {
        let cases = [
            (0u32, 0u32),
            (0xDEAD_BEEF, 0x000F_FFFF),
            (0x0010_0000, 0x0001_2345),
            (0xFFFF_FFFF, 0x000A_BCDE),
        ];
        for (base, limit) in cases {
            let access = DescriptorAccess::KERNEL_CODE;
            let flags = DescriptorFlags::LONG_4K;
            let (b, l, a, f) = decode(encode(base, limit, access, flags));
            assert_eq!((b, l), (base, limit));
            assert_eq!(a, access);
            assert_eq!(f, flags);
        }
    }

    #[test]
    fn access_privilege_bits() {
        assert_eq!(DescriptorAccess::KERNEL_CODE.dpl(), 0);
        assert_eq!(DescriptorAccess::USER_CODE.dpl(), 3);
        assert_eq!(DescriptorAccess::USER_DATA.dpl(), 3);
    }

    #[test]
    fn system_descriptor_spans_two_slots() {
        let base = 0xFFFF_8000_1234_5678u64;
        let limit = 0x67;
        let [low, high] = encode_system(
            base,
            limit,
            DescriptorAccess::TSS_AVAILABLE,
            DescriptorFlags::empty(),
        );
        let (b, l, a, _) = decode(low);
        assert_eq!(b, base as u32);
        assert_eq!(l, limit);
        assert_eq!(a.bits(), 0x89);
        assert_eq!(high, base >> 32);
    }

    #[test]
    fn gate_splits_handler_address() {
        let handler = 0xFFFF_FFFF_8001_2345u64;
        let gate = GateBits::new(handler, 0x08, 0, GATE_TYPE_INTERRUPT, 0);
        assert_eq!(gate.offset_low, 0x2345);
        assert_eq!(gate.offset_mid, 0x8001);
        assert_eq!(gate.offset_high, 0xFFFF_FFFF);
        assert_eq!(gate.handler(), handler);
        assert_eq!(gate.type_attr, 0x8E);
        assert!(gate.present());
    }

    #[test]
    fn gate_type_follows_irq_windows() {
        use crate::arch::x86_64::pic::{DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET};
        for vector in 0..=255u8 {
            let expected = if (0x20..0x30).contains(&vector) {
                GATE_TYPE_INTERRUPT
            } else {
                GATE_TYPE_TRAP
            };
            assert_eq!(
                gate_type_for_vector(vector, DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET),
                expected,
                "vector {}",
                vector
            );
        }
        // Exceptions in particular stay trap-typed.
        assert_eq!(
            gate_type_for_vector(3, DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET),
            GATE_TYPE_TRAP
        );
        assert_eq!(
            gate_type_for_vector(14, DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET),
            GATE_TYPE_TRAP
        );
    }

    #[test]
    fn trap_gate_attributes() {
        let gate = GateBits::new(0x1000, 0x08, 0, GATE_TYPE_TRAP, 0);
        assert_eq!(gate.type_attr, 0x8F);
        assert_eq!(gate.gate_type(), GATE_TYPE_TRAP);
        assert_eq!(gate.dpl(), 0);

        let user_gate = GateBits::new(0x1000, 0x08, 0, GATE_TYPE_TRAP, 3);
        assert_eq!(user_gate.type_attr, 0xEF);
        assert_eq!(user_gate.dpl(), 3);
    }
}
