//! Legacy 8259 PIC command words and vector mapping math.
//!
//! The side-effecting driver lives in `ember-drivers`; this module carries
//! the initialization command words and the pure line/vector/mask
//! arithmetic so the remap invariants can be checked on the host.

/// ICW1: start initialization, ICW4 follows.
pub const ICW1_INIT_ICW4: u8 = 0x11;
/// ICW3 for the master: slave attached on IRQ line 2.
pub const ICW3_MASTER_CASCADE: u8 = 0x04;
/// ICW3 for the slave: its cascade identity on the master.
pub const ICW3_SLAVE_IDENTITY: u8 = 0x02;
/// ICW4: 8086/88 mode.
pub const ICW4_8086: u8 = 0x01;

/// OCW3: select the interrupt request register for the next read.
pub const OCW3_READ_IRR: u8 = 0x0A;
/// OCW3: select the in-service register for the next read.
pub const OCW3_READ_ISR: u8 = 0x0B;
/// End of interrupt.
pub const EOI: u8 = 0x20;

/// Default vector base for IRQ 0-7 after remapping.
pub const DEFAULT_MASTER_OFFSET: u8 = 0x20;
/// Default vector base for IRQ 8-15 after remapping.
pub const DEFAULT_SLAVE_OFFSET: u8 = 0x28;

/// Number of IRQ lines across the cascade.
pub const IRQ_LINE_COUNT: u8 = 16;

/// CPU vector a given IRQ line raises after remapping with the two offsets.
#[inline]
pub const fn vector_for_irq(irq: u8, master_offset: u8, slave_offset: u8) -> u8 {
    if irq < 8 {
        master_offset + irq
    } else {
        slave_offset + (irq - 8)
    }
}

/// Inverse of `vector_for_irq`; `None` when the vector is outside both
/// remapped windows.
#[inline]
pub const fn irq_for_vector(vector: u8, master_offset: u8, slave_offset: u8) -> Option<u8> {
    if vector >= master_offset && vector < master_offset + 8 {
        Some(vector - master_offset)
    } else if vector >= slave_offset && vector < slave_offset + 8 {
        Some(8 + vector - slave_offset)
    } else {
        None
    }
}

/// Bit of the per-controller mask register covering an IRQ line.
#[inline]
pub const fn mask_bit(irq: u8) -> u8 {
    1 << (irq & 0x7)
}

/// Set the mask bit for a line in a controller's mask byte.
#[inline]
pub const fn with_line_masked(mask: u8, irq: u8) -> u8 {
    mask | mask_bit(irq)
}

/// Clear the mask bit for a line in a controller's mask byte.
#[inline]
pub const fn with_line_unmasked(mask: u8, irq: u8) -> u8 {
    mask & !mask_bit(irq)
}

/// Whether a line lives on the slave controller.
#[inline]
pub const fn is_slave_line(irq: u8) -> bool {
    irq >= 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_maps_every_line() {
        for irq in 0..IRQ_LINE_COUNT {
            let vector = vector_for_irq(irq, DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET);
            if irq < 8 {
                assert_eq!(vector, DEFAULT_MASTER_OFFSET + irq);
            } else {
                assert_eq!(vector, DEFAULT_SLAVE_OFFSET + irq - 8);
            }
            assert_eq!(
                irq_for_vector(vector, DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET),
                Some(irq)
            );
        }
    }

    #[test]
    fn vectors_outside_windows_map_to_none() {
        assert_eq!(irq_for_vector(0x03, DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET), None);
        assert_eq!(irq_for_vector(0x1F, DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET), None);
        assert_eq!(irq_for_vector(0x30, DEFAULT_MASTER_OFFSET, DEFAULT_SLAVE_OFFSET), None);
    }

    #[test]
    fn masking_is_idempotent() {
        for irq in 0..8 {
            let masked = with_line_masked(0x00, irq);
            assert_eq!(with_line_masked(masked, irq), masked);
            let unmasked = with_line_unmasked(0xFF, irq);
            assert_eq!(with_line_unmasked(unmasked, irq), unmasked);
        }
    }

    #[test]
    fn masking_leaves_other_lines_alone() {
        let mask = with_line_masked(0b0101_0000, 1);
        assert_eq!(mask, 0b0101_0010);
        let mask = with_line_unmasked(mask, 4);
        assert_eq!(mask, 0b0100_0010);
    }

    #[test]
    fn slave_lines_use_low_three_bits() {
        assert_eq!(mask_bit(8), 0x01);
        assert_eq!(mask_bit(15), 0x80);
        assert!(is_slave_line(8));
        assert!(!is_slave_line(7));
    }
}
