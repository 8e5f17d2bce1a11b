//! 8254 PIT command bits and divisor math.

/// PIT base oscillator frequency (Hz).
pub const PIT_BASE_FREQUENCY_HZ: u32 = 1_193_182;

/// Default timer frequency (Hz): millisecond-granular ticks.
pub const PIT_DEFAULT_FREQUENCY_HZ: u32 = 1000;

/// Select channel 0 (PIT command).
pub const PIT_COMMAND_CHANNEL0: u8 = 0x00;
/// Access mode: low byte then high byte (PIT command).
pub const PIT_COMMAND_ACCESS_LOHI: u8 = 0x30;
/// Operating mode: square wave generator (PIT command).
pub const PIT_COMMAND_MODE_SQUARE: u8 = 0x06;
/// Binary counting mode (PIT command).
pub const PIT_COMMAND_BINARY: u8 = 0x00;

/// PIT is connected to legacy IRQ 0.
pub const PIT_IRQ_LINE: u8 = 0;

/// Reload divisor for a requested frequency, clamped to the 16-bit counter.
///
/// Zero requests fall back to the default rate; requests above the base
/// oscillator run at the base rate (divisor 1).
#[inline]
pub const fn divisor_for_frequency(frequency_hz: u32) -> u16 {
    let freq = if frequency_hz == 0 {
        PIT_DEFAULT_FREQUENCY_HZ
    } else if frequency_hz > PIT_BASE_FREQUENCY_HZ {
        PIT_BASE_FREQUENCY_HZ
    } else {
        frequency_hz
    };

    let divisor = PIT_BASE_FREQUENCY_HZ / freq;
    if divisor == 0 {
        1
    } else if divisor > 0xFFFF {
        0xFFFF
    } else {
        divisor as u16
    }
}

/// Frequency actually produced by a divisor.
#[inline]
pub const fn actual_frequency(divisor: u16) -> u32 {
    PIT_BASE_FREQUENCY_HZ / divisor as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rate_divisor() {
        let divisor = divisor_for_frequency(1000);
        assert_eq!(divisor, 1193);
        // 1_193_182 / 1193 rounds to 1000 Hz within 1 Hz.
        let actual = actual_frequency(divisor);
        assert!(actual >= 999 && actual <= 1001);
    }

    #[test]
    fn zero_falls_back_to_default() {
        assert_eq!(
            divisor_for_frequency(0),
            divisor_for_frequency(PIT_DEFAULT_FREQUENCY_HZ)
        );
    }

    #[test]
    fn extremes_clamp_to_counter_range() {
        // Faster than the oscillator: run at base rate.
        assert_eq!(divisor_for_frequency(u32::MAX), 1);
        // Slower than the counter can express: clamp to 16 bits.
        assert_eq!(divisor_for_frequency(1), 0xFFFF);
    }

    #[test]
    fn command_byte_shape() {
        let cmd = PIT_COMMAND_CHANNEL0
            | PIT_COMMAND_ACCESS_LOHI
            | PIT_COMMAND_MODE_SQUARE
            | PIT_COMMAND_BINARY;
        assert_eq!(cmd, 0x36);
    }
}
