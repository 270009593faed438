//! Clock divider planning for counter-based PWM slices (RP2040 / RP2350).
//!
//! A slice counts from 0 to `top` at `clk_sys / divider`, where the divider is an 8.4 fixed
//! point value in `1.0..=255.9375`. Resolution `r` runs the counter over `2^(r + shift)` ticks
//! with the compare value scaled by `2^shift`. The shift grows until the divider fits, which
//! keeps low frequencies reachable at low resolutions.
//!
//! Kept free of register access so the arithmetic builds and tests on the host.

use crate::driver::DriverError;
use crate::duty::full_scale;

/// Largest counter span whose always-on compare value still fits a 16-bit compare register.
pub const MAX_COUNTER_BITS: u8 = 15;

/// Smallest divider, 1.0 in 8.4 fixed point.
const DIVIDER_MIN: u64 = 16;

/// Largest divider, 255.9375 in 8.4 fixed point.
const DIVIDER_MAX: u64 = 0xFFF;

/// Divider and counter span for one slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SliceTiming {
    divider_bits: u16,
    shift: u8,
    counter_bits: u8,
}

impl SliceTiming {
    /// Pick the smallest compare shift for which the divider can produce `frequency` from
    /// `clock_hz` at `resolution` bits.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Unsupported`] for a zero frequency or a resolution outside
    /// `1..=15`, and [`DriverError::DividerOutOfRange`] when no counter span fits the divider.
    pub fn plan(clock_hz: u32, frequency: u32, resolution: u8) -> Result<Self, DriverError> {
        if resolution == 0 || resolution > MAX_COUNTER_BITS || frequency == 0 {
            return Err(DriverError::Unsupported);
        }
        for counter_bits in resolution..=MAX_COUNTER_BITS {
            let period_ticks = u64::from(full_scale(counter_bits)) * u64::from(frequency);
            let divider16 = (u64::from(clock_hz) * 16 + period_ticks / 2) / period_ticks;
            if divider16 > DIVIDER_MAX {
                continue;
            }
            if divider16 < DIVIDER_MIN {
                return Err(DriverError::DividerOutOfRange);
            }
            let divider_bits =
                u16::try_from(divider16).map_err(|_| DriverError::DividerOutOfRange)?;
            return Ok(Self {
                divider_bits,
                shift: counter_bits - resolution,
                counter_bits,
            });
        }
        Err(DriverError::DividerOutOfRange)
    }

    /// Divider in 8.4 fixed point bits.
    #[must_use]
    pub const fn divider_bits(self) -> u16 {
        self.divider_bits
    }

    /// Compare-value scale, as a power of two.
    #[must_use]
    pub const fn shift(self) -> u8 {
        self.shift
    }

    /// Counter period in ticks, `top + 1`.
    #[must_use]
    pub const fn counts(self) -> u32 {
        full_scale(self.counter_bits)
    }

    /// The `top` register value.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Rejected`] if the span does not fit 16 bits.
    pub fn top(self) -> Result<u16, DriverError> {
        u16::try_from(self.counts().saturating_sub(1)).map_err(|_| DriverError::Rejected)
    }

    /// Compare register value for `duty` counts at the planned resolution. Saturates at
    /// always-on.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Rejected`] if the value does not fit 16 bits.
    pub fn compare(self, duty: u32) -> Result<u16, DriverError> {
        let scaled = duty.checked_shl(u32::from(self.shift)).unwrap_or(u32::MAX);
        u16::try_from(scaled.min(self.counts())).map_err(|_| DriverError::Rejected)
    }

    /// Counter preload that makes the period start `phase` counts early.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Rejected`] if the value does not fit 16 bits.
    pub fn counter_start(self, phase: u32) -> Result<u16, DriverError> {
        let counts = self.counts();
        let offset = phase.checked_shl(u32::from(self.shift)).unwrap_or(0) % counts;
        u16::try_from((counts - offset) % counts).map_err(|_| DriverError::Rejected)
    }

    /// Frequency the slice produces from `clock_hz`.
    #[must_use]
    pub fn frequency(self, clock_hz: u32) -> u32 {
        let ticks = u64::from(self.counts()) * u64::from(self.divider_bits);
        if ticks == 0 {
            return 0;
        }
        u32::try_from(u64::from(clock_hz) * 16 / ticks).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLK_SYS: u32 = 125_000_000;

    #[test]
    fn servo_frame_fits_without_shift() {
        let timing = SliceTiming::plan(CLK_SYS, 50, 14).unwrap();
        assert_eq!(timing.divider_bits(), 2441); // 152.5625
        assert_eq!(timing.shift(), 0);
        assert_eq!(timing.top(), Ok(16_383));
        assert_eq!(timing.frequency(CLK_SYS), 50);
        assert_eq!(timing.compare(1229), Ok(1229));
    }

    #[test]
    fn low_resolution_widens_counter() {
        let timing = SliceTiming::plan(CLK_SYS, 1000, 8).unwrap();
        assert_eq!(timing.divider_bits(), 3906);
        assert_eq!(timing.shift(), 1);
        assert_eq!(timing.counts(), 512);
        assert_eq!(timing.frequency(CLK_SYS), 1000);
        assert_eq!(timing.compare(100), Ok(200));
        assert_eq!(timing.compare(256), Ok(512));
        assert_eq!(timing.compare(u32::MAX), Ok(512));

        let servo_at_8_bits = SliceTiming::plan(CLK_SYS, 50, 8).unwrap();
        assert_eq!(servo_at_8_bits.shift(), 6);
        assert_eq!(servo_at_8_bits.compare(128), Ok(8192));
    }

    #[test]
    fn full_width_always_on_fits_compare_register() {
        let timing = SliceTiming::plan(CLK_SYS, 330, 15).unwrap();
        assert_eq!(timing.top(), Ok(32_767));
        assert_eq!(timing.compare(1 << 15), Ok(32_768));
        assert_eq!(timing.frequency(CLK_SYS), 329);
    }

    #[test]
    fn counter_start_wraps_phase() {
        let timing = SliceTiming::plan(CLK_SYS, 1000, 8).unwrap();
        assert_eq!(timing.counter_start(0), Ok(0));
        assert_eq!(timing.counter_start(64), Ok(384));
        assert_eq!(timing.counter_start(256), Ok(0));
    }

    #[test]
    fn unreachable_timings_are_rejected() {
        assert_eq!(
            SliceTiming::plan(CLK_SYS, 1_000_000, 8),
            Err(DriverError::DividerOutOfRange)
        );
        assert_eq!(
            SliceTiming::plan(CLK_SYS, 1, 8),
            Err(DriverError::DividerOutOfRange)
        );
        assert_eq!(
            SliceTiming::plan(CLK_SYS, 50, 16),
            Err(DriverError::Unsupported)
        );
        assert_eq!(
            SliceTiming::plan(CLK_SYS, 0, 8),
            Err(DriverError::Unsupported)
        );
    }
}
