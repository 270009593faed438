//! Duty-cycle and servo-pulse arithmetic.
//!
//! Everything here is pure integer math so it can be checked on the host.

/// Lowest frequency a servo write keeps; anything outside the band falls back to
/// [`SERVO_FALLBACK_HZ`].
pub const SERVO_MIN_HZ: u32 = 40;

/// Highest frequency a servo write keeps.
pub const SERVO_MAX_HZ: u32 = 900;

/// Servo frame rate used when the cached frequency is outside the servo band.
pub const SERVO_FALLBACK_HZ: u32 = 50;

/// Resolution floor for servo writes.
pub const SERVO_MIN_RESOLUTION: u8 = 14;

/// Largest angle a servo write accepts.
pub const SERVO_MAX_DEGREES: u16 = 180;

const MICROS_PER_SECOND: u64 = 1_000_000;

/// `2^resolution`, the always-on compare value. Saturates at `u32::MAX` past 31 bits.
#[must_use]
pub const fn full_scale(resolution: u8) -> u32 {
    match 1u32.checked_shl(resolution as u32) {
        Some(value) => value,
        None => u32::MAX,
    }
}

/// Clamp `duty` into `0..=2^resolution`.
///
/// Values above the counter maximum become `2^resolution` (output held high). At 8 bits and
/// above the counter maximum itself is also promoted, since `2^resolution - 1` would leave a
/// one-tick low glitch every period.
///
/// ```
/// use pwm_envoy::duty::max_duty_fix;
///
/// assert_eq!(max_duty_fix(255, 8), 256);
/// assert_eq!(max_duty_fix(254, 8), 254);
/// assert_eq!(max_duty_fix(300, 8), 256);
/// assert_eq!(max_duty_fix(127, 7), 127);
/// ```
#[must_use]
pub const fn max_duty_fix(duty: u32, resolution: u8) -> u32 {
    let full = full_scale(resolution);
    let max_value = full.saturating_sub(1);
    if duty > max_value || (resolution > 7 && duty == max_value) {
        full
    } else {
        duty
    }
}

/// What a servo write asks for, after classification and clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServoTarget {
    /// An angle in `0..=180`, mapped onto `[min_us, max_us]`.
    Degrees(u16),
    /// A pulse width already inside `[min_us, max_us]`.
    Micros(u16),
}

impl ServoTarget {
    /// Values below `min_us` are angles; everything else is a pulse width.
    ///
    /// Angles above 180 clamp to 180, pulse widths clamp into `[min_us, max_us]`.
    #[must_use]
    pub fn classify(value: u16, min_us: u16, max_us: u16) -> Self {
        if value < min_us {
            Self::Degrees(value.min(SERVO_MAX_DEGREES))
        } else {
            Self::Micros(value.clamp(min_us, max_us.max(min_us)))
        }
    }

    /// Pulse width times 180, so angles stay exact.
    #[must_use]
    pub fn pulse_us_x180(self, min_us: u16, max_us: u16) -> u64 {
        match self {
            Self::Degrees(degrees) => {
                let span = u64::from(max_us.saturating_sub(min_us));
                u64::from(min_us) * 180 + u64::from(degrees) * span
            }
            Self::Micros(us) => u64::from(us) * 180,
        }
    }
}

/// Bring cached timing into the servo band. Returns `(frequency, resolution)`.
#[must_use]
pub fn servo_timing(frequency: u32, resolution: u8, width_max: u8) -> (u32, u8) {
    let frequency = if (SERVO_MIN_HZ..=SERVO_MAX_HZ).contains(&frequency) {
        frequency
    } else {
        SERVO_FALLBACK_HZ
    };
    let resolution = resolution.max(SERVO_MIN_RESOLUTION).min(width_max);
    (frequency, resolution)
}

/// Compare ticks for a pulse of `pulse_us_x180 / 180` microseconds, rounded to nearest.
///
/// One microsecond is `(2^resolution - 1) * frequency / 1_000_000` ticks.
#[must_use]
pub fn pulse_ticks(pulse_us_x180: u64, frequency: u32, resolution: u8) -> u32 {
    let top = u64::from(full_scale(resolution).saturating_sub(1));
    let denominator = MICROS_PER_SECOND * 180;
    let numerator = pulse_us_x180
        .saturating_mul(top)
        .saturating_mul(u64::from(frequency));
    let ticks = numerator.saturating_add(denominator / 2) / denominator;
    u32::try_from(ticks).unwrap_or(u32::MAX)
}
