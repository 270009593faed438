//! Per-channel state records.

use serde::{Deserialize, Serialize};

use crate::chip::Chip;
use crate::driver::ChannelAddr;

/// Frequency a free channel falls back to.
pub const DEFAULT_FREQUENCY_HZ: u32 = 1_000;

/// Resolution a free channel falls back to.
pub const DEFAULT_RESOLUTION_BITS: u8 = 8;

/// Default minimum servo pulse width (microseconds).
pub const SERVO_MIN_US_DEFAULT: u16 = 500;

/// Default resting servo pulse width (microseconds).
pub const SERVO_DEF_US_DEFAULT: u16 = 1_500;

/// Default maximum servo pulse width (microseconds).
pub const SERVO_MAX_US_DEFAULT: u16 = 2_500;

/// Narrowest pulse [`set_servo`](crate::ChannelManager::set_servo) accepts.
pub const SERVO_US_FLOOR: u16 = 500;

/// Widest pulse [`set_servo`](crate::ChannelManager::set_servo) accepts.
pub const SERVO_US_CEILING: u16 = 2_500;

/// Cached configuration of one hardware channel.
///
/// The manager keeps one record per channel and diffs every request against it, so the
/// hardware is only touched when something actually changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Pin bound to this channel, `None` when free.
    pub pin: Option<u8>,
    /// Speed group.
    pub mode: u8,
    /// Timer within the speed group. Shared with the partner channel.
    pub timer: u8,
    /// PWM frequency in Hz.
    pub frequency: u32,
    /// Duty counter width in bits.
    pub resolution: u8,
    /// Compare value, `0..=2^resolution`.
    pub duty: u32,
    /// Tick within the period at which the pulse starts.
    pub phase: u32,
    /// Pulse for 0° (microseconds).
    pub servo_min_us: u16,
    /// Resting pulse (microseconds).
    pub servo_def_us: u16,
    /// Pulse for 180° (microseconds).
    pub servo_max_us: u16,
}

impl ChannelConfig {
    /// A free record for `channel` on `chip`.
    #[must_use]
    pub const fn new(chip: &Chip, channel: usize) -> Self {
        let (mode, timer) = chip.group(channel);
        Self {
            pin: None,
            mode,
            timer,
            frequency: DEFAULT_FREQUENCY_HZ,
            resolution: DEFAULT_RESOLUTION_BITS,
            duty: 0,
            phase: 0,
            servo_min_us: SERVO_MIN_US_DEFAULT,
            servo_def_us: SERVO_DEF_US_DEFAULT,
            servo_max_us: SERVO_MAX_US_DEFAULT,
        }
    }

    /// `true` when a pin is bound.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.pin.is_some()
    }

    /// Hardware address for driver calls.
    #[must_use]
    pub const fn addr(&self, index: usize) -> ChannelAddr {
        ChannelAddr {
            index,
            mode: self.mode,
            timer: self.timer,
        }
    }

    /// Return to the free state with default timing. Servo bounds survive.
    pub const fn reset(&mut self) {
        self.pin = None;
        self.reset_timing();
        self.duty = 0;
        self.phase = 0;
    }

    pub(crate) const fn reset_timing(&mut self) {
        self.frequency = DEFAULT_FREQUENCY_HZ;
        self.resolution = DEFAULT_RESOLUTION_BITS;
    }
}
