use derive_more::derive::{Display, Error};
use embedded_hal::pwm::ErrorKind;

use crate::driver::DriverError;

/// A specialized `Result` where the error is this crate's `Error` type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Define a unified error type for this crate.
///
/// Every [`ChannelManager`](crate::ChannelManager) operation that can leave the hardware
/// untouched for a reason other than "already configured" reports that reason here, so
/// `Ok` always means the requested state is now in effect.
#[derive(Clone, Copy, Debug, Display, Error, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The pin is claimed by another peripheral, already attached elsewhere, or no channel
    /// slot is available for it.
    #[display("pin {pin} is unavailable or no PWM channel is free for it")]
    Denied {
        /// The requested pin.
        pin: u8,
    },

    /// The pin cannot produce PWM on this chip.
    #[display("pin {pin} is not PWM-capable on this chip")]
    NotPwm {
        /// The requested pin.
        pin: u8,
    },

    /// The pin is not bound to any channel.
    #[display("pin {pin} is not attached to a PWM channel")]
    NotAttached {
        /// The requested pin.
        pin: u8,
    },

    /// A channel index past the end of the channel table.
    #[display("channel {channel} is out of range (chip has {channel_count} channels)")]
    InvalidChannel {
        /// The requested channel.
        channel: usize,
        /// Number of channels on the chip.
        channel_count: usize,
    },

    /// The channel table size does not match the chip profile.
    #[display("chip has {expected} channels but the manager was sized for {actual}")]
    ChannelCountMismatch {
        /// Channel count of the chip profile.
        expected: usize,
        /// Const-generic size of the manager.
        actual: usize,
    },

    /// Duty resolution outside what the chip's counters support.
    #[display("resolution of {resolution} bits is outside 1..={max}")]
    InvalidResolution {
        /// The requested resolution.
        resolution: u8,
        /// Widest resolution the chip supports.
        max: u8,
    },

    /// A zero frequency was requested.
    #[display("PWM frequency must be non-zero")]
    InvalidFrequency,

    /// Bulk defaults were requested while a pin is attached.
    #[display("channel defaults can only change while every channel is free")]
    ChannelsInUse,

    /// The peripheral driver rejected a call.
    #[display("PWM driver error: {_0}")]
    Driver(DriverError),
}

impl From<DriverError> for Error {
    fn from(err: DriverError) -> Self {
        Self::Driver(err)
    }
}

impl embedded_hal::pwm::Error for Error {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}
