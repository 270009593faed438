//! `embedded-hal` view of one managed pin.
//!
//! Drivers written against [`SetDutyCycle`] can drive a managed pin without knowing about
//! channels:
//!
//! ```
//! use embedded_hal::pwm::SetDutyCycle;
//! use pwm_envoy::chip::ESP32_C3;
//! use pwm_envoy::sim::{RecordingDriver, SimulatedMux};
//! use pwm_envoy::ChannelManager;
//!
//! let mut pwm = ChannelManager::<_, _, 6>::new(&ESP32_C3, RecordingDriver::new(), SimulatedMux::new())?;
//! let mut led = pwm.output(3)?;
//! led.set_duty_cycle_percent(50)?;
//! assert_eq!(pwm.channel_config(0)?.duty, 128);
//! # Ok::<(), pwm_envoy::Error>(())
//! ```

use embedded_hal::pwm::{ErrorType, SetDutyCycle};

use crate::channel_manager::ChannelManager;
use crate::driver::{PinMux, PwmDriver};
use crate::duty::full_scale;
use crate::{Error, Result};

/// A pin bound to a channel, borrowed from its [`ChannelManager`].
///
/// `max_duty_cycle` is the always-on value `2^resolution` while that fits in `u16`. Wider
/// counters report `u16::MAX` and scale every write up to the counter's range.
pub struct PwmOutput<'a, D, M, const N: usize> {
    manager: &'a mut ChannelManager<D, M, N>,
    pin: u8,
}

impl<D: PwmDriver, M: PinMux, const N: usize> ChannelManager<D, M, N> {
    /// Bind `pin` (if needed) and borrow it as an `embedded-hal` PWM output.
    ///
    /// # Errors
    ///
    /// Returns the pin's allocation error.
    pub fn output(&mut self, pin: u8) -> Result<PwmOutput<'_, D, M, N>> {
        self.resolve(pin)?;
        Ok(PwmOutput { manager: self, pin })
    }
}

impl<D: PwmDriver, M: PinMux, const N: usize> PwmOutput<'_, D, M, N> {
    /// The managed pin.
    #[must_use]
    pub const fn pin(&self) -> u8 {
        self.pin
    }

    fn full_scale(&self) -> u32 {
        self.manager
            .bound_channel(self.pin)
            .and_then(|channel| self.manager.channel_config(channel).ok())
            .map_or(u32::from(u16::MAX), |record| full_scale(record.resolution))
    }
}

impl<D: PwmDriver, M: PinMux, const N: usize> ErrorType for PwmOutput<'_, D, M, N> {
    type Error = Error;
}

impl<D: PwmDriver, M: PinMux, const N: usize> SetDutyCycle for PwmOutput<'_, D, M, N> {
    fn max_duty_cycle(&self) -> u16 {
        u16::try_from(self.full_scale()).unwrap_or(u16::MAX)
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<()> {
        let full = self.full_scale();
        let ticks = if full > u32::from(u16::MAX) {
            let scaled = u64::from(duty) * u64::from(full) / u64::from(u16::MAX);
            u32::try_from(scaled).unwrap_or(full)
        } else {
            u32::from(duty)
        };
        self.manager.write(self.pin, ticks)?;
        Ok(())
    }
}
