//! RC-servo pulses on top of the channel table.

use super::ChannelManager;
use crate::channel::{SERVO_US_CEILING, SERVO_US_FLOOR};
use crate::driver::{PinMux, PwmDriver};
use crate::duty::{ServoTarget, max_duty_fix, pulse_ticks, servo_timing};
use crate::Result;

impl<D: PwmDriver, M: PinMux, const N: usize> ChannelManager<D, M, N> {
    /// Drive a servo on `pin`.
    ///
    /// Values below the channel's minimum pulse are angles (`0..=180`, larger angles clamp to
    /// 180) mapped onto `[servo_min_us, servo_max_us]`. Anything else is a pulse width in
    /// microseconds, clamped into the same range.
    ///
    /// The channel's frequency is brought into 40–900 Hz (else 50 Hz) and its resolution to at
    /// least 14 bits. Returns the duty in ticks.
    ///
    /// # Errors
    ///
    /// Returns the pin's allocation error or the driver's error.
    pub fn write_servo(&mut self, pin: u8, value: u16) -> Result<u32> {
        let channel = self.resolve(pin)?;
        let record = *self.channel_config(channel)?;
        let (frequency, resolution) =
            servo_timing(record.frequency, record.resolution, self.chip.width_max);
        let target = ServoTarget::classify(value, record.servo_min_us, record.servo_max_us);
        let pulse = target.pulse_us_x180(record.servo_min_us, record.servo_max_us);
        let duty = max_duty_fix(pulse_ticks(pulse, frequency, resolution), resolution);

        if frequency != record.frequency || resolution != record.resolution {
            debug!(
                "PWM: servo channel {} normalized to {} Hz, {} bits",
                channel, frequency, resolution
            );
        }
        if frequency != record.frequency
            || resolution != record.resolution
            || duty != record.duty
        {
            self.reconfigure(pin, channel, frequency, resolution, duty)?;
        }
        Ok(duty)
    }

    /// Move the servo on `pin` to its resting pulse.
    ///
    /// # Errors
    ///
    /// As [`write_servo`](Self::write_servo).
    pub fn write_servo_default(&mut self, pin: u8) -> Result<u32> {
        let channel = self.resolve(pin)?;
        let resting = self.channel_config(channel)?.servo_def_us;
        self.write_servo(pin, resting)
    }

    /// Store pulse bounds for `channel`, each clamped into 500–2500 µs. Takes effect on the
    /// next servo write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChannel`](crate::Error::InvalidChannel) if `channel` is out of
    /// range.
    pub fn set_servo(&mut self, channel: usize, min_us: u16, def_us: u16, max_us: u16) -> Result<()> {
        let record = self.record_mut(channel)?;
        record.servo_min_us = min_us.clamp(SERVO_US_FLOOR, SERVO_US_CEILING);
        record.servo_def_us = def_us.clamp(SERVO_US_FLOOR, SERVO_US_CEILING);
        record.servo_max_us = max_us.clamp(SERVO_US_FLOOR, SERVO_US_CEILING);
        Ok(())
    }
}
