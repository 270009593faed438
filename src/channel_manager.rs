//! Pin-to-channel allocation and change-detecting PWM writes.
//!
//! See [`ChannelManager`] for usage.

mod report;
mod servo;

pub use report::ConfigReport;

use heapless::Vec;

use crate::channel::ChannelConfig;
use crate::chip::{Chip, partner};
use crate::driver::{ChannelAddr, PinMux, PwmDriver};
use crate::duty::{full_scale, max_duty_fix};
use crate::{Error, Result};

/// Highest pin [`ChannelManager::set_resolution`] will touch.
pub const MAX_RESOLUTION_PIN: u8 = 47;

/// Where a pin stands with respect to the PWM channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinStatus {
    /// Bound to this channel.
    Attached(usize),
    /// PWM-capable and not claimed by any peripheral.
    Free,
    /// Outside the chip's PWM-capable pins.
    NotPwm,
    /// Claimed by another peripheral.
    Denied,
}

/// Owns a fixed table of PWM channels and keeps the hardware in step with it.
///
/// Each request is diffed against the cached [`ChannelConfig`]: a duty-only change costs one
/// duty write, a frequency or resolution change reprograms the channel and its timer, and a
/// request that matches the cache does not touch the hardware at all. Pins are bound to
/// channels on first use.
///
/// Channels `2k` and `2k + 1` share a timer, so a frequency or resolution change on one is
/// mirrored into the other's cached record.
///
/// ```
/// use pwm_envoy::chip::ESP32;
/// use pwm_envoy::sim::{RecordingDriver, SimulatedMux};
/// use pwm_envoy::ChannelManager;
///
/// let mut pwm = ChannelManager::<_, _, 16>::new(&ESP32, RecordingDriver::new(), SimulatedMux::new())?;
///
/// // First write binds pin 4 to channel 0 and sets the duty.
/// assert_eq!(pwm.write(4, 128)?, 1000);
/// assert_eq!(pwm.pin_on_channel(0), Some(4));
///
/// // Same duty again: nothing reaches the driver.
/// pwm.driver_mut().clear_calls();
/// pwm.write(4, 128)?;
/// assert!(pwm.driver().calls().is_empty());
/// # Ok::<(), pwm_envoy::Error>(())
/// ```
pub struct ChannelManager<D, M, const N: usize> {
    chip: &'static Chip,
    driver: D,
    mux: M,
    channels: [ChannelConfig; N],
    sync: bool,
}

impl<D: PwmDriver, M: PinMux, const N: usize> ChannelManager<D, M, N> {
    /// Create a manager with every channel free and at default timing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelCountMismatch`] if `N` differs from the chip's channel count.
    pub fn new(chip: &'static Chip, driver: D, mux: M) -> Result<Self> {
        if chip.channel_count != N {
            return Err(Error::ChannelCountMismatch {
                expected: chip.channel_count,
                actual: N,
            });
        }
        info!("PWM: {} with {} channels", chip.name, N);
        Ok(Self {
            chip,
            driver,
            mux,
            channels: core::array::from_fn(|index| ChannelConfig::new(chip, index)),
            sync: false,
        })
    }

    /// The chip profile.
    #[must_use]
    pub const fn chip(&self) -> &'static Chip {
        self.chip
    }

    /// The peripheral driver.
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// The peripheral driver, mutably. Changes made here bypass the cache.
    pub const fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// The pin mux.
    pub const fn mux_mut(&mut self) -> &mut M {
        &mut self.mux
    }

    /// Give back the driver and mux.
    pub fn into_parts(self) -> (D, M) {
        (self.driver, self.mux)
    }

    /// `true` between [`pause`](Self::pause) and [`resume`](Self::resume).
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.sync
    }

    /// Classify `pin`.
    #[must_use]
    pub fn pin_status(&self, pin: u8) -> PinStatus {
        if !self.chip.is_pwm_capable(pin) {
            PinStatus::NotPwm
        } else if let Some(channel) = self.bound_channel(pin) {
            PinStatus::Attached(channel)
        } else if self.mux.is_claimed(pin) {
            PinStatus::Denied
        } else {
            PinStatus::Free
        }
    }

    /// Pin bound to `channel`, `None` when free or out of range.
    #[must_use]
    pub fn pin_on_channel(&self, channel: usize) -> Option<u8> {
        self.channels.get(channel).and_then(|record| record.pin)
    }

    /// Cached configuration of `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChannel`] if `channel` is out of range.
    pub fn channel_config(&self, channel: usize) -> Result<&ChannelConfig> {
        self.channels.get(channel).ok_or(Error::InvalidChannel {
            channel,
            channel_count: N,
        })
    }

    /// Copy of the whole channel table.
    #[must_use]
    pub const fn snapshot(&self) -> [ChannelConfig; N] {
        self.channels
    }

    /// Bind a free pin to the first available channel (or its wired channel).
    ///
    /// The channel's cached timing is pushed to the driver before the pin is routed, then its
    /// cached duty is written. If the partner channel is bound, its timing is adopted instead
    /// so the shared timer keeps running unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPwm`] for pins that cannot carry PWM and [`Error::Denied`] if the
    /// pin is claimed, already attached, or no channel is available.
    pub fn attach_pin(&mut self, pin: u8) -> Result<usize> {
        self.attach(pin, None)
    }

    /// Bind a free pin to a specific channel.
    ///
    /// # Errors
    ///
    /// As [`attach_pin`](Self::attach_pin), plus [`Error::Denied`] if `channel` is out of
    /// range, occupied, or not the channel the pin is wired to.
    pub fn attach_pin_to(&mut self, pin: u8, channel: usize) -> Result<usize> {
        self.attach(pin, Some(channel))
    }

    /// Unbind `pin`: zero its duty, tear down the channel, release the pin mux, and reset the
    /// record to 1000 Hz, 8 bits, duty 0, phase 0.
    ///
    /// The shared timer is torn down only if the partner channel is free too.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAttached`] if the pin is not bound, or the driver's error.
    pub fn detach_pin(&mut self, pin: u8) -> Result<usize> {
        let Some(channel) = self.bound_channel(pin) else {
            return Err(Error::NotAttached { pin });
        };
        let addr = self.addr(channel)?;
        let partner_bound = self
            .channels
            .get(partner(channel))
            .is_some_and(ChannelConfig::is_bound);

        self.driver.write_duty(addr, 0)?;
        self.driver.release_channel(addr)?;
        if !partner_bound {
            self.driver.release_timer(addr)?;
        }
        self.driver.detach_pin(pin)?;
        self.mux.release(pin);

        self.record_mut(channel)?.reset();
        if !partner_bound {
            if let Some(other) = self.channels.get_mut(partner(channel)) {
                other.reset_timing();
                other.duty = other.duty.min(full_scale(other.resolution));
            }
        }
        info!("PWM: pin {} detached from channel {}", pin, channel);
        Ok(channel)
    }

    /// Set the duty, keeping the cached frequency and resolution.
    ///
    /// Returns the channel's frequency.
    ///
    /// # Errors
    ///
    /// Returns the pin's allocation error or the driver's error.
    pub fn write(&mut self, pin: u8, duty: u32) -> Result<u32> {
        let channel = self.resolve(pin)?;
        let duty = max_duty_fix(duty, self.record(channel)?.resolution);
        self.update_duty(channel, duty)?;
        Ok(self.record(channel)?.frequency)
    }

    /// Set duty and frequency, keeping the cached resolution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrequency`] for 0 Hz, the pin's allocation error, or the
    /// driver's error.
    pub fn write_with_frequency(&mut self, pin: u8, duty: u32, frequency: u32) -> Result<u32> {
        if frequency == 0 {
            return Err(Error::InvalidFrequency);
        }
        let channel = self.resolve(pin)?;
        let resolution = self.record(channel)?.resolution;
        self.write_timed(pin, channel, duty, frequency, resolution)
    }

    /// Set duty, frequency, and resolution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrequency`] or [`Error::InvalidResolution`] before touching the
    /// hardware, then the pin's allocation error or the driver's error.
    pub fn write_with_resolution(
        &mut self,
        pin: u8,
        duty: u32,
        frequency: u32,
        resolution: u8,
    ) -> Result<u32> {
        self.validate(frequency, resolution)?;
        let channel = self.resolve(pin)?;
        self.write_timed(pin, channel, duty, frequency, resolution)
    }

    /// Set duty, frequency, resolution, and phase.
    ///
    /// Unlike the other writes, the channel configuration and phased duty are written on
    /// every call.
    ///
    /// # Errors
    ///
    /// As [`write_with_resolution`](Self::write_with_resolution).
    pub fn write_with_phase(
        &mut self,
        pin: u8,
        duty: u32,
        frequency: u32,
        resolution: u8,
        phase: u32,
    ) -> Result<u32> {
        self.validate(frequency, resolution)?;
        let channel = self.resolve(pin)?;
        let duty = max_duty_fix(duty, resolution);
        let record = *self.record(channel)?;
        let addr = record.addr(channel);

        if record.frequency != frequency || record.resolution != resolution {
            self.driver.setup_channel(addr, frequency, resolution)?;
            if self.sync {
                self.driver.pause_timer(addr);
            }
            self.store_timing(channel, frequency, resolution)?;
        }
        self.driver.configure_channel(addr, pin)?;
        self.driver.write_duty_with_phase(addr, duty, phase)?;

        let record = self.record_mut(channel)?;
        record.phase = phase;
        record.duty = duty;
        Ok(record.frequency)
    }

    /// Change only the frequency.
    ///
    /// Returns the frequency the hardware actually produces.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrequency`] for 0 Hz, the pin's allocation error, or the
    /// driver's error.
    pub fn set_frequency(&mut self, pin: u8, frequency: u32) -> Result<u32> {
        if frequency == 0 {
            return Err(Error::InvalidFrequency);
        }
        let channel = self.resolve(pin)?;
        let record = *self.record(channel)?;
        if record.frequency != frequency {
            self.reconfigure(pin, channel, frequency, record.resolution, record.duty)?;
        }
        Ok(self.driver.effective_frequency(record.addr(channel)))
    }

    /// Change only the resolution. The pin is detached from the channel while the timer is
    /// reprogrammed.
    ///
    /// Returns the resolution now in effect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Denied`] for pins above [`MAX_RESOLUTION_PIN`] without attaching them,
    /// [`Error::InvalidResolution`], the pin's allocation error, or the driver's error.
    pub fn set_resolution(&mut self, pin: u8, resolution: u8) -> Result<u8> {
        if !self.chip.is_pwm_capable(pin) {
            return Err(Error::NotPwm { pin });
        }
        if pin > MAX_RESOLUTION_PIN {
            warn!("PWM: resolution change refused on pin {}", pin);
            return Err(Error::Denied { pin });
        }
        self.validate_resolution(resolution)?;
        let channel = self.resolve(pin)?;
        let record = *self.record(channel)?;

        if record.resolution != resolution {
            let addr = record.addr(channel);
            let duty = max_duty_fix(record.duty, resolution);
            self.driver.detach_pin(pin)?;
            self.driver.configure_channel(addr, pin)?;
            self.driver.setup_channel(addr, record.frequency, resolution)?;
            if self.sync {
                self.driver.pause_timer(addr);
            }
            self.driver.attach_pin(pin, addr)?;
            self.driver.write_duty(addr, duty)?;
            self.store_timing(channel, record.frequency, resolution)?;
            self.record_mut(channel)?.duty = duty;
            debug!("PWM: channel {} now {} bits", channel, resolution);
        }
        Ok(self.record(channel)?.resolution)
    }

    /// Set the duty, frequency, resolution, and phase every channel starts from.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelsInUse`] while any pin is attached, or a validation error.
    pub fn set_config_defaults(
        &mut self,
        duty: u32,
        frequency: u32,
        resolution: u8,
        phase: u32,
    ) -> Result<()> {
        if self.channels.iter().any(ChannelConfig::is_bound) {
            return Err(Error::ChannelsInUse);
        }
        self.validate(frequency, resolution)?;
        let duty = duty.min(full_scale(resolution));
        for record in &mut self.channels {
            record.duty = duty;
            record.frequency = frequency;
            record.resolution = resolution;
            record.phase = phase;
        }
        info!(
            "PWM: defaults {} Hz, {} bits, duty {}, phase {}",
            frequency, resolution, duty, phase
        );
        Ok(())
    }

    /// From now on, freeze each timer right after it is reprogrammed, so several channels can
    /// be staged and then started together by [`resume`](Self::resume).
    pub fn pause(&mut self) {
        self.sync = true;
        info!("PWM: timers pause on setup");
    }

    /// Restart the timer of every bound channel in one driver call and stop pausing new
    /// setups.
    pub fn resume(&mut self) {
        let bound: Vec<ChannelAddr, N> = self
            .channels
            .iter()
            .enumerate()
            .filter(|(_, record)| record.is_bound())
            .map(|(index, record)| record.addr(index))
            .collect();
        self.driver.resume_timers(&bound);
        self.sync = false;
        info!("PWM: timers resumed");
    }

    /// Channel for `pin`, attaching it if it is free.
    pub(crate) fn resolve(&mut self, pin: u8) -> Result<usize> {
        match self.pin_status(pin) {
            PinStatus::Attached(channel) => Ok(channel),
            PinStatus::Free => self.allocate(pin, None),
            PinStatus::NotPwm => Err(Error::NotPwm { pin }),
            PinStatus::Denied => {
                warn!("PWM: pin {} is claimed by another peripheral", pin);
                Err(Error::Denied { pin })
            }
        }
    }

    pub(crate) fn bound_channel(&self, pin: u8) -> Option<usize> {
        self.channels
            .iter()
            .position(|record| record.pin == Some(pin))
    }

    fn attach(&mut self, pin: u8, requested: Option<usize>) -> Result<usize> {
        match self.pin_status(pin) {
            PinStatus::Free => self.allocate(pin, requested),
            PinStatus::NotPwm => Err(Error::NotPwm { pin }),
            PinStatus::Attached(_) | PinStatus::Denied => {
                warn!("PWM: pin {} is not free", pin);
                Err(Error::Denied { pin })
            }
        }
    }

    fn allocate(&mut self, pin: u8, requested: Option<usize>) -> Result<usize> {
        let candidate = match (requested, self.chip.routed_channel(pin)) {
            (Some(channel), Some(routed)) if channel != routed => None,
            (Some(channel), _) | (None, Some(channel)) => Some(channel),
            (None, None) => self.channels.iter().position(|record| !record.is_bound()),
        };
        let free = candidate.filter(|&channel| {
            self.channels
                .get(channel)
                .is_some_and(|record| !record.is_bound())
        });
        let Some(channel) = free else {
            warn!("PWM: no channel available for pin {}", pin);
            return Err(Error::Denied { pin });
        };
        self.bind(pin, channel)
    }

    fn bind(&mut self, pin: u8, channel: usize) -> Result<usize> {
        let record = *self.record(channel)?;
        let (frequency, resolution) = match self.channels.get(partner(channel)) {
            Some(other) if other.is_bound() => (other.frequency, other.resolution),
            _ => (record.frequency, record.resolution),
        };
        let addr = record.addr(channel);

        self.driver.setup_channel(addr, frequency, resolution)?;
        if self.sync {
            self.driver.pause_timer(addr);
        }
        self.driver.attach_pin(pin, addr)?;
        let duty = record.duty.min(full_scale(resolution));
        self.driver.write_duty(addr, duty)?;

        let record = self.record_mut(channel)?;
        record.pin = Some(pin);
        record.frequency = frequency;
        record.resolution = resolution;
        record.duty = duty;
        info!("PWM: pin {} attached to channel {}", pin, channel);
        Ok(channel)
    }

    fn write_timed(
        &mut self,
        pin: u8,
        channel: usize,
        duty: u32,
        frequency: u32,
        resolution: u8,
    ) -> Result<u32> {
        let duty = max_duty_fix(duty, resolution);
        let record = *self.record(channel)?;
        if record.frequency != frequency || record.resolution != resolution {
            self.reconfigure(pin, channel, frequency, resolution, duty)?;
        }
        self.update_duty(channel, duty)?;
        Ok(self.record(channel)?.frequency)
    }

    /// Reprogram the channel and its timer, then write `duty`.
    pub(crate) fn reconfigure(
        &mut self,
        pin: u8,
        channel: usize,
        frequency: u32,
        resolution: u8,
        duty: u32,
    ) -> Result<()> {
        let addr = self.addr(channel)?;
        self.driver.configure_channel(addr, pin)?;
        self.driver.setup_channel(addr, frequency, resolution)?;
        if self.sync {
            self.driver.pause_timer(addr);
        }
        self.driver.write_duty(addr, duty)?;
        self.store_timing(channel, frequency, resolution)?;
        self.record_mut(channel)?.duty = duty;
        debug!(
            "PWM: channel {} reconfigured to {} Hz, {} bits",
            channel, frequency, resolution
        );
        Ok(())
    }

    fn update_duty(&mut self, channel: usize, duty: u32) -> Result<()> {
        let record = *self.record(channel)?;
        if record.duty != duty {
            self.driver.write_duty(record.addr(channel), duty)?;
            self.record_mut(channel)?.duty = duty;
            trace!("PWM: channel {} duty {}", channel, duty);
        }
        Ok(())
    }

    /// Cache timing for `channel` and mirror it into the partner.
    ///
    /// A bound partner whose duty no longer fits the new counter gets the clamped duty written
    /// to the hardware too, so its cache and compare register agree.
    fn store_timing(&mut self, channel: usize, frequency: u32, resolution: u8) -> Result<()> {
        let ceiling = full_scale(resolution);
        for index in [channel, partner(channel)] {
            let Some(record) = self.channels.get_mut(index) else {
                continue;
            };
            record.frequency = frequency;
            record.resolution = resolution;
            if record.duty > ceiling {
                record.duty = ceiling;
                if index != channel && record.is_bound() {
                    let addr = record.addr(index);
                    self.driver.write_duty(addr, ceiling)?;
                    trace!("PWM: partner channel {} duty clamped to {}", index, ceiling);
                }
            }
        }
        Ok(())
    }

    fn validate(&self, frequency: u32, resolution: u8) -> Result<()> {
        if frequency == 0 {
            return Err(Error::InvalidFrequency);
        }
        self.validate_resolution(resolution)
    }

    const fn validate_resolution(&self, resolution: u8) -> Result<()> {
        if resolution == 0 || resolution > self.chip.width_max {
            return Err(Error::InvalidResolution {
                resolution,
                max: self.chip.width_max,
            });
        }
        Ok(())
    }

    fn record(&self, channel: usize) -> Result<&ChannelConfig> {
        self.channel_config(channel)
    }

    fn record_mut(&mut self, channel: usize) -> Result<&mut ChannelConfig> {
        self.channels.get_mut(channel).ok_or(Error::InvalidChannel {
            channel,
            channel_count: N,
        })
    }

    fn addr(&self, channel: usize) -> Result<ChannelAddr> {
        Ok(self.record(channel)?.addr(channel))
    }
}
