//! Host-side stand-ins for the PWM peripheral and pin mux.
//!
//! [`RecordingDriver`] logs every call the manager makes so tests can assert exactly which
//! hardware operations a request caused. [`SimulatedMux`] holds the set of pins claimed by
//! other peripherals.

use heapless::Vec;

use crate::driver::{ChannelAddr, DriverError, PinMux, PwmDriver};
use crate::duty::full_scale;

/// Calls kept before [`RecordingDriver`] starts counting drops.
pub const CALL_LOG_CAPACITY: usize = 64;

/// Largest channel index the recording driver tracks state for.
pub const MAX_SIM_CHANNELS: usize = 32;

/// One driver call, as recorded by [`RecordingDriver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverCall {
    /// [`PwmDriver::setup_channel`].
    Setup {
        /// Channel index.
        channel: usize,
        /// Requested frequency.
        frequency: u32,
        /// Requested resolution.
        resolution: u8,
    },
    /// [`PwmDriver::configure_channel`].
    Configure {
        /// Channel index.
        channel: usize,
        /// Output pin.
        pin: u8,
    },
    /// [`PwmDriver::release_channel`].
    ReleaseChannel {
        /// Channel index.
        channel: usize,
    },
    /// [`PwmDriver::release_timer`].
    ReleaseTimer {
        /// Channel index.
        channel: usize,
    },
    /// [`PwmDriver::write_duty`].
    WriteDuty {
        /// Channel index.
        channel: usize,
        /// Compare value.
        duty: u32,
    },
    /// [`PwmDriver::write_duty_with_phase`].
    WriteDutyWithPhase {
        /// Channel index.
        channel: usize,
        /// Compare value.
        duty: u32,
        /// Start tick.
        phase: u32,
    },
    /// [`PwmDriver::attach_pin`].
    AttachPin {
        /// Output pin.
        pin: u8,
        /// Channel index.
        channel: usize,
    },
    /// [`PwmDriver::detach_pin`].
    DetachPin {
        /// Output pin.
        pin: u8,
    },
    /// [`PwmDriver::pause_timer`].
    PauseTimer {
        /// Channel index.
        channel: usize,
    },
    /// [`PwmDriver::resume_timer`].
    ResumeTimer {
        /// Channel index.
        channel: usize,
    },
    /// [`PwmDriver::resume_timers`].
    ResumeTimers {
        /// Bit `i` set for channel index `i`.
        channels: u32,
    },
}

/// A [`PwmDriver`] that accepts everything (within optional clock limits) and records it.
#[derive(Debug)]
pub struct RecordingDriver {
    calls: Vec<DriverCall, CALL_LOG_CAPACITY>,
    dropped: usize,
    clock_hz: Option<u32>,
    max_frequency: Option<u32>,
    effective: [u32; MAX_SIM_CHANNELS],
    duties: [u32; MAX_SIM_CHANNELS],
    paused_timers: u32,
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDriver {
    /// A driver whose effective frequency is exactly what was requested.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            calls: Vec::new(),
            dropped: 0,
            clock_hz: None,
            max_frequency: None,
            effective: [0; MAX_SIM_CHANNELS],
            duties: [0; MAX_SIM_CHANNELS],
            paused_timers: 0,
        }
    }

    /// Derive effective frequencies from an integer divider of `clock_hz`, like a real clock
    /// tree. Setups the divider cannot reach fail with [`DriverError::DividerOutOfRange`].
    #[must_use]
    pub fn with_clock(mut self, clock_hz: u32) -> Self {
        self.clock_hz = Some(clock_hz);
        self
    }

    /// Reject setups above `frequency` Hz with [`DriverError::DividerOutOfRange`].
    #[must_use]
    pub fn with_max_frequency(mut self, frequency: u32) -> Self {
        self.max_frequency = Some(frequency);
        self
    }

    /// Calls recorded since creation or the last [`clear_calls`](Self::clear_calls).
    #[must_use]
    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    /// Forget recorded calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
        self.dropped = 0;
    }

    /// Calls that did not fit in the log.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped
    }

    /// Last duty written to `channel`.
    #[must_use]
    pub fn duty(&self, channel: usize) -> Option<u32> {
        self.duties.get(channel).copied()
    }

    /// `true` while the timer behind `channel` is paused.
    #[must_use]
    pub const fn is_paused(&self, channel: ChannelAddr) -> bool {
        self.paused_timers & timer_bit(channel) != 0
    }

    fn record(&mut self, call: DriverCall) {
        if self.calls.push(call).is_err() {
            self.dropped = self.dropped.saturating_add(1);
        }
    }

    fn quantize(&self, frequency: u32, resolution: u8) -> Result<u32, DriverError> {
        if self.max_frequency.is_some_and(|max| frequency > max) {
            return Err(DriverError::DividerOutOfRange);
        }
        let Some(clock_hz) = self.clock_hz else {
            return Ok(frequency);
        };
        let counts = u64::from(full_scale(resolution));
        let divider = u64::from(clock_hz) / (u64::from(frequency) * counts);
        if divider == 0 {
            return Err(DriverError::DividerOutOfRange);
        }
        u32::try_from(u64::from(clock_hz) / (counts * divider))
            .map_err(|_| DriverError::DividerOutOfRange)
    }
}

const fn timer_bit(channel: ChannelAddr) -> u32 {
    let bit = (channel.mode as u32) * 8 + channel.timer as u32;
    match 1u32.checked_shl(bit) {
        Some(mask) => mask,
        None => 0,
    }
}

impl PwmDriver for RecordingDriver {
    fn setup_channel(
        &mut self,
        channel: ChannelAddr,
        frequency: u32,
        resolution: u8,
    ) -> Result<(), DriverError> {
        self.record(DriverCall::Setup {
            channel: channel.index,
            frequency,
            resolution,
        });
        let effective = self.quantize(frequency, resolution)?;
        if let Some(slot) = self.effective.get_mut(channel.index) {
            *slot = effective;
        }
        if let Some(slot) = self.effective.get_mut(channel.index ^ 1) {
            *slot = effective;
        }
        Ok(())
    }

    fn configure_channel(&mut self, channel: ChannelAddr, pin: u8) -> Result<(), DriverError> {
        self.record(DriverCall::Configure {
            channel: channel.index,
            pin,
        });
        Ok(())
    }

    fn release_channel(&mut self, channel: ChannelAddr) -> Result<(), DriverError> {
        self.record(DriverCall::ReleaseChannel {
            channel: channel.index,
        });
        Ok(())
    }

    fn release_timer(&mut self, channel: ChannelAddr) -> Result<(), DriverError> {
        self.record(DriverCall::ReleaseTimer {
            channel: channel.index,
        });
        self.paused_timers &= !timer_bit(channel);
        Ok(())
    }

    fn write_duty(&mut self, channel: ChannelAddr, duty: u32) -> Result<(), DriverError> {
        self.record(DriverCall::WriteDuty {
            channel: channel.index,
            duty,
        });
        if let Some(slot) = self.duties.get_mut(channel.index) {
            *slot = duty;
        }
        Ok(())
    }

    fn write_duty_with_phase(
        &mut self,
        channel: ChannelAddr,
        duty: u32,
        phase: u32,
    ) -> Result<(), DriverError> {
        self.record(DriverCall::WriteDutyWithPhase {
            channel: channel.index,
            duty,
            phase,
        });
        if let Some(slot) = self.duties.get_mut(channel.index) {
            *slot = duty;
        }
        Ok(())
    }

    fn attach_pin(&mut self, pin: u8, channel: ChannelAddr) -> Result<(), DriverError> {
        self.record(DriverCall::AttachPin {
            pin,
            channel: channel.index,
        });
        Ok(())
    }

    fn detach_pin(&mut self, pin: u8) -> Result<(), DriverError> {
        self.record(DriverCall::DetachPin { pin });
        Ok(())
    }

    fn pause_timer(&mut self, channel: ChannelAddr) {
        self.record(DriverCall::PauseTimer {
            channel: channel.index,
        });
        self.paused_timers |= timer_bit(channel);
    }

    fn resume_timer(&mut self, channel: ChannelAddr) {
        self.record(DriverCall::ResumeTimer {
            channel: channel.index,
        });
        self.paused_timers &= !timer_bit(channel);
    }

    fn resume_timers(&mut self, channels: &[ChannelAddr]) {
        let mut mask = 0u32;
        for &channel in channels {
            mask |= u32::try_from(channel.index)
                .ok()
                .and_then(|index| 1u32.checked_shl(index))
                .unwrap_or(0);
            self.paused_timers &= !timer_bit(channel);
        }
        self.record(DriverCall::ResumeTimers { channels: mask });
    }

    fn effective_frequency(&self, channel: ChannelAddr) -> u32 {
        self.effective.get(channel.index).copied().unwrap_or(0)
    }
}

/// Pins claimed by peripherals other than PWM.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimulatedMux {
    claimed: u64,
}

impl SimulatedMux {
    /// Every pin unclaimed.
    #[must_use]
    pub const fn new() -> Self {
        Self { claimed: 0 }
    }

    /// Builder form of [`claim`](Self::claim).
    #[must_use]
    pub const fn with_claimed(mut self, pin: u8) -> Self {
        self.claim(pin);
        self
    }

    /// Mark `pin` as owned by another peripheral. Pins above 63 are ignored.
    pub const fn claim(&mut self, pin: u8) {
        if pin < 64 {
            self.claimed |= 1 << pin;
        }
    }
}

impl PinMux for SimulatedMux {
    fn is_claimed(&self, pin: u8) -> bool {
        pin < 64 && (self.claimed >> pin) & 1 == 1
    }

    fn release(&mut self, pin: u8) {
        if pin < 64 {
            self.claimed &= !(1 << pin);
        }
    }
}
