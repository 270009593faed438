//! Capabilities the channel manager needs from the hardware.
//!
//! [`PwmDriver`] is the peripheral driver: timer setup, duty writes, pin routing. [`PinMux`]
//! answers whether some *other* peripheral owns a pin. The manager validates every parameter
//! before calling either, so implementations only report what the hardware itself refuses.
//!
//! See [`sim`](crate::sim) for a recording implementation and `rp` (with the `pico1`/`pico2`
//! features) for the RP2040/RP2350 slices.

use derive_more::derive::{Display, Error};

/// Hardware address of one channel: its index plus the timer group it belongs to.
///
/// Channels `2k` and `2k + 1` always report the same `mode`/`timer` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelAddr {
    /// Index into the channel table.
    pub index: usize,
    /// Speed group (ESP32 high/low speed); always `0` on single-group chips.
    pub mode: u8,
    /// Timer within the speed group (an RP slice).
    pub timer: u8,
}

/// Failures a [`PwmDriver`] may report.
#[derive(Clone, Copy, Debug, Display, Error, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// The clock tree cannot produce the requested frequency at the requested resolution.
    #[display("frequency/resolution pair is outside the clock divider range")]
    DividerOutOfRange,

    /// The pin cannot be routed to the channel.
    #[display("pin cannot be routed to this channel")]
    InvalidPin,

    /// The hardware does not implement the requested operation.
    #[display("operation not supported by this PWM peripheral")]
    Unsupported,

    /// The vendor driver refused the call.
    #[display("PWM peripheral rejected the request")]
    Rejected,
}

/// The PWM peripheral driver.
///
/// Every call is synchronous and bounded: a register write or a vendor routine that returns
/// once the hardware has accepted the change.
pub trait PwmDriver {
    /// Program the channel's timer for `frequency` Hz with a `resolution`-bit duty counter.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::DividerOutOfRange`] when the pair cannot be generated.
    fn setup_channel(
        &mut self,
        channel: ChannelAddr,
        frequency: u32,
        resolution: u8,
    ) -> Result<(), DriverError>;

    /// Bind the channel's output stage to `pin` and its timer. Hardware may zero the duty.
    ///
    /// # Errors
    ///
    /// Returns an error if the vendor driver rejects the channel configuration.
    fn configure_channel(&mut self, channel: ChannelAddr, pin: u8) -> Result<(), DriverError>;

    /// Stop the channel's output stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the vendor driver rejects the call.
    fn release_channel(&mut self, channel: ChannelAddr) -> Result<(), DriverError>;

    /// Tear down the timer behind `channel`. Only called once neither channel of the pair is
    /// bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the vendor driver rejects the call.
    fn release_timer(&mut self, channel: ChannelAddr) -> Result<(), DriverError>;

    /// Set the compare value. `duty == 2^resolution` must hold the output high.
    ///
    /// # Errors
    ///
    /// Returns an error if the vendor driver rejects the duty value.
    fn write_duty(&mut self, channel: ChannelAddr, duty: u32) -> Result<(), DriverError>;

    /// Set the compare value and the tick within the period at which the pulse starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the vendor driver rejects the values.
    fn write_duty_with_phase(
        &mut self,
        channel: ChannelAddr,
        duty: u32,
        phase: u32,
    ) -> Result<(), DriverError>;

    /// Route `pin` to `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidPin`] if the pin cannot reach the channel.
    fn attach_pin(&mut self, pin: u8, channel: ChannelAddr) -> Result<(), DriverError>;

    /// Disconnect `pin` from whatever PWM channel drives it.
    ///
    /// # Errors
    ///
    /// Returns an error if the vendor driver rejects the call.
    fn detach_pin(&mut self, pin: u8) -> Result<(), DriverError>;

    /// Freeze the timer shared by `channel` and its partner.
    fn pause_timer(&mut self, channel: ChannelAddr);

    /// Release a timer frozen by [`pause_timer`](Self::pause_timer).
    fn resume_timer(&mut self, channel: ChannelAddr);

    /// Release several frozen timers at once. Hardware with a global enable register should
    /// start them on the same clock edge; the default resumes them one by one.
    fn resume_timers(&mut self, channels: &[ChannelAddr]) {
        for &channel in channels {
            self.resume_timer(channel);
        }
    }

    /// Frequency the hardware actually produces after divider rounding.
    fn effective_frequency(&self, channel: ChannelAddr) -> u32;
}

/// Pin-mux introspection.
pub trait PinMux {
    /// `true` when some peripheral other than PWM owns `pin`.
    fn is_claimed(&self, pin: u8) -> bool;

    /// Return `pin` to the unclaimed state.
    fn release(&mut self, pin: u8);
}
