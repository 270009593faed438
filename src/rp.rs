//! RP2040 / RP2350 PWM slices as a [`PwmDriver`].
//!
//! Channel `2k` is output A of slice `k`, channel `2k + 1` output B, so the chip profiles'
//! `timer` is the slice number. A slice has one counter: `top` and the clock divider are
//! shared by both outputs, exactly the pairing the channel manager maintains.
//!
//! Divider, `top`, and compare scaling come from [`SliceTiming`]. Timers resumed together are
//! started with one write to the global `EN` register, so their counters stay aligned.
//!
//! Phase has no per-output register on these chips. [`RpPwm`] applies it by preloading the
//! slice counter, which shifts both outputs of the slice relative to other slices.

use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::pac;
use fixed::types::U12F4;

use crate::driver::{ChannelAddr, DriverError, PinMux, PwmDriver};
use crate::slice_timing::SliceTiming;

#[cfg(feature = "pico1")]
const SLICE_COUNT: usize = 8;
#[cfg(feature = "pico2")]
const SLICE_COUNT: usize = 12;

#[cfg(feature = "pico1")]
const GPIO_COUNT: u8 = 30;
#[cfg(feature = "pico2")]
const GPIO_COUNT: u8 = 48;

const FUNCSEL_PWM: u8 = 4;
const FUNCSEL_NULL: u8 = 0x1f;

const fn output_is_b(channel: ChannelAddr) -> bool {
    channel.index % 2 == 1
}

fn slice_of_pin(pin: u8) -> usize {
    if pin < 32 {
        usize::from((pin / 2) % 8)
    } else {
        8 + usize::from(((pin - 32) / 2) % 4)
    }
}

/// PWM slices driven through `embassy-rp`'s register access.
pub struct RpPwm {
    clock_hz: u32,
    slices: [Option<SliceTiming>; SLICE_COUNT],
}

impl Default for RpPwm {
    fn default() -> Self {
        Self::new()
    }
}

impl RpPwm {
    /// Use the current system clock. Call after `embassy_rp::init`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(clk_sys_freq())
    }

    /// Use a known system clock frequency.
    #[must_use]
    pub const fn with_clock(clock_hz: u32) -> Self {
        Self {
            clock_hz,
            slices: [None; SLICE_COUNT],
        }
    }

    fn slice(channel: ChannelAddr) -> Result<usize, DriverError> {
        let slice = usize::from(channel.timer);
        if slice < SLICE_COUNT {
            Ok(slice)
        } else {
            Err(DriverError::Unsupported)
        }
    }

    fn timing(&self, channel: ChannelAddr) -> Result<SliceTiming, DriverError> {
        self.slices
            .get(Self::slice(channel)?)
            .copied()
            .flatten()
            .ok_or(DriverError::Rejected)
    }

    fn compare(&self, channel: ChannelAddr, duty: u32) -> Result<u16, DriverError> {
        self.timing(channel)?.compare(duty)
    }
}

impl PwmDriver for RpPwm {
    fn setup_channel(
        &mut self,
        channel: ChannelAddr,
        frequency: u32,
        resolution: u8,
    ) -> Result<(), DriverError> {
        let slice = Self::slice(channel)?;
        let timing = SliceTiming::plan(self.clock_hz, frequency, resolution)?;
        let top = timing.top()?;
        let divider = U12F4::from_bits(timing.divider_bits());
        let int = u8::try_from(divider.int().to_num::<u16>())
            .map_err(|_| DriverError::DividerOutOfRange)?;
        let frac = u8::try_from(divider.frac().to_bits())
            .map_err(|_| DriverError::DividerOutOfRange)?;

        let regs = pac::PWM.ch(slice);
        regs.div().write(|w| {
            w.set_int(int);
            w.set_frac(frac);
        });
        regs.top().write(|w| w.set_top(top));
        regs.csr().modify(|w| {
            w.set_ph_correct(false);
            w.set_en(true);
        });
        if let Some(slot) = self.slices.get_mut(slice) {
            *slot = Some(timing);
        }
        debug!(
            "PWM slice {}: div {}.{}/16 top {} shift {}",
            slice,
            int,
            frac,
            top,
            timing.shift()
        );
        Ok(())
    }

    fn configure_channel(&mut self, channel: ChannelAddr, _pin: u8) -> Result<(), DriverError> {
        let slice = Self::slice(channel)?;
        pac::PWM.ch(slice).csr().modify(|w| {
            if output_is_b(channel) {
                w.set_b_inv(false);
            } else {
                w.set_a_inv(false);
            }
        });
        Ok(())
    }

    fn release_channel(&mut self, channel: ChannelAddr) -> Result<(), DriverError> {
        let slice = Self::slice(channel)?;
        pac::PWM.ch(slice).cc().modify(|w| {
            if output_is_b(channel) {
                w.set_b(0);
            } else {
                w.set_a(0);
            }
        });
        Ok(())
    }

    fn release_timer(&mut self, channel: ChannelAddr) -> Result<(), DriverError> {
        let slice = Self::slice(channel)?;
        pac::PWM.ch(slice).csr().modify(|w| w.set_en(false));
        if let Some(slot) = self.slices.get_mut(slice) {
            *slot = None;
        }
        Ok(())
    }

    fn write_duty(&mut self, channel: ChannelAddr, duty: u32) -> Result<(), DriverError> {
        let slice = Self::slice(channel)?;
        let compare = self.compare(channel, duty)?;
        pac::PWM.ch(slice).cc().modify(|w| {
            if output_is_b(channel) {
                w.set_b(compare);
            } else {
                w.set_a(compare);
            }
        });
        Ok(())
    }

    fn write_duty_with_phase(
        &mut self,
        channel: ChannelAddr,
        duty: u32,
        phase: u32,
    ) -> Result<(), DriverError> {
        let slice = Self::slice(channel)?;
        let timing = self.timing(channel)?;
        self.write_duty(channel, duty)?;
        let start = timing.counter_start(phase)?;
        pac::PWM.ch(slice).ctr().write(|w| w.set_ctr(start));
        Ok(())
    }

    fn attach_pin(&mut self, pin: u8, channel: ChannelAddr) -> Result<(), DriverError> {
        if pin >= GPIO_COUNT
            || slice_of_pin(pin) != usize::from(channel.timer)
            || (pin % 2 == 1) != output_is_b(channel)
        {
            return Err(DriverError::InvalidPin);
        }
        #[cfg(feature = "pico2")]
        pac::PADS_BANK0
            .gpio(usize::from(pin))
            .modify(|w| w.set_iso(false));
        pac::IO_BANK0
            .gpio(usize::from(pin))
            .ctrl()
            .write(|w| w.set_funcsel(FUNCSEL_PWM));
        Ok(())
    }

    fn detach_pin(&mut self, pin: u8) -> Result<(), DriverError> {
        if pin >= GPIO_COUNT {
            return Err(DriverError::InvalidPin);
        }
        pac::IO_BANK0
            .gpio(usize::from(pin))
            .ctrl()
            .write(|w| w.set_funcsel(FUNCSEL_NULL));
        Ok(())
    }

    fn pause_timer(&mut self, channel: ChannelAddr) {
        if let Ok(slice) = Self::slice(channel) {
            pac::PWM.ch(slice).csr().modify(|w| w.set_en(false));
        }
    }

    fn resume_timer(&mut self, channel: ChannelAddr) {
        if let Ok(slice) = Self::slice(channel) {
            pac::PWM.ch(slice).csr().modify(|w| w.set_en(true));
        }
    }

    fn resume_timers(&mut self, channels: &[ChannelAddr]) {
        let mask = channels
            .iter()
            .filter_map(|&channel| Self::slice(channel).ok())
            .fold(0u32, |mask, slice| mask | (1 << slice));
        pac::PWM.en().modify(|w| w.0 |= mask);
    }

    fn effective_frequency(&self, channel: ChannelAddr) -> u32 {
        self.timing(channel)
            .map_or(0, |timing| timing.frequency(self.clock_hz))
    }
}

/// `IO_BANK0` function select as the pin mux: any function other than NULL counts as claimed.
#[derive(Clone, Copy, Debug, Default)]
pub struct RpPinMux;

impl PinMux for RpPinMux {
    fn is_claimed(&self, pin: u8) -> bool {
        if pin >= GPIO_COUNT {
            return true;
        }
        pac::IO_BANK0.gpio(usize::from(pin)).ctrl().read().funcsel() != FUNCSEL_NULL
    }

    fn release(&mut self, pin: u8) {
        if pin < GPIO_COUNT {
            pac::IO_BANK0
                .gpio(usize::from(pin))
                .ctrl()
                .write(|w| w.set_funcsel(FUNCSEL_NULL));
        }
    }
}
