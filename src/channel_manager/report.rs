//! Human-readable channel table.

use core::fmt;

use super::ChannelManager;
use crate::channel::ChannelConfig;
use crate::chip::Chip;
use crate::driver::{PinMux, PwmDriver};

/// The PWM-capable pins and one line per channel.
///
/// ```text
/// PWM pins: 0, 1, 2, 3, 4, 5, 12, 13, ...
///
/// ch:  0  Pin:   4  Hz:  1000  Bits:  8  Duty:   128  Ø:    0
/// ch:  1  Pin:   -  Hz:  1000  Bits:  8  Duty:     0  Ø:    0
/// ```
pub struct ConfigReport<'a> {
    chip: &'static Chip,
    channels: &'a [ChannelConfig],
}

impl fmt::Display for ConfigReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PWM pins: ")?;
        for (position, pin) in self.chip.pwm_pins().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{pin}")?;
        }
        writeln!(f)?;
        writeln!(f)?;

        for (index, record) in self.channels.iter().enumerate() {
            write!(f, "ch: {index:>2}  Pin: ")?;
            match record.pin {
                Some(pin) => write!(f, "{pin:>3}")?,
                None => write!(f, "{:>3}", "-")?,
            }
            writeln!(
                f,
                "  Hz: {:>5}  Bits: {:>2}  Duty: {:>5}  Ø: {:>4}",
                record.frequency, record.resolution, record.duty, record.phase
            )?;
        }
        Ok(())
    }
}

impl<D: PwmDriver, M: PinMux, const N: usize> ChannelManager<D, M, N> {
    /// The channel table as text, for a serial console or a test assertion.
    #[must_use]
    pub fn report(&self) -> ConfigReport<'_> {
        ConfigReport {
            chip: self.chip,
            channels: &self.channels,
        }
    }

    /// Log every channel at info level.
    pub fn log_config(&self) {
        info!("PWM: {} channel table", self.chip.name);
        for (index, record) in self.channels.iter().enumerate() {
            info!(
                "ch {} pin {} {} Hz {} bits duty {} phase {}",
                index, record.pin, record.frequency, record.resolution, record.duty, record.phase
            );
        }
    }
}
