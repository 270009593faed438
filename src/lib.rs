//! PWM channel bookkeeping for microcontrollers.
//!
//! A [`ChannelManager`] maps pins onto a fixed pool of hardware PWM channels, caches each
//! channel's frequency, resolution, duty, and phase, and only reprograms the hardware when a
//! request actually changes something. It also converts servo angles and pulse widths into
//! duty ticks.
//!
//! The hardware sits behind two small traits, [`PwmDriver`] and [`PinMux`]. With the `pico1`
//! or `pico2` feature, [`rp`] implements them for the RP2040/RP2350 PWM slices; [`sim`]
//! implements them on the host for tests.
//!
//! # Glossary
//!
//! - **Channel:** one hardware PWM output generator. Channels `2k` and `2k + 1` are
//!   **partners** and share a timer, so they always share frequency and resolution.
//! - **Resolution:** bit width of the duty counter. Duty runs `0..=2^resolution`, where
//!   `2^resolution` holds the output high.
//! - **Phase:** the tick within a period at which the pulse starts.
//! - **Sync mode:** between [`ChannelManager::pause`] and [`ChannelManager::resume`], each
//!   reprogrammed timer stays frozen so several channels can start together.
//! - **Slices** (RP2040/RP2350): a slice is one timer with outputs A and B. These "slices"
//!   are unrelated to Rust slices.
#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "pico1", feature = "pico2"))]
compile_error!("Cannot enable both 'pico1' and 'pico2' features simultaneously");

#[macro_use]
mod logging;

pub mod channel;
pub mod channel_manager;
pub mod chip;
pub mod driver;
pub mod duty;
mod error;
pub mod output;
#[cfg(any(feature = "pico1", feature = "pico2"))]
pub mod rp;
pub mod shared;
pub mod sim;
pub mod slice_timing;

pub use crate::channel::ChannelConfig;
pub use crate::channel_manager::{ChannelManager, ConfigReport, PinStatus};
pub use crate::chip::Chip;
pub use crate::driver::{ChannelAddr, DriverError, PinMux, PwmDriver};
pub use crate::error::{Error, Result};
pub use crate::output::PwmOutput;
pub use crate::shared::SharedChannelManager;
