//! Static per-target descriptions of the PWM peripheral.
//!
//! A [`Chip`] says which pins can carry PWM, how many channels exist, how wide the duty
//! counter may be, how channels group onto timers, and whether pins are hard-wired to
//! channels.
//!
//! # PWM-capable pins
//!
//! | Chip     | Channels | Max bits | Pins                              |
//! |----------|----------|----------|-----------------------------------|
//! | ESP32    | 16       | 20       | 0–5, 12–19, 21–23, 25–27, 32–33   |
//! | ESP32-S2 | 8        | 14       | 0–21, 33–45                       |
//! | ESP32-S3 | 8        | 14       | 0–21, 38–48                       |
//! | ESP32-C3 | 6        | 14       | 0–10, 18–21                       |
//! | RP2040   | 16       | 15       | 0–29 (fixed: channel = pin % 16)  |
//! | RP2350B  | 24       | 15       | 0–47 (fixed, see [`RP2350`])      |

/// How pins reach channels.
#[derive(Clone, Copy, Debug)]
pub enum Routing {
    /// Any PWM-capable pin can be routed to any channel (GPIO matrix).
    Any,
    /// Each pin is hard-wired to exactly one channel.
    Fixed(fn(u8) -> usize),
}

/// A target's PWM peripheral.
#[derive(Clone, Copy, Debug)]
pub struct Chip {
    /// Display name used in logs.
    pub name: &'static str,
    /// Bit `n` set when GPIO `n` can output PWM.
    pub pin_mask: u64,
    /// Number of hardware channels.
    pub channel_count: usize,
    /// Widest duty counter in bits.
    pub width_max: u8,
    /// Channels per speed group; each group has its own timers.
    pub channels_per_group: usize,
    /// Pin-to-channel routing.
    pub routing: Routing,
}

impl Chip {
    /// `true` when `pin` can carry PWM on this chip.
    #[must_use]
    pub const fn is_pwm_capable(&self, pin: u8) -> bool {
        pin < 64 && (self.pin_mask >> pin) & 1 == 1
    }

    /// PWM-capable pins in ascending order.
    pub fn pwm_pins(&self) -> impl Iterator<Item = u8> + '_ {
        (0..64).filter(|&pin| self.is_pwm_capable(pin))
    }

    /// `(mode, timer)` for `channel`. Even/odd partners share both.
    #[must_use]
    pub const fn group(&self, channel: usize) -> (u8, u8) {
        let per_group = if self.channels_per_group == 0 {
            1
        } else {
            self.channels_per_group
        };
        let mode = channel / per_group;
        let timer = (channel % per_group) / 2;
        (mode as u8, timer as u8)
    }

    /// The only channel `pin` can use, for chips with fixed routing.
    #[must_use]
    pub fn routed_channel(&self, pin: u8) -> Option<usize> {
        match self.routing {
            Routing::Any => None,
            Routing::Fixed(route) => Some(route(pin)),
        }
    }
}

/// The other channel sharing `channel`'s timer.
#[must_use]
pub const fn partner(channel: usize) -> usize {
    channel ^ 1
}

/// Build a pin bitmask from inclusive ranges.
#[must_use]
pub const fn pin_mask(ranges: &[(u8, u8)]) -> u64 {
    let mut mask = 0u64;
    let mut range_index = 0;
    while range_index < ranges.len() {
        let (first, last) = ranges[range_index];
        let mut pin = first;
        while pin <= last && pin < 64 {
            mask |= 1 << pin;
            pin += 1;
        }
        range_index += 1;
    }
    mask
}

/// Original ESP32: 8 high-speed + 8 low-speed channels, 4 timers per group.
pub static ESP32: Chip = Chip {
    name: "ESP32",
    pin_mask: pin_mask(&[(0, 5), (12, 19), (21, 23), (25, 27), (32, 33)]),
    channel_count: 16,
    width_max: 20,
    channels_per_group: 8,
    routing: Routing::Any,
};

/// ESP32-S2: 8 low-speed channels.
pub static ESP32_S2: Chip = Chip {
    name: "ESP32-S2",
    pin_mask: pin_mask(&[(0, 21), (33, 45)]),
    channel_count: 8,
    width_max: 14,
    channels_per_group: 8,
    routing: Routing::Any,
};

/// ESP32-S3: 8 low-speed channels.
pub static ESP32_S3: Chip = Chip {
    name: "ESP32-S3",
    pin_mask: pin_mask(&[(0, 21), (38, 48)]),
    channel_count: 8,
    width_max: 14,
    channels_per_group: 8,
    routing: Routing::Any,
};

/// ESP32-C3: 6 low-speed channels.
pub static ESP32_C3: Chip = Chip {
    name: "ESP32-C3",
    pin_mask: pin_mask(&[(0, 10), (18, 21)]),
    channel_count: 6,
    width_max: 14,
    channels_per_group: 6,
    routing: Routing::Any,
};

/// RP2040: 8 slices with outputs A/B. GPIO `n` drives slice `(n / 2) % 8`, output `n % 2`.
///
/// The counter is 16 bits, but the always-on duty (`2^resolution`) must also fit in the
/// compare register, which caps resolution at 15 bits.
pub static RP2040: Chip = Chip {
    name: "RP2040",
    pin_mask: pin_mask(&[(0, 29)]),
    channel_count: 16,
    width_max: 15,
    channels_per_group: 16,
    routing: Routing::Fixed(rp2040_route),
};

/// RP2350B: 12 slices. GPIO 0–31 repeat slices 0–7; GPIO 32–47 repeat slices 8–11.
pub static RP2350: Chip = Chip {
    name: "RP2350",
    pin_mask: pin_mask(&[(0, 47)]),
    channel_count: 24,
    width_max: 15,
    channels_per_group: 24,
    routing: Routing::Fixed(rp2350_route),
};

fn rp2040_route(pin: u8) -> usize {
    usize::from(pin % 16)
}

fn rp2350_route(pin: u8) -> usize {
    if pin < 32 {
        usize::from(pin % 16)
    } else {
        16 + usize::from((pin - 32) % 8)
    }
}

#[cfg(test)]
mod tests {
    use super::{ESP32, ESP32_C3, RP2040, RP2350, partner};

    #[test]
    fn esp32_mask_skips_flash_and_input_only_pins() {
        assert_eq!(ESP32.pin_mask, 0x3_0EEF_F03F);
        assert!(!ESP32.is_pwm_capable(6));
        assert!(!ESP32.is_pwm_capable(34));
        assert!(!ESP32.is_pwm_capable(200));
    }

    #[test]
    fn esp32_groups_two_speed_modes_of_four_timers() {
        assert_eq!(ESP32.group(0), (0, 0));
        assert_eq!(ESP32.group(1), (0, 0));
        assert_eq!(ESP32.group(7), (0, 3));
        assert_eq!(ESP32.group(8), (1, 0));
        assert_eq!(ESP32.group(15), (1, 3));
        assert_eq!(ESP32_C3.group(5), (0, 2));
    }

    #[test]
    fn rp_slices_follow_gpio_wiring() {
        assert_eq!(RP2040.routed_channel(11), Some(11));
        assert_eq!(RP2040.routed_channel(27), Some(11));
        assert_eq!(RP2040.group(11), (0, 5));
        assert_eq!(RP2350.routed_channel(30), Some(14));
        assert_eq!(RP2350.routed_channel(32), Some(16));
        assert_eq!(RP2350.routed_channel(41), Some(17));
        assert_eq!(RP2350.routed_channel(47), Some(23));
        assert_eq!(ESP32.routed_channel(4), None);
    }

    #[test]
    fn partners_pair_even_and_odd() {
        assert_eq!(partner(0), 1);
        assert_eq!(partner(1), 0);
        assert_eq!(partner(14), 15);
    }
}
