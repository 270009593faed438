#![allow(missing_docs)]
//! Host-level tests for pin status, channel allocation, and detach.

use pwm_envoy::chip::{ESP32, ESP32_C3, RP2040, RP2350};
use pwm_envoy::sim::{DriverCall, RecordingDriver, SimulatedMux};
use pwm_envoy::{ChannelManager, Error, PinStatus};

fn esp32() -> ChannelManager<RecordingDriver, SimulatedMux, 16> {
    ChannelManager::new(&ESP32, RecordingDriver::new(), SimulatedMux::new()).unwrap()
}

#[test]
fn non_pwm_pins_report_not_pwm() {
    let mut pwm = esp32();
    for pin in [6, 7, 8, 9, 10, 11, 34, 35, 36, 39, 64, 255] {
        assert_eq!(pwm.pin_status(pin), PinStatus::NotPwm, "pin {pin}");
        assert_eq!(pwm.write(pin, 10), Err(Error::NotPwm { pin }));
        assert_eq!(pwm.attach_pin(pin), Err(Error::NotPwm { pin }));
    }
    assert!(pwm.driver().calls().is_empty());
}

#[test]
fn pin_claimed_by_another_peripheral_is_denied() {
    let mut pwm = ChannelManager::<_, _, 16>::new(
        &ESP32,
        RecordingDriver::new(),
        SimulatedMux::new().with_claimed(4),
    )
    .unwrap();
    assert_eq!(pwm.pin_status(4), PinStatus::Denied);
    assert_eq!(pwm.write(4, 100), Err(Error::Denied { pin: 4 }));
    assert_eq!(pwm.attach_pin(4), Err(Error::Denied { pin: 4 }));
    assert!(pwm.driver().calls().is_empty());
    assert_eq!(pwm.pin_status(5), PinStatus::Free);
}

#[test]
fn attach_sets_up_channel_then_routes_pin() {
    let mut pwm = esp32();
    assert_eq!(pwm.attach_pin(4), Ok(0));
    assert_eq!(
        pwm.driver().calls(),
        &[
            DriverCall::Setup {
                channel: 0,
                frequency: 1000,
                resolution: 8
            },
            DriverCall::AttachPin { pin: 4, channel: 0 },
            DriverCall::WriteDuty { channel: 0, duty: 0 },
        ]
    );
    assert_eq!(pwm.pin_status(4), PinStatus::Attached(0));
    assert_eq!(pwm.pin_on_channel(0), Some(4));
    assert_eq!(pwm.attach_pin(4), Err(Error::Denied { pin: 4 }));
}

#[test]
fn attach_under_sync_pauses_timer() {
    let mut pwm = esp32();
    pwm.pause();
    assert_eq!(pwm.attach_pin(12), Ok(0));
    assert_eq!(
        pwm.driver().calls(),
        &[
            DriverCall::Setup {
                channel: 0,
                frequency: 1000,
                resolution: 8
            },
            DriverCall::PauseTimer { channel: 0 },
            DriverCall::AttachPin { pin: 12, channel: 0 },
            DriverCall::WriteDuty { channel: 0, duty: 0 },
        ]
    );
}

#[test]
fn automatic_allocation_runs_out_of_channels() {
    let mut pwm =
        ChannelManager::<_, _, 6>::new(&ESP32_C3, RecordingDriver::new(), SimulatedMux::new())
            .unwrap();
    for (expected, pin) in [0, 1, 2, 3, 4, 5].into_iter().enumerate() {
        assert_eq!(pwm.attach_pin(pin), Ok(expected));
    }
    assert_eq!(pwm.attach_pin(6), Err(Error::Denied { pin: 6 }));
    assert_eq!(pwm.write(7, 1), Err(Error::Denied { pin: 7 }));
    assert_eq!(pwm.pin_status(6), PinStatus::Free);
}

#[test]
fn explicit_allocation_checks_channel() {
    let mut pwm = esp32();
    assert_eq!(pwm.attach_pin_to(4, 3), Ok(3));
    assert_eq!(pwm.attach_pin_to(5, 3), Err(Error::Denied { pin: 5 }));
    assert_eq!(pwm.attach_pin_to(5, 16), Err(Error::Denied { pin: 5 }));
    assert_eq!(pwm.attach_pin(5), Ok(0));
    assert_eq!(pwm.pin_on_channel(3), Some(4));
}

#[test]
fn fixed_routing_only_offers_the_wired_channel() {
    let mut pwm =
        ChannelManager::<_, _, 16>::new(&RP2040, RecordingDriver::new(), SimulatedMux::new())
            .unwrap();
    assert_eq!(pwm.attach_pin(3), Ok(3));
    // GPIO 19 is wired to the same slice output as GPIO 3.
    assert_eq!(pwm.attach_pin(19), Err(Error::Denied { pin: 19 }));
    assert_eq!(pwm.attach_pin_to(4, 5), Err(Error::Denied { pin: 4 }));
    assert_eq!(pwm.attach_pin_to(4, 4), Ok(4));
    assert_eq!(pwm.pin_status(30), PinStatus::NotPwm);

    let mut pwm =
        ChannelManager::<_, _, 24>::new(&RP2350, RecordingDriver::new(), SimulatedMux::new())
            .unwrap();
    assert_eq!(pwm.attach_pin(41), Ok(17));
    assert_eq!(pwm.attach_pin(25), Ok(9));
}

#[test]
fn detach_resets_record_and_releases_hardware() {
    let mut pwm = esp32();
    pwm.write_with_resolution(4, 100, 5000, 10).unwrap();
    // The pin mux now routes GPIO 4 to the PWM peripheral.
    pwm.mux_mut().claim(4);
    pwm.driver_mut().clear_calls();

    assert_eq!(pwm.detach_pin(4), Ok(0));
    assert_eq!(
        pwm.driver().calls(),
        &[
            DriverCall::WriteDuty { channel: 0, duty: 0 },
            DriverCall::ReleaseChannel { channel: 0 },
            DriverCall::ReleaseTimer { channel: 0 },
            DriverCall::DetachPin { pin: 4 },
        ]
    );
    assert_eq!(pwm.pin_status(4), PinStatus::Free);

    let record = pwm.channel_config(0).unwrap();
    assert_eq!(record.pin, None);
    assert_eq!(record.frequency, 1000);
    assert_eq!(record.resolution, 8);
    assert_eq!(record.duty, 0);
    assert_eq!(record.phase, 0);

    let partner = pwm.channel_config(1).unwrap();
    assert_eq!((partner.frequency, partner.resolution), (1000, 8));

    assert_eq!(pwm.detach_pin(4), Err(Error::NotAttached { pin: 4 }));
}

#[test]
fn detach_keeps_timer_shared_with_bound_partner() {
    let mut pwm = esp32();
    pwm.write_with_frequency(4, 10, 2000).unwrap();
    pwm.driver_mut().clear_calls();

    // The partner joins the running timer instead of reprogramming it.
    assert_eq!(pwm.attach_pin(5), Ok(1));
    assert_eq!(
        pwm.driver().calls()[0],
        DriverCall::Setup {
            channel: 1,
            frequency: 2000,
            resolution: 8
        }
    );

    pwm.driver_mut().clear_calls();
    assert_eq!(pwm.detach_pin(5), Ok(1));
    assert_eq!(
        pwm.driver().calls(),
        &[
            DriverCall::WriteDuty { channel: 1, duty: 0 },
            DriverCall::ReleaseChannel { channel: 1 },
            DriverCall::DetachPin { pin: 5 },
        ]
    );
    assert_eq!(pwm.channel_config(1).unwrap().frequency, 1000);
    assert_eq!(pwm.channel_config(0).unwrap().frequency, 2000);

    assert_eq!(pwm.attach_pin(12), Ok(1));
    assert_eq!(pwm.channel_config(1).unwrap().frequency, 2000);
}

#[test]
fn out_of_range_channels_are_reported() {
    let pwm = esp32();
    assert_eq!(pwm.pin_on_channel(16), None);
    assert_eq!(
        pwm.channel_config(99).err(),
        Some(Error::InvalidChannel {
            channel: 99,
            channel_count: 16
        })
    );
}

#[test]
fn manager_size_must_match_chip() {
    let result =
        ChannelManager::<_, _, 8>::new(&ESP32, RecordingDriver::new(), SimulatedMux::new());
    assert_eq!(
        result.err(),
        Some(Error::ChannelCountMismatch {
            expected: 16,
            actual: 8
        })
    );
}
