#![allow(missing_docs)]
//! Host-level tests for servo pulse writes.

use pwm_envoy::chip::ESP32;
use pwm_envoy::sim::{DriverCall, RecordingDriver, SimulatedMux};
use pwm_envoy::{ChannelManager, Error};

type Esp32Pwm = ChannelManager<RecordingDriver, SimulatedMux, 16>;

/// Pin 4 on channel 0 at 50 Hz / 16 bits with 1000–2000 µs bounds.
fn servo_on_pin_4() -> Esp32Pwm {
    let mut pwm = ChannelManager::new(&ESP32, RecordingDriver::new(), SimulatedMux::new()).unwrap();
    pwm.write_with_resolution(4, 0, 50, 16).unwrap();
    pwm.set_servo(0, 1000, 1500, 2000).unwrap();
    pwm.driver_mut().clear_calls();
    pwm
}

#[test]
fn degrees_and_microseconds_agree() {
    let mut pwm = servo_on_pin_4();
    // 1500 µs * 65535 ticks / 20000 µs = 4915.1
    assert_eq!(pwm.write_servo(4, 90), Ok(4915));
    assert_eq!(pwm.channel_config(0).unwrap().duty, 4915);

    pwm.driver_mut().clear_calls();
    assert_eq!(pwm.write_servo(4, 1500), Ok(4915));
    assert!(pwm.driver().calls().is_empty());
}

#[test]
fn angles_and_pulses_clamp_to_servo_bounds() {
    let mut pwm = servo_on_pin_4();
    let full_travel = pwm.write_servo(4, 180).unwrap();
    assert_eq!(full_travel, 6554);
    // Below the minimum pulse but above 180: still an angle, clamped to 180.
    assert_eq!(pwm.write_servo(4, 700), Ok(full_travel));
    assert_eq!(pwm.write_servo(4, 2400), Ok(full_travel));
    assert_eq!(pwm.write_servo(4, 3000), Ok(full_travel));
    assert_eq!(pwm.write_servo(4, 0), Ok(3277));
    assert_eq!(pwm.write_servo(4, 1000), Ok(3277));
}

#[test]
fn servo_write_normalizes_default_timing() {
    let mut pwm = ChannelManager::<_, _, 16>::new(&ESP32, RecordingDriver::new(), SimulatedMux::new())
        .unwrap();
    pwm.attach_pin(4).unwrap();
    pwm.driver_mut().clear_calls();

    // 1500 µs of a 20 ms frame at 14 bits: 16383 * 0.075 = 1228.7
    assert_eq!(pwm.write_servo_default(4), Ok(1229));
    assert_eq!(
        pwm.driver().calls(),
        &[
            DriverCall::Configure { channel: 0, pin: 4 },
            DriverCall::Setup {
                channel: 0,
                frequency: 50,
                resolution: 14
            },
            DriverCall::WriteDuty {
                channel: 0,
                duty: 1229
            },
        ]
    );
    let record = pwm.channel_config(0).unwrap();
    assert_eq!((record.frequency, record.resolution), (50, 14));
    let partner = pwm.channel_config(1).unwrap();
    assert_eq!((partner.frequency, partner.resolution), (50, 14));
}

#[test]
fn servo_band_timing_is_kept() {
    let mut pwm = ChannelManager::<_, _, 16>::new(&ESP32, RecordingDriver::new(), SimulatedMux::new())
        .unwrap();
    pwm.write_with_resolution(4, 0, 330, 20).unwrap();
    assert_eq!(pwm.write_servo(4, 1500), Ok(519_045));
    let record = pwm.channel_config(0).unwrap();
    assert_eq!((record.frequency, record.resolution), (330, 20));
}

#[test]
fn set_servo_clamps_bounds() {
    let mut pwm = ChannelManager::<_, _, 16>::new(&ESP32, RecordingDriver::new(), SimulatedMux::new())
        .unwrap();
    pwm.set_servo(2, 100, 3000, 2600).unwrap();
    let record = pwm.channel_config(2).unwrap();
    assert_eq!(
        (record.servo_min_us, record.servo_def_us, record.servo_max_us),
        (500, 2500, 2500)
    );
    assert!(pwm.driver().calls().is_empty());

    assert_eq!(
        pwm.set_servo(16, 1000, 1500, 2000),
        Err(Error::InvalidChannel {
            channel: 16,
            channel_count: 16
        })
    );
}

#[test]
fn servo_bounds_survive_detach() {
    let mut pwm = servo_on_pin_4();
    pwm.detach_pin(4).unwrap();
    let record = pwm.channel_config(0).unwrap();
    assert_eq!((record.servo_min_us, record.servo_max_us), (1000, 2000));
}
