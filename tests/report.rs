#![allow(missing_docs)]
//! Host-level tests for the configuration dump and table snapshots.

use pwm_envoy::chip::{ESP32, ESP32_C3};
use pwm_envoy::sim::{RecordingDriver, SimulatedMux};
use pwm_envoy::{ChannelConfig, ChannelManager};

#[test]
fn report_lists_pins_and_channels() {
    let mut pwm =
        ChannelManager::<_, _, 16>::new(&ESP32, RecordingDriver::new(), SimulatedMux::new())
            .unwrap();
    pwm.write(4, 128).unwrap();

    let text = format!("{}", pwm.report());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "PWM pins: 0, 1, 2, 3, 4, 5, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 25, 26, 27, 32, 33"
    );
    assert_eq!(lines[1], "");
    assert_eq!(
        lines[2],
        "ch:  0  Pin:   4  Hz:  1000  Bits:  8  Duty:   128  Ø:    0"
    );
    assert_eq!(
        lines[3],
        "ch:  1  Pin:   -  Hz:  1000  Bits:  8  Duty:     0  Ø:    0"
    );
    assert_eq!(lines.len(), 2 + 16);
    assert!(lines[17].starts_with("ch: 15  Pin:   -"));
}

#[test]
fn report_shows_phase_and_wide_values() {
    let mut pwm =
        ChannelManager::<_, _, 6>::new(&ESP32_C3, RecordingDriver::new(), SimulatedMux::new())
            .unwrap();
    pwm.write_with_phase(10, 9000, 40_000, 14, 250).unwrap();

    let text = format!("{}", pwm.report());
    assert!(text.starts_with("PWM pins: 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 18, 19, 20, 21\n\n"));
    assert!(text.contains("ch:  0  Pin:  10  Hz: 40000  Bits: 14  Duty:  9000  Ø:  250\n"));
}

#[test]
fn snapshot_round_trips_through_postcard() {
    let mut pwm =
        ChannelManager::<_, _, 16>::new(&ESP32, RecordingDriver::new(), SimulatedMux::new())
            .unwrap();
    pwm.write_with_resolution(4, 300, 5000, 10).unwrap();
    pwm.set_servo(3, 900, 1500, 2100).unwrap();

    let snapshot = pwm.snapshot();
    let mut buffer = [0u8; 1024];
    let bytes = postcard::to_slice(&snapshot, &mut buffer).unwrap();
    let decoded: [ChannelConfig; 16] = postcard::from_bytes(bytes).unwrap();
    assert_eq!(decoded, snapshot);
    assert_eq!(decoded[0].pin, Some(4));
    assert_eq!(decoded[1].frequency, 5000);
    assert_eq!(decoded[3].servo_min_us, 900);
}
