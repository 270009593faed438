#![no_std]
#![no_main]

use core::{convert::Infallible, future, panic};
use embassy_executor::Spawner;
use embassy_time::Timer;
use pwm_envoy::{
    ChannelManager, Result,
    chip::RP2040,
    rp::{RpPinMux, RpPwm},
};
use {defmt::info, defmt_rtt as _, panic_probe as _};

const SERVO_PIN: u8 = 11; // slice 5, output B
const LED_PIN: u8 = 25; // onboard LED, slice 4, output B

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(_spawner: Spawner) -> Result<Infallible> {
    let _p = embassy_rp::init(Default::default());
    let mut pwm = ChannelManager::<_, _, 16>::new(&RP2040, RpPwm::new(), RpPinMux)?;

    let channel = pwm.attach_pin(SERVO_PIN)?;
    pwm.set_servo(channel, 600, 1_500, 2_400)?;
    let ticks = pwm.write_servo_default(SERVO_PIN)?;
    info!("servo resting at {} ticks", ticks);
    pwm.log_config();
    Timer::after_millis(400).await;

    // Sweep in 10 degree steps, LED brightness follows the angle.
    for degrees in (0..=180u16).step_by(10).chain((0..=180u16).rev().step_by(10)).cycle() {
        let ticks = pwm.write_servo(SERVO_PIN, degrees)?;
        pwm.write(LED_PIN, u32::from(degrees) * 256 / 180)?;
        info!("{}° -> {} ticks", degrees, ticks);
        Timer::after_millis(150).await;
    }

    future::pending().await
}
