#![no_std]
#![no_main]

use core::{convert::Infallible, future, panic};
use embassy_executor::Spawner;
use embassy_time::Timer;
use pwm_envoy::{
    ChannelManager, Result, SharedChannelManager,
    chip::RP2040,
    rp::{RpPinMux, RpPwm},
};
use static_cell::StaticCell;
use {defmt::info, defmt_rtt as _, panic_probe as _};

type SharedPwm = SharedChannelManager<RpPwm, RpPinMux, 16>;

static PWM: StaticCell<SharedPwm> = StaticCell::new();

// One output per slice so each gets its own counter and phase.
const PINS: [u8; 3] = [0, 2, 4];
const FREQUENCY_HZ: u32 = 1_000;
const RESOLUTION_BITS: u8 = 10;

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<Infallible> {
    let _p = embassy_rp::init(Default::default());
    let manager = ChannelManager::<_, _, 16>::new(&RP2040, RpPwm::new(), RpPinMux)?;
    let pwm: &'static SharedPwm = PWM.init(SharedChannelManager::new(manager));

    // Stage three phase-shifted outputs with their timers frozen, then start them together.
    pwm.lock(|pwm| -> Result<()> {
        pwm.pause();
        let mut phase = 0;
        for pin in PINS {
            pwm.write_with_phase(pin, 341, FREQUENCY_HZ, RESOLUTION_BITS, phase)?;
            phase += 341;
        }
        pwm.resume();
        pwm.log_config();
        Ok(())
    })?;
    info!("three-phase outputs running");

    defmt::unwrap!(spawner.spawn(breathe_task(pwm)));
    future::pending().await
}

#[embassy_executor::task]
async fn breathe_task(pwm: &'static SharedPwm) -> ! {
    let mut duty = 0u32;
    let mut rising = true;
    loop {
        if let Err(err) = pwm.lock(|pwm| pwm.write(PINS[0], duty)) {
            info!("breathe write failed: {}", err);
        }
        match (rising, duty) {
            (true, 1_024..) => rising = false,
            (false, 0) => rising = true,
            (true, _) => duty += 32,
            (false, _) => duty -= 32,
        }
        Timer::after_millis(20).await;
    }
}
