//! A button event example polling from the main loop.
//! Target board: STM32F3DISCOVERY
//!
//! A click toggles the "south" led, a long click lights the "north" led while held.

// Handle the cases where the example is build with the wrong target architecture
#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_main)]
#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std)]

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {
    eprintln!("Error:");
    eprintln!("\tExample does not work with choosen target_arch.");
    eprintln!("\tBuild with for example --target thumbv7em-none-eabihf instead!");
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
use {
    core::sync::atomic::{AtomicU32, Ordering},
    cortex_m::peripheral::syst::SystClkSource,
    cortex_m_rt::{entry, exception},
    debounced_button::{Button, ButtonEvent, ButtonState},
    panic_semihosting as _,
    stm32f3xx_hal::{hal::digital::v2::OutputPin, prelude::*, stm32},
};

/// Milliseconds since boot, counted by SysTick.
#[cfg(all(target_arch = "arm", target_os = "none"))]
static MILLIS: AtomicU32 = AtomicU32::new(0);

#[cfg(all(target_arch = "arm", target_os = "none"))]
#[entry]
fn main() -> ! {
    let dp = stm32::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let mut rcc = dp.RCC.constrain();
    let mut flash = dp.FLASH.constrain();
    let mut gpioe = dp.GPIOE.split(&mut rcc.ahb);
    let mut gpioa = dp.GPIOA.split(&mut rcc.ahb);

    let clocks = rcc.cfgr.freeze(&mut flash.acr);

    // 1 kHz SysTick drives the millisecond clock
    let mut syst = cp.SYST;
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(clocks.sysclk().0 / 1_000 - 1);
    syst.clear_current();
    syst.enable_counter();
    syst.enable_interrupt();

    let mut south = gpioe
        .pe13
        .into_push_pull_output(&mut gpioe.moder, &mut gpioe.otyper);
    let mut north = gpioe
        .pe9
        .into_push_pull_output(&mut gpioe.moder, &mut gpioe.otyper);
    south.set_low().unwrap();
    north.set_low().unwrap();

    // button is externally pulled down, and is pulled up via a button press
    let user_button = gpioa
        .pa0
        .into_floating_input(&mut gpioa.moder, &mut gpioa.pupdr);

    let mut button = Button::active_high(user_button, || MILLIS.load(Ordering::Relaxed));

    let mut south_on = false;
    button.set_handler(move |_: &ButtonState, event: ButtonEvent| match event {
        ButtonEvent::ClickFinish => {
            south_on = !south_on;
            if south_on {
                south.set_high().ok();
            } else {
                south.set_low().ok();
            }
        }
        ButtonEvent::LongFirst => {
            north.set_high().ok();
        }
        ButtonEvent::LongFinish => {
            north.set_low().ok();
        }
        _ => (),
    });

    loop {
        button.poll().unwrap();
        // Sleep until the next SysTick
        cortex_m::asm::wfi();
    }
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
#[exception]
fn SysTick() {
    MILLIS.fetch_add(1, Ordering::Relaxed);
}
