//! A button event example using the the rtfm framework.
//! Target board: STM32F3DISCOVERY
//!
//! The button is polled from a 1 kHz timer task, which also drives its clock.
//! Every finished click toggles the led.

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
    debounced_button::{Button, ButtonEvent, ButtonState},
    panic_halt as _,
    stm32f3xx_hal::{
        gpio::{gpioa::PA0, gpioe::PE13, Floating, Input, Output, PushPull},
        hal::digital::v2::OutputPin,
        prelude::*,
        stm32::{self, TIM1},
        timer::{Event, Timer},
    },
};

#[cfg(all(target_arch = "arm", target_os = "none"))]
static MILLIS: AtomicU32 = AtomicU32::new(0);

#[cfg(all(target_arch = "arm", target_os = "none"))]
fn millis() -> u32 {
    MILLIS.load(Ordering::Relaxed)
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
type UserButton = Button<PA0<Input<Floating>>, fn() -> u32, fn(&ButtonState, ButtonEvent)>;

#[cfg(all(target_arch = "arm", target_os = "none"))]
#[rtfm::app(device = stm32f3xx_hal::stm32, peripherals = true)]
const APP: () = {
    struct Resources {
        user_button: UserButton,
        led: PE13<Output<PushPull>>,
        timer: Timer<TIM1>,
        #[init(false)]
        led_state: bool,
    }
    #[init]
    fn init(_cx: init::Context) -> init::LateResources {
        let dp = stm32::Peripherals::take().unwrap();

        let mut rcc = dp.RCC.constrain();
        let mut flash = dp.FLASH.constrain();
        let mut gpioe = dp.GPIOE.split(&mut rcc.ahb);
        let mut gpioa = dp.GPIOA.split(&mut rcc.ahb);

        let clocks = rcc.cfgr.freeze(&mut flash.acr);

        // The timer ticks every ms and polls the button
        let mut timer = Timer::tim1(dp.TIM1, 1.khz(), clocks, &mut rcc.apb2);
        timer.listen(Event::Update);

        // Configure led, which is the "south" led on the stm32 discovery board
        let mut led = gpioe
            .pe13
            .into_push_pull_output(&mut gpioe.moder, &mut gpioe.otyper);

        led.set_low().unwrap();

        // button is externally pulled down, and is pulled up via a button press
        let user_button = gpioa
            .pa0
            .into_floating_input(&mut gpioa.moder, &mut gpioa.pupdr);

        let user_button: UserButton = Button::active_high(user_button, millis as fn() -> u32);

        init::LateResources {
            user_button,
            led,
            timer,
        }
    }

    #[task(binds = TIM1_UP_TIM16, spawn = [button_action], resources = [user_button, timer])]
    fn button_poll(cx: button_poll::Context) {
        MILLIS.fetch_add(1, Ordering::Relaxed);
        match cx.resources.user_button.poll().unwrap() {
            // Only react once the click sequence is over
            Some(ButtonEvent::ClickFinish) => cx.spawn.button_action().unwrap(),
            _ => (),
        }
        cx.resources.timer.clear_update_interrupt_flag();
    }

    #[task(resources = [led, led_state])]
    fn button_action(cx: button_action::Context) {
        if *cx.resources.led_state {
            cx.resources.led.set_low().unwrap();
        } else {
            cx.resources.led.set_high().unwrap();
        }
        *cx.resources.led_state = !*cx.resources.led_state
    }

    extern "C" {
        fn UART4_EXTI34();
    }
};
