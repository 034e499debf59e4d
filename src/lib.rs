//! Wraps an `InputPin` connected to a push button and classifies its activity into events.
//!
//! # Implementation
//!
//! The button is **only** sampled in `poll()`.
//! Every call reads the pin once, reads the clock once and emits at most one [`ButtonEvent`],
//! both to the registered [`EventHandler`] and as the return value.
//! Call it as often as you can, at least faster than the shortest timing threshold.
//! At best call it every 1 ms.
//!
//! A press is confirmed once the pin has stayed at its pressed level for the debounce time.
//! Holding it past [`LONGCLICK_MS`] starts a long click, which repeats every
//! [`LONGCLICK_REPEAT_MS`] until release.
//! A short click ends [`MULTICLICK_MS`] after its press with [`ButtonEvent::ClickFinish`].
//!
//! | Gesture | Events |
//! |---|---|
//! | Click | `Pressed`, `Released`, `ClickFinish` |
//! | Double click | `Pressed`, `Released`, `Pressed`, `Released`, `ClickFinish` |
//! | Long click | `Pressed`, `LongFirst`, `LongRepeat`..., `LongFinish` |
//!
//! Elapsed times are computed with wrapping subtraction, so the clock may overflow.
//!
//! # Example
//!
//! ## Simple
//!
//! ```rust,ignore
//! use debounced_button::{Button, ButtonEvent, ButtonState};
//!
//! // This is up to the implementation details of the embedded_hal you are using.
//! let pin: InputPin = hal_function_which_returns_input_pin();
//! // Anything returning monotonic milliseconds.
//! let clock = || hal_function_which_returns_millis();
//!
//! let mut button = Button::active_low(pin, clock);
//! button.set_handler(|state: &ButtonState, event: ButtonEvent| match event {
//!     ButtonEvent::ClickFinish => handle_clicks(state.click_count()),
//!     ButtonEvent::LongFinish => handle_long_press(state.pressed_duration()),
//!     _ => (),
//! });
//!
//! loop {
//!     button.poll()?;
//!     // Also hardware specific
//!     wait(1.ms());
//! }
//! ```
//!
//! ## Using the Returned Event
//!
//! ```rust,ignore
//! use debounced_button::{Button, ButtonEvent, ButtonState};
//!
//! let pin: InputPin = hal_function_which_returns_input_pin();
//! let clock = || hal_function_which_returns_millis();
//!
//! // No handler is ever registered, so name its type.
//! let mut button: Button<_, _, fn(&ButtonState, ButtonEvent)> = Button::active_high(pin, clock);
//!
//! loop {
//!     match button.poll()? {
//!         Some(ButtonEvent::Pressed) => led.set_high()?,
//!         Some(ButtonEvent::Released) | Some(ButtonEvent::LongFinish) => led.set_low()?,
//!         _ => (),
//!     }
//!     wait(1.ms());
//! }
//! ```

#![cfg_attr(not(test), no_std)]

use core::convert::TryFrom;
use core::ptr;

use embedded_hal::digital::v2::InputPin;
use log::{debug, trace};

/// Default time in ms the pin has to stay pressed before a press is confirmed.
pub const DEBOUNCE_MS: u8 = 50;

/// Default time in ms a press has to last to become a long click.
pub const LONGCLICK_MS: u32 = 250;

/// Default interval in ms between long click repeats.
pub const LONGCLICK_REPEAT_MS: u32 = 250;

/// Default time in ms after a press before a click is finished.
pub const MULTICLICK_MS: u32 = 300;

/// The events emitted by [`Button::poll()`].
///
/// Each variant has a stable numeric code, see `u8::from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ButtonEvent {
    /// A press outlasted the debounce time.
    Pressed = 0,
    /// The button was released and the press was not a long click.
    Released = 1,
    /// The multi-click window closed. Handlers see the number of clicks in `click_count()`.
    ClickFinish = 2,
    /// The press became a long click.
    LongFirst = 3,
    /// The long click is still held.
    LongRepeat = 4,
    /// A long click was released. No `Released` follows.
    LongFinish = 5,
}

impl From<ButtonEvent> for u8 {
    fn from(event: ButtonEvent) -> u8 {
        event as u8
    }
}

impl TryFrom<u8> for ButtonEvent {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ButtonEvent::Pressed),
            1 => Ok(ButtonEvent::Released),
            2 => Ok(ButtonEvent::ClickFinish),
            3 => Ok(ButtonEvent::LongFirst),
            4 => Ok(ButtonEvent::LongRepeat),
            5 => Ok(ButtonEvent::LongFinish),
            other => Err(other),
        }
    }
}

/// Electrical input mode of the pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputMode {
    /// Internal pull-up, the usual wiring for active-low buttons.
    PullUp,
    /// Internal pull-down.
    PullDown,
    /// No internal resistor.
    Floating,
}

impl Default for InputMode {
    fn default() -> Self {
        InputMode::PullUp
    }
}

/// A pin that can be switched into an [`InputMode`] at runtime.
///
/// Most HALs encode the mode in the pin type instead. Those pins can be passed to
/// [`Button::new()`] directly.
pub trait ConfigureInput {
    /// Error raised by the hardware.
    type Error;

    /// Puts the pin into `mode`.
    fn configure(&mut self, mode: InputMode) -> Result<(), Self::Error>;
}

/// A monotonic millisecond counter.
///
/// The counter may wrap around.
pub trait Clock {
    /// Returns the current tick in ms.
    fn now_ms(&self) -> u32;
}

impl<F> Clock for F
where
    F: Fn() -> u32,
{
    fn now_ms(&self) -> u32 {
        self()
    }
}

/// Receives the events of a [`Button`].
///
/// Implemented for every `FnMut(&ButtonState, ButtonEvent)`.
pub trait EventHandler {
    /// Called from within `poll()`. Should return quickly.
    fn on_event(&mut self, button: &ButtonState, event: ButtonEvent);
}

impl<F> EventHandler for F
where
    F: FnMut(&ButtonState, ButtonEvent),
{
    fn on_event(&mut self, button: &ButtonState, event: ButtonEvent) {
        self(button, event)
    }
}

/// Thresholds of the gesture detection, in ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Press duration after which a long click starts.
    pub longclick_ms: u32,
    /// Interval between long click repeats.
    pub longclick_repeat_ms: u32,
    /// Time after a press at which a click is finished.
    pub multiclick_ms: u32,
}

impl Timing {
    /// The crate defaults.
    pub const fn new() -> Self {
        Self {
            longclick_ms: LONGCLICK_MS,
            longclick_repeat_ms: LONGCLICK_REPEAT_MS,
            multiclick_ms: MULTICLICK_MS,
        }
    }

    pub const fn longclick(self, ms: u32) -> Self {
        Self {
            longclick_ms: ms,
            ..self
        }
    }

    pub const fn longclick_repeat(self, ms: u32) -> Self {
        Self {
            longclick_repeat_ms: ms,
            ..self
        }
    }

    pub const fn multiclick(self, ms: u32) -> Self {
        Self {
            multiclick_ms: ms,
            ..self
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}

/// The state of a button, as seen by event handlers.
///
/// Two states are only equal if they are the same instance.
#[derive(Debug)]
pub struct ButtonState {
    /// The level which means pressed. `false` for active-low buttons.
    pressed_level: bool,
    /// The level sampled by the previous poll.
    raw_level_prev: bool,
    /// The level sampled by the last poll.
    raw_level_curr: bool,
    debounce_ms: u8,
    timing: Timing,
    /// Tick of the last press edge.
    pressed_at: u32,
    /// Tick of the last long click event.
    longclick_at: u32,
    /// A `Pressed` event was emitted for the current press.
    press_confirmed: bool,
    longclick_active: bool,
    click_count: u8,
    last_press_duration: u32,
}

impl ButtonState {
    fn new(active_low: bool, debounce_ms: u8, now: u32) -> Self {
        let pressed_level = !active_low;
        Self {
            pressed_level,
            raw_level_prev: !pressed_level,
            raw_level_curr: !pressed_level,
            debounce_ms,
            timing: Timing::new(),
            pressed_at: now,
            longclick_at: now,
            press_confirmed: false,
            longclick_active: false,
            click_count: 0,
            last_press_duration: 0,
        }
    }

    /// Whether the level sampled by the last poll is the pressed level.
    pub fn is_pressed(&self) -> bool {
        self.raw_level_curr == self.pressed_level
    }

    /// Number of confirmed presses in the current click sequence.
    pub fn click_count(&self) -> u8 {
        self.click_count
    }

    /// Duration in ms of the last press, updated on release and on long click events.
    pub fn pressed_duration(&self) -> u32 {
        self.last_press_duration
    }

    /// Whether the current press is a long click.
    pub fn is_long_click(&self) -> bool {
        self.longclick_active
    }

    pub fn debounce_time(&self) -> u8 {
        self.debounce_ms
    }

    pub fn is_active_low(&self) -> bool {
        !self.pressed_level
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    fn reset(&mut self, now: u32) {
        self.pressed_at = now;
        self.longclick_at = now;
        self.press_confirmed = false;
        self.longclick_active = false;
        self.click_count = 0;
    }

    /// Feeds one sample into the state machine.
    fn advance(&mut self, level: bool, now: u32) -> Option<ButtonEvent> {
        self.raw_level_prev = self.raw_level_curr;
        self.raw_level_curr = level;

        let active = self.raw_level_curr == self.pressed_level;
        let was_active = self.raw_level_prev == self.pressed_level;
        let since_pressed = now.wrapping_sub(self.pressed_at);

        if active {
            if !was_active {
                self.pressed_at = now;
                self.longclick_at = now;
                self.press_confirmed = false;
                self.longclick_active = false;
                None
            } else if !self.press_confirmed && since_pressed >= u32::from(self.debounce_ms) {
                self.press_confirmed = true;
                self.click_count = self.click_count.saturating_add(1);
                Some(ButtonEvent::Pressed)
            } else if self.press_confirmed && self.click_count == 1 {
                if !self.longclick_active && since_pressed >= self.timing.longclick_ms {
                    self.last_press_duration = since_pressed;
                    self.longclick_active = true;
                    self.longclick_at = now;
                    Some(ButtonEvent::LongFirst)
                } else if self.longclick_active
                    && now.wrapping_sub(self.longclick_at) >= self.timing.longclick_repeat_ms
                {
                    self.last_press_duration = since_pressed;
                    self.longclick_at = now;
                    Some(ButtonEvent::LongRepeat)
                } else {
                    None
                }
            } else {
                None
            }
        } else if self.press_confirmed {
            if was_active {
                self.last_press_duration = since_pressed;
                // A long click ends here, it never reports a plain release.
                if self.click_count == 1 && self.longclick_active {
                    Some(ButtonEvent::LongFinish)
                } else {
                    Some(ButtonEvent::Released)
                }
            } else if self.click_count > 0 && since_pressed >= self.timing.multiclick_ms {
                Some(ButtonEvent::ClickFinish)
            } else {
                None
            }
        } else if self.click_count > 0 && since_pressed >= self.timing.multiclick_ms {
            // A bounce inside the multi-click window unconfirmed the last press.
            Some(ButtonEvent::ClickFinish)
        } else {
            None
        }
    }

    /// Ends the click sequence once its final event has been delivered.
    fn settle(&mut self, event: ButtonEvent) {
        if let ButtonEvent::ClickFinish | ButtonEvent::LongFinish = event {
            self.press_confirmed = false;
            self.longclick_active = false;
            self.click_count = 0;
        }
    }
}

impl PartialEq for ButtonState {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

/// A push button with event detection.
///
/// Requires `poll()` to be called every ~1ms.
pub struct Button<P, C, H> {
    /// The wrapped pin.
    pin: P,

    /// The millisecond source.
    clock: C,

    /// Receives every emitted event.
    handler: Option<H>,

    state: ButtonState,
}

impl<P, C, H> Button<P, C, H>
where
    P: InputPin,
    C: Clock,
    H: EventHandler,
{
    /// Initializes a new button.
    ///
    /// An `active_low` button is pressed when the pin is low.
    pub fn new(pin: P, clock: C, active_low: bool, debounce_ms: u8) -> Self {
        let state = ButtonState::new(active_low, debounce_ms, clock.now_ms());
        Self {
            pin,
            clock,
            handler: None,
            state,
        }
    }

    /// Initializes a new button which is pressed when the pin is low.
    pub fn active_low(pin: P, clock: C) -> Self {
        Self::new(pin, clock, true, DEBOUNCE_MS)
    }

    /// Initializes a new button which is pressed when the pin is high.
    pub fn active_high(pin: P, clock: C) -> Self {
        Self::new(pin, clock, false, DEBOUNCE_MS)
    }

    /// Puts the pin into `mode` and initializes a new button.
    pub fn with_mode(
        mut pin: P,
        mode: InputMode,
        clock: C,
        active_low: bool,
        debounce_ms: u8,
    ) -> Result<Self, <P as ConfigureInput>::Error>
    where
        P: ConfigureInput,
    {
        pin.configure(mode)?;
        debug!("button input configured as {:?}", mode);
        Ok(Self::new(pin, clock, active_low, debounce_ms))
    }

    /// Sets the debounce time. Takes effect on the next poll.
    pub fn set_debounce_time(&mut self, ms: u8) {
        debug!("button debounce time set to {} ms", ms);
        self.state.debounce_ms = ms;
    }

    /// Replaces the gesture thresholds.
    pub fn set_timing(&mut self, timing: Timing) {
        debug!("button timing set to {:?}", timing);
        self.state.timing = timing;
    }

    /// Registers the event handler, replacing the previous one.
    pub fn set_handler(&mut self, handler: H) {
        self.handler = Some(handler);
    }

    /// Unregisters the event handler and returns it.
    pub fn remove_handler(&mut self) -> Option<H> {
        self.handler.take()
    }

    /// Clears counters and flags. The configuration and the handler are kept.
    pub fn reset(&mut self) {
        debug!("button reset");
        self.state.reset(self.clock.now_ms());
    }

    /// Samples the pin and runs the event detection.
    ///
    /// Needs to be called every ~1ms.
    /// Returns the event passed to the handler, if any.
    pub fn poll(&mut self) -> Result<Option<ButtonEvent>, P::Error> {
        let level = self.pin.is_high()?;
        let now = self.clock.now_ms();

        let event = self.state.advance(level, now);
        if let Some(event) = event {
            trace!(
                "button event {:?} (clicks: {}, pressed for {} ms)",
                event,
                self.state.click_count,
                self.state.last_press_duration
            );
            if let Some(handler) = self.handler.as_mut() {
                handler.on_event(&self.state, event);
            }
            self.state.settle(event);
        }
        Ok(event)
    }

    /// Whether the level sampled by the last poll is the pressed level.
    pub fn is_pressed(&self) -> bool {
        self.state.is_pressed()
    }

    /// Reads the pin right now, ignoring any debouncing.
    pub fn is_pressed_raw(&self) -> Result<bool, P::Error> {
        Ok(self.pin.is_high()? == self.state.pressed_level)
    }

    /// Number of confirmed presses in the current click sequence.
    pub fn click_count(&self) -> u8 {
        self.state.click_count()
    }

    /// Duration in ms of the last press.
    pub fn pressed_duration(&self) -> u32 {
        self.state.pressed_duration()
    }

    pub fn is_long_click(&self) -> bool {
        self.state.is_long_click()
    }

    pub fn debounce_time(&self) -> u8 {
        self.state.debounce_time()
    }

    pub fn is_active_low(&self) -> bool {
        self.state.is_active_low()
    }

    pub fn timing(&self) -> Timing {
        self.state.timing()
    }

    /// The state handed to the event handler.
    pub fn state(&self) -> &ButtonState {
        &self.state
    }

    /// Releases the pin and the clock.
    pub fn free(self) -> (P, C) {
        (self.pin, self.clock)
    }
}

/// Reports the level sampled by the last poll.
impl<P, C, H> InputPin for Button<P, C, H>
where
    P: InputPin,
{
    type Error = P::Error;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.state.raw_level_curr)
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.state.raw_level_curr)
    }
}

impl<P, C, H> PartialEq for Button<P, C, H> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}
