//! Physical controller buttons and the events derived from their state.
//!
//! The host only reports which buttons are held on every tick ([`ButtonMask`]). The
//! [`ButtonTracker`] turns consecutive masks into the event vocabulary the control modes bind
//! to: a button going down produces [`ButtonPhase::Start`], a button going up produces
//! [`ButtonPhase::Click`] followed by [`ButtonPhase::End`], and every tick also carries the
//! level event [`ButtonPhase::Held`] or [`ButtonPhase::Released`].

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Buttons held down in the current tick
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct ButtonMask: u8 {
        const NONE =    0b0000_0000;
        const GRIP =    0b0000_0001;
        const TRIGGER = 0b0000_0010;
        const A =       0b0000_0100;
        const B =       0b0000_1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Grip,
    Trigger,
    A,
    B,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::Grip, Button::Trigger, Button::A, Button::B];

    pub fn mask(self) -> ButtonMask {
        match self {
            Button::Grip => ButtonMask::GRIP,
            Button::Trigger => ButtonMask::TRIGGER,
            Button::A => ButtonMask::A,
            Button::B => ButtonMask::B,
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Button::Grip => "grip",
            Button::Trigger => "trigger",
            Button::A => "a",
            Button::B => "b",
        };
        write!(f, "{}", name)
    }
}

/// Phase of a button gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonPhase {
    /// Button went down this tick.
    Start,
    /// A complete press: fires on release, before `End`.
    Click,
    /// Button went up this tick.
    End,
    /// Button is down (every tick).
    Held,
    /// Button is up (every tick).
    Released,
}

/// Derives button events from the masks reported on consecutive ticks.
#[derive(Debug, Default, Clone)]
pub struct ButtonTracker {
    previous: ButtonMask,
}

impl ButtonTracker {
    pub fn new() -> Self {
        ButtonTracker::default()
    }

    /// Events for this tick, in dispatch order: per button, edge events first, then the level
    /// event.
    pub fn advance(&mut self, current: ButtonMask) -> Vec<(Button, ButtonPhase)> {
        let pressed = current - self.previous;
        let released = self.previous - current;
        let mut events = Vec::with_capacity(Button::ALL.len() * 2);
        for button in Button::ALL {
            let bit = button.mask();
            if pressed.contains(bit) {
                events.push((button, ButtonPhase::Start));
            }
            if released.contains(bit) {
                events.push((button, ButtonPhase::Click));
                events.push((button, ButtonPhase::End));
            }
            if current.contains(bit) {
                events.push((button, ButtonPhase::Held));
            } else {
                events.push((button, ButtonPhase::Released));
            }
        }
        self.previous = current;
        events
    }

    /// Forget the held state, e.g. after the controller reconnects.
    pub fn clear(&mut self) {
        self.previous = ButtonMask::NONE;
    }
}
