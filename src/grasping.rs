//! Gripper control sharing the controller with the active control mode.
//!
//! Grasping does not move the fingers itself: every tick it issues a [`GripperCommand`] and the
//! host steps the fingers. Commands are gated by the finger aperture the host reports, so the
//! gripper is never driven past fully open or fully closed, and never closed further on an
//! object already grasped.

use tracing::debug;

use crate::buttons::{Button, ButtonPhase};
use crate::control_error::ControlError;
use crate::dispatch::{action, ButtonRegistry, OwnerTag};
use crate::teleop::Session;

/// Finger tip distance (meters) of the fully open gripper.
pub const FULLY_OPEN_APERTURE: f64 = 0.08;

/// Finger tip distance (meters) of the fully closed gripper.
pub const FULLY_CLOSED_APERTURE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GripperCommand {
    #[default]
    Hold,
    Open,
    Close,
}

/// Gripper state reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GripperReading {
    /// Distance between the finger tips, meters.
    pub aperture: f64,
    /// An object is held between the fingers.
    pub grasped: bool,
}

impl Default for GripperReading {
    fn default() -> Self {
        GripperReading {
            aperture: FULLY_OPEN_APERTURE,
            grasped: false,
        }
    }
}

impl GripperReading {
    pub fn can_open(&self) -> bool {
        self.aperture <= FULLY_OPEN_APERTURE
    }

    pub fn can_close(&self) -> bool {
        self.aperture >= FULLY_CLOSED_APERTURE && !self.grasped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraspPolicy {
    /// A held closes, B held opens.
    AbHold,
    /// Trigger held closes, released opens.
    TriggerHold,
    /// Each trigger click toggles between closing and opening.
    TriggerToggle,
}

impl GraspPolicy {
    pub fn parse(policy: &str) -> Result<Self, ControlError> {
        match policy {
            "ab-hold" => Ok(GraspPolicy::AbHold),
            "trigger-hold" => Ok(GraspPolicy::TriggerHold),
            "trigger-toggle" => Ok(GraspPolicy::TriggerToggle),
            _ => Err(ControlError::UnknownPolicy {
                policy: policy.to_string(),
                owner: OwnerTag::Grasping,
            }),
        }
    }

    pub fn instructions(self) -> &'static str {
        match self {
            GraspPolicy::AbHold => "Close: Press and hold (a).\nOpen: Press and hold (b).",
            GraspPolicy::TriggerHold => "Close: Squeeze and hold the trigger.\nOpen: Release the trigger.",
            GraspPolicy::TriggerToggle => "Close: Squeeze the trigger.\nOpen: Squeeze the trigger again.",
        }
    }
}

/// Toggle sub-machine: a click while open starts closing, closing ends when the fingers stop
/// or hold an object, a click while closed opens again. Clicks while closing are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleState {
    #[default]
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Grasping {
    policy: GraspPolicy,
    toggle: ToggleState,
    /// Requested by this tick's button events, consumed by `command`.
    request: GripperCommand,
}

impl Grasping {
    pub fn new(policy: GraspPolicy) -> Self {
        Grasping {
            policy,
            toggle: ToggleState::Open,
            request: GripperCommand::Hold,
        }
    }

    pub fn policy(&self) -> GraspPolicy {
        self.policy
    }

    pub fn toggle_state(&self) -> ToggleState {
        self.toggle
    }

    /// Replace the grasping bindings with the ones of the policy.
    pub fn install(&self, registry: &mut ButtonRegistry<Session>) {
        let owner = OwnerTag::Grasping;
        registry.unbind_owner(owner);
        match self.policy {
            GraspPolicy::AbHold => {
                registry.bind(Button::A, ButtonPhase::Held, owner, request(GripperCommand::Close));
                registry.bind(Button::B, ButtonPhase::Held, owner, request(GripperCommand::Open));
            }
            GraspPolicy::TriggerHold => {
                registry.bind(Button::Trigger, ButtonPhase::Held, owner, request(GripperCommand::Close));
                registry.bind(Button::Trigger, ButtonPhase::Released, owner, request(GripperCommand::Open));
            }
            GraspPolicy::TriggerToggle => {
                registry.bind(Button::Trigger, ButtonPhase::Click, owner, action(|_, session: &mut Session| {
                    if let Some(grasping) = session.grasping.as_mut() {
                        grasping.click();
                    }
                }));
            }
        }
    }

    fn click(&mut self) {
        self.toggle = match self.toggle {
            ToggleState::Open | ToggleState::Closing => ToggleState::Closing,
            ToggleState::Closed => ToggleState::Open,
        };
        debug!("grasp toggle now {:?}", self.toggle);
    }

    /// Command for this tick, gated by the gripper reading. Clears the request.
    pub fn command(&mut self, reading: &GripperReading) -> GripperCommand {
        let wanted = match self.policy {
            GraspPolicy::TriggerToggle => match self.toggle {
                ToggleState::Open => GripperCommand::Open,
                ToggleState::Closing => GripperCommand::Close,
                ToggleState::Closed => GripperCommand::Hold,
            },
            _ => self.request,
        };
        self.request = GripperCommand::Hold;

        match wanted {
            GripperCommand::Close if reading.can_close() => GripperCommand::Close,
            GripperCommand::Close => {
                if self.toggle == ToggleState::Closing {
                    self.toggle = ToggleState::Closed;
                    debug!("grasp closed at aperture {:.3}", reading.aperture);
                }
                GripperCommand::Hold
            }
            GripperCommand::Open if reading.can_open() => GripperCommand::Open,
            _ => GripperCommand::Hold,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.toggle = ToggleState::Open;
        self.request = GripperCommand::Hold;
    }
}

fn request(command: GripperCommand) -> crate::dispatch::Action<Session> {
    action(move |_, session: &mut Session| {
        if let Some(grasping) = session.grasping.as_mut() {
            grasping.request = command;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(aperture: f64) -> GripperReading {
        GripperReading {
            aperture,
            grasped: false,
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(GraspPolicy::parse("trigger-toggle").unwrap(), GraspPolicy::TriggerToggle);
        assert!(matches!(
            GraspPolicy::parse("grip-auto"),
            Err(ControlError::UnknownPolicy { owner: OwnerTag::Grasping, .. })
        ));
    }

    #[test]
    fn test_toggle_cycle() {
        let mut grasping = Grasping::new(GraspPolicy::TriggerToggle);
        assert_eq!(grasping.toggle_state(), ToggleState::Open);

        grasping.click();
        assert_eq!(grasping.toggle_state(), ToggleState::Closing);
        assert_eq!(grasping.command(&reading(0.05)), GripperCommand::Close);
        assert_eq!(grasping.command(&reading(0.02)), GripperCommand::Close);
        // Fingers at the stop
        assert_eq!(grasping.command(&reading(0.009)), GripperCommand::Hold);
        assert_eq!(grasping.toggle_state(), ToggleState::Closed);

        grasping.click();
        assert_eq!(grasping.toggle_state(), ToggleState::Open);
        assert_eq!(grasping.command(&reading(0.009)), GripperCommand::Open);
    }

    #[test]
    fn test_click_while_closing_keeps_closing() {
        let mut grasping = Grasping::new(GraspPolicy::TriggerToggle);
        grasping.click();
        assert_eq!(grasping.command(&reading(0.05)), GripperCommand::Close);
        grasping.click();
        assert_eq!(grasping.toggle_state(), ToggleState::Closing);
        assert_eq!(grasping.command(&reading(0.04)), GripperCommand::Close);
        assert_eq!(grasping.command(&reading(0.005)), GripperCommand::Hold);
        assert_eq!(grasping.toggle_state(), ToggleState::Closed);
    }

    #[test]
    fn test_grasped_object_stops_closing() {
        let mut grasping = Grasping::new(GraspPolicy::TriggerToggle);
        grasping.click();
        let holding = GripperReading {
            aperture: 0.04,
            grasped: true,
        };
        assert_eq!(grasping.command(&holding), GripperCommand::Hold);
        assert_eq!(grasping.toggle_state(), ToggleState::Closed);
    }

    #[test]
    fn test_open_gated_at_full_aperture() {
        let mut grasping = Grasping::new(GraspPolicy::AbHold);
        grasping.request = GripperCommand::Open;
        assert_eq!(grasping.command(&reading(0.081)), GripperCommand::Hold);
        grasping.request = GripperCommand::Open;
        assert_eq!(grasping.command(&reading(0.05)), GripperCommand::Open);
        // Request is consumed
        assert_eq!(grasping.command(&reading(0.05)), GripperCommand::Hold);
    }
}
