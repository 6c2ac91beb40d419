//! Activation policies: which button engages a control mode and how.
//!
//! Policies are given as strings such as `grip-toggle` or `trigger-auto`: the first part names
//! the button, the second part the gesture.

use std::fmt;

use crate::buttons::Button;
use crate::control_error::ControlError;
use crate::integrator::ControlModeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationStyle {
    /// Engaged while the button is held.
    Hold,
    /// Each click alternates between engaged and idle.
    Toggle,
    /// Engages when the controller reaches the end-effector, the button only disengages.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationPolicy {
    pub button: Button,
    pub style: ActivationStyle,
}

impl ActivationPolicy {
    pub fn new(button: Button, style: ActivationStyle) -> Self {
        ActivationPolicy { button, style }
    }

    /// Parse the policy string for the given control mode. Only grip and trigger can be
    /// bound, and only Drag control supports the automatic policy.
    pub fn for_mode(kind: ControlModeKind, policy: &str) -> Result<Self, ControlError> {
        let unknown = || ControlError::UnknownPolicy {
            policy: policy.to_string(),
            owner: kind.owner(),
        };
        let (button, style) = policy.split_once('-').ok_or_else(unknown)?;
        let button = match button {
            "grip" => Button::Grip,
            "trigger" => Button::Trigger,
            _ => return Err(unknown()),
        };
        let style = match style {
            "hold" => ActivationStyle::Hold,
            "toggle" => ActivationStyle::Toggle,
            "auto" if kind == ControlModeKind::Drag => ActivationStyle::Auto,
            _ => return Err(unknown()),
        };
        Ok(ActivationPolicy::new(button, style))
    }

    /// Two lines telling the operator how to engage and disengage.
    pub fn instructions(&self, kind: ControlModeKind) -> &'static str {
        use ActivationStyle::*;
        use Button::*;
        match (kind, self.button, self.style) {
            (ControlModeKind::Drag, Grip, Hold) => {
                "Activate: Move the controller to the gripper and hold the grip button\nDeactivate: Release the grip button."
            }
            (ControlModeKind::Drag, Grip, Toggle) => {
                "Activate: Move the controller to the gripper and press the grip button\nDeactivate: Press the grip button."
            }
            (ControlModeKind::Drag, Grip, Auto) => {
                "Activate: Move the controller to the gripper.\nDeactivate: Press the grip button."
            }
            (ControlModeKind::Drag, Trigger, Hold) => {
                "Activate: Move the controller to the gripper, then squeeze and hold the trigger.\nDeactivate: Release the trigger."
            }
            (ControlModeKind::Drag, Trigger, Toggle) => {
                "Activate: Move the controller to the gripper and squeeze the trigger.\nDeactivate: Squeeze the trigger again."
            }
            (ControlModeKind::Drag, Trigger, Auto) => {
                "Activate: Move the controller to the gripper.\nDeactivate: Squeeze the trigger."
            }
            (_, Grip, Hold) => "Activate: Press and hold the grip button.\nDeactivate: Release the grip button.",
            (_, Grip, _) => "Activate: Press the grip button.\nDeactivate: Press the grip button again.",
            (_, Trigger, Hold) => "Activate: Squeeze and hold the trigger.\nDeactivate: Release the trigger.",
            (_, _, _) => "Activate: Squeeze the trigger.\nDeactivate: Squeeze the trigger again.",
        }
    }
}

impl fmt::Display for ActivationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match self.style {
            ActivationStyle::Hold => "hold",
            ActivationStyle::Toggle => "toggle",
            ActivationStyle::Auto => "auto",
        };
        write!(f, "{}-{}", self.button, style)
    }
}
