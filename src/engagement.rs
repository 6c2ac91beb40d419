//! Two-state engagement machine shared by all control modes.

use tracing::error;

use crate::control_error::ControlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngagementState {
    #[default]
    Idle,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activate,
    Deactivate,
}

impl Transition {
    fn from(self) -> EngagementState {
        match self {
            Transition::Activate => EngagementState::Idle,
            Transition::Deactivate => EngagementState::Active,
        }
    }

    fn to(self) -> EngagementState {
        match self {
            Transition::Activate => EngagementState::Active,
            Transition::Deactivate => EngagementState::Idle,
        }
    }
}

/// Engagement of one control mode. Changes only through [`activate`](Self::activate) and
/// [`deactivate`](Self::deactivate); a transition from the wrong state is rejected.
#[derive(Debug, Clone, Default)]
pub struct EngagementMachine {
    state: EngagementState,
}

impl EngagementMachine {
    pub fn new() -> Self {
        EngagementMachine::default()
    }

    pub fn state(&self) -> EngagementState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == EngagementState::Idle
    }

    pub fn is_active(&self) -> bool {
        self.state == EngagementState::Active
    }

    pub fn activate(&mut self) -> Result<(), ControlError> {
        self.fire(Transition::Activate)
    }

    pub fn deactivate(&mut self) -> Result<(), ControlError> {
        self.fire(Transition::Deactivate)
    }

    /// Back to Idle without a transition, used on unload and reset.
    pub(crate) fn clear(&mut self) {
        self.state = EngagementState::Idle;
    }

    fn fire(&mut self, transition: Transition) -> Result<(), ControlError> {
        if self.state != transition.from() {
            error!("rejected {:?} while {:?}", transition, self.state);
            return Err(ControlError::InvalidTransition {
                transition,
                from: self.state,
            });
        }
        self.state = transition.to();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_then_deactivate() {
        let mut fsm = EngagementMachine::new();
        assert!(fsm.is_idle());
        fsm.activate().unwrap();
        assert_eq!(fsm.state(), EngagementState::Active);
        fsm.deactivate().unwrap();
        assert_eq!(fsm.state(), EngagementState::Idle);
    }

    #[test]
    fn test_wrong_state_is_rejected() {
        let mut fsm = EngagementMachine::new();
        let err = fsm.deactivate().unwrap_err();
        assert!(matches!(
            err,
            ControlError::InvalidTransition {
                transition: Transition::Deactivate,
                from: EngagementState::Idle
            }
        ));
        fsm.activate().unwrap();
        assert!(fsm.activate().is_err());
        assert!(fsm.is_active());
    }
}
