//! A loaded control mode: its engagement machine wired to the controller buttons.
//!
//! The wiring depends on the activation policy:
//!
//! - hold: engage on press start, disengage on press end.
//! - toggle: each click alternates.
//! - auto (Drag only): engage as soon as the controller reaches the end-effector, a click
//!   disengages.
//!
//! Drag control additionally requires the controller to be within the activation radius of
//! the end-effector to engage, and does not engage automatically again for
//! [`DRAG_COOLDOWN`] seconds after it was released.

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::activation::{ActivationPolicy, ActivationStyle};
use crate::buttons::ButtonPhase;
use crate::config::ControlModeConfig;
use crate::control_error::ControlError;
use crate::dispatch::{action, ButtonRegistry, OwnerTag};
use crate::engagement::{EngagementMachine, EngagementState};
use crate::integrator::{ControlModeKind, ModeParameters};
use crate::teleop::Session;

/// Seconds after a Drag release during which automatic engagement is suppressed.
pub const DRAG_COOLDOWN: f64 = 1.0;

/// What the bindings need to know about the scene when a button fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readings {
    /// Controller world position.
    pub controller: Vector3<f64>,
    /// End-effector world position.
    pub end_effector: Vector3<f64>,
    /// Host timestamp, seconds.
    pub time: f64,
}

impl Default for Readings {
    fn default() -> Self {
        Readings {
            controller: Vector3::zeros(),
            end_effector: Vector3::zeros(),
            time: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlMode {
    kind: ControlModeKind,
    policy: ActivationPolicy,
    params: ModeParameters,
    activation_radius: f64,
    show_offset_indicator: bool,
    engagement: EngagementMachine,
    cooldown_until: Option<f64>,
}

impl ControlMode {
    /// Resolve the configuration. Fails on unknown policy or invalid parameters.
    pub fn new(config: &ControlModeConfig) -> Result<Self, ControlError> {
        let policy = ActivationPolicy::for_mode(config.kind, config.activation())?;
        let params = config.parameters()?;
        Ok(ControlMode {
            kind: config.kind,
            policy,
            params,
            activation_radius: config.activation_radius,
            show_offset_indicator: config.show_offset_indicator,
            engagement: EngagementMachine::new(),
            cooldown_until: None,
        })
    }

    pub fn kind(&self) -> ControlModeKind {
        self.kind
    }

    pub fn owner(&self) -> OwnerTag {
        self.kind.owner()
    }

    pub fn policy(&self) -> ActivationPolicy {
        self.policy
    }

    pub fn parameters(&self) -> &ModeParameters {
        &self.params
    }

    pub fn state(&self) -> EngagementState {
        self.engagement.state()
    }

    pub fn is_active(&self) -> bool {
        self.engagement.is_active()
    }

    pub fn shows_offset_indicator(&self) -> bool {
        self.show_offset_indicator
    }

    pub fn instructions(&self) -> &'static str {
        self.policy.instructions(self.kind)
    }

    /// Install the bindings of the policy. Previous bindings of this owner are removed first.
    pub fn install(&self, registry: &mut ButtonRegistry<Session>) {
        let owner = self.owner();
        registry.unbind_owner(owner);
        let button = self.policy.button;
        match self.policy.style {
            ActivationStyle::Hold => {
                registry.bind(button, ButtonPhase::Start, owner, action(|_, session: &mut Session| {
                    let readings = session.readings;
                    if let Some(mode) = session.control.as_mut() {
                        if mode.engagement.is_idle() && mode.in_reach(&readings) {
                            mode.engage(&readings);
                        }
                    }
                }));
                registry.bind(button, ButtonPhase::End, owner, action(|_, session: &mut Session| {
                    let readings = session.readings;
                    if let Some(mode) = session.control.as_mut() {
                        if mode.engagement.is_active() {
                            mode.release(&readings);
                        }
                    }
                }));
            }
            ActivationStyle::Toggle => {
                registry.bind(button, ButtonPhase::Click, owner, action(|_, session: &mut Session| {
                    let readings = session.readings;
                    if let Some(mode) = session.control.as_mut() {
                        if mode.engagement.is_idle() && mode.in_reach(&readings) {
                            mode.engage(&readings);
                        } else if mode.engagement.is_active() {
                            mode.release(&readings);
                        }
                    }
                }));
            }
            ActivationStyle::Auto => {
                registry.bind(button, ButtonPhase::Click, owner, action(|_, session: &mut Session| {
                    let readings = session.readings;
                    if let Some(mode) = session.control.as_mut() {
                        if mode.engagement.is_active() {
                            mode.release(&readings);
                        }
                    }
                }));
            }
        }
        info!("{} loaded with {}", owner, self.policy);
    }

    /// Engage without a button if the policy is automatic, the controller reached the
    /// end-effector and the cooldown has passed. Returns true if engaged now.
    pub fn auto_engage(&mut self, readings: &Readings) -> bool {
        if self.policy.style != ActivationStyle::Auto || !self.engagement.is_idle() {
            return false;
        }
        if self.cooling_down(readings.time) {
            debug!("auto engagement suppressed, cooling down");
            return false;
        }
        if !self.in_reach(readings) {
            return false;
        }
        self.engage(readings);
        true
    }

    /// True while automatic engagement is suppressed after a release.
    pub fn cooling_down(&self, time: f64) -> bool {
        matches!(self.cooldown_until, Some(until) if time < until)
    }

    /// Controller close enough to engage. Only Drag control is limited by reach.
    pub fn in_reach(&self, readings: &Readings) -> bool {
        if self.kind != ControlModeKind::Drag {
            return true;
        }
        (readings.controller - readings.end_effector).norm() <= self.activation_radius
    }

    /// Leave the engaged state as on unload or reset. No-op when idle.
    pub(crate) fn disengage(&mut self, readings: &Readings) {
        if self.engagement.is_active() {
            self.release(readings);
        }
    }

    /// Forget engagement and cooldown entirely.
    pub(crate) fn clear(&mut self) {
        self.engagement.clear();
        self.cooldown_until = None;
    }

    fn engage(&mut self, readings: &Readings) {
        if self.engagement.activate().is_ok() {
            info!("{} engaged at {:.3}s", self.owner(), readings.time);
        }
    }

    fn release(&mut self, readings: &Readings) {
        if self.engagement.deactivate().is_ok() {
            if self.kind == ControlModeKind::Drag {
                self.cooldown_until = Some(readings.time + DRAG_COOLDOWN);
            }
            info!("{} released at {:.3}s", self.owner(), readings.time);
        }
    }
}
