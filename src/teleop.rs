//! Host-facing teleoperation session.
//!
//! The host owns a [`SimulationContext`] and calls [`Teleoperation::update`] once per frame
//! with the [`Tick`] it observed. Within one update, button events are dispatched first
//! (including any engagement changes they cause), then the goal pose is integrated, so a
//! transition takes effect on the same tick.
//!
//! ```
//! use nalgebra::{UnitQuaternion, Vector3};
//! use rs_teleop_control::buttons::ButtonMask;
//! use rs_teleop_control::config::ControlModeConfig;
//! use rs_teleop_control::integrator::ControlModeKind;
//! use rs_teleop_control::pose::{Pose, PoseSample};
//! use rs_teleop_control::teleop::{SimulationContext, Teleoperation, Tick};
//!
//! let mut ctx = SimulationContext::new(Pose::identity());
//! let mut teleop = Teleoperation::new();
//! teleop.load(&ControlModeConfig::new(ControlModeKind::Clutch).with_activation("grip-hold")).unwrap();
//!
//! let at = |y: f64, tick: u64| PoseSample::at(Vector3::new(0.0, y, 0.0), UnitQuaternion::identity(), tick, tick as f64 * 0.01);
//! let tick = Tick {
//!     controller: at(0.1, 1),
//!     previous_controller: at(0.0, 0),
//!     elapsed: 0.0,
//!     base_orientation: UnitQuaternion::identity(),
//!     buttons: ButtonMask::GRIP,
//! };
//! let report = teleop.update(&mut ctx, &tick);
//! assert!(report.engaged());
//! assert!((ctx.goal.position.y - 0.1).abs() < 1e-12);
//! ```

use nalgebra::{UnitQuaternion, Vector3};
use tracing::{debug, info};

use crate::buttons::{ButtonMask, ButtonTracker};
use crate::config::{ControlModeConfig, GraspingConfig, SessionConfig};
use crate::control_error::ControlError;
use crate::control_mode::{ControlMode, Readings};
use crate::dispatch::ButtonRegistry;
use crate::engagement::EngagementState;
use crate::grasping::{GraspPolicy, Grasping, GripperCommand, GripperReading};
use crate::hazard::{HazardLevel, NEUTRAL_RGB};
use crate::integrator::{integrate, MotionInput};
use crate::pose::{FramedPose, GoalPose, Pose, PoseSample};

/// What the host observed this tick.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub controller: PoseSample,
    pub previous_controller: PoseSample,
    /// Seconds since the previous tick.
    pub elapsed: f64,
    pub base_orientation: UnitQuaternion<f64>,
    pub buttons: ButtonMask,
}

impl Tick {
    pub fn motion(&self) -> MotionInput {
        MotionInput {
            current: self.controller,
            previous: self.previous_controller,
            elapsed: self.elapsed,
            base_orientation: self.base_orientation,
        }
    }
}

/// Scene state owned by the host and passed into every update.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    /// Actual end-effector pose in the world, as the robot currently stands.
    pub end_effector: FramedPose,
    /// World position the goal is relative to: the end-effector position at start.
    pub anchor: Vector3<f64>,
    pub goal: GoalPose,
    pub gripper: GripperReading,
}

impl SimulationContext {
    /// Context for a robot whose end-effector starts at the given world pose.
    pub fn new(initial_end_effector: Pose) -> Self {
        SimulationContext {
            end_effector: FramedPose::world(initial_end_effector),
            anchor: initial_end_effector.translation.vector,
            goal: GoalPose::identity(),
            gripper: GripperReading::default(),
        }
    }

    /// Goal as a world-frame pose, to hand over to the solver.
    pub fn goal_world(&self, base_orientation: &UnitQuaternion<f64>) -> FramedPose {
        self.goal.to_world(&self.anchor, base_orientation)
    }
}

/// Outcome of one update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub engagement: EngagementState,
    /// The goal pose was written this tick.
    pub goal_written: bool,
    /// Gap severity, while engaged and the indicator is enabled.
    pub hazard: Option<HazardLevel>,
    /// Offset indicator colour, neutral while idle.
    pub indicator_rgb: u32,
    pub gripper: GripperCommand,
}

impl TickReport {
    pub fn engaged(&self) -> bool {
        self.engagement == EngagementState::Active
    }
}

/// State reachable from button actions.
#[derive(Debug, Default)]
pub struct Session {
    pub(crate) control: Option<ControlMode>,
    pub(crate) grasping: Option<Grasping>,
    pub(crate) readings: Readings,
}

impl Session {
    pub fn control(&self) -> Option<&ControlMode> {
        self.control.as_ref()
    }

    pub fn grasping(&self) -> Option<&Grasping> {
        self.grasping.as_ref()
    }
}

/// One controller driving one control mode, plus optional grasping.
#[derive(Default)]
pub struct Teleoperation {
    registry: ButtonRegistry<Session>,
    session: Session,
    tracker: ButtonTracker,
}

impl Teleoperation {
    pub fn new() -> Self {
        Teleoperation::default()
    }

    /// Load both the control mode and grasping of a session file.
    pub fn load_session(&mut self, config: &SessionConfig) -> Result<(), ControlError> {
        self.load(&config.control)?;
        match &config.grasping {
            Some(grasping) => self.load_grasping(grasping),
            None => {
                self.unload_grasping();
                Ok(())
            }
        }
    }

    /// Load a control mode, replacing the current one. The bindings of the previous mode are
    /// removed before anything else; on error no control mode stays loaded.
    pub fn load(&mut self, config: &ControlModeConfig) -> Result<(), ControlError> {
        self.unload();
        self.registry.unbind_owner(config.kind.owner());
        let mode = ControlMode::new(config)?;
        mode.install(&mut self.registry);
        self.session.control = Some(mode);
        Ok(())
    }

    /// Remove the control mode and its bindings. The goal pose is left where it is.
    pub fn unload(&mut self) {
        if let Some(mut mode) = self.session.control.take() {
            self.registry.unbind_owner(mode.owner());
            mode.clear();
            info!("{} unloaded", mode.owner());
        }
    }

    pub fn load_grasping(&mut self, config: &GraspingConfig) -> Result<(), ControlError> {
        self.unload_grasping();
        let grasping = Grasping::new(GraspPolicy::parse(&config.activation)?);
        grasping.install(&mut self.registry);
        self.session.grasping = Some(grasping);
        Ok(())
    }

    pub fn unload_grasping(&mut self) {
        if self.session.grasping.take().is_some() {
            self.registry.unbind_owner(crate::dispatch::OwnerTag::Grasping);
        }
    }

    /// Disengage, forget held buttons and put the goal back to identity.
    pub fn reset(&mut self, ctx: &mut SimulationContext) {
        let readings = self.session.readings;
        if let Some(mode) = self.session.control.as_mut() {
            mode.disengage(&readings);
        }
        if let Some(grasping) = self.session.grasping.as_mut() {
            grasping.reset();
        }
        self.tracker.clear();
        ctx.goal = GoalPose::identity();
        info!("teleoperation reset");
    }

    /// Two-line instructions of the loaded control mode, empty if none.
    pub fn mode_instructions(&self) -> &'static str {
        self.session.control.as_ref().map(|m| m.instructions()).unwrap_or("")
    }

    pub fn grasp_instructions(&self) -> &'static str {
        self.session
            .grasping
            .as_ref()
            .map(|g| g.policy().instructions())
            .unwrap_or("")
    }

    pub fn engagement(&self) -> EngagementState {
        self.session
            .control
            .as_ref()
            .map(|m| m.state())
            .unwrap_or(EngagementState::Idle)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &ButtonRegistry<Session> {
        &self.registry
    }

    /// Advance one tick: dispatch button events, engage automatically if the policy says so,
    /// integrate the goal pose and report.
    pub fn update(&mut self, ctx: &mut SimulationContext, tick: &Tick) -> TickReport {
        self.session.readings = Readings {
            controller: tick.controller.position(),
            end_effector: ctx.end_effector.position(),
            time: tick.controller.time,
        };

        for (button, phase) in self.tracker.advance(tick.buttons) {
            self.registry.dispatch(button, phase, &mut self.session);
        }

        let readings = self.session.readings;
        let mut report = TickReport {
            engagement: EngagementState::Idle,
            goal_written: false,
            hazard: None,
            indicator_rgb: NEUTRAL_RGB,
            gripper: GripperCommand::Hold,
        };

        if let Some(mode) = self.session.control.as_mut() {
            mode.auto_engage(&readings);
            let engaged = mode.is_active();
            report.engagement = mode.state();
            report.goal_written = integrate(
                mode.kind(),
                engaged,
                &tick.motion(),
                mode.parameters(),
                &ctx.anchor,
                &mut ctx.goal,
            );
            if engaged && mode.shows_offset_indicator() {
                let goal = ctx.goal_world(&tick.base_orientation);
                let level = HazardLevel::between(&readings.end_effector, &goal.position());
                report.hazard = Some(level);
                report.indicator_rgb = level.indicator_rgb();
            }
        }

        if let Some(grasping) = self.session.grasping.as_mut() {
            report.gripper = grasping.command(&ctx.gripper);
        }

        debug!(
            "tick {}: {:?}, goal {:?}",
            tick.controller.tick, report.engagement, ctx.goal.position
        );
        report
    }
}
