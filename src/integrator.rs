//! Pose delta integration: turns controller motion into goal pose motion.
//!
//! All control modes share one frame rule: controller motion, observed in the world, is brought
//! into the robot base frame by rotating it with the inverse of the robot base orientation `R`.
//! With `c` and `p` the current and previous controller orientation, the incremental rotation
//! of one tick is `(R⁻¹c)(R⁻¹p)⁻¹`, applied to the goal orientation by left multiplication.
//!
//! | Mode | Position | Orientation |
//! |---|---|---|
//! | Clutch | incremental | incremental, blended toward the corrected controller orientation by elapsed time |
//! | Drag | absolute, controller minus anchor | incremental |
//! | PureOffset | incremental | corrected controller orientation, every tick, engaged or not |
//! | Redirected | incremental | incremental, blended toward the corrected controller orientation by rotation speed |

use std::f64::consts::PI;

use nalgebra::{Translation3, UnitQuaternion, Vector3};
use serde::Deserialize;
use tracing::warn;

use crate::dispatch::OwnerTag;
use crate::pose::{FramedPose, GoalPose, Pose, PoseSample, ReferenceFrame};

/// Below this, slerp between two orientations is considered undefined.
const SLERP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlModeKind {
    /// Clutched offset control.
    Clutch,
    /// The end-effector sticks to the controller once the controller reaches it.
    Drag,
    /// Offset control, position clutched, orientation always live.
    PureOffset,
    /// Orientation corrections scaled by how fast the operator rotates.
    Redirected,
}

impl ControlModeKind {
    pub fn owner(self) -> OwnerTag {
        match self {
            ControlModeKind::Clutch => OwnerTag::ClutchControl,
            ControlModeKind::Drag => OwnerTag::DragControl,
            ControlModeKind::PureOffset => OwnerTag::OffsetControl,
            ControlModeKind::Redirected => OwnerTag::RedirectedControl,
        }
    }

    pub fn default_policy(self) -> &'static str {
        match self {
            ControlModeKind::Drag => "grip-auto",
            _ => "grip-toggle",
        }
    }

    /// True if the goal is written on idle ticks too.
    pub fn tracks_while_idle(self) -> bool {
        self == ControlModeKind::PureOffset
    }
}

/// Controller motion of one tick, as supplied by the host.
#[derive(Debug, Clone, Copy)]
pub struct MotionInput {
    pub current: PoseSample,
    pub previous: PoseSample,
    /// Seconds since the previous tick.
    pub elapsed: f64,
    /// Orientation of the robot base in the world.
    pub base_orientation: UnitQuaternion<f64>,
}

/// Orientation shaping of a loaded mode, resolved from its configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeParameters {
    /// Fixed rotation between controller and gripper axes.
    pub correction: UnitQuaternion<f64>,
    /// Operator supplied offset, applied after the correction.
    pub offset: UnitQuaternion<f64>,
    /// Blend rate: per second for Clutch, per full turn for Redirected.
    pub slerp_rate: f64,
}

impl Default for ModeParameters {
    fn default() -> Self {
        ModeParameters {
            correction: default_correction(),
            offset: UnitQuaternion::identity(),
            slerp_rate: 1.0,
        }
    }
}

/// Rotation from intrinsic XYZ Euler angles (radians), X applied first.
pub fn euler_xyz(x: f64, y: f64, z: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), x)
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y)
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), z)
}

/// Controller to gripper axes, (-60°, 90°, 0°).
pub fn default_correction() -> UnitQuaternion<f64> {
    euler_xyz(-PI / 3.0, PI / 2.0, 0.0)
}

/// Controller displacement of this tick in base frame.
pub fn position_delta(r_inv: &UnitQuaternion<f64>, input: &MotionInput) -> Vector3<f64> {
    r_inv * (input.current.position() - input.previous.position())
}

/// Controller rotation of this tick in base frame, `(R⁻¹c)(R⁻¹p)⁻¹`.
pub fn incremental_rotation(r_inv: &UnitQuaternion<f64>, input: &MotionInput) -> UnitQuaternion<f64> {
    let current = r_inv * input.current.orientation();
    let previous = r_inv * input.previous.orientation();
    let mut delta = current * previous.inverse();
    delta.renormalize();
    finite_or_identity(delta)
}

/// Controller motion of this tick as a pose in the robot base frame: displacement and
/// incremental rotation.
pub fn base_delta(input: &MotionInput) -> FramedPose {
    let r_inv = input.base_orientation.inverse();
    FramedPose::new(
        Pose::from_parts(Translation3::from(position_delta(&r_inv, input)), incremental_rotation(&r_inv, input)),
        ReferenceFrame::RobotBase,
    )
}

/// Clutch blend: proportional to the time since the last tick.
pub fn clutch_blend_factor(elapsed: f64, slerp_rate: f64) -> f64 {
    clamp_factor(elapsed * slerp_rate)
}

/// Redirected blend: proportional to the controller rotation angle of this tick, one full turn
/// giving factor 1.
pub fn redirect_blend_factor(angle: f64, slerp_rate: f64) -> f64 {
    clamp_factor(angle.abs() / (2.0 * PI) * slerp_rate)
}

fn clamp_factor(factor: f64) -> f64 {
    if factor.is_nan() {
        return 0.0;
    }
    factor.clamp(0.0, 1.0)
}

/// Spherical interpolation that never produces NaN: if the interpolation is undefined, the
/// blend is skipped and `from` is returned.
pub fn slerp_or_hold(from: &UnitQuaternion<f64>, to: &UnitQuaternion<f64>, factor: f64) -> UnitQuaternion<f64> {
    let factor = clamp_factor(factor);
    if factor == 0.0 {
        return *from;
    }
    match from.try_slerp(to, factor, SLERP_EPSILON) {
        Some(mut q) if is_finite(&q) => {
            q.renormalize();
            q
        }
        _ => *from,
    }
}

/// Corrected controller orientation in base frame: `R⁻¹·c·C`, optionally followed by the
/// offset.
fn target_orientation(
    r_inv: &UnitQuaternion<f64>,
    input: &MotionInput,
    params: &ModeParameters,
    with_offset: bool,
) -> UnitQuaternion<f64> {
    let mut target = r_inv * input.current.orientation() * params.correction;
    if with_offset {
        target *= params.offset;
    }
    target.renormalize();
    target
}

fn is_finite(q: &UnitQuaternion<f64>) -> bool {
    q.quaternion().coords.iter().all(|c| c.is_finite())
}

fn finite_or_identity(q: UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    if is_finite(&q) { q } else { UnitQuaternion::identity() }
}

/// Update the goal pose for one tick of the given mode. `engaged` is the engagement state
/// after this tick's button events. `anchor` is the world position the goal is relative to.
///
/// Returns true if the goal was written.
pub fn integrate(
    kind: ControlModeKind,
    engaged: bool,
    input: &MotionInput,
    params: &ModeParameters,
    anchor: &Vector3<f64>,
    goal: &mut GoalPose,
) -> bool {
    if !engaged && !kind.tracks_while_idle() {
        return false;
    }
    if !input.current.is_finite() || !input.previous.is_finite() || !is_finite(&input.base_orientation) {
        warn!("non-finite controller sample at tick {}, goal kept", input.current.tick);
        return false;
    }

    let r_inv = input.base_orientation.inverse();
    let delta = base_delta(input);
    match kind {
        ControlModeKind::Clutch => {
            goal.position += delta.position();
            goal.orientation = delta.orientation() * goal.orientation;
            let factor = clutch_blend_factor(input.elapsed, params.slerp_rate);
            let target = target_orientation(&r_inv, input, params, true);
            goal.orientation = slerp_or_hold(&goal.orientation, &target, factor);
        }
        ControlModeKind::Drag => {
            goal.position = r_inv * (input.current.position() - anchor);
            goal.orientation = delta.orientation() * goal.orientation;
        }
        ControlModeKind::PureOffset => {
            goal.orientation = target_orientation(&r_inv, input, params, true);
            if engaged {
                goal.position += delta.position();
            }
        }
        ControlModeKind::Redirected => {
            goal.position += delta.position();
            goal.orientation = delta.orientation() * goal.orientation;
            let current = r_inv * input.current.orientation();
            let previous = r_inv * input.previous.orientation();
            let factor = redirect_blend_factor(current.angle_to(&previous), params.slerp_rate);
            let target = target_orientation(&r_inv, input, params, false);
            goal.orientation = slerp_or_hold(&goal.orientation, &target, factor);
        }
    }
    goal.renormalize();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Unit;
    use std::f64::consts::FRAC_PI_2;

    fn sample(position: Vector3<f64>, orientation: UnitQuaternion<f64>, tick: u64) -> PoseSample {
        PoseSample::new(
            Pose::from_parts(Translation3::from(position), orientation),
            tick,
            tick as f64 * 0.01,
        )
    }

    fn motion(
        from: (Vector3<f64>, UnitQuaternion<f64>),
        to: (Vector3<f64>, UnitQuaternion<f64>),
        elapsed: f64,
        base: UnitQuaternion<f64>,
    ) -> MotionInput {
        MotionInput {
            current: sample(to.0, to.1, 1),
            previous: sample(from.0, from.1, 0),
            elapsed,
            base_orientation: base,
        }
    }

    fn still() -> (Vector3<f64>, UnitQuaternion<f64>) {
        (Vector3::zeros(), UnitQuaternion::identity())
    }

    #[test]
    fn test_clutch_position_delta_identity_base() {
        let input = motion(
            still(),
            (Vector3::new(0.0, 0.1, 0.0), UnitQuaternion::identity()),
            0.0,
            UnitQuaternion::identity(),
        );
        let mut goal = GoalPose {
            position: Vector3::new(0.2, 0.0, 0.3),
            orientation: UnitQuaternion::identity(),
        };
        let before = goal.position;
        assert!(integrate(
            ControlModeKind::Clutch,
            true,
            &input,
            &ModeParameters::default(),
            &Vector3::zeros(),
            &mut goal
        ));
        assert!((goal.position - before - Vector3::new(0.0, 0.1, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_delta_rotated_into_base_frame() {
        // Base turned 90° about Z, so world +Y is base +X.
        let base = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let input = motion(
            still(),
            (Vector3::new(0.0, 0.1, 0.0), UnitQuaternion::identity()),
            0.0,
            base,
        );
        let mut goal = GoalPose::identity();
        integrate(
            ControlModeKind::Redirected,
            true,
            &input,
            &ModeParameters::default(),
            &Vector3::zeros(),
            &mut goal,
        );
        assert!((goal.position - Vector3::new(0.1, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_idle_modes_leave_goal() {
        let input = motion(
            still(),
            (Vector3::new(0.3, 0.1, 0.0), UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.4)),
            0.5,
            UnitQuaternion::identity(),
        );
        for kind in [ControlModeKind::Clutch, ControlModeKind::Drag, ControlModeKind::Redirected] {
            let mut goal = GoalPose::identity();
            assert!(!integrate(kind, false, &input, &ModeParameters::default(), &Vector3::zeros(), &mut goal));
            assert_eq!(goal, GoalPose::identity());
        }
    }

    #[test]
    fn test_pure_offset_orientation_tracks_while_idle() {
        let controller = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.7);
        let input = motion(
            still(),
            (Vector3::new(0.3, 0.0, 0.0), controller),
            0.01,
            UnitQuaternion::identity(),
        );
        let params = ModeParameters {
            correction: UnitQuaternion::identity(),
            offset: UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.2),
            slerp_rate: 1.0,
        };
        let mut goal = GoalPose {
            position: Vector3::new(0.0, 0.0, 0.5),
            orientation: UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 1.0),
        };
        assert!(integrate(ControlModeKind::PureOffset, false, &input, &params, &Vector3::zeros(), &mut goal));
        assert!(goal.orientation.angle_to(&(controller * params.offset)) < 1e-12);
        assert_eq!(goal.position, Vector3::new(0.0, 0.0, 0.5));

        integrate(ControlModeKind::PureOffset, true, &input, &params, &Vector3::zeros(), &mut goal);
        assert!((goal.position - Vector3::new(0.3, 0.0, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn test_drag_position_is_absolute() {
        let anchor = Vector3::new(0.5, 1.0, 0.0);
        let input = motion(
            (Vector3::new(0.5, 1.0, 0.0), UnitQuaternion::identity()),
            (Vector3::new(0.6, 1.2, 0.0), UnitQuaternion::identity()),
            0.01,
            UnitQuaternion::identity(),
        );
        let mut goal = GoalPose {
            position: Vector3::new(9.0, 9.0, 9.0),
            orientation: UnitQuaternion::identity(),
        };
        integrate(ControlModeKind::Drag, true, &input, &ModeParameters::default(), &anchor, &mut goal);
        assert!((goal.position - Vector3::new(0.1, 0.2, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_drag_orientation_is_incremental() {
        let turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.3);
        let start = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.5);
        let input = motion(still(), (Vector3::zeros(), turn), 0.01, UnitQuaternion::identity());
        let mut goal = GoalPose {
            position: Vector3::zeros(),
            orientation: start,
        };
        integrate(ControlModeKind::Drag, true, &input, &ModeParameters::default(), &Vector3::zeros(), &mut goal);
        assert!(goal.orientation.angle_to(&(turn * start)) < 1e-12);
    }

    #[test]
    fn test_clutch_full_blend_reaches_target() {
        let controller = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.25);
        let input = motion(
            (Vector3::zeros(), controller),
            (Vector3::zeros(), controller),
            2.0,
            UnitQuaternion::identity(),
        );
        let params = ModeParameters::default();
        let mut goal = GoalPose::identity();
        integrate(ControlModeKind::Clutch, true, &input, &params, &Vector3::zeros(), &mut goal);
        let target = controller * params.correction * params.offset;
        assert!(goal.orientation.angle_to(&target) < 1e-9);
    }

    #[test]
    fn test_clutch_partial_blend_by_elapsed_time() {
        let controller = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.8);
        let params = ModeParameters {
            correction: UnitQuaternion::identity(),
            offset: UnitQuaternion::identity(),
            slerp_rate: 2.0,
        };
        let target = controller * params.correction * params.offset;
        let start = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.6);

        // 0.25 s at rate 2 blends half way
        let input = motion((Vector3::zeros(), controller), (Vector3::zeros(), controller), 0.25, UnitQuaternion::identity());
        let mut goal = GoalPose {
            position: Vector3::zeros(),
            orientation: start,
        };
        integrate(ControlModeKind::Clutch, true, &input, &params, &Vector3::zeros(), &mut goal);
        let halfway = start.slerp(&target, 0.5);
        assert!(goal.orientation.angle_to(&halfway) < 1e-9);
        let total = start.angle_to(&target);
        assert!((goal.orientation.angle_to(&target) - total / 2.0).abs() < 1e-9);

        // A shorter frame blends proportionally less
        let input = motion((Vector3::zeros(), controller), (Vector3::zeros(), controller), 0.05, UnitQuaternion::identity());
        let mut goal = GoalPose {
            position: Vector3::zeros(),
            orientation: start,
        };
        integrate(ControlModeKind::Clutch, true, &input, &params, &Vector3::zeros(), &mut goal);
        assert!((goal.orientation.angle_to(&target) - total * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_base_delta_is_in_robot_base_frame() {
        let base = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let turn = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3);
        let input = motion(still(), (Vector3::new(0.0, 0.2, 0.0), turn), 0.01, base);
        let delta = base_delta(&input);
        assert_eq!(delta.frame, ReferenceFrame::RobotBase);
        assert!((delta.position() - Vector3::new(0.2, 0.0, 0.0)).norm() < 1e-12);
        // World X rotation seen from a base turned 90 degrees about Z is a rotation about -Y
        let expected = UnitQuaternion::from_axis_angle(&-Vector3::y_axis(), 0.3);
        assert!(delta.orientation().angle_to(&expected) < 1e-12);
    }

    #[test]
    fn test_redirect_factor_monotonic_and_clamped() {
        assert_eq!(redirect_blend_factor(0.0, 1.0), 0.0);
        assert!((redirect_blend_factor(PI, 1.0) - 0.5).abs() < 1e-12);
        assert_eq!(redirect_blend_factor(2.0 * PI, 1.0), 1.0);
        assert_eq!(redirect_blend_factor(5.0 * PI, 1.0), 1.0);
        let mut last = 0.0;
        for i in 0..=100 {
            let f = redirect_blend_factor(i as f64 * 0.1, 1.0);
            assert!(f >= last);
            last = f;
        }
    }

    #[test]
    fn test_redirected_without_rotation_does_not_blend() {
        let input = motion(
            still(),
            (Vector3::new(0.1, 0.0, 0.0), UnitQuaternion::identity()),
            1.0,
            UnitQuaternion::identity(),
        );
        let start = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.9);
        let mut goal = GoalPose {
            position: Vector3::zeros(),
            orientation: start,
        };
        integrate(ControlModeKind::Redirected, true, &input, &ModeParameters::default(), &Vector3::zeros(), &mut goal);
        assert!(goal.orientation.angle_to(&start) < 1e-12);
    }

    #[test]
    fn test_clutch_factor_clamped() {
        assert_eq!(clutch_blend_factor(0.016, 0.0), 0.0);
        assert_eq!(clutch_blend_factor(3.0, 1.0), 1.0);
        assert_eq!(clutch_blend_factor(-1.0, 1.0), 0.0);
        assert_eq!(clutch_blend_factor(f64::NAN, 1.0), 0.0);
    }

    #[test]
    fn test_slerp_opposite_rotations_stays_finite() {
        let from = UnitQuaternion::identity();
        let to = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI);
        let q = slerp_or_hold(&from, &to, 0.5);
        assert!(is_finite(&q));
        assert!((q.angle() - FRAC_PI_2).abs() < 1e-9);

        let same = slerp_or_hold(&to, &to, 0.5);
        assert!(same.angle_to(&to) < 1e-12);
    }

    #[test]
    fn test_nan_sample_keeps_goal() {
        let input = motion(
            still(),
            (Vector3::new(f64::NAN, 0.0, 0.0), UnitQuaternion::identity()),
            0.01,
            UnitQuaternion::identity(),
        );
        let mut goal = GoalPose::identity();
        assert!(!integrate(ControlModeKind::Clutch, true, &input, &ModeParameters::default(), &Vector3::zeros(), &mut goal));
        assert_eq!(goal, GoalPose::identity());
    }

    #[test]
    fn test_orientation_stays_unit_length() {
        let step = UnitQuaternion::from_axis_angle(&Unit::new_normalize(Vector3::new(1.0, 2.0, 3.0)), 0.013);
        let mut goal = GoalPose::identity();
        let mut previous = UnitQuaternion::identity();
        for tick in 0..5000 {
            let current = step * previous;
            let input = MotionInput {
                current: sample(Vector3::zeros(), current, tick + 1),
                previous: sample(Vector3::zeros(), previous, tick),
                elapsed: 0.0,
                base_orientation: UnitQuaternion::identity(),
            };
            integrate(ControlModeKind::Drag, true, &input, &ModeParameters::default(), &Vector3::zeros(), &mut goal);
            previous = current;
        }
        assert!((goal.orientation.quaternion().norm() - 1.0).abs() < 1e-12);
    }
}
