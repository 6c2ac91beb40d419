//! Poses, reference frames and the goal pose that the control modes write.

extern crate nalgebra as na;

use na::{Isometry3, Translation3, UnitQuaternion, Vector3};

/// Pose is used for the controller, the end-effector and the goal. It contains both Cartesian
/// position and rotation quaternion
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(0.0, 1.2, -0.3);
/// // The quaternion should be normalized to represent a valid rotation.
/// let rotation = UnitQuaternion::from_quaternion(na::Quaternion::new(1.0, 0.0, 1.0, 0.0).normalize());
/// let controller = Pose::from_parts(translation, rotation);
/// ```
pub type Pose = Isometry3<f64>;

/// The frame a pose is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceFrame {
    /// Scene coordinates, as reported by the tracking system.
    World,
    /// Axes of the robot root link.
    RobotBase,
    /// Robot base axes with the origin at the initial end-effector position (the anchor).
    EndEffectorRelative,
}

/// Pose tagged with the frame it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramedPose {
    pub pose: Pose,
    pub frame: ReferenceFrame,
}

impl FramedPose {
    pub fn new(pose: Pose, frame: ReferenceFrame) -> Self {
        FramedPose { pose, frame }
    }

    pub fn world(pose: Pose) -> Self {
        FramedPose::new(pose, ReferenceFrame::World)
    }

    pub fn identity(frame: ReferenceFrame) -> Self {
        FramedPose::new(Pose::identity(), frame)
    }

    pub fn position(&self) -> Vector3<f64> {
        self.pose.translation.vector
    }

    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.pose.rotation
    }

    /// Rescale the orientation back to unit length after repeated composition.
    pub fn renormalize(&mut self) {
        self.pose.rotation.renormalize();
    }
}

/// World-frame controller pose observed at the given tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub pose: Pose,
    /// Index of the host frame this sample was taken in.
    pub tick: u64,
    /// Host timestamp in seconds.
    pub time: f64,
}

impl PoseSample {
    pub fn new(pose: Pose, tick: u64, time: f64) -> Self {
        PoseSample { pose, tick, time }
    }

    /// Sample from position and orientation.
    pub fn at(position: Vector3<f64>, orientation: UnitQuaternion<f64>, tick: u64, time: f64) -> Self {
        PoseSample::new(Pose::from_parts(Translation3::from(position), orientation), tick, time)
    }

    pub fn position(&self) -> Vector3<f64> {
        self.pose.translation.vector
    }

    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.pose.rotation
    }

    /// False if any component is NaN or infinite (lost tracking).
    pub fn is_finite(&self) -> bool {
        let q = self.pose.rotation.quaternion();
        self.pose.translation.vector.iter().all(|v| v.is_finite())
            && q.coords.iter().all(|v| v.is_finite())
    }
}

/// The single mutable target of the control modes. Position and orientation are expressed in
/// robot base axes, relative to the anchor (initial end-effector position), see
/// [`ReferenceFrame::EndEffectorRelative`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalPose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Default for GoalPose {
    fn default() -> Self {
        GoalPose::identity()
    }
}

impl GoalPose {
    pub fn identity() -> Self {
        GoalPose {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }

    pub fn framed(&self) -> FramedPose {
        FramedPose::new(
            Pose::from_parts(Translation3::from(self.position), self.orientation),
            ReferenceFrame::EndEffectorRelative,
        )
    }

    /// World pose of the goal, given the anchor position and the robot base orientation.
    pub fn to_world(&self, anchor: &Vector3<f64>, base_orientation: &UnitQuaternion<f64>) -> FramedPose {
        let position = anchor + base_orientation * self.position;
        let orientation = base_orientation * self.orientation;
        FramedPose::world(Pose::from_parts(Translation3::from(position), orientation))
    }

    pub(crate) fn renormalize(&mut self) {
        self.orientation.renormalize();
    }
}
