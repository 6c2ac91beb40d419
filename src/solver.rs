//! Seam to the external inverse kinematics solver.
//!
//! The control core never solves kinematics. The host implements [`GoalSolver`] on top of
//! whatever solver drives the robot, and uses [`solve_goal`] once per tick: the solver is only
//! invoked when the end-effector is not already at the goal.

use anyhow::{ensure, Result};
use tracing::trace;

use crate::pose::{FramedPose, Pose, ReferenceFrame};

/// Position (meters) within which the end-effector counts as being at the goal.
pub const POSITION_TOLERANCE: f64 = 1e-3;

/// Rotation (radians) within which the end-effector counts as being at the goal.
pub const ANGULAR_TOLERANCE: f64 = 1e-3;

pub trait GoalSolver {
    /// Joint values reaching the world-frame goal pose.
    fn solve(&mut self, goal: &Pose) -> Result<Vec<f64>>;

    /// Restart from the initial joint configuration, used on reset.
    fn recover(&mut self) -> Result<()> {
        Ok(())
    }
}

/// False if the end-effector already matches the goal within tolerances.
pub fn needs_solve(end_effector: &Pose, goal: &Pose) -> bool {
    let distance = (end_effector.translation.vector - goal.translation.vector).norm();
    let angle = end_effector.rotation.angle_to(&goal.rotation);
    distance > POSITION_TOLERANCE || angle > ANGULAR_TOLERANCE
}

/// Run the solver for the goal if needed. Both poses must be world-frame poses.
pub fn solve_goal(
    solver: &mut dyn GoalSolver,
    end_effector: &FramedPose,
    goal: &FramedPose,
) -> Result<Option<Vec<f64>>> {
    ensure!(
        end_effector.frame == ReferenceFrame::World && goal.frame == ReferenceFrame::World,
        "solver needs world poses, got {:?} and {:?}",
        end_effector.frame,
        goal.frame
    );
    if !needs_solve(&end_effector.pose, &goal.pose) {
        trace!("end-effector at goal, solve skipped");
        return Ok(None);
    }
    solver.solve(&goal.pose).map(Some)
}
