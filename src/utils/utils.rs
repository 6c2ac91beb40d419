//! Helper functions

use nalgebra::{Isometry3, UnitQuaternion};

use crate::pose::GoalPose;

/// Print position and quaternion of the pose.
pub fn dump_pose(isometry: &Isometry3<f64>) {
    let translation = isometry.translation.vector;
    let rotation: UnitQuaternion<f64> = isometry.rotation;

    println!(
        "x: {:.5}, y: {:.5}, z: {:.5},  quat: {:.5},{:.5},{:.5},{:.5}",
        translation.x, translation.y, translation.z, rotation.i, rotation.j, rotation.k, rotation.w
    );
}

/// Print the goal pose, orientation as roll, pitch, yaw in degrees.
pub fn dump_goal(goal: &GoalPose) {
    let (roll, pitch, yaw) = goal.orientation.euler_angles();
    println!(
        "goal x: {:.4}, y: {:.4}, z: {:.4},  rpy: {:.2}, {:.2}, {:.2}",
        goal.position.x,
        goal.position.y,
        goal.position.z,
        roll.to_degrees(),
        pitch.to_degrees(),
        yaw.to_degrees()
    );
}

/// Compare two goal poses with separate tolerances (meters, radians).
pub fn goals_close(a: &GoalPose, b: &GoalPose, distance_tolerance: f64, angular_tolerance: f64) -> bool {
    let distance = (a.position - b.position).norm();
    let mut angle = a.orientation.angle_to(&b.orientation);
    if angle.is_nan() {
        angle = 0.0;
    }
    distance <= distance_tolerance && angle <= angular_tolerance
}

pub fn assert_goal_eq(ga: &GoalPose, gb: &GoalPose, distance_tolerance: f64, angular_tolerance: f64) -> bool {
    fn bad(ga: &GoalPose, gb: &GoalPose) {
        dump_goal(ga);
        dump_goal(gb);
    }

    if (ga.position - gb.position).norm() > distance_tolerance {
        bad(ga, gb);
        panic!("Goals have too different positions");
    }

    if ga.orientation.angle_to(&gb.orientation) > angular_tolerance {
        bad(ga, gb);
        panic!("Goals have too different angles");
    }
    true
}
