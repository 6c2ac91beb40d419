//! Goal pose teleoperation of a robot arm from a tracked hand controller.
//!
//! The host (a simulation or a robot driver) reports, once per frame, the controller pose and its
//! pressed buttons. This crate decides whether the operator is currently steering the robot and,
//! while they are, turns controller motion into motion of a goal pose for the end-effector. The
//! goal pose is then handed to an inverse kinematics solver the host provides.
//!
//! # Features
//!
//! - Four control modes: clutched offset, drag, pure offset and redirected control. They differ in
//!   how controller motion maps to goal motion, see [`integrator`].
//! - Activation by holding or toggling the grip or the trigger. Drag control can also engage
//!   automatically when the controller reaches the gripper.
//! - Controller motion is always expressed in the robot base frame, so a rotated robot responds
//!   to the operator as expected.
//! - Hazard classification of the gap between the goal and the actual end-effector, with an
//!   indicator colour for the host to render.
//! - Gripper control from the same controller.
//! - Session configuration from YAML (feature `allow_filesystem`, on by default).
//!
//! # Usage
//!
//! Create a [`teleop::Teleoperation`], load a control mode into it and call
//! [`teleop::Teleoperation::update`] every frame. See the `teleop-demo` binary for a complete loop
//! with a stand-in solver.

pub mod pose;
pub mod control_error;

pub mod buttons;
pub mod dispatch;

pub mod activation;
pub mod engagement;
pub mod control_mode;

pub mod integrator;
pub mod hazard;

pub mod grasping;
pub mod solver;

pub mod config;
pub mod teleop;

#[path = "utils/utils.rs"]
pub mod utils;

#[cfg(test)]
#[cfg(feature = "allow_filesystem")]
mod tests;
