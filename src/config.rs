//! Control mode configuration, optionally read from YAML.
//!
//! A session file names the control mode and, optionally, the grasping scheme:
//! ```yaml
//! control:
//!   kind: clutch              # clutch, drag, pure-offset or redirected
//!   activation: grip-hold     # grip/trigger - hold/toggle/auto (auto is Drag only)
//!   slerp_rate: 1.0
//!   activation_radius: 0.1    # Drag only
//!   correction: [deg(-60), deg(90), 0.0]   # radians unless deg()
//!   offset: [0.0, 0.0, 0.0, 1.0]   # x, y, z, w
//! grasping:
//!   activation: trigger-toggle     # ab-hold, trigger-hold or trigger-toggle
//! ```
//! Everything except `kind` is optional.

use std::f64::consts::PI;
#[cfg(feature = "allow_filesystem")]
use std::path::Path;

use nalgebra::{Quaternion, UnitQuaternion};
use serde::Deserialize;
#[cfg(feature = "allow_filesystem")]
use serde_saphyr::Options;

use crate::control_error::ControlError;
use crate::integrator::{euler_xyz, ControlModeKind, ModeParameters};

fn default_activation_radius() -> f64 { 0.1 }
fn default_correction_angles() -> [f64; 3] { [-PI / 3.0, PI / 2.0, 0.0] }
fn default_offset() -> [f64; 4] { [0.0, 0.0, 0.0, 1.0] }
fn default_slerp_rate() -> f64 { 1.0 }
fn default_true() -> bool { true }
fn default_grasp_activation() -> String { "ab-hold".to_string() }

/// Describes one control mode. Immutable once loaded; switching schemes loads a new one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlModeConfig {
    pub kind: ControlModeKind,

    /// Activation policy string, like `grip-toggle`. Defaults per kind.
    #[serde(default)]
    pub activation: Option<String>,

    /// Reach (meters) around the end-effector where Drag control can engage.
    #[serde(default = "default_activation_radius")]
    pub activation_radius: f64,

    /// Fixed controller to gripper correction, intrinsic XYZ Euler angles in radians.
    #[serde(default = "default_correction_angles")]
    pub correction: [f64; 3],

    /// Operator offset quaternion in [x, y, z, w] ordering. Normalized on load.
    #[serde(default = "default_offset")]
    pub offset: [f64; 4],

    /// Orientation blend rate.
    #[serde(default = "default_slerp_rate")]
    pub slerp_rate: f64,

    /// Report the hazard level while engaged.
    #[serde(default = "default_true")]
    pub show_offset_indicator: bool,
}

impl ControlModeConfig {
    pub fn new(kind: ControlModeKind) -> Self {
        ControlModeConfig {
            kind,
            activation: None,
            activation_radius: default_activation_radius(),
            correction: default_correction_angles(),
            offset: default_offset(),
            slerp_rate: default_slerp_rate(),
            show_offset_indicator: true,
        }
    }

    pub fn with_activation(mut self, activation: &str) -> Self {
        self.activation = Some(activation.to_string());
        self
    }

    pub fn with_offset(mut self, offset: UnitQuaternion<f64>) -> Self {
        let q = offset.quaternion();
        self.offset = [q.i, q.j, q.k, q.w];
        self
    }

    pub fn with_slerp_rate(mut self, slerp_rate: f64) -> Self {
        self.slerp_rate = slerp_rate;
        self
    }

    pub fn with_activation_radius(mut self, radius: f64) -> Self {
        self.activation_radius = radius;
        self
    }

    /// Activation policy string in effect.
    pub fn activation(&self) -> &str {
        self.activation.as_deref().unwrap_or(self.kind.default_policy())
    }

    /// Validate and resolve the orientation shaping.
    pub fn parameters(&self) -> Result<ModeParameters, ControlError> {
        for (i, &angle) in self.correction.iter().enumerate() {
            if !angle.is_finite() {
                return Err(ControlError::InvalidParameter(format!(
                    "correction[{}] must be finite (got {})", i, angle
                )));
            }
        }
        let [x, y, z, w] = self.offset;
        let offset = Quaternion::new(w, x, y, z);
        let norm = offset.norm();
        if !norm.is_finite() || norm < 1e-9 {
            return Err(ControlError::InvalidParameter(format!(
                "offset {:?} cannot be normalized", self.offset
            )));
        }
        if !self.slerp_rate.is_finite() || self.slerp_rate < 0.0 {
            return Err(ControlError::InvalidParameter(format!(
                "slerp_rate must be finite and non-negative (got {})", self.slerp_rate
            )));
        }
        if !self.activation_radius.is_finite() || self.activation_radius <= 0.0 {
            return Err(ControlError::InvalidParameter(format!(
                "activation_radius must be positive (got {})", self.activation_radius
            )));
        }

        let [rx, ry, rz] = self.correction;
        Ok(ModeParameters {
            correction: euler_xyz(rx, ry, rz),
            offset: UnitQuaternion::from_quaternion(offset),
            slerp_rate: self.slerp_rate,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraspingConfig {
    #[serde(default = "default_grasp_activation")]
    pub activation: String,
}

impl Default for GraspingConfig {
    fn default() -> Self {
        GraspingConfig {
            activation: default_grasp_activation(),
        }
    }
}

/// Everything loaded together: one control mode and, optionally, grasping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    pub control: ControlModeConfig,
    #[serde(default)]
    pub grasping: Option<GraspingConfig>,
}

#[cfg(feature = "allow_filesystem")]
impl SessionConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ControlError> {
        let config: SessionConfig = serde_saphyr::from_str_with_options(
            contents,
            Options { angle_conversions: true, ..Default::default() }
        ).map_err(|e| ControlError::ParseError(format!("{}", e)))?;
        // Surface bad numbers at read time rather than at load.
        config.control.parameters()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ControlError> {
        let contents = std::fs::read_to_string(path)?;
        SessionConfig::from_yaml_str(&contents)
    }
}
