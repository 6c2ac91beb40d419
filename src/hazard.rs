//! Severity of the gap between where the end-effector is and where the goal wants it.

use nalgebra::Vector3;

/// Below this distance (meters) the gap is safe.
pub const CAUTION_DISTANCE: f64 = 0.1;

/// From this distance (meters) on, the gap is dangerous.
pub const DANGER_DISTANCE: f64 = 0.2;

/// Indicator colour when no mode is engaged.
pub const NEUTRAL_RGB: u32 = 0xffffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HazardLevel {
    Safe,
    Caution,
    Danger,
}

impl HazardLevel {
    /// Classify the distance between the actual end-effector and the goal position.
    pub fn classify(distance: f64) -> HazardLevel {
        if distance < CAUTION_DISTANCE {
            HazardLevel::Safe
        } else if distance < DANGER_DISTANCE {
            HazardLevel::Caution
        } else {
            HazardLevel::Danger
        }
    }

    pub fn between(end_effector: &Vector3<f64>, goal: &Vector3<f64>) -> HazardLevel {
        HazardLevel::classify((end_effector - goal).norm())
    }

    /// Colour of the offset indicator, 0xRRGGBB.
    pub fn indicator_rgb(self) -> u32 {
        match self {
            HazardLevel::Safe => 0x00ff00,
            HazardLevel::Caution => 0xffcc00,
            HazardLevel::Danger => 0xff0000,
        }
    }
}
