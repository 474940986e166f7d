//! Navigation goals.

use serde::{Deserialize, Serialize};

use crate::core::math::angle_diff;
use crate::core::types::Pose2D;

/// Acceptance tolerances for a goal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GoalTolerance {
    /// Position tolerance in meters.
    pub position: f32,
    /// Orientation tolerance in radians.
    pub orientation: f32,
}

impl Default for GoalTolerance {
    fn default() -> Self {
        Self {
            position: 0.10,
            orientation: 0.10,
        }
    }
}

/// A target pose with acceptance tolerances.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NavigationGoal {
    /// Target pose in the planar frame.
    pub pose: Pose2D,
    /// Acceptance tolerances.
    pub tolerance: GoalTolerance,
}

impl NavigationGoal {
    /// Goal with default tolerances.
    pub fn new(pose: Pose2D) -> Self {
        Self {
            pose,
            tolerance: GoalTolerance::default(),
        }
    }

    /// Goal with explicit tolerances.
    pub fn with_tolerance(pose: Pose2D, tolerance: GoalTolerance) -> Self {
        Self { pose, tolerance }
    }

    /// Whether `pose` satisfies both tolerances.
    pub fn is_reached(&self, pose: &Pose2D) -> bool {
        pose.distance_to(&self.pose.position()) < self.tolerance.position
            && angle_diff(pose.theta, self.pose.theta).abs() < self.tolerance.orientation
    }
}
