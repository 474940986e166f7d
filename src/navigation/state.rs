//! Navigation state record.
//!
//! [`NavigationState`] is the externally visible snapshot of the
//! controller: pose estimate, active goal, remaining path, status and the
//! last surfaced error. It is created with the controller and mutated only
//! by it.

use serde::{Deserialize, Serialize};

use crate::core::types::Pose2D;

use super::{NavPath, NavigationGoal};

/// Navigation execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NavStatus {
    /// No active goal.
    #[default]
    Idle,

    /// Planning a path to the current goal.
    Planning,

    /// Following the planned path.
    Moving,

    /// Map change invalidated the path and replanning failed.
    Blocked,

    /// Goal reached within tolerances.
    GoalReached,

    /// Planning failed; see `last_error`.
    Failed,
}

impl NavStatus {
    /// Stable string form for logs and state readouts.
    pub fn as_str(&self) -> &'static str {
        match self {
            NavStatus::Idle => "IDLE",
            NavStatus::Planning => "PLANNING",
            NavStatus::Moving => "MOVING",
            NavStatus::Blocked => "BLOCKED",
            NavStatus::GoalReached => "GOAL_REACHED",
            NavStatus::Failed => "FAILED",
        }
    }
}

/// Snapshot of the controller's navigation state.
#[derive(Debug, Clone, Default)]
pub struct NavigationState {
    /// Current pose estimate from the localizer.
    pub current_pose: Pose2D,

    /// Whether a path is actively being followed.
    pub is_navigating: bool,

    /// The active goal, if any.
    pub current_goal: Option<NavigationGoal>,

    /// Remaining planned path, if any.
    pub path: Option<NavPath>,

    /// Execution status.
    pub status: NavStatus,

    /// Last surfaced error message, if any.
    pub last_error: Option<String>,
}

impl NavigationState {
    /// Fresh idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface a planning failure.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = NavStatus::Failed;
        self.last_error = Some(message.into());
        self.is_navigating = false;
        self.path = None;
    }

    /// Surface a blocked path (replanning failed after a map change).
    pub fn block(&mut self, message: impl Into<String>) {
        self.status = NavStatus::Blocked;
        self.last_error = Some(message.into());
        self.is_navigating = false;
        self.path = None;
    }

    /// Mark the goal as reached.
    pub fn reach_goal(&mut self) {
        self.status = NavStatus::GoalReached;
        self.is_navigating = false;
        self.path = None;
    }
}
