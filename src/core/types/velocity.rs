//! Velocity command emitted by the navigation controller.

use serde::{Deserialize, Serialize};

/// Velocity command for the robot base.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityCommand {
    /// Linear velocity in m/s (forward only, never negative).
    pub linear: f32,
    /// Angular velocity in rad/s (positive = counter-clockwise).
    pub angular: f32,
}

impl VelocityCommand {
    /// Create a new velocity command.
    #[inline]
    pub fn new(linear: f32, angular: f32) -> Self {
        Self { linear, angular }
    }

    /// Zero velocity (stop).
    #[inline]
    pub fn stop() -> Self {
        Self::default()
    }

    /// Check whether this command is effectively a stop.
    #[inline]
    pub fn is_stop(&self) -> bool {
        self.linear.abs() < 1e-3 && self.angular.abs() < 1e-3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop() {
        let cmd = VelocityCommand::stop();
        assert_eq!(cmd.linear, 0.0);
        assert_eq!(cmd.angular, 0.0);
        assert!(cmd.is_stop());
    }

    #[test]
    fn test_is_stop_threshold() {
        assert!(!VelocityCommand::new(0.1, 0.0).is_stop());
        assert!(!VelocityCommand::new(0.0, -0.5).is_stop());
    }
}
