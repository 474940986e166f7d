//! Planned path representation.
//!
//! A [`NavPath`] is the output of the RRT planner: an ordered sequence of
//! poses from the robot's position to the goal, each waypoint carrying the
//! heading of the segment it starts.

use std::collections::VecDeque;

use crate::core::types::{Point2D, Pose2D};

/// A planned path from robot to goal.
///
/// The first pose matches the planning start position, the last pose the
/// goal position. The controller consumes waypoints from the front as the
/// robot reaches them.
#[derive(Debug, Clone, Default)]
pub struct NavPath {
    poses: VecDeque<Pose2D>,
    total_length: f32,
}

impl NavPath {
    /// Build a path from planar waypoints, assigning per-segment headings.
    ///
    /// Waypoint `i` takes the heading of segment `i → i+1`; the final
    /// waypoint repeats the last segment heading. Degenerate (zero-length)
    /// segments inherit the previous heading.
    pub fn from_waypoints(points: &[Point2D]) -> Self {
        let mut poses = VecDeque::with_capacity(points.len());
        let mut heading = 0.0f32;

        for (i, point) in points.iter().enumerate() {
            if i + 1 < points.len() {
                let next = &points[i + 1];
                if point.distance_squared(next) > 0.0 {
                    heading = point.heading_to(next);
                }
            }
            poses.push_back(Pose2D::new(point.x, point.y, heading));
        }

        let total_length = points
            .windows(2)
            .map(|pair| pair[0].distance(&pair[1]))
            .sum();

        Self {
            poses,
            total_length,
        }
    }

    /// Whether the path has no waypoints left.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Number of waypoints left.
    #[inline]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Next waypoint to drive toward.
    #[inline]
    pub fn front(&self) -> Option<&Pose2D> {
        self.poses.front()
    }

    /// Final waypoint (the goal).
    #[inline]
    pub fn last(&self) -> Option<&Pose2D> {
        self.poses.back()
    }

    /// Remaining waypoints, front first.
    pub fn poses(&self) -> impl Iterator<Item = &Pose2D> {
        self.poses.iter()
    }

    /// Drop the front waypoint (reached).
    pub fn advance(&mut self) -> Option<Pose2D> {
        self.poses.pop_front()
    }

    /// Length of the path as planned, in meters.
    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    /// Length of the not-yet-consumed part of the path.
    pub fn remaining_length(&self) -> f32 {
        self.poses
            .iter()
            .zip(self.poses.iter().skip(1))
            .map(|(a, b)| a.position().distance(&b.position()))
            .sum()
    }
}
