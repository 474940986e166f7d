//! Vector Field Histogram obstacle avoidance.
//!
//! Represents nearby obstacles as a polar density histogram, smooths it
//! circularly, and steers into the low-density valley best aligned with
//! the goal direction while respecting the current heading.

use serde::Deserialize;

use crate::core::math::{angle_diff, canonicalize_angle};
use crate::core::types::Point2D;
use crate::sensors::SensorReading;

/// Circular smoothing kernel applied to the raw density histogram.
const SMOOTHING_KERNEL: [f32; 5] = [0.1, 0.2, 0.4, 0.2, 0.1];

/// Configuration for the VFH direction selector.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VfhConfig {
    /// Number of polar sectors. Typical: 72 (5° each).
    pub num_sectors: usize,

    /// Distance at which an obstacle contributes full density, in meters.
    pub safe_distance: f32,

    /// Readings beyond this range are ignored, in meters.
    pub max_range: f32,

    /// Weight of alignment with the target direction.
    pub target_weight: f32,

    /// Weight of alignment with the current heading.
    pub heading_weight: f32,

    /// Smoothed density below which a sector can be a valley.
    pub valley_threshold: f32,
}

impl Default for VfhConfig {
    fn default() -> Self {
        Self {
            num_sectors: 72,
            safe_distance: 1.0,
            max_range: 5.0,
            target_weight: 0.5,
            heading_weight: 0.3,
            valley_threshold: 0.3,
        }
    }
}

/// Polar-histogram direction selector.
#[derive(Debug)]
pub struct VectorFieldHistogram {
    config: VfhConfig,
}

impl VectorFieldHistogram {
    /// Create a selector.
    pub fn new(config: VfhConfig) -> Self {
        Self { config }
    }

    /// The configuration.
    pub fn config(&self) -> &VfhConfig {
        &self.config
    }

    /// Pick the safest direction toward `target_angle`.
    ///
    /// `current` encodes the current motion direction as a planar vector;
    /// when the histogram offers no valley at all the selector falls back
    /// to that direction. Returns a canonical angle in (-π, π].
    pub fn best_direction(
        &self,
        readings: &[SensorReading],
        target_angle: f32,
        current: Point2D,
    ) -> f32 {
        let current_angle = canonicalize_angle(current.y.atan2(current.x));

        let smoothed = self.smoothed_histogram(readings);
        let valleys = self.find_valleys(&smoothed);

        if valleys.is_empty() {
            return current_angle;
        }

        let mut best = valleys[0];
        let mut best_cost = f32::INFINITY;
        for &valley in &valleys {
            let cost = self.config.target_weight * angle_diff(valley, target_angle).abs()
                + self.config.heading_weight * angle_diff(valley, current_angle).abs();
            if cost < best_cost {
                best_cost = cost;
                best = valley;
            }
        }
        best
    }

    /// Build the density histogram and smooth it circularly.
    fn smoothed_histogram(&self, readings: &[SensorReading]) -> Vec<f32> {
        let n = self.config.num_sectors;
        let sector_size = std::f32::consts::TAU / n as f32;

        let mut histogram = vec![0.0f32; n];
        for reading in readings {
            if reading.distance > self.config.max_range {
                continue;
            }
            let angle = reading.point.y.atan2(reading.point.x);
            let wrapped = angle.rem_euclid(std::f32::consts::TAU);
            let sector = ((wrapped / sector_size) as usize).min(n - 1);
            histogram[sector] += 1.0 - (reading.distance / self.config.safe_distance).min(1.0);
        }

        let half = SMOOTHING_KERNEL.len() / 2;
        let mut smoothed = vec![0.0f32; n];
        for (i, slot) in smoothed.iter_mut().enumerate() {
            for (k, &weight) in SMOOTHING_KERNEL.iter().enumerate() {
                let j = (i + n + k - half) % n;
                *slot += weight * histogram[j];
            }
        }
        smoothed
    }

    /// Sector centers that are local minima below the valley threshold.
    fn find_valleys(&self, smoothed: &[f32]) -> Vec<f32> {
        let n = smoothed.len();
        let sector_size = std::f32::consts::TAU / n as f32;

        let mut valleys = Vec::new();
        for i in 0..n {
            let prev = smoothed[(i + n - 1) % n];
            let next = smoothed[(i + 1) % n];
            let value = smoothed[i];
            if value < self.config.valley_threshold && value <= prev && value <= next {
                valleys.push(canonicalize_angle((i as f32 + 0.5) * sector_size));
            }
        }
        valleys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn reading_at(x: f32, y: f32, distance: f32) -> SensorReading {
        SensorReading {
            point: Point2D::new(x, y),
            distance,
            occupied: true,
            mesh_id: String::new(),
            normal: None,
        }
    }

    fn vfh() -> VectorFieldHistogram {
        VectorFieldHistogram::new(VfhConfig::default())
    }

    #[test]
    fn test_open_space_follows_target() {
        // No obstacles: every sector is a valley, the one nearest the
        // target direction wins (within half a sector width).
        let direction = vfh().best_direction(&[], 0.3, Point2D::new(1.0, 0.0));
        assert!(angle_diff(direction, 0.3).abs() <= 0.05);
    }

    #[test]
    fn test_avoids_obstacle_toward_target() {
        // Dense obstacle straight ahead toward the target.
        let readings: Vec<_> = (0..5)
            .map(|i| reading_at(0.5, -0.02 + 0.01 * i as f32, 0.5))
            .collect();

        let direction = vfh().best_direction(&readings, 0.0, Point2D::new(1.0, 0.0));
        // The selected valley steers off the blocked sector.
        assert!(direction.abs() > 0.03, "direction {} still blocked", direction);
        // But stays broadly goal-aligned rather than reversing.
        assert!(direction.abs() < FRAC_PI_2);
    }

    #[test]
    fn test_far_readings_ignored() {
        let readings = vec![reading_at(6.0, 0.0, 6.0)];
        let direction = vfh().best_direction(&readings, 0.0, Point2D::new(1.0, 0.0));
        assert!(angle_diff(direction, 0.0).abs() <= 0.05);
    }

    #[test]
    fn test_no_valley_falls_back_to_current_heading() {
        // Saturate every sector with close obstacles all around.
        let mut readings = Vec::new();
        for i in 0..360 {
            let angle = i as f32 * PI / 180.0;
            readings.push(reading_at(0.2 * angle.cos(), 0.2 * angle.sin(), 0.05));
        }

        let current = Point2D::new(0.0, 1.0);
        let direction = vfh().best_direction(&readings, 0.0, current);
        assert_relative_eq!(direction, FRAC_PI_2, epsilon = 1e-5);
    }

    #[test]
    fn test_closer_obstacles_weigh_more() {
        let vfh = vfh();
        let near = vfh.smoothed_histogram(&[reading_at(0.2, 0.0, 0.2)]);
        let far = vfh.smoothed_histogram(&[reading_at(0.9, 0.0, 0.9)]);
        assert!(near[0] > far[0]);
    }

    #[test]
    fn test_histogram_wraps_circularly() {
        let vfh = vfh();
        // Obstacle just below the +x axis lands in the last sector; the
        // smoothing kernel must bleed into sector 0 across the wrap.
        let smoothed = vfh.smoothed_histogram(&[reading_at(1.0, -0.01, 0.3)]);
        assert!(smoothed[0] > 0.0);
        assert!(*smoothed.last().unwrap() > 0.0);
    }

    #[test]
    fn test_result_is_canonical() {
        let readings = vec![reading_at(-0.5, 0.05, 0.5)];
        let direction = vfh().best_direction(&readings, PI, Point2D::new(-1.0, 0.0));
        assert!(direction > -PI && direction <= PI + 1e-6);
    }
}
