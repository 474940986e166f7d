//! Simulated range sensor for tests and the demo binary.
//!
//! Casts evenly spaced rays against a set of disc obstacles and returns
//! hit readings, standing in for the real ray-cast backend.

use std::f32::consts::TAU;

use crate::core::types::{Point2D, Vector3};

use super::{RangeSensor, SensorError, SensorReading};

/// A circular obstacle in the simulated world.
#[derive(Debug, Clone)]
pub struct Disc {
    /// Center on the navigation plane.
    pub center: Point2D,
    /// Radius in meters.
    pub radius: f32,
    /// Mesh identifier reported in readings.
    pub id: String,
}

impl Disc {
    /// Create a new disc obstacle.
    pub fn new(x: f32, y: f32, radius: f32, id: impl Into<String>) -> Self {
        Self {
            center: Point2D::new(x, y),
            radius,
            id: id.into(),
        }
    }
}

/// Configuration for the simulated lidar.
#[derive(Debug, Clone)]
pub struct SimulatedLidarConfig {
    /// Number of evenly spaced rays per sweep.
    pub num_rays: usize,

    /// Maximum range in meters; rays that hit nothing report a
    /// max-range return with `occupied = false`.
    pub max_range: f32,
}

impl Default for SimulatedLidarConfig {
    fn default() -> Self {
        Self {
            num_rays: 36,
            max_range: 5.0,
        }
    }
}

/// Disc-world lidar simulator.
pub struct SimulatedLidar {
    config: SimulatedLidarConfig,
    obstacles: Vec<Disc>,
}

impl SimulatedLidar {
    /// Create a simulator over the given obstacle set.
    pub fn new(config: SimulatedLidarConfig, obstacles: Vec<Disc>) -> Self {
        Self { config, obstacles }
    }

    /// The obstacle set.
    pub fn obstacles(&self) -> &[Disc] {
        &self.obstacles
    }

    /// First intersection of a ray with a disc, as a distance along the ray.
    ///
    /// `origin` is the ray start, `dir` a unit direction. Returns `None`
    /// when the ray misses or the disc is behind the origin.
    fn ray_disc_distance(origin: &Point2D, dir: (f32, f32), disc: &Disc) -> Option<f32> {
        let ocx = origin.x - disc.center.x;
        let ocy = origin.y - disc.center.y;
        let b = ocx * dir.0 + ocy * dir.1;
        let c = ocx * ocx + ocy * ocy - disc.radius * disc.radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let t = -b - discriminant.sqrt();
        if t > 0.0 { Some(t) } else { None }
    }
}

impl RangeSensor for SimulatedLidar {
    fn update(
        &mut self,
        position: &Vector3,
        rotation: &Vector3,
    ) -> Result<Vec<SensorReading>, SensorError> {
        let origin = position.planar();
        let yaw = rotation.y;
        let n = self.config.num_rays.max(1);

        let mut readings = Vec::with_capacity(n);
        for i in 0..n {
            let angle = yaw + i as f32 * TAU / n as f32;
            let dir = (angle.cos(), angle.sin());

            let mut best: Option<(f32, &Disc)> = None;
            for disc in &self.obstacles {
                if let Some(t) = Self::ray_disc_distance(&origin, dir, disc)
                    && t <= self.config.max_range
                    && best.is_none_or(|(bt, _)| t < bt)
                {
                    best = Some((t, disc));
                }
            }

            let reading = match best {
                Some((t, disc)) => SensorReading {
                    point: Point2D::new(origin.x + t * dir.0, origin.y + t * dir.1),
                    distance: t,
                    occupied: true,
                    mesh_id: disc.id.clone(),
                    normal: None,
                },
                None => {
                    let r = self.config.max_range;
                    SensorReading {
                        point: Point2D::new(origin.x + r * dir.0, origin.y + r * dir.1),
                        distance: r,
                        occupied: false,
                        mesh_id: String::new(),
                        normal: None,
                    }
                }
            };
            readings.push(reading);
        }

        Ok(readings)
    }
}
