//! Sensor boundary.
//!
//! Range sensors are external providers of hit points. The world delivers
//! hit points as [`Vector3`] in its own frame; everything behind this
//! module works on planar [`Point2D`] coordinates. The world→planar
//! conversion (`planar.x = world.x`, `planar.y = world.z`) happens exactly
//! once, at this boundary, via [`SensorReading::from_world_hit`].
//! Downstream code (grid, filter, VFH) never touches `Vector3`.

mod simulated;

pub use simulated::{Disc, SimulatedLidar, SimulatedLidarConfig};

use crate::core::types::{Point2D, Vector3};
use thiserror::Error;

/// Error raised by a sensor backend.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor not initialized: {0}")]
    NotInitialized(String),

    #[error("sensor read failed: {0}")]
    ReadFailed(String),
}

/// One range return from a sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Hit point on the navigation plane.
    pub point: Point2D,
    /// Range from the sensor origin to the hit, in meters.
    pub distance: f32,
    /// Whether the ray hit an obstacle (`false` = max-range return).
    pub occupied: bool,
    /// Identifier of the mesh the ray hit (empty for max-range returns).
    pub mesh_id: String,
    /// Surface normal at the hit, world frame, when the backend provides one.
    pub normal: Option<[f32; 3]>,
}

impl SensorReading {
    /// Build a reading from a world-frame hit point.
    ///
    /// This is the single world→planar conversion point for sensor data.
    pub fn from_world_hit(
        world: Vector3,
        distance: f32,
        occupied: bool,
        mesh_id: impl Into<String>,
    ) -> Self {
        Self {
            point: world.planar(),
            distance,
            occupied,
            mesh_id: mesh_id.into(),
            normal: None,
        }
    }

    /// Attach a surface normal.
    pub fn with_normal(mut self, normal: [f32; 3]) -> Self {
        self.normal = Some(normal);
        self
    }
}

/// A range sensor the navigation controller can poll.
///
/// The sensor set is heterogeneous (different backends behind one list),
/// so the controller holds `Box<dyn RangeSensor>` values.
pub trait RangeSensor {
    /// One-time setup before the first poll.
    fn initialize(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    /// Poll the sensor at the given world pose.
    ///
    /// `position` is the robot position in world frame; `rotation` is the
    /// world Euler rotation, of which only `y` (yaw) is meaningful here.
    /// Returns a batch of readings; an empty batch is a valid answer.
    fn update(
        &mut self,
        position: &Vector3,
        rotation: &Vector3,
    ) -> Result<Vec<SensorReading>, SensorError>;
}
