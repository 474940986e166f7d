//! Configuration loading for MargaNav.
//!
//! Every component keeps its own config struct next to its
//! implementation; [`MargaConfig`] aggregates them and loads overrides
//! from a TOML file. Missing fields fall back to the component defaults.

use std::path::Path;

use serde::Deserialize;

use crate::algorithms::avoidance::VfhConfig;
use crate::algorithms::localization::ParticleFilterConfig;
use crate::algorithms::mapping::OccupancyGridConfig;
use crate::algorithms::planning::RrtConfig;
use crate::error::Result;
use crate::navigation::ControllerConfig;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MargaConfig {
    /// Occupancy grid parameters.
    pub grid: OccupancyGridConfig,

    /// Particle filter parameters.
    pub filter: ParticleFilterConfig,

    /// RRT planner parameters.
    pub planner: RrtConfig,

    /// VFH avoidance parameters.
    pub vfh: VfhConfig,

    /// Controller gains and distances.
    pub controller: ControllerConfig,
}

impl MargaConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
