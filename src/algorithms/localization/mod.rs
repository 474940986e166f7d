//! Monte Carlo localization.

mod particle_filter;

pub use particle_filter::{Particle, ParticleFilter, ParticleFilterConfig, ParticleFilterState};
