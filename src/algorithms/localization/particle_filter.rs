//! Particle filter (Monte Carlo localization).
//!
//! Tracks the robot pose as a cloud of weighted samples. Odometry deltas
//! drive the prediction step with uniform motion noise; range readings
//! weight particles by how well the measured distances match the distance
//! from the particle to the reported hit points. Weights degrade particles
//! by `exp(-Σ err²/2σ²)`; resampling is low-variance and keeps the
//! particle count constant.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::core::types::{Point2D, Pose2D};
use crate::sensors::SensorReading;

/// A single particle representing a possible robot pose.
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    /// Hypothesized robot pose.
    pub pose: Pose2D,
    /// Normalized importance weight.
    pub weight: f64,
}

/// Configuration for the particle filter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParticleFilterConfig {
    /// Number of particles. Constant across resampling.
    pub num_particles: usize,

    /// Motion noise scale on (x, y, theta). Noise is uniform in
    /// [-0.5, 0.5] times the scale, per prediction step.
    pub motion_noise: [f32; 3],

    /// Measurement noise sigma in meters.
    pub measurement_sigma: f32,

    /// Effective particle ratio below which resampling triggers.
    /// Typical: 0.5
    pub resample_threshold: f64,

    /// Initial position spread in meters (uniform over ±spread/2).
    pub initial_spread: f32,

    /// Initial heading spread in radians (uniform over ±spread).
    pub initial_theta_spread: f32,

    /// Random seed for deterministic behavior (0 = entropy seed).
    pub seed: u64,
}

impl Default for ParticleFilterConfig {
    fn default() -> Self {
        Self {
            num_particles: 100,
            motion_noise: [0.05, 0.05, 0.1],
            measurement_sigma: 0.1,
            resample_threshold: 0.5,
            initial_spread: 0.5,
            initial_theta_spread: 0.05 * std::f32::consts::PI,
            seed: 0,
        }
    }
}

/// Filter diagnostics, refreshed by every update.
#[derive(Debug, Clone, Default)]
pub struct ParticleFilterState {
    /// Effective number of particles after the last update.
    pub neff: f64,
    /// Whether the last update resampled.
    pub resampled: bool,
    /// Largest normalized weight after the last update.
    pub max_weight: f64,
    /// Number of update calls so far.
    pub iterations: u64,
}

/// Monte Carlo localization filter.
#[derive(Debug)]
pub struct ParticleFilter {
    config: ParticleFilterConfig,
    particles: Vec<Particle>,
    rng: StdRng,
    state: ParticleFilterState,
}

impl ParticleFilter {
    /// Create a filter initialized around the given pose with the
    /// configured spread.
    pub fn new(config: ParticleFilterConfig, initial_pose: Pose2D) -> Self {
        let seed = if config.seed == 0 {
            rand::rng().random()
        } else {
            config.seed
        };

        let spread = config.initial_spread;
        let mut filter = Self {
            config,
            particles: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            state: ParticleFilterState::default(),
        };
        filter.initialize(initial_pose, spread);
        filter
    }

    /// Re-seed the particle cloud around a pose.
    ///
    /// Positions are uniform over ±`spread`/2 on each axis, headings
    /// uniform over ± the configured theta spread. Weights reset to 1/N.
    pub fn initialize(&mut self, pose: Pose2D, spread: f32) {
        let n = self.config.num_particles;
        let half = spread / 2.0;
        let theta_spread = self.config.initial_theta_spread;
        let weight = 1.0 / n as f64;

        let mut particles = Vec::with_capacity(n);
        for _ in 0..n {
            let x = pose.x + self.rng.random_range(-half..=half);
            let y = pose.y + self.rng.random_range(-half..=half);
            let theta = pose.theta + self.rng.random_range(-theta_spread..=theta_spread);
            particles.push(Particle {
                pose: Pose2D::new(x, y, theta),
                weight,
            });
        }
        self.particles = particles;
        self.state = ParticleFilterState::default();
    }

    /// The configuration.
    pub fn config(&self) -> &ParticleFilterConfig {
        &self.config
    }

    /// Current particles (for diagnostics and visualization).
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Filter diagnostics.
    pub fn state(&self) -> &ParticleFilterState {
        &self.state
    }

    /// Number of particles.
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Prediction step: shift every particle by the odometry delta plus
    /// uniform motion noise. Weights are unchanged.
    pub fn predict(&mut self, delta: Point2D, delta_theta: f32) {
        let [sx, sy, st] = self.config.motion_noise;
        for i in 0..self.particles.len() {
            let nx = self.rng.random_range(-0.5..=0.5) * sx;
            let ny = self.rng.random_range(-0.5..=0.5) * sy;
            let nt = self.rng.random_range(-0.5..=0.5) * st;
            let p = &mut self.particles[i];
            p.pose = Pose2D::new(
                p.pose.x + delta.x + nx,
                p.pose.y + delta.y + ny,
                p.pose.theta + delta_theta + nt,
            );
        }
    }

    /// Update step: weight particles by measurement likelihood, normalize,
    /// and resample when the effective particle count collapses.
    ///
    /// Each reading contributes `err²/2σ²` to a particle's negative
    /// log-likelihood, where `err` is the difference between the particle's
    /// distance to the hit point and the measured range. An empty batch
    /// leaves the filter untouched.
    pub fn update(&mut self, readings: &[SensorReading]) {
        if readings.is_empty() {
            return;
        }

        self.state.iterations += 1;
        self.state.resampled = false;

        let sigma = self.config.measurement_sigma as f64;
        let inv_two_sigma_sq = 1.0 / (2.0 * sigma * sigma);

        let log_likelihoods: Vec<f64> = self
            .particles
            .iter()
            .map(|p| {
                let err_sq_sum: f64 = readings
                    .iter()
                    .map(|r| {
                        let expected = p.pose.distance_to(&r.point) as f64;
                        let err = expected - r.distance as f64;
                        err * err
                    })
                    .sum();
                -err_sq_sum * inv_two_sigma_sq
            })
            .collect();

        // Shift by the max log-likelihood before exponentiating so a tight
        // measurement model cannot underflow every weight at once.
        let max_log = log_likelihoods
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        if max_log.is_finite() {
            for (particle, &log_lik) in self.particles.iter_mut().zip(&log_likelihoods) {
                particle.weight *= (log_lik - max_log).exp();
            }
        }

        let sum: f64 = self.particles.iter().map(|p| p.weight).sum();
        if sum > 1e-300 && sum.is_finite() {
            for p in &mut self.particles {
                p.weight /= sum;
            }
        } else {
            // Numerical degeneracy: fall back to uniform weights.
            log::warn!("particle weights degenerated, resetting to uniform");
            let uniform = 1.0 / self.particles.len() as f64;
            for p in &mut self.particles {
                p.weight = uniform;
            }
        }

        let sum_sq: f64 = self.particles.iter().map(|p| p.weight * p.weight).sum();
        self.state.neff = if sum_sq > 0.0 { 1.0 / sum_sq } else { 0.0 };
        self.state.max_weight = self
            .particles
            .iter()
            .map(|p| p.weight)
            .fold(0.0, f64::max);

        let threshold = self.config.resample_threshold * self.particles.len() as f64;
        if self.state.neff < threshold {
            self.resample();
            self.state.resampled = true;
        }
    }

    /// Low-variance resampling: one uniform draw, then evenly spaced
    /// comb over the cumulative weights. Keeps N constant and resets
    /// weights to 1/N.
    fn resample(&mut self) {
        let n = self.particles.len();

        let mut cumulative = Vec::with_capacity(n);
        let mut sum = 0.0;
        for p in &self.particles {
            sum += p.weight;
            cumulative.push(sum);
        }
        if sum <= 0.0 {
            return;
        }
        for c in &mut cumulative {
            *c /= sum;
        }

        let step = 1.0 / n as f64;
        let mut r = self.rng.random::<f64>() * step;
        let mut idx = 0;
        let weight = step;

        let mut resampled = Vec::with_capacity(n);
        for _ in 0..n {
            while r > cumulative[idx] && idx < n - 1 {
                idx += 1;
            }
            resampled.push(Particle {
                pose: self.particles[idx].pose,
                weight,
            });
            r += step;
        }

        self.particles = resampled;
    }

    /// Weighted mean pose of the particle cloud.
    ///
    /// Heading is the weighted circular mean, canonical in (-π, π].
    pub fn estimated_pose(&self) -> Pose2D {
        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;
        let mut sum_sin = 0.0f64;
        let mut sum_cos = 0.0f64;
        let mut total = 0.0f64;

        for p in &self.particles {
            let w = p.weight;
            sum_x += w * p.pose.x as f64;
            sum_y += w * p.pose.y as f64;
            sum_sin += w * p.pose.theta.sin() as f64;
            sum_cos += w * p.pose.theta.cos() as f64;
            total += w;
        }

        if total > 1e-12 {
            Pose2D::new(
                (sum_x / total) as f32,
                (sum_y / total) as f32,
                (sum_sin.atan2(sum_cos)) as f32,
            )
        } else {
            // Degenerate weights: plain mean of the cloud.
            let n = self.particles.len().max(1) as f32;
            let x = self.particles.iter().map(|p| p.pose.x).sum::<f32>() / n;
            let y = self.particles.iter().map(|p| p.pose.y).sum::<f32>() / n;
            let s = self.particles.iter().map(|p| p.pose.theta.sin()).sum::<f32>() / n;
            let c = self.particles.iter().map(|p| p.pose.theta.cos()).sum::<f32>() / n;
            Pose2D::new(x, y, s.atan2(c))
        }
    }
}
