//! Core algorithms: mapping, localization, planning, obstacle avoidance.

pub mod avoidance;
pub mod localization;
pub mod mapping;
pub mod planning;
