//! Tuning constants for a simulation run.

use super::types::{
    CONGESTION_FACTOR, DEFAULT_ROAD_WIDTH, DEFAULT_SPEED, DENSITY_FACTOR, SATURATION_MULTIPLIER,
    SIGNAL_INTERVAL_TICKS, SNAP_DISTANCE,
};

/// Simulation parameters. `Default` gives the reference behaviour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Capacity per unit of road area: `capacity = floor(width * length * density_factor)`
    pub density_factor: f64,
    /// Scale of the congestion penalty added to every road's length
    pub congestion_factor: f64,
    /// Multiplier applied to `congestion_factor` on saturated roads
    pub saturation_multiplier: f64,
    /// Remaining distance at which a moving agent snaps to its target
    pub snap_distance: f64,
    /// Ticks between signal rotations
    pub signal_interval_ticks: u64,
    pub default_road_width: f64,
    pub default_speed: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            density_factor: DENSITY_FACTOR,
            congestion_factor: CONGESTION_FACTOR,
            saturation_multiplier: SATURATION_MULTIPLIER,
            snap_distance: SNAP_DISTANCE,
            signal_interval_ticks: SIGNAL_INTERVAL_TICKS,
            default_road_width: DEFAULT_ROAD_WIDTH,
            default_speed: DEFAULT_SPEED,
        }
    }
}
