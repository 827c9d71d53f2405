//! Core types for the traffic simulation
//!
//! Ids, positions and vehicle categories shared by every component.

use log::warn;
use std::fmt;

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for intersection IDs (index into the network's intersection arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntersectionId(pub SimId);

/// A wrapper type for road IDs (index into the network's road arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoadId(pub SimId);

/// A wrapper type for agent IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub SimId);

/// A wrapper type for driver IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverId(pub SimId);

/// A wrapper type for ride request IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RideId(pub SimId);

impl IntersectionId {
    pub fn index(self) -> usize {
        self.0 .0
    }
}

impl RoadId {
    pub fn index(self) -> usize {
        self.0 .0
    }
}

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0 .0)
    }
}

impl fmt::Display for RoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0 .0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0 .0)
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0 .0)
    }
}

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ride{}", self.0 .0)
    }
}

/// A 2D position in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Move up to `step` units toward `target` along the straight line.
    /// Never overshoots the target.
    pub fn step_toward(&self, target: &Position, step: f64) -> Position {
        let distance = self.distance(target);
        if distance <= step || distance == 0.0 {
            return *target;
        }
        Position {
            x: self.x + (target.x - self.x) / distance * step,
            y: self.y + (target.y - self.y) / distance * step,
        }
    }
}

/// Category of vehicle. Only affects the cosmetic vehicle length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VehicleCategory {
    Car,
    Truck,
    Bus,
    Bike,
    Rickshaw,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 5] = [
        VehicleCategory::Car,
        VehicleCategory::Truck,
        VehicleCategory::Bus,
        VehicleCategory::Bike,
        VehicleCategory::Rickshaw,
    ];

    /// Average vehicle length in metres
    pub fn length(self) -> f64 {
        match self {
            VehicleCategory::Car => 4.5,
            VehicleCategory::Truck => 12.0,
            VehicleCategory::Bus => 10.5,
            VehicleCategory::Bike => 2.0,
            VehicleCategory::Rickshaw => 1.8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VehicleCategory::Car => "Car",
            VehicleCategory::Truck => "Truck",
            VehicleCategory::Bus => "Bus",
            VehicleCategory::Bike => "Bike",
            VehicleCategory::Rickshaw => "Rickshaw",
        }
    }

    /// Parse a category by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Like [`from_name`](Self::from_name) but unknown names become `Car`
    pub fn from_name_or_car(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            warn!("Unknown vehicle type: {name}. Treating it as a Car");
            VehicleCategory::Car
        })
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Road capacity per unit of road area
pub const DENSITY_FACTOR: f64 = 0.123;

/// Base cost added per road, scaled by congestion
pub const CONGESTION_FACTOR: f64 = 100.0;

/// Penalty multiplier applied once a road reaches capacity
pub const SATURATION_MULTIPLIER: f64 = 1000.0;

/// Distance at which a moving agent snaps onto its target intersection
pub const SNAP_DISTANCE: f64 = 5.0;

/// Ticks between traffic signal rotations
pub const SIGNAL_INTERVAL_TICKS: u64 = 100;

/// Road width used by the demo city
pub const DEFAULT_ROAD_WIDTH: f64 = 3.2;

/// Agent speed in distance units per tick
pub const DEFAULT_SPEED: f64 = 0.7;

/// Highest rating a rider may submit
pub const MAX_RATING: f64 = 5.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_toward_does_not_overshoot() {
        let from = Position::new(0.0, 0.0);
        let to = Position::new(3.0, 4.0);

        let halfway = from.step_toward(&to, 2.5);
        assert!((halfway.x - 1.5).abs() < 1e-9);
        assert!((halfway.y - 2.0).abs() < 1e-9);

        assert_eq!(from.step_toward(&to, 10.0), to);
    }

    #[test]
    fn category_names_round_trip_case_insensitively() {
        assert_eq!(VehicleCategory::from_name("truck"), Some(VehicleCategory::Truck));
        assert_eq!(VehicleCategory::from_name(" Rickshaw "), Some(VehicleCategory::Rickshaw));
        assert_eq!(VehicleCategory::from_name("hovercraft"), None);
        assert_eq!(VehicleCategory::from_name_or_car("hovercraft"), VehicleCategory::Car);
        assert_eq!(VehicleCategory::Bus.length(), 10.5);
    }
}
