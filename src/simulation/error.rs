//! Recoverable error conditions of the simulation core.
//!
//! Invariant violations (negative occupancy, dangling road references) are
//! not represented here: they are bookkeeping bugs and abort via `assert!`.

use super::dispatch::RideStatus;
use super::types::{DriverId, IntersectionId, RideId, VehicleCategory};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// The route search exhausted the network without reaching the goal.
    #[error("no path from {start} to {goal}")]
    NoPath {
        start: IntersectionId,
        goal: IntersectionId,
    },

    /// No available driver matches the requested category.
    #[error("no {category} drivers available now")]
    NoAvailableDriver { category: VehicleCategory },

    /// Ratings must lie in [0, 5].
    #[error("invalid rating {0}: ratings must be between 0 and 5")]
    InvalidRating(f64),

    /// Intersection names must be unique within a construction pass.
    #[error("intersection name {0:?} is already in use")]
    DuplicateName(String),

    #[error("intersection {0} does not exist")]
    UnknownIntersection(IntersectionId),

    /// Random placement needs somewhere to start and somewhere else to go.
    #[error("network has {0} intersections, at least 2 are needed")]
    TooFewIntersections(usize),

    #[error("driver {0} does not exist")]
    UnknownDriver(DriverId),

    #[error("ride {0} does not exist")]
    UnknownRide(RideId),

    /// The ride is not in a state that allows the requested operation.
    #[error("ride {ride} is {status:?}, cannot {action}")]
    InvalidRideTransition {
        ride: RideId,
        status: RideStatus,
        action: &'static str,
    },

    /// Signaled intersections must have 3 or 4 approaches.
    #[error("invalid signal approach count {0}")]
    InvalidSignal(usize),

    #[error("record store: {0}")]
    Record(String),
}

pub type SimResult<T> = Result<T, SimError>;
