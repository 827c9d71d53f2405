//! Ride dispatch: driver bindings, ride requests and driver matching.

use ordered_float::OrderedFloat;

use super::error::{SimError, SimResult};
use super::types::{
    AgentId, DriverId, IntersectionId, Position, RideId, VehicleCategory, MAX_RATING,
};

/// Running mean of submitted ratings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingAverage {
    total: f64,
    count: u32,
}

impl RatingAverage {
    /// Seed from a stored average and the number of ratings behind it
    pub fn from_parts(average: f64, count: u32) -> Self {
        Self {
            total: average * f64::from(count),
            count,
        }
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / f64::from(self.count)
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Fold in a rating. Anything outside [0, 5] (or NaN) is rejected and
    /// the average is left untouched.
    pub fn add(&mut self, rating: f64) -> SimResult<f64> {
        if !(0.0..=MAX_RATING).contains(&rating) {
            return Err(SimError::InvalidRating(rating));
        }
        self.total += rating;
        self.count += 1;
        Ok(self.average())
    }
}

/// A driver bound to the agent that drives for them
#[derive(Debug, Clone)]
pub struct DriverBinding {
    pub id: DriverId,
    /// Key of the driver's record in the record store
    pub record_key: String,
    pub agent: AgentId,
    pub category: VehicleCategory,
    pub available: bool,
    pub rating: RatingAverage,
}

impl DriverBinding {
    pub fn new(
        id: DriverId,
        record_key: impl Into<String>,
        agent: AgentId,
        category: VehicleCategory,
    ) -> Self {
        Self {
            id,
            record_key: record_key.into(),
            agent,
            category,
            available: true,
            rating: RatingAverage::default(),
        }
    }

    /// Close out a trip with the rider's rating and become available again.
    /// An invalid rating changes nothing.
    pub fn complete_trip(&mut self, rating: f64) -> SimResult<f64> {
        let average = self.rating.add(rating)?;
        self.available = true;
        Ok(average)
    }
}

/// Ride lifecycle, driven by the bound driver's availability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideStatus {
    Requested,
    /// Driver accepted and is heading to the pickup
    Accepted(DriverId),
    /// Rider picked up, heading to the destination
    EnRoute(DriverId),
    Completed(DriverId),
}

impl RideStatus {
    pub fn driver(&self) -> Option<DriverId> {
        match *self {
            RideStatus::Requested => None,
            RideStatus::Accepted(driver)
            | RideStatus::EnRoute(driver)
            | RideStatus::Completed(driver) => Some(driver),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RideRequest {
    pub id: RideId,
    pub origin: IntersectionId,
    pub destination: IntersectionId,
    pub category: VehicleCategory,
    pub status: RideStatus,
    pub rating: Option<f64>,
}

impl RideRequest {
    pub fn new(
        id: RideId,
        origin: IntersectionId,
        destination: IntersectionId,
        category: VehicleCategory,
    ) -> Self {
        Self {
            id,
            origin,
            destination,
            category,
            status: RideStatus::Requested,
            rating: None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            RideStatus::Accepted(_) | RideStatus::EnRoute(_)
        )
    }

    pub(super) fn invalid(&self, action: &'static str) -> SimError {
        SimError::InvalidRideTransition {
            ride: self.id,
            status: self.status,
            action,
        }
    }
}

/// What a matcher sees of a driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverCandidate {
    pub driver: DriverId,
    pub category: VehicleCategory,
    pub available: bool,
    /// Current position of the driver's agent
    pub position: Position,
}

/// Strategy for picking a driver for a ride request
pub trait DispatchMatcher {
    fn find_match(
        &self,
        origin: Position,
        candidates: &[DriverCandidate],
        category: VehicleCategory,
    ) -> Option<DriverId>;
}

/// Closest available driver of the requested category by straight-line
/// distance. Equal distances go to the lowest driver id.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestAvailable;

impl DispatchMatcher for NearestAvailable {
    fn find_match(
        &self,
        origin: Position,
        candidates: &[DriverCandidate],
        category: VehicleCategory,
    ) -> Option<DriverId> {
        candidates
            .iter()
            .filter(|candidate| candidate.available && candidate.category == category)
            .min_by_key(|candidate| {
                (
                    OrderedFloat(origin.distance(&candidate.position)),
                    candidate.driver,
                )
            })
            .map(|candidate| candidate.driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::SimId;

    fn candidate(id: usize, x: f64, category: VehicleCategory, available: bool) -> DriverCandidate {
        DriverCandidate {
            driver: DriverId(SimId(id)),
            category,
            available,
            position: Position::new(x, 0.0),
        }
    }

    #[test]
    fn test_nearest_available_matching_category() {
        let candidates = [
            candidate(0, 5.0, VehicleCategory::Car, false),
            candidate(1, 50.0, VehicleCategory::Car, true),
            candidate(2, 8.0, VehicleCategory::Truck, true),
            candidate(3, 20.0, VehicleCategory::Car, true),
        ];
        let matched =
            NearestAvailable.find_match(Position::default(), &candidates, VehicleCategory::Car);
        assert_eq!(matched, Some(DriverId(SimId(3))));
    }

    #[test]
    fn test_no_candidates_after_filtering() {
        let candidates = [
            candidate(0, 5.0, VehicleCategory::Car, false),
            candidate(1, 8.0, VehicleCategory::Truck, true),
        ];
        assert_eq!(
            NearestAvailable.find_match(Position::default(), &candidates, VehicleCategory::Car),
            None
        );
        assert_eq!(
            NearestAvailable.find_match(Position::default(), &[], VehicleCategory::Car),
            None
        );
    }

    #[test]
    fn test_ties_go_to_lowest_driver_id() {
        let candidates = [
            candidate(7, -10.0, VehicleCategory::Bike, true),
            candidate(4, 10.0, VehicleCategory::Bike, true),
        ];
        assert_eq!(
            NearestAvailable.find_match(Position::default(), &candidates, VehicleCategory::Bike),
            Some(DriverId(SimId(4)))
        );
    }

    #[test]
    fn test_rating_average() {
        let mut rating = RatingAverage::default();
        assert_eq!(rating.average(), 0.0);
        rating.add(4.0).unwrap();
        rating.add(5.0).unwrap();
        assert!((rating.average() - 4.5).abs() < 1e-9);
        assert_eq!(rating.count(), 2);

        assert_eq!(rating.add(5.5), Err(SimError::InvalidRating(5.5)));
        assert!(rating.add(f64::NAN).is_err());
        assert!((rating.average() - 4.5).abs() < 1e-9);
        assert_eq!(rating.count(), 2);
    }

    #[test]
    fn test_invalid_rating_keeps_driver_busy() {
        let mut driver = DriverBinding::new(
            DriverId(SimId(0)),
            "driver@example.com",
            AgentId(SimId(1)),
            VehicleCategory::Car,
        );
        driver.available = false;

        assert!(driver.complete_trip(-1.0).is_err());
        assert!(!driver.available);

        assert_eq!(driver.complete_trip(3.0), Ok(3.0));
        assert!(driver.available);
    }

    #[test]
    fn test_rating_from_stored_parts() {
        let mut rating = RatingAverage::from_parts(4.0, 3);
        rating.add(0.0).unwrap();
        assert!((rating.average() - 3.0).abs() < 1e-9);
    }
}
