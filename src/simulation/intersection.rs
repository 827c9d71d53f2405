//! Intersection records for the traffic simulation
//!
//! Plain and signaled intersections share one record type; the signal
//! state lives in the variant tag.

use super::signal::TrafficSignal;
use super::types::{IntersectionId, Position, RoadId};

/// Whether an intersection is gated by a traffic signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntersectionKind {
    Plain,
    Signaled(TrafficSignal),
}

/// An intersection in the traffic simulation
#[derive(Debug, Clone)]
pub struct SimIntersection {
    pub id: IntersectionId,
    pub position: Position,
    pub name: String,
    pub kind: IntersectionKind,
    /// Incident roads in connection order. At a signaled intersection
    /// this order defines the approach slots.
    roads: Vec<RoadId>,
}

impl SimIntersection {
    pub fn new(
        id: IntersectionId,
        position: Position,
        name: String,
        kind: IntersectionKind,
    ) -> Self {
        Self {
            id,
            position,
            name,
            kind,
            roads: Vec::new(),
        }
    }

    pub(super) fn attach_road(&mut self, road: RoadId) {
        self.roads.push(road);
    }

    pub fn roads(&self) -> &[RoadId] {
        &self.roads
    }

    pub fn is_signaled(&self) -> bool {
        matches!(self.kind, IntersectionKind::Signaled(_))
    }

    pub fn signal(&self) -> Option<&TrafficSignal> {
        match &self.kind {
            IntersectionKind::Signaled(signal) => Some(signal),
            IntersectionKind::Plain => None,
        }
    }

    pub fn signal_mut(&mut self) -> Option<&mut TrafficSignal> {
        match &mut self.kind {
            IntersectionKind::Signaled(signal) => Some(signal),
            IntersectionKind::Plain => None,
        }
    }

    /// The approach slot a road occupies at this intersection.
    /// Roads beyond the slot count wrap around modulo the approach count.
    pub fn approach_slot(&self, road: RoadId) -> Option<usize> {
        let signal = self.signal()?;
        self.roads
            .iter()
            .position(|r| *r == road)
            .map(|position| position % signal.approach_count())
    }

    /// Whether traffic on `road` may currently enter toward this intersection.
    /// Plain intersections never block.
    pub fn is_open_for(&self, road: RoadId) -> bool {
        match &self.kind {
            IntersectionKind::Plain => true,
            IntersectionKind::Signaled(signal) => self
                .approach_slot(road)
                .is_some_and(|slot| signal.is_green(slot)),
        }
    }
}
