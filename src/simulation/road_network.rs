//! Road network graph for pathfinding
//!
//! Intersections and roads live in dense append-only arenas addressed by id.
//! The petgraph graph mirrors the arenas so node index `n` is intersection
//! `n`; each physical road is a single undirected edge carrying its `RoadId`,
//! so both directions of travel share one occupancy counter.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashSet;

use super::error::{SimError, SimResult};
use super::intersection::{IntersectionKind, SimIntersection};
use super::signal::TrafficSignal;
use super::types::{IntersectionId, Position, RoadId, SimId, DENSITY_FACTOR};

/// A physical road between two intersections
#[derive(Debug, Clone)]
pub struct SimRoad {
    pub id: RoadId,
    pub endpoints: (IntersectionId, IntersectionId),
    /// Euclidean distance between the endpoints, fixed at creation
    pub length: f64,
    pub width: f64,
    capacity: u32,
    occupancy: u32,
}

impl SimRoad {
    fn new(
        id: RoadId,
        a: (IntersectionId, &Position),
        b: (IntersectionId, &Position),
        width: f64,
        density_factor: f64,
    ) -> Self {
        let length = a.1.distance(b.1);
        let capacity = (width * length * density_factor).floor().max(0.0) as u32;
        Self {
            id,
            endpoints: (a.0, b.0),
            length,
            width,
            capacity,
            occupancy: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Agents currently traversing this road, in either direction
    pub fn occupancy(&self) -> u32 {
        self.occupancy
    }

    pub fn is_saturated(&self) -> bool {
        self.occupancy >= self.capacity
    }

    pub fn connects(&self, a: IntersectionId, b: IntersectionId) -> bool {
        self.endpoints == (a, b) || self.endpoints == (b, a)
    }

    /// The endpoint opposite `from`, or `None` if `from` is not an endpoint
    pub fn other_end(&self, from: IntersectionId) -> Option<IntersectionId> {
        match self.endpoints {
            (a, b) if a == from => Some(b),
            (a, b) if b == from => Some(a),
            _ => None,
        }
    }
}

/// Standalone road network: topology plus live occupancy.
pub struct SimRoadNetwork {
    /// Undirected graph; node weights are intersection ids, edge weights road ids
    graph: UnGraph<IntersectionId, RoadId>,

    intersections: Vec<SimIntersection>,

    roads: Vec<SimRoad>,

    /// Names used so far in this construction pass
    names: HashSet<String>,

    density_factor: f64,
}

impl Default for SimRoadNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRoadNetwork {
    pub fn new() -> Self {
        Self::with_density_factor(DENSITY_FACTOR)
    }

    pub fn with_density_factor(density_factor: f64) -> Self {
        Self {
            graph: UnGraph::default(),
            intersections: Vec::new(),
            roads: Vec::new(),
            names: HashSet::new(),
            density_factor,
        }
    }

    /// Adds an intersection to the network graph.
    /// Fails if the name was already used by another intersection.
    pub fn add_intersection(
        &mut self,
        position: Position,
        name: impl Into<String>,
        kind: IntersectionKind,
    ) -> SimResult<IntersectionId> {
        let name = name.into();
        if !self.names.insert(name.clone()) {
            return Err(SimError::DuplicateName(name));
        }

        let id = IntersectionId(SimId(self.intersections.len()));
        let node_index = self.graph.add_node(id);
        debug_assert_eq!(node_index.index(), id.index());

        self.intersections
            .push(SimIntersection::new(id, position, name, kind));
        Ok(id)
    }

    /// Adds a signaled intersection with `approaches` slots, slot 0 green
    pub fn add_signaled_intersection(
        &mut self,
        position: Position,
        name: impl Into<String>,
        approaches: usize,
    ) -> SimResult<IntersectionId> {
        let signal = TrafficSignal::new(approaches)?;
        self.add_intersection(position, name, IntersectionKind::Signaled(signal))
    }

    /// Connects two intersections with a road usable in both directions.
    /// Length and capacity are derived from the endpoint coordinates and `width`.
    pub fn connect(
        &mut self,
        a: IntersectionId,
        b: IntersectionId,
        width: f64,
    ) -> SimResult<RoadId> {
        let a_pos = self
            .intersection(a)
            .ok_or(SimError::UnknownIntersection(a))?
            .position;
        let b_pos = self
            .intersection(b)
            .ok_or(SimError::UnknownIntersection(b))?
            .position;

        let id = RoadId(SimId(self.roads.len()));
        let road = SimRoad::new(id, (a, &a_pos), (b, &b_pos), width, self.density_factor);
        self.roads.push(road);
        self.graph
            .add_edge(NodeIndex::new(a.index()), NodeIndex::new(b.index()), id);

        self.intersections[a.index()].attach_road(id);
        if a != b {
            self.intersections[b.index()].attach_road(id);
        }
        Ok(id)
    }

    /// Applies `delta` to a road's occupancy. Both directions of travel see the
    /// change at once since they share the counter.
    ///
    /// # Panics
    /// If the road does not exist or the occupancy would become negative.
    /// Either means enter/exit bookkeeping has gone wrong.
    pub fn adjust_occupancy(&mut self, road_id: RoadId, delta: i32) {
        let road = self
            .roads
            .get_mut(road_id.index())
            .unwrap_or_else(|| panic!("dangling road reference {road_id}"));
        let updated = i64::from(road.occupancy) + i64::from(delta);
        assert!(
            updated >= 0,
            "negative occupancy on {road_id}: {} {delta:+}",
            road.occupancy
        );
        road.occupancy = updated as u32;
    }

    /// Finds the road for travel from `from` toward `to`.
    /// With parallel roads the lowest id wins.
    pub fn find_road(&self, from: IntersectionId, to: IntersectionId) -> Option<RoadId> {
        if from.index() >= self.intersections.len() {
            return None;
        }
        self.graph
            .edges(NodeIndex::new(from.index()))
            .filter(|edge| edge.target().index() == to.index())
            .map(|edge| *edge.weight())
            .min()
    }

    /// Occupancy seen on the directed arc `from -> to`
    pub fn arc_occupancy(&self, from: IntersectionId, to: IntersectionId) -> Option<u32> {
        self.find_road(from, to)
            .and_then(|road| self.road(road))
            .map(SimRoad::occupancy)
    }

    pub fn road(&self, road_id: RoadId) -> Option<&SimRoad> {
        self.roads.get(road_id.index())
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&SimIntersection> {
        self.intersections.get(id.index())
    }

    pub fn intersection_position(&self, id: IntersectionId) -> Option<Position> {
        self.intersection(id).map(|i| i.position)
    }

    pub fn find_intersection_by_name(&self, name: &str) -> Option<IntersectionId> {
        self.intersections
            .iter()
            .find(|i| i.name == name)
            .map(|i| i.id)
    }

    /// Roads leaving an intersection paired with the intersection they lead to
    pub fn connected_roads(&self, id: IntersectionId) -> Vec<(RoadId, IntersectionId)> {
        let Some(intersection) = self.intersection(id) else {
            return Vec::new();
        };
        intersection
            .roads()
            .iter()
            .filter_map(|road_id| {
                let next = self.road(*road_id)?.other_end(id)?;
                Some((*road_id, next))
            })
            .collect()
    }

    pub fn intersections(&self) -> impl Iterator<Item = &SimIntersection> {
        self.intersections.iter()
    }

    pub fn roads(&self) -> impl Iterator<Item = &SimRoad> {
        self.roads.iter()
    }

    pub fn intersection_ids(&self) -> Vec<IntersectionId> {
        self.intersections.iter().map(|i| i.id).collect()
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn intersection_count(&self) -> usize {
        self.intersections.len()
    }

    /// Advance every signaled intersection to its next approach
    pub fn rotate_signals(&mut self) {
        for signal in self
            .intersections
            .iter_mut()
            .filter_map(SimIntersection::signal_mut)
        {
            signal.advance();
        }
    }

    pub(super) fn graph(&self) -> &UnGraph<IntersectionId, RoadId> {
        &self.graph
    }
}
