//! Congestion-aware route search
//!
//! A* over the road network where each road costs its length plus a
//! congestion penalty. The straight-line heuristic stays admissible because
//! the penalty is never negative, so a road always costs at least the
//! distance between its endpoints.

use log::debug;
use ordered_float::OrderedFloat;
use petgraph::algo::astar;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use super::config::SimConfig;
use super::error::{SimError, SimResult};
use super::road_network::{SimRoad, SimRoadNetwork};
use super::types::{IntersectionId, RoadId};

/// An ordered list of roads from a start intersection to a goal
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub roads: Vec<RoadId>,
    /// Sum of road costs (length plus congestion penalty) at search time
    pub cost: f64,
    /// Sum of geometric road lengths
    pub length: f64,
}

impl Route {
    pub fn is_trivial(&self) -> bool {
        self.roads.is_empty()
    }
}

/// Route search parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteFinder {
    congestion_factor: f64,
    saturation_multiplier: f64,
}

impl Default for RouteFinder {
    fn default() -> Self {
        Self::from_config(&SimConfig::default())
    }
}

impl RouteFinder {
    pub fn new(congestion_factor: f64, saturation_multiplier: f64) -> Self {
        Self {
            congestion_factor,
            saturation_multiplier,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.congestion_factor, config.saturation_multiplier)
    }

    /// Penalty for entering a road given its current occupancy.
    ///
    /// Below capacity the penalty grows linearly from `factor` to `2 * factor`;
    /// at or above capacity it jumps to `factor * saturation_multiplier`, which
    /// is large but finite so saturated roads stay traversable.
    pub fn congestion_penalty(&self, road: &SimRoad) -> f64 {
        let occupancy = f64::from(road.occupancy());
        let capacity = f64::from(road.capacity());
        if road.is_saturated() {
            self.congestion_factor * self.saturation_multiplier
        } else {
            self.congestion_factor * (1.0 + occupancy / capacity)
        }
    }

    pub fn road_cost(&self, road: &SimRoad) -> f64 {
        road.length + self.congestion_penalty(road)
    }

    /// Current cost of following `roads`; unknown roads are skipped
    pub fn route_cost(&self, network: &SimRoadNetwork, roads: &[RoadId]) -> f64 {
        roads
            .iter()
            .filter_map(|road_id| network.road(*road_id))
            .map(|road| self.road_cost(road))
            .sum()
    }

    /// Finds the cheapest route from `start` to `goal` under current occupancy.
    pub fn find_path(
        &self,
        network: &SimRoadNetwork,
        start: IntersectionId,
        goal: IntersectionId,
    ) -> SimResult<Route> {
        network
            .intersection(start)
            .ok_or(SimError::UnknownIntersection(start))?;
        let goal_pos = network
            .intersection_position(goal)
            .ok_or(SimError::UnknownIntersection(goal))?;

        if start == goal {
            return Ok(Route {
                roads: Vec::new(),
                cost: 0.0,
                length: 0.0,
            });
        }

        let graph = network.graph();
        let goal_node = NodeIndex::new(goal.index());

        let (_, nodes) = astar(
            graph,
            NodeIndex::new(start.index()),
            |node| node == goal_node,
            |edge| {
                network
                    .road(*edge.weight())
                    .map_or(f64::INFINITY, |road| self.road_cost(road))
            },
            |node| {
                network
                    .intersection_position(graph[node])
                    .map_or(0.0, |pos| pos.distance(&goal_pos))
            },
        )
        .ok_or(SimError::NoPath { start, goal })?;

        let mut roads = Vec::with_capacity(nodes.len().saturating_sub(1));
        for pair in nodes.windows(2) {
            let road = self
                .cheapest_road(network, pair[0], pair[1])
                .ok_or(SimError::NoPath { start, goal })?;
            roads.push(road.id);
        }

        let route = Route {
            cost: self.route_cost(network, &roads),
            length: roads
                .iter()
                .filter_map(|road_id| network.road(*road_id))
                .map(|road| road.length)
                .sum(),
            roads,
        };
        debug!(
            "Route {start} -> {goal}: {} roads, cost {:.1}",
            route.roads.len(),
            route.cost
        );
        Ok(route)
    }

    /// Among parallel roads between two adjacent nodes, the cheapest one
    /// (lowest id on ties)
    fn cheapest_road<'a>(
        &self,
        network: &'a SimRoadNetwork,
        from: NodeIndex,
        to: NodeIndex,
    ) -> Option<&'a SimRoad> {
        network
            .graph()
            .edges(from)
            .filter(|edge| edge.target() == to)
            .filter_map(|edge| network.road(*edge.weight()))
            .min_by_key(|road| (OrderedFloat(self.road_cost(road)), road.id))
    }
}
