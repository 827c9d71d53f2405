//! Agent movement logic for the traffic simulation
//!
//! Each agent consumes a route one road at a time. Entering a road
//! increments its occupancy and reaching the far end releases it, so the
//! only thing other agents ever observe is the network's occupancy.

use log::{debug, warn};
use std::collections::VecDeque;

use super::error::{SimError, SimResult};
use super::road_network::SimRoadNetwork;
use super::routing::RouteFinder;
use super::types::{AgentId, IntersectionId, Position, RoadId, VehicleCategory};

/// Fine-grained motion state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    /// Not at the goal and no route could be found yet
    Idle,
    /// Standing on `current` intersection
    AtNode,
    /// Travelling along `road` toward `toward`
    EnRoute {
        road: RoadId,
        toward: IntersectionId,
    },
    /// Standing on the goal
    Arrived,
}

/// Coarse status reported to dispatch and renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Idle,
    EnRoute,
    Arrived,
}

/// Result of an agent update indicating what happened this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentUpdateResult {
    /// Agent moved, entered a road or reached an intermediate intersection
    Continue,
    /// Agent is held at an intersection by a red signal
    Stalled,
    /// No route exists right now, will retry next tick
    Unreachable,
    /// Agent reached its goal this tick
    Arrived(IntersectionId),
    /// Agent was already parked at its goal
    Parked,
}

/// A vehicle in the traffic simulation
#[derive(Debug, Clone)]
pub struct SimAgent {
    pub id: AgentId,
    pub category: VehicleCategory,
    /// Cosmetic vehicle length in metres
    pub length: f64,
    /// Distance units per tick
    pub speed: f64,
    current: IntersectionId,
    goal: IntersectionId,
    path: VecDeque<RoadId>,
    position: Position,
    state: MotionState,
}

impl SimAgent {
    /// Create an agent standing on `start` and plan its first route.
    /// An unreachable goal leaves the agent `Idle` rather than failing.
    pub fn new(
        id: AgentId,
        category: VehicleCategory,
        start: IntersectionId,
        goal: IntersectionId,
        speed: f64,
        network: &SimRoadNetwork,
        router: &RouteFinder,
    ) -> SimResult<Self> {
        let position = network
            .intersection_position(start)
            .ok_or(SimError::UnknownIntersection(start))?;
        network
            .intersection(goal)
            .ok_or(SimError::UnknownIntersection(goal))?;

        let mut agent = Self {
            id,
            category,
            length: category.length(),
            speed,
            current: start,
            goal,
            path: VecDeque::new(),
            position,
            state: MotionState::AtNode,
        };
        agent.plan(network, router)?;
        Ok(agent)
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn status(&self) -> AgentStatus {
        match self.state {
            MotionState::Idle => AgentStatus::Idle,
            MotionState::AtNode | MotionState::EnRoute { .. } => AgentStatus::EnRoute,
            MotionState::Arrived => AgentStatus::Arrived,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Last intersection the agent stood on
    pub fn current_intersection(&self) -> IntersectionId {
        self.current
    }

    pub fn goal(&self) -> IntersectionId {
        self.goal
    }

    pub fn current_road(&self) -> Option<RoadId> {
        match self.state {
            MotionState::EnRoute { road, .. } => Some(road),
            _ => None,
        }
    }

    pub fn next_intersection(&self) -> Option<IntersectionId> {
        match self.state {
            MotionState::EnRoute { toward, .. } => Some(toward),
            _ => None,
        }
    }

    /// Roads still to be entered after the current one
    pub fn remaining_path(&self) -> impl Iterator<Item = &RoadId> {
        self.path.iter()
    }

    pub fn has_arrived(&self) -> bool {
        self.state == MotionState::Arrived
    }

    /// Replace the goal. A road in progress is finished first, then the
    /// agent plans from the intersection it reaches.
    pub fn retarget(&mut self, goal: IntersectionId) {
        self.goal = goal;
        self.path.clear();
        if !matches!(self.state, MotionState::EnRoute { .. }) {
            self.state = MotionState::AtNode;
        }
        debug!("Agent {} retargeted to {goal}", self.id);
    }

    /// Advance the agent by one tick
    pub fn update(
        &mut self,
        network: &mut SimRoadNetwork,
        router: &RouteFinder,
        snap_distance: f64,
    ) -> SimResult<AgentUpdateResult> {
        match self.state {
            MotionState::Arrived => Ok(AgentUpdateResult::Parked),
            MotionState::EnRoute { road, toward } => {
                self.advance(network, road, toward, snap_distance)
            }
            MotionState::Idle | MotionState::AtNode => self.depart(network, router),
        }
    }

    /// Install a fresh route toward the goal. `NoPath` leaves the agent idle.
    fn plan(&mut self, network: &SimRoadNetwork, router: &RouteFinder) -> SimResult<bool> {
        if self.current == self.goal {
            return Ok(true);
        }
        match router.find_path(network, self.current, self.goal) {
            Ok(route) => {
                self.path = route.roads.into();
                self.state = MotionState::AtNode;
                Ok(true)
            }
            Err(SimError::NoPath { .. }) => {
                warn!(
                    "Agent {}: no path from {} to {}, will retry",
                    self.id, self.current, self.goal
                );
                self.state = MotionState::Idle;
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn depart(
        &mut self,
        network: &mut SimRoadNetwork,
        router: &RouteFinder,
    ) -> SimResult<AgentUpdateResult> {
        if self.current == self.goal {
            self.state = MotionState::Arrived;
            self.path.clear();
            debug!("Agent {} arrived at {}", self.id, self.goal);
            return Ok(AgentUpdateResult::Arrived(self.goal));
        }

        if self.path.is_empty() && !self.plan(network, router)? {
            return Ok(AgentUpdateResult::Unreachable);
        }

        let Some(&road_id) = self.path.front() else {
            return Ok(AgentUpdateResult::Unreachable);
        };
        let road = network
            .road(road_id)
            .unwrap_or_else(|| panic!("dangling road reference {road_id} in agent path"));
        let Some(toward) = road.other_end(self.current) else {
            // stale path, plan again next tick
            debug!(
                "Agent {}: {road_id} does not touch {}, replanning",
                self.id, self.current
            );
            self.path.clear();
            return Ok(AgentUpdateResult::Continue);
        };

        let open = network
            .intersection(toward)
            .ok_or(SimError::UnknownIntersection(toward))?
            .is_open_for(road_id);
        if !open {
            return Ok(AgentUpdateResult::Stalled);
        }

        self.path.pop_front();
        network.adjust_occupancy(road_id, 1);
        self.state = MotionState::EnRoute {
            road: road_id,
            toward,
        };
        debug!("Agent {} entered {road_id} toward {toward}", self.id);
        Ok(AgentUpdateResult::Continue)
    }

    fn advance(
        &mut self,
        network: &mut SimRoadNetwork,
        road: RoadId,
        toward: IntersectionId,
        snap_distance: f64,
    ) -> SimResult<AgentUpdateResult> {
        let target = network
            .intersection_position(toward)
            .ok_or(SimError::UnknownIntersection(toward))?;

        self.position = self.position.step_toward(&target, self.speed);

        if self.position.distance(&target) <= snap_distance {
            self.position = target;
            network.adjust_occupancy(road, -1);
            self.current = toward;
            self.state = MotionState::AtNode;
            debug!("Agent {} reached {toward} via {road}", self.id);
        }
        Ok(AgentUpdateResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::intersection::IntersectionKind;
    use crate::simulation::types::{SimId, SNAP_DISTANCE};

    fn corridor(signaled_middle: bool) -> (SimRoadNetwork, [IntersectionId; 3], [RoadId; 2]) {
        let mut network = SimRoadNetwork::new();
        let a = network
            .add_intersection(Position::new(0.0, 0.0), "A", IntersectionKind::Plain)
            .unwrap();
        let b = if signaled_middle {
            network
                .add_signaled_intersection(Position::new(20.0, 0.0), "B", 3)
                .unwrap()
        } else {
            network
                .add_intersection(Position::new(20.0, 0.0), "B", IntersectionKind::Plain)
                .unwrap()
        };
        let c = network
            .add_intersection(Position::new(40.0, 0.0), "C", IntersectionKind::Plain)
            .unwrap();
        let bc = network.connect(b, c, 3.2).unwrap();
        let ab = network.connect(a, b, 3.2).unwrap();
        // connection order at B is [b-c, a-b], so a-b is slot 1
        (network, [a, b, c], [ab, bc])
    }

    fn run_until_arrived(
        agent: &mut SimAgent,
        network: &mut SimRoadNetwork,
        router: &RouteFinder,
    ) -> usize {
        for tick in 0..1000 {
            if let AgentUpdateResult::Arrived(_) =
                agent.update(network, router, SNAP_DISTANCE).unwrap()
            {
                return tick;
            }
        }
        panic!("agent never arrived");
    }

    #[test]
    fn test_agent_enters_and_releases_roads() {
        let (mut network, [a, _, c], [first, second]) = corridor(false);
        let router = RouteFinder::default();
        let mut agent = SimAgent::new(
            AgentId(SimId(0)),
            VehicleCategory::Car,
            a,
            c,
            2.0,
            &network,
            &router,
        )
        .unwrap();
        assert_eq!(agent.remaining_path().copied().collect::<Vec<_>>(), vec![first, second]);

        agent.update(&mut network, &router, SNAP_DISTANCE).unwrap();
        assert_eq!(agent.current_road(), Some(first));
        assert_eq!(network.road(first).unwrap().occupancy(), 1);

        run_until_arrived(&mut agent, &mut network, &router);
        assert_eq!(agent.status(), AgentStatus::Arrived);
        assert_eq!(agent.position(), network.intersection_position(c).unwrap());
        assert_eq!(network.road(first).unwrap().occupancy(), 0);
        assert_eq!(network.road(second).unwrap().occupancy(), 0);
    }

    #[test]
    fn test_arrival_is_reported_once() {
        let (mut network, [a, _, c], _) = corridor(false);
        let router = RouteFinder::default();
        let mut agent = SimAgent::new(
            AgentId(SimId(0)),
            VehicleCategory::Bus,
            a,
            c,
            3.0,
            &network,
            &router,
        )
        .unwrap();
        run_until_arrived(&mut agent, &mut network, &router);

        for _ in 0..10 {
            assert_eq!(
                agent.update(&mut network, &router, SNAP_DISTANCE).unwrap(),
                AgentUpdateResult::Parked
            );
        }
    }

    #[test]
    fn test_red_signal_holds_agent() {
        let (mut network, [a, b, _], [first, _]) = corridor(true);
        let router = RouteFinder::default();
        let mut agent = SimAgent::new(
            AgentId(SimId(0)),
            VehicleCategory::Car,
            a,
            b,
            2.0,
            &network,
            &router,
        )
        .unwrap();

        // a-b is slot 1 at B, slot 0 is green
        assert_eq!(
            agent.update(&mut network, &router, SNAP_DISTANCE).unwrap(),
            AgentUpdateResult::Stalled
        );
        assert_eq!(agent.state(), MotionState::AtNode);
        assert_eq!(network.road(first).unwrap().occupancy(), 0);

        network.rotate_signals();
        agent.update(&mut network, &router, SNAP_DISTANCE).unwrap();
        assert_eq!(agent.current_road(), Some(first));
        assert_eq!(network.road(first).unwrap().occupancy(), 1);
    }

    #[test]
    fn test_unreachable_goal_leaves_agent_idle() {
        let (mut network, [a, _, _], _) = corridor(false);
        let island = network
            .add_intersection(Position::new(0.0, 90.0), "Island", IntersectionKind::Plain)
            .unwrap();
        let router = RouteFinder::default();
        let mut agent = SimAgent::new(
            AgentId(SimId(0)),
            VehicleCategory::Bike,
            a,
            island,
            1.0,
            &network,
            &router,
        )
        .unwrap();
        assert_eq!(agent.status(), AgentStatus::Idle);
        assert_eq!(
            agent.update(&mut network, &router, SNAP_DISTANCE).unwrap(),
            AgentUpdateResult::Unreachable
        );

        // the road appears later and the agent picks it up
        network.connect(a, island, 3.2).unwrap();
        agent.update(&mut network, &router, SNAP_DISTANCE).unwrap();
        assert_eq!(agent.status(), AgentStatus::EnRoute);
    }

    #[test]
    fn test_retarget_finishes_current_road_first() {
        let (mut network, [a, _, c], [first, _]) = corridor(false);
        let router = RouteFinder::default();
        let mut agent = SimAgent::new(
            AgentId(SimId(0)),
            VehicleCategory::Truck,
            a,
            c,
            1.0,
            &network,
            &router,
        )
        .unwrap();
        agent.update(&mut network, &router, SNAP_DISTANCE).unwrap();
        assert_eq!(agent.current_road(), Some(first));

        agent.retarget(a);
        assert_eq!(agent.current_road(), Some(first));
        assert_eq!(agent.remaining_path().count(), 0);

        run_until_arrived(&mut agent, &mut network, &router);
        assert_eq!(agent.current_intersection(), a);
        assert_eq!(network.road(first).unwrap().occupancy(), 0);
    }
}
