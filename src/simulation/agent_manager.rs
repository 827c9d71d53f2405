//! Agent spawning and management for the traffic simulation
//!
//! Spawning (explicit or random placement), the ordered per-tick update and
//! despawning. Agents are kept in a `BTreeMap` so every tick visits them in
//! ascending id order.

use log::{debug, warn};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashSet};

use super::agent::{AgentUpdateResult, SimAgent};
use super::error::{SimError, SimResult};
use super::road_network::SimRoadNetwork;
use super::routing::RouteFinder;
use super::types::{AgentId, IntersectionId, VehicleCategory};

/// Spawn an agent at `start` heading to `goal`
///
/// # Arguments
/// * `agent_id` - The pre-generated agent ID
/// * `category` - Vehicle category (cosmetic length only)
/// * `start` / `goal` - Endpoints of the trip
/// * `speed` - Distance units per tick
pub fn spawn_agent(
    agent_id: AgentId,
    category: VehicleCategory,
    start: IntersectionId,
    goal: IntersectionId,
    speed: f64,
    road_network: &SimRoadNetwork,
    router: &RouteFinder,
) -> SimResult<SimAgent> {
    let agent = SimAgent::new(agent_id, category, start, goal, speed, road_network, router)?;
    debug!("Spawned agent {agent_id} ({category}) {start} -> {goal}");
    Ok(agent)
}

/// Pick a random start and a different random goal
pub fn random_trip<R: Rng + ?Sized>(
    road_network: &SimRoadNetwork,
    rng: &mut R,
) -> SimResult<(IntersectionId, IntersectionId)> {
    let ids = road_network.intersection_ids();
    if ids.len() < 2 {
        return Err(SimError::TooFewIntersections(ids.len()));
    }
    let Some(&start) = ids.choose(rng) else {
        return Err(SimError::TooFewIntersections(0));
    };
    let mut goal = start;
    while goal == start {
        goal = ids[rng.random_range(0..ids.len())];
    }
    Ok((start, goal))
}

/// Update every agent once, in ascending id order
///
/// Returns the (agent_id, result) pairs that need handling by the caller
/// (arrivals and unreachable goals).
pub fn update_agents(
    agents: &mut BTreeMap<AgentId, SimAgent>,
    road_network: &mut SimRoadNetwork,
    router: &RouteFinder,
    snap_distance: f64,
) -> Vec<(AgentId, AgentUpdateResult)> {
    let mut results = Vec::new();

    for (agent_id, agent) in agents.iter_mut() {
        match agent.update(road_network, router, snap_distance) {
            Ok(result @ (AgentUpdateResult::Arrived(_) | AgentUpdateResult::Unreachable)) => {
                results.push((*agent_id, result));
            }
            Ok(_) => {}
            Err(err) => {
                warn!("Agent {agent_id} update failed: {err}");
            }
        }
    }

    results
}

/// Remove arrived agents that are not in `keep`
///
/// Returns the ids that were removed
pub fn despawn_arrived(
    agents: &mut BTreeMap<AgentId, SimAgent>,
    keep: &HashSet<AgentId>,
) -> Vec<AgentId> {
    let finished: Vec<AgentId> = agents
        .iter()
        .filter(|(id, agent)| agent.has_arrived() && !keep.contains(id))
        .map(|(id, _)| *id)
        .collect();

    for agent_id in &finished {
        agents.remove(agent_id);
        debug!("Despawned agent {agent_id}");
    }
    finished
}
