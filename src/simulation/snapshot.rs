//! Read-only view of the world handed to renderers between ticks.

use super::agent::AgentStatus;
use super::types::{AgentId, IntersectionId, Position, RoadId, VehicleCategory};

#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionView {
    pub id: IntersectionId,
    pub name: String,
    pub position: Position,
    /// Green approach slot, `None` for plain intersections
    pub green_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadView {
    pub id: RoadId,
    pub from: Position,
    pub to: Position,
    pub occupancy: u32,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentView {
    pub id: AgentId,
    pub category: VehicleCategory,
    pub position: Position,
    pub status: AgentStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub intersections: Vec<IntersectionView>,
    pub roads: Vec<RoadView>,
    pub agents: Vec<AgentView>,
}

/// Consumer of per-tick snapshots. Renderers get a copy, never the world.
pub trait Renderer {
    fn render(&mut self, snapshot: &WorldSnapshot);
}

/// Prints a plain-text summary of each snapshot to stdout
#[derive(Debug, Default)]
pub struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn render(&mut self, snapshot: &WorldSnapshot) {
        println!("=== Tick {} ===", snapshot.tick);

        println!("--- Signals ---");
        for intersection in &snapshot.intersections {
            if let Some(green) = intersection.green_index {
                println!("  {} ({}): green approach {}", intersection.name, intersection.id, green);
            }
        }

        println!("--- Busy roads ---");
        for road in snapshot.roads.iter().filter(|road| road.occupancy > 0) {
            println!("  {}: {}/{}", road.id, road.occupancy, road.capacity);
        }

        if !snapshot.agents.is_empty() {
            println!("--- Agents ---");
            for agent in &snapshot.agents {
                println!(
                    "  {} {}: ({:.1}, {:.1}) {:?}",
                    agent.id, agent.category, agent.position.x, agent.position.y, agent.status
                );
            }
        }
        println!();
    }
}
