//! Congestion-aware routing and multi-agent traffic simulation
//!
//! This module contains all the core simulation logic: the road network,
//! route search, traffic signals, agent motion and ride dispatch. It runs
//! headless and is driven one tick at a time by [`SimWorld`].

mod agent;
mod agent_manager;
mod config;
mod dispatch;
mod error;
mod intersection;
mod records;
mod road_network;
mod routing;
mod signal;
mod snapshot;
mod types;
mod world;

// Re-export public types for external use
pub use agent::{AgentStatus, AgentUpdateResult, MotionState, SimAgent};
pub use agent_manager::{despawn_arrived, random_trip, spawn_agent, update_agents};
pub use config::SimConfig;
pub use dispatch::{
    DispatchMatcher, DriverBinding, DriverCandidate, NearestAvailable, RatingAverage, RideRequest,
    RideStatus,
};
pub use error::{SimError, SimResult};
pub use intersection::{IntersectionKind, SimIntersection};
pub use records::{DriverRecord, Gender, MemoryRecordStore, PersonRecord, RecordStore};
pub use road_network::{SimRoad, SimRoadNetwork};
pub use routing::{Route, RouteFinder};
pub use signal::{SignalClock, TrafficSignal};
pub use snapshot::{AgentView, ConsoleRenderer, IntersectionView, Renderer, RoadView, WorldSnapshot};
pub use types::{
    AgentId, DriverId, IntersectionId, Position, RideId, RoadId, SimId, VehicleCategory,
    CONGESTION_FACTOR, DEFAULT_ROAD_WIDTH, DEFAULT_SPEED, DENSITY_FACTOR, MAX_RATING,
    SATURATION_MULTIPLIER, SIGNAL_INTERVAL_TICKS, SNAP_DISTANCE,
};
pub use world::{SimStats, SimWorld};
