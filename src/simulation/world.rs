//! Main simulation world that ties everything together
//!
//! Owns the road network, agents, drivers and rides, and drives the
//! per-tick sequence: signals first, then every agent in id order, then
//! ride bookkeeping for agents that arrived.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet};

use super::agent::{AgentUpdateResult, SimAgent};
use super::agent_manager;
use super::config::SimConfig;
use super::dispatch::{
    DispatchMatcher, DriverBinding, DriverCandidate, NearestAvailable, RatingAverage, RideRequest,
    RideStatus,
};
use super::error::{SimError, SimResult};
use super::intersection::IntersectionKind;
use super::records::{DriverRecord, MemoryRecordStore, RecordStore};
use super::road_network::SimRoadNetwork;
use super::routing::RouteFinder;
use super::signal::SignalClock;
use super::snapshot::{AgentView, IntersectionView, Renderer, RoadView, WorldSnapshot};
use super::types::{
    AgentId, DriverId, IntersectionId, Position, RideId, RoadId, SimId, VehicleCategory,
};

/// Counters accumulated over a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Every agent spawned, drivers included
    pub agents_spawned: usize,
    /// Free agents that reached their goal. Driver legs show up in the
    /// ride counters instead.
    pub agents_arrived: usize,
    /// Agent-ticks spent without a route
    pub unreachable_ticks: usize,
    pub rides_requested: usize,
    pub rides_dispatched: usize,
    /// Dispatch attempts that found no driver
    pub rides_unservable: usize,
    pub rides_completed: usize,
    pub ratings_rejected: usize,
}

/// The main simulation world
pub struct SimWorld {
    /// Road network for pathfinding and occupancy
    pub road_network: SimRoadNetwork,

    /// All agents, visited in id order every tick
    pub agents: BTreeMap<AgentId, SimAgent>,

    pub drivers: BTreeMap<DriverId, DriverBinding>,

    pub rides: BTreeMap<RideId, RideRequest>,

    pub stats: SimStats,

    /// Ticks run so far
    pub tick_count: u64,

    config: SimConfig,

    router: RouteFinder,

    matcher: Box<dyn DispatchMatcher>,

    records: Box<dyn RecordStore>,

    signal_clock: SignalClock,

    /// Next ID to assign
    next_id: usize,

    rng: StdRng,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    fn new_internal(config: SimConfig, rng: StdRng) -> Self {
        Self {
            road_network: SimRoadNetwork::with_density_factor(config.density_factor),
            agents: BTreeMap::new(),
            drivers: BTreeMap::new(),
            rides: BTreeMap::new(),
            stats: SimStats::default(),
            tick_count: 0,
            router: RouteFinder::from_config(&config),
            matcher: Box::new(NearestAvailable),
            records: Box::new(MemoryRecordStore::new()),
            signal_clock: SignalClock::new(config.signal_interval_ticks),
            next_id: 0,
            config,
            rng,
        }
    }

    /// World with the reference configuration, seeded from the OS
    pub fn new() -> Self {
        Self::new_internal(SimConfig::default(), StdRng::from_os_rng())
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::new_internal(SimConfig::default(), StdRng::seed_from_u64(seed))
    }

    pub fn with_config(config: SimConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new_internal(config, rng)
    }

    /// Replace the record store drivers are loaded from and saved to
    pub fn with_record_store(mut self, records: impl RecordStore + 'static) -> Self {
        self.records = Box::new(records);
        self
    }

    /// Replace the driver matching strategy
    pub fn with_matcher(mut self, matcher: impl DispatchMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn router(&self) -> &RouteFinder {
        &self.router
    }

    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a plain intersection to the world
    pub fn add_intersection(
        &mut self,
        position: Position,
        name: impl Into<String>,
    ) -> SimResult<IntersectionId> {
        self.road_network
            .add_intersection(position, name, IntersectionKind::Plain)
    }

    /// Add a signaled intersection with `approaches` slots
    pub fn add_signaled_intersection(
        &mut self,
        position: Position,
        name: impl Into<String>,
        approaches: usize,
    ) -> SimResult<IntersectionId> {
        self.road_network
            .add_signaled_intersection(position, name, approaches)
    }

    /// Connect two intersections with a road of the configured default width
    pub fn connect(&mut self, a: IntersectionId, b: IntersectionId) -> SimResult<RoadId> {
        self.road_network
            .connect(a, b, self.config.default_road_width)
    }

    /// Spawn an agent at `start` heading to `goal` at the default speed
    pub fn spawn_agent(
        &mut self,
        category: VehicleCategory,
        start: IntersectionId,
        goal: IntersectionId,
    ) -> SimResult<AgentId> {
        let id = AgentId(self.next_sim_id());
        let agent = agent_manager::spawn_agent(
            id,
            category,
            start,
            goal,
            self.config.default_speed,
            &self.road_network,
            &self.router,
        )?;
        self.agents.insert(id, agent);
        self.stats.agents_spawned += 1;
        Ok(id)
    }

    /// Spawn an agent on a random trip
    pub fn spawn_random_agent(&mut self, category: VehicleCategory) -> SimResult<AgentId> {
        let (start, goal) = agent_manager::random_trip(&self.road_network, &mut self.rng)?;
        self.spawn_agent(category, start, goal)
    }

    /// Save a driver record and bind it to a new agent parked at `start`
    pub fn register_driver(
        &mut self,
        record_key: &str,
        record: DriverRecord,
        start: IntersectionId,
    ) -> SimResult<DriverId> {
        self.records
            .save(record_key, record)
            .map_err(|err| SimError::Record(format!("{err:#}")))?;
        self.load_driver(record_key, start)
    }

    /// Bind an existing driver record to a new agent parked at `start`
    pub fn load_driver(&mut self, record_key: &str, start: IntersectionId) -> SimResult<DriverId> {
        let record = self
            .records
            .load_existing(record_key)
            .map_err(|err| SimError::Record(format!("{err:#}")))?;

        let agent = self.spawn_agent(record.category, start, start)?;
        let id = DriverId(self.next_sim_id());
        let mut binding = DriverBinding::new(id, record_key, agent, record.category);
        binding.available = record.available;
        binding.rating = RatingAverage::from_parts(record.average_rating, record.rides_completed);
        self.drivers.insert(id, binding);

        info!(
            "Driver {id} ({}, {}) ready at {start}",
            record.person.name, record.category
        );
        Ok(id)
    }

    /// Register a driver at a random intersection
    pub fn register_driver_at_random(
        &mut self,
        record_key: &str,
        record: DriverRecord,
    ) -> SimResult<DriverId> {
        let ids = self.road_network.intersection_ids();
        let start = *ids
            .choose(&mut self.rng)
            .ok_or(SimError::TooFewIntersections(0))?;
        self.register_driver(record_key, record, start)
    }

    /// Record a ride request. Dispatch happens separately.
    pub fn request_ride(
        &mut self,
        origin: IntersectionId,
        destination: IntersectionId,
        category: VehicleCategory,
    ) -> SimResult<RideId> {
        for id in [origin, destination] {
            self.road_network
                .intersection(id)
                .ok_or(SimError::UnknownIntersection(id))?;
        }
        let id = RideId(self.next_sim_id());
        self.rides
            .insert(id, RideRequest::new(id, origin, destination, category));
        self.stats.rides_requested += 1;
        info!("Ride {id} requested: {origin} -> {destination} ({category})");
        Ok(id)
    }

    /// What the matcher sees of every driver
    pub fn driver_candidates(&self) -> Vec<DriverCandidate> {
        self.drivers
            .values()
            .filter_map(|driver| {
                let agent = self.agents.get(&driver.agent)?;
                Some(DriverCandidate {
                    driver: driver.id,
                    category: driver.category,
                    available: driver.available,
                    position: agent.position(),
                })
            })
            .collect()
    }

    /// Nearest available driver of `category` to `origin`, without side effects
    pub fn nearest_available(
        &self,
        origin: IntersectionId,
        category: VehicleCategory,
    ) -> SimResult<Option<DriverId>> {
        let origin_pos = self
            .road_network
            .intersection_position(origin)
            .ok_or(SimError::UnknownIntersection(origin))?;
        Ok(self
            .matcher
            .find_match(origin_pos, &self.driver_candidates(), category))
    }

    /// Match a requested ride to a driver and send the driver to the pickup.
    /// With no driver available the ride stays requested and can be retried.
    pub fn dispatch_ride(&mut self, ride_id: RideId) -> SimResult<DriverId> {
        let ride = self.rides.get(&ride_id).ok_or(SimError::UnknownRide(ride_id))?;
        if ride.status != RideStatus::Requested {
            return Err(ride.invalid("dispatch"));
        }
        let (origin, category) = (ride.origin, ride.category);

        let Some(driver_id) = self.nearest_available(origin, category)? else {
            self.stats.rides_unservable += 1;
            warn!("Ride {ride_id}: no {category} drivers available now");
            return Err(SimError::NoAvailableDriver { category });
        };

        let mut updated = self
            .drivers
            .get(&driver_id)
            .ok_or(SimError::UnknownDriver(driver_id))?
            .clone();
        updated.available = false;
        // nothing changes unless the store accepted the new state
        self.persist_driver(&updated)?;

        let agent_id = updated.agent;
        self.drivers.insert(driver_id, updated);
        if let Some(agent) = self.agents.get_mut(&agent_id) {
            agent.retarget(origin);
        }
        if let Some(ride) = self.rides.get_mut(&ride_id) {
            ride.status = RideStatus::Accepted(driver_id);
        }
        self.stats.rides_dispatched += 1;

        info!("Ride {ride_id} accepted by driver {driver_id}");
        Ok(driver_id)
    }

    /// Rate a completed ride. The driver becomes available again once a
    /// valid rating is accepted; an invalid one changes nothing.
    pub fn rate_ride(&mut self, ride_id: RideId, rating: f64) -> SimResult<f64> {
        let ride = self.rides.get(&ride_id).ok_or(SimError::UnknownRide(ride_id))?;
        let driver_id = match (ride.status, ride.rating) {
            (RideStatus::Completed(driver_id), None) => driver_id,
            _ => return Err(ride.invalid("rate")),
        };

        let mut updated = self
            .drivers
            .get(&driver_id)
            .ok_or(SimError::UnknownDriver(driver_id))?
            .clone();
        let average = match updated.complete_trip(rating) {
            Ok(average) => average,
            Err(err) => {
                self.stats.ratings_rejected += 1;
                warn!("Ride {ride_id}: {err}");
                return Err(err);
            }
        };
        self.persist_driver(&updated)?;

        self.drivers.insert(driver_id, updated);
        if let Some(ride) = self.rides.get_mut(&ride_id) {
            ride.rating = Some(rating);
        }

        info!("Ride {ride_id} rated {rating:.1}, driver {driver_id} now averages {average:.2}");
        Ok(average)
    }

    /// Write a driver's availability and rating aggregate back to the store
    fn persist_driver(&mut self, driver: &DriverBinding) -> SimResult<()> {
        let mut record = self
            .records
            .load_existing(&driver.record_key)
            .map_err(|err| SimError::Record(format!("{err:#}")))?;
        record.available = driver.available;
        record.average_rating = driver.rating.average();
        record.rides_completed = driver.rating.count();

        self.records
            .save(&driver.record_key, record)
            .map_err(|err| SimError::Record(format!("{err:#}")))
    }

    fn driver_for_agent(&self, agent_id: AgentId) -> Option<DriverId> {
        self.drivers
            .values()
            .find(|driver| driver.agent == agent_id)
            .map(|driver| driver.id)
    }

    /// Advance ride state when a driver's agent reaches a pickup or drop-off
    fn handle_arrival(&mut self, agent_id: AgentId, at: IntersectionId) {
        let Some(driver_id) = self.driver_for_agent(agent_id) else {
            return;
        };
        let Some(ride) = self
            .rides
            .values_mut()
            .find(|ride| ride.is_active() && ride.status.driver() == Some(driver_id))
        else {
            return;
        };

        match ride.status {
            RideStatus::Accepted(driver) if at == ride.origin => {
                ride.status = RideStatus::EnRoute(driver);
                if let Some(agent) = self.agents.get_mut(&agent_id) {
                    agent.retarget(ride.destination);
                }
                info!("Ride {}: driver {driver} picked up rider at {at}", ride.id);
            }
            RideStatus::EnRoute(driver) if at == ride.destination => {
                ride.status = RideStatus::Completed(driver);
                self.stats.rides_completed += 1;
                info!("Ride {}: completed at {at}", ride.id);
            }
            _ => {}
        }
    }

    /// Advance the simulation by one tick
    pub fn tick(&mut self) {
        self.tick_count += 1;

        if self.signal_clock.tick() {
            self.road_network.rotate_signals();
            debug!("Tick {}: signals rotated", self.tick_count);
        }

        let results = agent_manager::update_agents(
            &mut self.agents,
            &mut self.road_network,
            &self.router,
            self.config.snap_distance,
        );

        for (agent_id, result) in results {
            match result {
                AgentUpdateResult::Arrived(at) => {
                    if self.driver_for_agent(agent_id).is_some() {
                        self.handle_arrival(agent_id, at);
                    } else {
                        self.stats.agents_arrived += 1;
                    }
                }
                AgentUpdateResult::Unreachable => {
                    self.stats.unreachable_ticks += 1;
                }
                _ => {}
            }
        }

        let drivers: HashSet<AgentId> = self.drivers.values().map(|driver| driver.agent).collect();
        agent_manager::despawn_arrived(&mut self.agents, &drivers);
    }

    /// Run `ticks` ticks
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Read-only copy of the state renderers need
    pub fn snapshot(&self) -> WorldSnapshot {
        let intersections = self
            .road_network
            .intersections()
            .map(|intersection| IntersectionView {
                id: intersection.id,
                name: intersection.name.clone(),
                position: intersection.position,
                green_index: intersection.signal().map(|signal| signal.green_index()),
            })
            .collect();

        let roads = self
            .road_network
            .roads()
            .filter_map(|road| {
                Some(RoadView {
                    id: road.id,
                    from: self.road_network.intersection_position(road.endpoints.0)?,
                    to: self.road_network.intersection_position(road.endpoints.1)?,
                    occupancy: road.occupancy(),
                    capacity: road.capacity(),
                })
            })
            .collect();

        let agents = self
            .agents
            .values()
            .map(|agent| AgentView {
                id: agent.id,
                category: agent.category,
                position: agent.position(),
                status: agent.status(),
            })
            .collect();

        WorldSnapshot {
            tick: self.tick_count,
            intersections,
            roads,
            agents,
        }
    }

    pub fn render(&self, renderer: &mut dyn Renderer) {
        renderer.render(&self.snapshot());
    }

    /// Create a world populated with the demo city
    pub fn create_demo_world(seed: Option<u64>) -> Result<Self> {
        let mut world = Self::with_config(SimConfig::default(), seed);
        world.build_demo_city()?;
        Ok(world)
    }

    /// Build the 24-intersection demo city: 10 plain intersections, four
    /// 4-way and ten 3-way signaled intersections, 32 roads.
    /// Returns the intersection ids in table order.
    pub fn build_demo_city(&mut self) -> Result<Vec<IntersectionId>> {
        // (name, x, y, signal approaches or 0 for plain)
        const PLACES: [(&str, f64, f64, usize); 24] = [
            ("JamshedTown", 200.0, 200.0, 0),
            ("GardenEast", 400.0, 600.0, 0),
            ("MemonSociety", 1200.0, 250.0, 0),
            ("FederalBArea", 830.0, 500.0, 0),
            ("LalKothi", 1000.0, 1000.0, 0),
            ("Gulshan-e-Iqbal", 1200.0, 1070.0, 0),
            ("Kharadar", 1850.0, 860.0, 0),
            ("MohammadAliSociety", 1200.0, 800.0, 0),
            ("Dhoraji", 1400.0, 400.0, 0),
            ("FaisalBase", 1000.0, 600.0, 0),
            ("Clifton", 1000.0, 800.0, 4),
            ("Saddar", 600.0, 400.0, 4),
            ("Defence", 800.0, 100.0, 4),
            ("Gulshan", 1300.0, 950.0, 4),
            ("Korangi", 1800.0, 390.0, 3),
            ("Malir", 1860.0, 490.0, 3),
            ("ShahFaisal", 1700.0, 490.0, 3),
            ("Nazimabad", 1600.0, 450.0, 3),
            ("Liaquatabad", 1200.0, 530.0, 3),
            ("Orangi", 1000.0, 100.0, 3),
            ("NorthNazimabad", 210.0, 450.0, 3),
            ("Kemari", 500.0, 900.0, 3),
            ("Garden", 800.0, 800.0, 3),
            ("UniversityRoad", 1600.0, 800.0, 3),
        ];
        // 1-based indices into PLACES, in connection order
        const ROADS: [(usize, usize); 32] = [
            (1, 21), (1, 13), (12, 21), (12, 2), (12, 13), (12, 4), (21, 22), (4, 19),
            (13, 3), (13, 20), (20, 3), (20, 15), (22, 6), (23, 5), (22, 23), (23, 11),
            (11, 5), (11, 8), (11, 10), (10, 19), (14, 6), (14, 7), (14, 24), (14, 8),
            (19, 9), (24, 17), (24, 16), (9, 18), (18, 17), (18, 15), (17, 16), (16, 15),
        ];

        let mut ids = Vec::with_capacity(PLACES.len());
        for (name, x, y, approaches) in PLACES {
            let position = Position::new(x, y);
            let added = if approaches == 0 {
                self.add_intersection(position, name)
            } else {
                self.add_signaled_intersection(position, name, approaches)
            };
            ids.push(added.with_context(|| format!("adding intersection {name}"))?);
        }

        for (a, b) in ROADS {
            self.connect(ids[a - 1], ids[b - 1]).with_context(|| {
                format!("connecting {} and {}", PLACES[a - 1].0, PLACES[b - 1].0)
            })?;
        }

        info!(
            "Demo city built: {} intersections, {} roads",
            self.road_network.intersection_count(),
            self.road_network.road_count()
        );
        Ok(ids)
    }

    /// Log a summary of the world state
    pub fn print_summary(&self) {
        info!("=== Traffic Simulation Summary ===");
        info!("Tick: {}", self.tick_count);
        info!("Total intersections: {}", self.road_network.intersection_count());
        info!("Total roads: {}", self.road_network.road_count());
        info!("Total agents spawned: {}", self.stats.agents_spawned);
        info!("Total agents arrived: {}", self.stats.agents_arrived);
        info!("Active agents: {}", self.agents.len());
        info!("Drivers: {}", self.drivers.len());
        info!(
            "Rides requested/dispatched/completed: {}/{}/{}",
            self.stats.rides_requested, self.stats.rides_dispatched, self.stats.rides_completed
        );
        let saturated = self
            .road_network
            .roads()
            .filter(|road| road.occupancy() > 0 && road.is_saturated())
            .count();
        info!("Saturated roads: {saturated}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::records::{Gender, PersonRecord};

    fn driver_record(category: VehicleCategory) -> DriverRecord {
        DriverRecord::new(
            PersonRecord {
                name: "Bilal".to_string(),
                email: "bilal@example.com".to_string(),
                gender: Gender::Male,
                phone: "0321-1111111".to_string(),
                age: 40,
            },
            category,
            "KHI-9876",
        )
    }

    #[test]
    fn test_demo_city_shape() {
        let world = SimWorld::create_demo_world(Some(1)).unwrap();
        assert_eq!(world.road_network.intersection_count(), 24);
        assert_eq!(world.road_network.road_count(), 32);
        let signaled = world
            .road_network
            .intersections()
            .filter(|i| i.is_signaled())
            .count();
        assert_eq!(signaled, 14);
    }

    #[test]
    fn test_signals_rotate_on_interval() {
        let mut world = SimWorld::create_demo_world(Some(1)).unwrap();
        let clifton = world.road_network.find_intersection_by_name("Clifton").unwrap();
        let green = |world: &SimWorld| {
            world
                .road_network
                .intersection(clifton)
                .and_then(|i| i.signal())
                .map(|s| s.green_index())
        };

        world.run(99);
        assert_eq!(green(&world), Some(0));
        world.tick();
        assert_eq!(green(&world), Some(1));
        world.run(300);
        assert_eq!(green(&world), Some(0));
    }

    #[test]
    fn test_free_agents_despawn_after_arrival() {
        let mut world = SimWorld::new_with_seed(3);
        let a = world.add_intersection(Position::new(0.0, 0.0), "A").unwrap();
        let b = world.add_intersection(Position::new(10.0, 0.0), "B").unwrap();
        world.connect(a, b).unwrap();
        world.spawn_agent(VehicleCategory::Car, a, b).unwrap();

        world.run(50);
        assert!(world.agents.is_empty());
        assert_eq!(world.stats.agents_arrived, 1);
    }

    #[test]
    fn test_dispatch_without_drivers_is_unservable() {
        let mut world = SimWorld::create_demo_world(Some(1)).unwrap();
        let ride = world
            .request_ride(IntersectionId(SimId(0)), IntersectionId(SimId(5)), VehicleCategory::Car)
            .unwrap();
        assert_eq!(
            world.dispatch_ride(ride),
            Err(SimError::NoAvailableDriver {
                category: VehicleCategory::Car
            })
        );
        assert_eq!(world.rides[&ride].status, RideStatus::Requested);
        assert_eq!(world.stats.rides_unservable, 1);
    }

    #[test]
    fn test_registered_driver_is_persisted_and_parked() {
        let mut world = SimWorld::create_demo_world(Some(1)).unwrap();
        let start = world.road_network.find_intersection_by_name("Saddar").unwrap();
        let driver = world
            .register_driver("bilal@example.com", driver_record(VehicleCategory::Car), start)
            .unwrap();

        world.tick();
        let agent = &world.agents[&world.drivers[&driver].agent];
        assert!(agent.has_arrived());
        // parking on the start intersection is not a completed trip
        assert_eq!(world.stats.agents_arrived, 0);
        assert!(world.records().load("bilal@example.com").unwrap().is_some());
    }

    #[test]
    fn test_rate_requires_completed_ride() {
        let mut world = SimWorld::create_demo_world(Some(1)).unwrap();
        let ride = world
            .request_ride(IntersectionId(SimId(0)), IntersectionId(SimId(5)), VehicleCategory::Car)
            .unwrap();
        assert!(matches!(
            world.rate_ride(ride, 4.0),
            Err(SimError::InvalidRideTransition { .. })
        ));
        assert_eq!(
            world.rate_ride(RideId(SimId(999)), 4.0),
            Err(SimError::UnknownRide(RideId(SimId(999))))
        );
    }
}
