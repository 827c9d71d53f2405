use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use traffic_dispatch::simulation::{
    random_trip, ConsoleRenderer, DriverRecord, Gender, PersonRecord, RideId, RideStatus,
    SimConfig, SimWorld, VehicleCategory,
};

#[derive(Parser)]
#[command(name = "traffic_dispatch")]
#[command(about = "Congestion-aware traffic simulation with ride dispatch")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "2000")]
    ticks: u64,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Free-roaming agents spawned at startup
    #[arg(long, default_value = "40")]
    agents: usize,

    /// Drivers registered at random intersections
    #[arg(long, default_value = "4")]
    drivers: usize,

    /// Ticks between traffic signal rotations
    #[arg(long, default_value = "100")]
    signal_interval: u64,

    /// Scale of the congestion penalty in route costs
    #[arg(long, default_value = "100.0")]
    congestion_factor: f64,

    /// Vehicle category of the demo ride request
    #[arg(long, default_value = "Car")]
    ride_category: String,

    /// Log a summary and render the map every N ticks (0 disables)
    #[arg(long, default_value = "500")]
    summary_every: u64,
}

const DRIVER_ROSTER: [(&str, Gender, u32); 4] = [
    ("Ahmed Khan", Gender::Male, 34),
    ("Sara Malik", Gender::Female, 29),
    ("Usman Tariq", Gender::Male, 45),
    ("Hina Aslam", Gender::Female, 38),
];

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    run_headless(&cli)
}

fn driver_record(n: usize, category: VehicleCategory) -> (String, DriverRecord) {
    let (name, gender, age) = DRIVER_ROSTER[n % DRIVER_ROSTER.len()].clone();
    let email = format!("driver{n}@example.com");
    let record = DriverRecord::new(
        PersonRecord {
            name: name.to_string(),
            email: email.clone(),
            gender,
            phone: format!("0300-{:07}", 1_000_000 + n),
            age,
        },
        category,
        format!("KHI-{:04}", 1000 + n),
    );
    (email, record)
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli) -> Result<()> {
    let config = SimConfig {
        signal_interval_ticks: cli.signal_interval,
        congestion_factor: cli.congestion_factor,
        ..SimConfig::default()
    };
    let mut world = SimWorld::with_config(config, cli.seed);
    world.build_demo_city().context("building demo city")?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_os_rng(),
    };

    info!("=== SPAWNING AGENTS ===");
    for n in 0..cli.agents {
        let category = VehicleCategory::ALL[n % VehicleCategory::ALL.len()];
        if let Err(err) = world.spawn_random_agent(category) {
            warn!("Could not spawn agent {n}: {err}");
        }
    }

    let ride_category = VehicleCategory::from_name_or_car(&cli.ride_category);
    for n in 0..cli.drivers {
        // The first driver always serves the demo ride's category
        let category = if n == 0 {
            ride_category
        } else {
            VehicleCategory::ALL[rng.random_range(0..VehicleCategory::ALL.len())]
        };
        let (key, record) = driver_record(n, category);
        world
            .register_driver_at_random(&key, record)
            .with_context(|| format!("registering driver {key}"))?;
    }

    let ride = request_demo_ride(&mut world, &mut rng, ride_category)?;

    info!("Initial state:");
    world.print_summary();

    let mut renderer = ConsoleRenderer;
    let mut rated = false;
    for _ in 0..cli.ticks {
        world.tick();

        if !rated {
            if let Some(RideStatus::Completed(driver)) = world.rides.get(&ride).map(|r| r.status) {
                let rating = rng.random_range(3..=5) as f64;
                match world.rate_ride(ride, rating) {
                    Ok(average) => info!("Driver {driver} rated {rating}, average {average:.2}"),
                    Err(err) => warn!("Rating ride {ride} failed: {err}"),
                }
                rated = true;
            }
        }

        if cli.summary_every > 0 && world.tick_count % cli.summary_every == 0 {
            world.print_summary();
            world.render(&mut renderer);
        }
    }

    info!("=== SIMULATION COMPLETE ===");
    world.print_summary();
    match world.rides.get(&ride) {
        Some(request) => info!("Demo ride {ride}: {:?}", request.status),
        None => warn!("Demo ride {ride} is missing"),
    }
    Ok(())
}

/// Request a ride between two random intersections and try to dispatch it
fn request_demo_ride(
    world: &mut SimWorld,
    rng: &mut StdRng,
    category: VehicleCategory,
) -> Result<RideId> {
    let (origin, destination) = random_trip(&world.road_network, rng)?;
    let ride = world.request_ride(origin, destination, category)?;
    match world.dispatch_ride(ride) {
        Ok(driver) => info!("Ride {ride} dispatched to {driver}"),
        Err(err) => warn!("Ride {ride} not dispatched: {err}"),
    }
    Ok(ride)
}
