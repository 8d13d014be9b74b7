//! Flowgrid CLI - Run water and soil simulations from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use flowgrid::{
    EngineError,
    compute::{
        EngineSwitch, Moisture, SimulationDriver, SoilContamination, SoilContaminationEngine,
        SoilField, SoilMoistureEngine, WaterMap, WaterMapStats, WaterSimulationEngine, WorkerPool,
    },
    schema::{Seed, SimulationConfig},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [ticks]", args[0]);
        eprintln!();
        eprintln!("Run a flowgrid water simulation from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to simulation configuration file");
        eprintln!("  ticks        Number of simulation ticks (default: 100)");
        eprintln!();
        eprintln!("Print an example configuration with --example.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);
    let ticks: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);

    let config = SimulationConfig::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    // Load or create seed
    let seed_path = config_path.with_extension("seed.json");
    let seed: Seed = if seed_path.exists() {
        let seed_str = fs::read_to_string(&seed_path).unwrap_or_else(|e| {
            eprintln!("Error reading seed file: {}", e);
            std::process::exit(1);
        });
        serde_json::from_str(&seed_str).unwrap_or_else(|e| {
            eprintln!("Error parsing seed: {}", e);
            std::process::exit(1);
        })
    } else {
        Seed::default()
    };

    let mut map = WaterMap::from_seed(&seed, &config).unwrap_or_else(|e| fail(e));
    let pool = WorkerPool::new(config.engine.threads).unwrap_or_else(|e| fail(e));
    let switch = EngineSwitch::from(&config.engine);

    println!("Flowgrid Simulation");
    println!("===================");
    println!("Map: {}x{}", config.width, config.height);
    println!("Worker threads: {}", pool.threads());
    println!("Backend: {:?}", switch.backend());
    println!("dt: {}", map.parameters.delta_time);
    println!("Ticks: {}", ticks);
    println!();

    let initial_stats = WaterMapStats::from_map(&map);
    print_stats("Initial state", &initial_stats);

    let engine = WaterSimulationEngine::new(map.geometry, pool.clone());
    let mut driver = SimulationDriver::new(engine, pool.clone(), switch);

    let moisture_params = config.moisture_parameters();
    let soil_contamination_params = config.soil_contamination_parameters();
    let mut moisture = SoilField::new(map.geometry);
    let mut soil_contamination = SoilField::new(map.geometry);
    let mut moisture_engine = SoilMoistureEngine::new(map.geometry, pool.clone());
    let mut soil_contamination_engine = SoilContaminationEngine::new(map.geometry, pool);

    println!("Running simulation...");
    let start = Instant::now();

    for i in 0..ticks {
        driver.tick(&mut map).unwrap_or_else(|e| fail(e));

        moisture
            .update_sources::<Moisture>(&map, &moisture_params)
            .unwrap_or_else(|e| fail(e));
        moisture_engine
            .process_simulation(moisture.view(), &moisture_params)
            .unwrap_or_else(|e| fail(e));
        soil_contamination
            .update_sources::<SoilContamination>(&map, &soil_contamination_params)
            .unwrap_or_else(|e| fail(e));
        soil_contamination_engine
            .process_simulation(soil_contamination.view(), &soil_contamination_params)
            .unwrap_or_else(|e| fail(e));

        // Print progress every 10%
        if (i + 1) % (ticks / 10).max(1) == 0 {
            let stats = WaterMapStats::from_map(&map);
            let elapsed = start.elapsed().as_secs_f32();
            let ticks_per_sec = (i + 1) as f32 / elapsed;
            println!(
                "  Tick {}/{}: water={:.6}, wet={}, moisture={:.3}, {:.1} ticks/s",
                i + 1,
                ticks,
                stats.total_water,
                stats.wet_tiles,
                moisture.total(),
                ticks_per_sec
            );
        }
    }

    let elapsed = start.elapsed();
    let final_stats = WaterMapStats::from_map(&map);

    println!();
    print_stats("Final state", &final_stats);
    println!("  Soil moisture: {:.6}", moisture.total());
    println!("  Soil contamination: {:.6}", soil_contamination.total());
    println!();
    if initial_stats.total_water > 0.0 {
        println!(
            "Water conservation: {:.4}%",
            (1.0 - (final_stats.total_water - initial_stats.total_water).abs()
                / initial_stats.total_water)
                * 100.0
        );
    }
    println!(
        "Time: {:.2}s ({:.1} ticks/s)",
        elapsed.as_secs_f32(),
        ticks as f32 / elapsed.as_secs_f32()
    );
}

fn fail(e: EngineError) -> ! {
    eprintln!("Simulation error: {}", e);
    std::process::exit(1);
}

fn print_stats(label: &str, stats: &WaterMapStats) {
    println!("{}:", label);
    println!("  Total water: {:.6}", stats.total_water);
    println!("  Wet tiles: {}", stats.wet_tiles);
    println!("  Max depth: {:.6}", stats.max_depth);
    println!("  Contaminant mass: {:.6}", stats.contaminant_mass);
    println!();
}

fn print_example_config() {
    let config = SimulationConfig::default();
    let seed = Seed::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
    println!();
    println!("Example seed (config.seed.json):");
    match serde_json::to_string_pretty(&seed) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing seed: {}", e),
    }
}
