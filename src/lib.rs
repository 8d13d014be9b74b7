//! Flowgrid - Row-parallel water, contamination and soil field simulation.
//!
//! This crate recomputes a padded 2-D tile grid once per fixed host tick:
//! water depth, per-direction outflow, and a diffusing contamination scalar,
//! plus single-field soil moisture and soil contamination. Each stage is
//! split by rows across a shared worker pool, and stages are separated by
//! barriers so no row task reads a buffer another task is writing.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, per-tick parameters and seeding
//! - `compute`: Grid geometry, stage kernels, scheduler and engines
//!
//! # Example
//!
//! ```rust,no_run
//! use flowgrid::{
//!     compute::{WaterMap, WaterMapStats, WaterSimulationEngine, WorkerPool},
//!     schema::{Seed, SimulationConfig},
//! };
//!
//! let config = SimulationConfig::default();
//! let mut map = WaterMap::from_seed(&Seed::default(), &config)?;
//!
//! let pool = WorkerPool::new(config.engine.threads)?;
//! let mut engine = WaterSimulationEngine::new(map.geometry, pool);
//! for _ in 0..100 {
//!     engine.process_host(&mut map)?;
//! }
//!
//! println!("Total water after 100 ticks: {}", WaterMapStats::from_map(&map).total_water);
//! # Ok::<(), flowgrid::compute::EngineError>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{
    EngineError, SimulationDriver, WaterMap, WaterMapStats, WaterSimulationEngine, WorkerPool,
};
pub use schema::{Scenario, Seed, SimulationConfig, SimulationParameters};
