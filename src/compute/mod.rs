//! Compute module - Row-parallel grid simulation engines.

mod diffusion;
mod driver;
mod engine;
mod error;
mod grid;
mod movement;
mod outflow;
mod scheduler;
mod soil;
mod water_map;

pub use diffusion::*;
pub use driver::*;
pub use engine::*;
pub use error::*;
pub use grid::*;
pub use movement::*;
pub use outflow::*;
pub use scheduler::*;
pub use soil::*;
pub use water_map::*;
