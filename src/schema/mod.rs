//! Schema module - Configuration, parameter and seeding types for flowgrid runs.

mod config;
mod parameters;
mod seed;

pub use config::*;
pub use parameters::*;
pub use seed::*;
