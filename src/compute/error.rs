use std::fmt;

use crate::schema::ConfigError;

/// A stage of the per-tick pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Outflow,
    Movement,
    DiffusionDelta,
    DiffusionApply,
    SoilSpread,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Outflow => "outflow",
            Stage::Movement => "movement",
            Stage::DiffusionDelta => "diffusion delta",
            Stage::DiffusionApply => "diffusion apply",
            Stage::SoilSpread => "soil spread",
        };
        f.write_str(name)
    }
}

/// Error type for engine construction and ticks.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Grid dimensions must be non-zero")]
    EmptyGrid,

    #[error("Stride {stride} is smaller than map width {width}")]
    StrideTooNarrow { stride: usize, width: usize },

    #[error("Grid layout leaves no padding border around the map")]
    MissingBorder,

    #[error("Buffer {buffer} has length {actual}, expected {expected}")]
    BufferLength {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Map geometry does not match the geometry the engine was built for")]
    GeometryMismatch,

    #[error("Non-finite value produced by {stage} stage at ({x}, {y})")]
    NonFinite { stage: Stage, x: usize, y: usize },

    #[error("Invalid simulation parameters: {0}")]
    InvalidParameters(#[from] ConfigError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
