//! Configuration types for flowgrid simulation runs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{SimulationParameters, SoilFieldParameters};

fn default_fixed_delta_time() -> f32 {
    0.1
}

fn default_true() -> bool {
    true
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Map width in tiles.
    pub width: usize,
    /// Map height in tiles.
    pub height: usize,
    /// Fixed host tick length, scaled by `parameters.time_scale`.
    #[serde(default = "default_fixed_delta_time")]
    pub fixed_delta_time: f32,
    /// Worker pool and backend selection.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Water flow constants.
    #[serde(default)]
    pub parameters: SimulationParameters,
    /// Soil moisture constants.
    #[serde(default = "SoilFieldParameters::moisture")]
    pub moisture: SoilFieldParameters,
    /// Soil contamination constants.
    #[serde(default = "SoilFieldParameters::soil_contamination")]
    pub soil_contamination: SoilFieldParameters,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            fixed_delta_time: default_fixed_delta_time(),
            engine: EngineConfig::default(),
            parameters: SimulationParameters::default(),
            moisture: SoilFieldParameters::moisture(),
            soil_contamination: SoilFieldParameters::soil_contamination(),
        }
    }
}

/// Worker pool and backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker thread count. 0 uses the available hardware parallelism.
    #[serde(default)]
    pub threads: usize,
    /// Run the row-parallel engine instead of the sequential path.
    #[serde(default = "default_true")]
    pub parallel_enabled: bool,
    /// A GPU engine is active and takes priority over both CPU paths.
    #[serde(default)]
    pub gpu_active: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            parallel_enabled: true,
            gpu_active: false,
        }
    }
}

impl SimulationConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Water parameters with `delta_time` derived from the fixed tick length.
    pub fn tick_parameters(&self) -> SimulationParameters {
        self.parameters.for_tick(self.fixed_delta_time)
    }

    /// Soil moisture parameters sharing the water tick's `delta_time`.
    pub fn moisture_parameters(&self) -> SoilFieldParameters {
        self.moisture.for_tick(self.tick_parameters().delta_time)
    }

    /// Soil contamination parameters sharing the water tick's `delta_time`.
    pub fn soil_contamination_parameters(&self) -> SoilFieldParameters {
        self.soil_contamination
            .for_tick(self.tick_parameters().delta_time)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if !(self.fixed_delta_time.is_finite() && self.fixed_delta_time > 0.0) {
            return Err(ConfigError::InvalidTimeStep);
        }
        self.tick_parameters().validate()?;
        self.moisture_parameters().validate()?;
        self.soil_contamination_parameters().validate()?;
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid dimensions (width, height) must be non-zero")]
    InvalidDimensions,
    #[error("Time step must be positive and finite")]
    InvalidTimeStep,
    #[error("Dam thresholds must satisfy hard <= mid <= soft (got {hard}, {mid}, {soft})")]
    DamThresholdOrder { hard: f32, mid: f32, soft: f32 },
    #[error("Parameter {name} must be non-negative and finite (got {value})")]
    NegativeParameter { name: &'static str, value: f32 },
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
