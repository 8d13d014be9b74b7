//! Per-tick simulation constants supplied by the host.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Immutable constants for one water simulation tick.
///
/// All policy values (flow speed, dam thresholds, penalties) come from the
/// host. `delta_time` is the fixed tick length multiplied by `time_scale`;
/// use [`SimulationParameters::for_tick`] to derive it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    /// Multiplier applied to the fixed tick length.
    pub time_scale: f32,
    /// Outflow gained per unit of water height difference per unit time.
    pub water_flow_speed: f32,
    /// Overflow above which a partial obstacle no longer slows water.
    pub soft_dam_threshold: f32,
    /// Overflow below which a partial obstacle starts decreasing outflow.
    pub mid_dam_threshold: f32,
    /// Overflow below which a partial obstacle applies the full decrease.
    pub hard_dam_threshold: f32,
    /// Outflow decrease per unit time at or below the hard threshold.
    pub max_hard_dam_decrease: f32,
    /// Head required before water spills onto a dry tile.
    pub water_spill_threshold: f32,
    /// Outflow above which the flow-slowdown penalty is considered.
    pub flow_slower_outflow_penalty_threshold: f32,
    /// Fraction of inbound flow an outflow may reach before being penalized.
    pub flow_slower_outflow_max_inflow_part: f32,
    /// Outflow decrease per unit time when the penalty applies.
    pub flow_slower_outflow_penalty: f32,
    /// Maximum outflow from higher ground onto a lower map tile.
    pub max_waterfall_outflow: f32,
    /// Contamination exchanged per unit concentration difference per unit time.
    pub contamination_diffusion_rate: f32,
    /// Elapsed simulated time for this tick.
    pub delta_time: f32,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            water_flow_speed: 1.0,
            soft_dam_threshold: 0.85,
            mid_dam_threshold: 0.65,
            hard_dam_threshold: 0.4,
            max_hard_dam_decrease: 0.25,
            water_spill_threshold: 0.05,
            flow_slower_outflow_penalty_threshold: 0.3,
            flow_slower_outflow_max_inflow_part: 1.2,
            flow_slower_outflow_penalty: 0.2,
            max_waterfall_outflow: 0.8,
            contamination_diffusion_rate: 0.1,
            delta_time: 0.1,
        }
    }
}

impl SimulationParameters {
    /// Copy of these parameters with `delta_time` set for a fixed tick length.
    pub fn for_tick(&self, fixed_delta_time: f32) -> Self {
        Self {
            delta_time: fixed_delta_time * self.time_scale,
            ..*self
        }
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.delta_time.is_finite() && self.delta_time > 0.0) {
            return Err(ConfigError::InvalidTimeStep);
        }
        if !(self.hard_dam_threshold <= self.mid_dam_threshold
            && self.mid_dam_threshold <= self.soft_dam_threshold)
        {
            return Err(ConfigError::DamThresholdOrder {
                hard: self.hard_dam_threshold,
                mid: self.mid_dam_threshold,
                soft: self.soft_dam_threshold,
            });
        }
        let non_negative = [
            ("time_scale", self.time_scale),
            ("water_flow_speed", self.water_flow_speed),
            ("max_hard_dam_decrease", self.max_hard_dam_decrease),
            ("water_spill_threshold", self.water_spill_threshold),
            (
                "flow_slower_outflow_penalty_threshold",
                self.flow_slower_outflow_penalty_threshold,
            ),
            (
                "flow_slower_outflow_max_inflow_part",
                self.flow_slower_outflow_max_inflow_part,
            ),
            ("flow_slower_outflow_penalty", self.flow_slower_outflow_penalty),
            ("max_waterfall_outflow", self.max_waterfall_outflow),
            ("contamination_diffusion_rate", self.contamination_diffusion_rate),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::NegativeParameter { name, value });
            }
        }
        Ok(())
    }
}

/// Constants for a single-field soil engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilFieldParameters {
    /// Level exchanged per unit difference with each open neighbour per unit time.
    pub spread_rate: f32,
    /// Fraction of the level lost per unit time.
    pub decay_rate: f32,
    /// Upper bound of the field.
    pub max_level: f32,
    /// Elapsed simulated time for this tick.
    pub delta_time: f32,
}

impl SoilFieldParameters {
    /// Defaults for soil moisture: spreads quickly from wet tiles and dries out.
    pub fn moisture() -> Self {
        Self {
            spread_rate: 0.2,
            decay_rate: 0.05,
            max_level: 1.0,
            delta_time: 0.1,
        }
    }

    /// Defaults for soil contamination: spreads slowly and lingers.
    pub fn soil_contamination() -> Self {
        Self {
            spread_rate: 0.05,
            decay_rate: 0.01,
            max_level: 1.0,
            delta_time: 0.1,
        }
    }

    /// Copy of these parameters with `delta_time` set.
    pub fn for_tick(&self, delta_time: f32) -> Self {
        Self { delta_time, ..*self }
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.delta_time.is_finite() && self.delta_time > 0.0) {
            return Err(ConfigError::InvalidTimeStep);
        }
        for (name, value) in [
            ("spread_rate", self.spread_rate),
            ("decay_rate", self.decay_rate),
            ("max_level", self.max_level),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::NegativeParameter { name, value });
            }
        }
        Ok(())
    }
}
