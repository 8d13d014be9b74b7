//! Outflow stage: per-cell flow toward each of the four neighbours.
//!
//! Reads the tick-start depth snapshot and the committed outflows of the
//! previous tick. Results go to a scratch buffer, so no cell ever observes
//! another cell's outflow from the tick in progress.

use super::{Direction, EngineError, GridGeometry, MapRow, Outflow};
use crate::schema::SimulationParameters;

/// Frozen inputs of the outflow stage.
#[derive(Clone, Copy)]
pub struct OutflowInputs<'a> {
    pub geometry: &'a GridGeometry,
    pub params: &'a SimulationParameters,
    /// Depth snapshot taken at tick start.
    pub depths: &'a [f32],
    /// Outflows committed by the previous tick.
    pub outflows: &'a [Outflow],
    pub surface_heights: &'a [f32],
    pub partial_obstacles: &'a [bool],
    pub min_flow_slower_heights: &'a [f32],
}

/// How a partial obstacle responds to the water pressing against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamResponse {
    /// Outflow decays by this amount per unit time.
    Decrease(f32),
    /// The height difference is scaled by this factor.
    Scale(f32),
    /// No effect.
    Open,
}

/// Classify the overflow (origin water height above the obstacle's surface).
#[inline]
pub fn dam_response(overflow: f32, params: &SimulationParameters) -> DamResponse {
    let hard = params.hard_dam_threshold;
    let mid = params.mid_dam_threshold;
    let soft = params.soft_dam_threshold;

    if overflow < hard {
        DamResponse::Decrease(params.max_hard_dam_decrease)
    } else if overflow < mid {
        let t = (mid - overflow) / (mid - hard);
        DamResponse::Decrease(params.max_hard_dam_decrease * t)
    } else if overflow < soft {
        DamResponse::Scale((overflow - mid) / (soft - mid))
    } else {
        DamResponse::Open
    }
}

/// Sum of committed outflow arriving at `origin` from its four neighbours.
#[inline]
fn committed_inflow(origin: usize, cells: &OutflowInputs<'_>) -> f32 {
    Direction::ALL
        .iter()
        .map(|&direction| {
            let neighbor = cells.geometry.neighbor(origin, direction);
            cells.outflows[neighbor].get(direction.opposite())
        })
        .sum()
}

/// Outflow from `origin` toward the adjacent `target` for this tick.
pub fn directional_outflow(
    origin: usize,
    target: usize,
    previous: f32,
    cells: &OutflowInputs<'_>,
) -> f32 {
    let params = cells.params;
    let dt = params.delta_time;

    let origin_surface = cells.surface_heights[origin];
    let target_surface = cells.surface_heights[target];
    let target_depth = cells.depths[target];
    let origin_water = origin_surface + cells.depths[origin];
    let target_water = target_surface + target_depth;

    let mut height_diff = origin_water - target_water;
    let overflow = origin_water - target_surface;

    if cells.partial_obstacles[target] {
        match dam_response(overflow, params) {
            DamResponse::Decrease(amount) => return (previous - amount * dt).max(0.0),
            DamResponse::Scale(factor) => height_diff *= factor,
            DamResponse::Open => {}
        }
    } else if target_depth == 0.0 {
        height_diff -= params.water_spill_threshold;
    }

    let move_amount = dt * params.water_flow_speed * height_diff;
    let mut outflow = previous + move_amount;

    let threshold = params.flow_slower_outflow_penalty_threshold;
    if outflow > threshold && origin_water >= cells.min_flow_slower_heights[origin] {
        let inflow = committed_inflow(origin, cells);
        if outflow > params.flow_slower_outflow_max_inflow_part * inflow {
            outflow = (outflow - params.flow_slower_outflow_penalty * dt).max(threshold);
        }
    }

    if origin_surface > target_surface
        && outflow > params.max_waterfall_outflow
        && cells.geometry.is_map_tile(target)
    {
        outflow = params.max_waterfall_outflow;
    }

    outflow.max(0.0)
}

/// All four outflows of a cell, scaled so it never sends more than it holds.
pub fn cell_outflow(index: usize, cells: &OutflowInputs<'_>) -> Outflow {
    let depth = cells.depths[index];
    if depth == 0.0 {
        return Outflow::default();
    }

    let g = cells.geometry;
    let previous = cells.outflows[index];
    let toward = |direction: Direction| {
        directional_outflow(
            index,
            g.neighbor(index, direction),
            previous.get(direction),
            cells,
        )
    };
    let outflow = Outflow {
        top: toward(Direction::Top),
        bottom: toward(Direction::Bottom),
        left: toward(Direction::Left),
        right: toward(Direction::Right),
    };

    let dt = cells.params.delta_time;
    let sum = outflow.total();
    if sum > depth / dt {
        outflow.scaled((depth / (sum * dt)).min(1.0))
    } else {
        outflow
    }
}

/// Row task: fill `scratch` (the row's chunk of the scratch buffer).
pub fn outflow_row(
    row: MapRow,
    cells: &OutflowInputs<'_>,
    scratch: &mut [Outflow],
) -> Result<(), EngineError> {
    let out = &mut scratch[row.offset..row.offset + cells.geometry.width()];
    for (x, slot) in out.iter_mut().enumerate() {
        *slot = cell_outflow(row.start + x, cells);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        geometry: GridGeometry,
        params: SimulationParameters,
        depths: Vec<f32>,
        outflows: Vec<Outflow>,
        heights: Vec<f32>,
        obstacles: Vec<bool>,
        flow_slower: Vec<f32>,
    }

    impl Fixture {
        fn new(width: usize, height: usize) -> Self {
            let geometry = GridGeometry::with_border(width, height).unwrap();
            let len = geometry.len();
            Self {
                geometry,
                params: SimulationParameters {
                    water_flow_speed: 0.25,
                    water_spill_threshold: 0.0,
                    flow_slower_outflow_penalty_threshold: 1.0e6,
                    max_waterfall_outflow: 1.0e6,
                    delta_time: 1.0,
                    ..Default::default()
                },
                depths: vec![0.0; len],
                outflows: vec![Outflow::default(); len],
                heights: vec![0.0; len],
                obstacles: vec![false; len],
                flow_slower: vec![0.0; len],
            }
        }

        fn inputs(&self) -> OutflowInputs<'_> {
            OutflowInputs {
                geometry: &self.geometry,
                params: &self.params,
                depths: &self.depths,
                outflows: &self.outflows,
                surface_heights: &self.heights,
                partial_obstacles: &self.obstacles,
                min_flow_slower_heights: &self.flow_slower,
            }
        }

        fn at(&self, x: usize, y: usize) -> usize {
            self.geometry.index(x, y)
        }
    }

    #[test]
    fn test_dry_cell_has_no_outflow() {
        let mut f = Fixture::new(3, 3);
        let center = f.at(1, 1);
        f.outflows[center] = Outflow {
            top: 1.0,
            bottom: 1.0,
            left: 1.0,
            right: 1.0,
        };
        let left = f.at(0, 1);
        f.depths[left] = 5.0;
        assert_eq!(cell_outflow(center, &f.inputs()), Outflow::default());
    }

    #[test]
    fn test_flat_pool_spreads_evenly() {
        let mut f = Fixture::new(3, 3);
        let center = f.at(1, 1);
        f.depths[center] = 10.0;

        let flow = cell_outflow(center, &f.inputs());
        assert_eq!(flow.top, 2.5);
        assert_eq!(flow.bottom, 2.5);
        assert_eq!(flow.left, 2.5);
        assert_eq!(flow.right, 2.5);
    }

    #[test]
    fn test_outflow_scaled_to_available_depth() {
        let mut f = Fixture::new(3, 3);
        f.params.water_flow_speed = 1.0;
        let center = f.at(1, 1);
        f.depths[center] = 2.0;

        let flow = cell_outflow(center, &f.inputs());
        // Unscaled outflow is 2.0 per direction, but only 2.0 is available.
        assert!((flow.total() - 2.0).abs() < 1e-6);
        assert!((flow.left - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_spill_threshold_holds_back_shallow_water() {
        let mut f = Fixture::new(2, 1);
        f.params.water_spill_threshold = 0.1;
        let origin = f.at(0, 0);
        let target = f.at(1, 0);
        f.depths[origin] = 0.05;

        assert_eq!(directional_outflow(origin, target, 0.0, &f.inputs()), 0.0);

        f.depths[target] = 0.01;
        assert!(directional_outflow(origin, target, 0.0, &f.inputs()) > 0.0);
    }

    #[test]
    fn test_previous_outflow_carries_momentum() {
        let mut f = Fixture::new(2, 1);
        let origin = f.at(0, 0);
        let target = f.at(1, 0);
        f.depths[origin] = 1.0;
        f.depths[target] = 1.0;

        // Level water keeps flowing with last tick's outflow.
        let flow = directional_outflow(origin, target, 0.3, &f.inputs());
        assert!((flow - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_dam_response_bands() {
        let params = SimulationParameters {
            hard_dam_threshold: 0.2,
            mid_dam_threshold: 0.6,
            soft_dam_threshold: 1.0,
            max_hard_dam_decrease: 0.4,
            ..Default::default()
        };
        assert_eq!(dam_response(0.1, &params), DamResponse::Decrease(0.4));
        match dam_response(0.4, &params) {
            DamResponse::Decrease(amount) => assert!((amount - 0.2).abs() < 1e-6),
            other => panic!("unexpected response: {:?}", other),
        }
        match dam_response(0.8, &params) {
            DamResponse::Scale(factor) => assert!((factor - 0.5).abs() < 1e-6),
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(dam_response(1.5, &params), DamResponse::Open);
    }

    #[test]
    fn test_low_water_behind_dam_decays_outflow() {
        let mut f = Fixture::new(2, 1);
        f.params.hard_dam_threshold = 0.5;
        f.params.mid_dam_threshold = 0.75;
        f.params.soft_dam_threshold = 1.0;
        f.params.max_hard_dam_decrease = 0.1;
        let origin = f.at(0, 0);
        let target = f.at(1, 0);
        f.obstacles[target] = true;
        f.depths[origin] = 0.3;

        let flow = directional_outflow(origin, target, 0.25, &f.inputs());
        assert!((flow - 0.15).abs() < 1e-6);
        assert_eq!(directional_outflow(origin, target, 0.05, &f.inputs()), 0.0);
    }

    fn dam_fixture() -> (Fixture, usize, usize) {
        let mut f = Fixture::new(2, 1);
        f.params.hard_dam_threshold = 0.2;
        f.params.mid_dam_threshold = 0.6;
        f.params.soft_dam_threshold = 1.0;
        f.params.max_hard_dam_decrease = 0.4;
        let origin = f.at(0, 0);
        let target = f.at(1, 0);
        f.obstacles[target] = true;
        (f, origin, target)
    }

    #[test]
    fn test_dam_between_hard_and_mid_interpolates_decrease() {
        let (mut f, origin, target) = dam_fixture();
        f.depths[origin] = 0.4;

        // Halfway between hard and mid: half of the full decrease.
        let flow = directional_outflow(origin, target, 0.5, &f.inputs());
        assert!((flow - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_dam_between_mid_and_soft_scales_height_difference() {
        let (mut f, origin, target) = dam_fixture();
        f.depths[origin] = 0.8;

        // Height difference 0.8 scaled by 0.5, times flow speed 0.25.
        let flow = directional_outflow(origin, target, 0.0, &f.inputs());
        assert!((flow - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_dam_above_soft_is_open() {
        let (mut f, origin, target) = dam_fixture();
        f.depths[origin] = 1.2;

        let flow = directional_outflow(origin, target, 0.0, &f.inputs());
        assert!((flow - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_flow_slowdown_reads_committed_inflow() {
        let mut f = Fixture::new(3, 1);
        f.params.water_flow_speed = 1.0;
        f.params.flow_slower_outflow_penalty_threshold = 0.5;
        f.params.flow_slower_outflow_max_inflow_part = 1.0;
        f.params.flow_slower_outflow_penalty = 0.25;
        let origin = f.at(1, 0);
        let target = f.at(2, 0);
        f.depths[origin] = 2.0;

        // Tentative outflow 2.0 with no inflow: penalized by 0.25.
        let flow = directional_outflow(origin, target, 0.0, &f.inputs());
        assert!((flow - 1.75).abs() < 1e-6);

        // Enough committed inflow from the left neighbour lifts the penalty.
        let upstream = f.at(0, 0);
        f.outflows[upstream].right = 3.0;
        let flow = directional_outflow(origin, target, 0.0, &f.inputs());
        assert!((flow - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_flow_slowdown_floors_at_threshold() {
        let mut f = Fixture::new(2, 1);
        f.params.water_flow_speed = 1.0;
        f.params.flow_slower_outflow_penalty_threshold = 0.9;
        f.params.flow_slower_outflow_penalty = 5.0;
        let origin = f.at(0, 0);
        let target = f.at(1, 0);
        f.depths[origin] = 1.0;

        let flow = directional_outflow(origin, target, 0.0, &f.inputs());
        assert!((flow - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_flow_slowdown_respects_min_height() {
        let mut f = Fixture::new(2, 1);
        f.params.water_flow_speed = 1.0;
        f.params.flow_slower_outflow_penalty_threshold = 0.5;
        f.params.flow_slower_outflow_penalty = 0.25;
        let origin = f.at(0, 0);
        let target = f.at(1, 0);
        f.depths[origin] = 1.0;
        f.flow_slower[origin] = 2.0;

        let flow = directional_outflow(origin, target, 0.0, &f.inputs());
        assert!((flow - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_waterfall_cap_only_onto_map_tiles() {
        let mut f = Fixture::new(2, 1);
        f.params.water_flow_speed = 1.0;
        f.params.max_waterfall_outflow = 0.5;
        let origin = f.at(0, 0);
        let target = f.at(1, 0);
        f.heights[origin] = 10.0;
        f.depths[origin] = 1.0;
        f.depths[target] = 1.0;

        assert_eq!(directional_outflow(origin, target, 0.0, &f.inputs()), 0.5);

        let border = f.geometry.neighbor(origin, Direction::Left);
        assert!(directional_outflow(origin, border, 0.0, &f.inputs()) > 0.5);
    }

    #[test]
    fn test_uphill_outflow_is_zero() {
        let mut f = Fixture::new(2, 1);
        let origin = f.at(0, 0);
        let target = f.at(1, 0);
        f.heights[target] = 5.0;
        f.depths[origin] = 1.0;
        assert_eq!(directional_outflow(origin, target, 0.2, &f.inputs()), 0.0);
    }

    #[test]
    fn test_row_writes_only_map_columns() {
        let mut f = Fixture::new(3, 2);
        let wet = f.at(1, 1);
        f.depths[wet] = 4.0;
        let stride = f.geometry.stride();
        let mut chunk = vec![
            Outflow {
                top: -1.0,
                ..Default::default()
            };
            stride
        ];
        let row = f.geometry.row(f.geometry.first_row() + 1);
        outflow_row(row, &f.inputs(), &mut chunk).unwrap();

        assert_eq!(chunk[0].top, -1.0);
        assert_eq!(chunk[stride - 1].top, -1.0);
        assert_eq!(chunk[row.offset], Outflow::default());
        assert!(chunk[row.offset + 1].total() > 0.0);
    }
}
