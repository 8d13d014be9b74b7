//! Movement stage: apply committed outflows to depth and carry contaminant.

use super::{Direction, EngineError, GridGeometry, MapRow, Outflow, Stage};

/// Frozen inputs of the movement stage.
#[derive(Clone, Copy)]
pub struct MovementInputs<'a> {
    pub geometry: &'a GridGeometry,
    pub delta_time: f32,
    pub depth_snapshot: &'a [f32],
    pub contamination_snapshot: &'a [f32],
    /// Outflows committed by this tick's outflow stage.
    pub outflows: &'a [Outflow],
}

/// New `(depth, contamination)` of a cell after this tick's flow.
///
/// Outbound water carries the cell's own concentration; inbound water
/// carries the concentration of the neighbour it came from.
#[inline]
pub fn move_cell(index: usize, cells: &MovementInputs<'_>) -> (f32, f32) {
    let dt = cells.delta_time;
    let depth = cells.depth_snapshot[index];
    let concentration = cells.contamination_snapshot[index];
    let outbound = cells.outflows[index].total();

    let mut inbound = 0.0f32;
    let mut inbound_mass = 0.0f32;
    for direction in Direction::ALL {
        let neighbor = cells.geometry.neighbor(index, direction);
        let flow = cells.outflows[neighbor].get(direction.opposite());
        inbound += flow;
        inbound_mass += flow * cells.contamination_snapshot[neighbor];
    }

    // Comparison rather than `max` so a NaN depth reaches the row check.
    let new_depth = depth + dt * (inbound - outbound);
    let new_depth = if new_depth < 0.0 { 0.0 } else { new_depth };
    let mass = depth * concentration + dt * (inbound_mass - outbound * concentration);
    let new_concentration = if new_depth > 0.0 {
        (mass / new_depth).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (new_depth, new_concentration)
}

/// Row task: write new depths and moved concentrations for one row.
pub fn movement_row(
    row: MapRow,
    cells: &MovementInputs<'_>,
    depths: &mut [f32],
    moved_contamination: &mut [f32],
) -> Result<(), EngineError> {
    let width = cells.geometry.width();
    for x in 0..width {
        let (depth, concentration) = move_cell(row.start + x, cells);
        if !depth.is_finite() {
            return Err(EngineError::NonFinite {
                stage: Stage::Movement,
                x,
                y: row.y,
            });
        }
        depths[row.offset + x] = depth;
        moved_contamination[row.offset + x] = concentration;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(width: usize, height: usize) -> (GridGeometry, Vec<f32>, Vec<f32>, Vec<Outflow>) {
        let geometry = GridGeometry::with_border(width, height).unwrap();
        let len = geometry.len();
        (
            geometry,
            vec![0.0; len],
            vec![0.0; len],
            vec![Outflow::default(); len],
        )
    }

    #[test]
    fn test_water_moves_between_neighbors() {
        let (g, mut depths, mut contamination, mut outflows) = fixture(2, 1);
        let a = g.index(0, 0);
        let b = g.index(1, 0);
        depths[a] = 2.0;
        contamination[a] = 0.5;
        depths[b] = 1.0;
        outflows[a].right = 0.5;

        let cells = MovementInputs {
            geometry: &g,
            delta_time: 1.0,
            depth_snapshot: &depths,
            contamination_snapshot: &contamination,
            outflows: &outflows,
        };

        let (depth_a, c_a) = move_cell(a, &cells);
        let (depth_b, c_b) = move_cell(b, &cells);
        assert!((depth_a - 1.5).abs() < 1e-6);
        assert!((c_a - 0.5).abs() < 1e-6);
        assert!((depth_b - 1.5).abs() < 1e-6);
        // 0.25 units of contaminant diluted into 1.5 units of water.
        assert!((c_b - 0.25 / 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_drained_cell_is_clean() {
        let (g, mut depths, mut contamination, mut outflows) = fixture(2, 1);
        let a = g.index(0, 0);
        depths[a] = 1.0;
        contamination[a] = 0.8;
        outflows[a].right = 1.0;

        let cells = MovementInputs {
            geometry: &g,
            delta_time: 1.0,
            depth_snapshot: &depths,
            contamination_snapshot: &contamination,
            outflows: &outflows,
        };
        assert_eq!(move_cell(a, &cells), (0.0, 0.0));
        let (depth_b, c_b) = move_cell(g.index(1, 0), &cells);
        assert!((depth_b - 1.0).abs() < 1e-6);
        assert!((c_b - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_depth_aborts_row() {
        let (g, mut depths, contamination, outflows) = fixture(3, 1);
        depths[g.index(2, 0)] = f32::INFINITY;
        let cells = MovementInputs {
            geometry: &g,
            delta_time: 1.0,
            depth_snapshot: &depths,
            contamination_snapshot: &contamination,
            outflows: &outflows,
        };
        let mut out_depths = vec![0.0; g.stride()];
        let mut out_contamination = vec![0.0; g.stride()];
        let result = movement_row(
            g.row(g.first_row()),
            &cells,
            &mut out_depths,
            &mut out_contamination,
        );
        assert!(matches!(
            result,
            Err(EngineError::NonFinite {
                stage: Stage::Movement,
                x: 2,
                y: 0
            })
        ));
    }
}
