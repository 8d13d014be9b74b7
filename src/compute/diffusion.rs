//! Contamination diffusion between wet neighbours, in two phases.
//!
//! Phase 1 computes every cell's delta from the frozen post-movement
//! concentrations. Phase 2 applies the deltas and clears dry tiles. Phase 2
//! needs all of phase 1, so the two run as separate stages.

use super::{Direction, EngineError, GridGeometry, MapRow};

/// Frozen inputs of both diffusion phases.
#[derive(Clone, Copy)]
pub struct DiffusionInputs<'a> {
    pub geometry: &'a GridGeometry,
    pub rate: f32,
    pub delta_time: f32,
    /// Depths after this tick's movement.
    pub depths: &'a [f32],
    /// Concentrations after this tick's movement.
    pub contamination: &'a [f32],
}

/// Concentration change of a cell from its wet neighbours.
#[inline]
pub fn diffusion_delta(index: usize, cells: &DiffusionInputs<'_>) -> f32 {
    if cells.depths[index] <= 0.0 {
        return 0.0;
    }
    let own = cells.contamination[index];
    let exchange: f32 = Direction::ALL
        .iter()
        .map(|&direction| cells.geometry.neighbor(index, direction))
        .filter(|&neighbor| cells.depths[neighbor] > 0.0)
        .map(|neighbor| cells.contamination[neighbor] - own)
        .sum();
    cells.rate * cells.delta_time * exchange
}

/// Final concentration of a cell.
#[inline]
pub fn apply_diffusion(index: usize, delta: f32, cells: &DiffusionInputs<'_>) -> f32 {
    if cells.depths[index] > 0.0 {
        (cells.contamination[index] + delta).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Phase 1 row task.
pub fn delta_row(
    row: MapRow,
    cells: &DiffusionInputs<'_>,
    deltas: &mut [f32],
) -> Result<(), EngineError> {
    let out = &mut deltas[row.offset..row.offset + cells.geometry.width()];
    for (x, delta) in out.iter_mut().enumerate() {
        *delta = diffusion_delta(row.start + x, cells);
    }
    Ok(())
}

/// Phase 2 row task. `deltas` is the complete phase 1 output.
pub fn apply_row(
    row: MapRow,
    cells: &DiffusionInputs<'_>,
    deltas: &[f32],
    contaminations: &mut [f32],
) -> Result<(), EngineError> {
    let out = &mut contaminations[row.offset..row.offset + cells.geometry.width()];
    for (x, contamination) in out.iter_mut().enumerate() {
        let index = row.start + x;
        *contamination = apply_diffusion(index, deltas[index], cells);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_pulls_toward_wet_neighbors() {
        let g = GridGeometry::with_border(3, 1).unwrap();
        let mut depths = vec![0.0; g.len()];
        let mut contamination = vec![0.0; g.len()];
        for x in 0..3 {
            depths[g.index(x, 0)] = 1.0;
        }
        contamination[g.index(0, 0)] = 1.0;
        // Dry cells never exchange, whatever they hold.
        contamination[g.neighbor(g.index(1, 0), Direction::Top)] = 1.0;

        let cells = DiffusionInputs {
            geometry: &g,
            rate: 0.1,
            delta_time: 1.0,
            depths: &depths,
            contamination: &contamination,
        };

        assert!((diffusion_delta(g.index(0, 0), &cells) + 0.1).abs() < 1e-6);
        assert!((diffusion_delta(g.index(1, 0), &cells) - 0.1).abs() < 1e-6);
        assert_eq!(diffusion_delta(g.index(2, 0), &cells), 0.0);
    }

    #[test]
    fn test_apply_clears_dry_tiles_and_clamps() {
        let g = GridGeometry::with_border(2, 1).unwrap();
        let mut depths = vec![0.0; g.len()];
        let mut contamination = vec![0.0; g.len()];
        let wet = g.index(0, 0);
        let dry = g.index(1, 0);
        depths[wet] = 1.0;
        contamination[wet] = 0.95;
        contamination[dry] = 0.7;

        let cells = DiffusionInputs {
            geometry: &g,
            rate: 0.1,
            delta_time: 1.0,
            depths: &depths,
            contamination: &contamination,
        };
        assert_eq!(apply_diffusion(wet, 0.2, &cells), 1.0);
        assert_eq!(apply_diffusion(wet, -2.0, &cells), 0.0);
        assert_eq!(apply_diffusion(dry, 0.1, &cells), 0.0);
    }
}
