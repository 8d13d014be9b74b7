//! Host-facing water map types.
//!
//! The engine never owns the host's grid. Each tick it borrows a
//! [`WaterMapView`] for the duration of one call; [`WaterMap`] is an owned
//! host used by the CLI, benchmarks and tests.

use super::{Direction, EngineError, GridGeometry};
use crate::schema::{Seed, SimulationConfig, SimulationParameters};

/// Surface height given to border cells of a closed [`WaterMap`].
pub const BORDER_HEIGHT: f32 = 1.0e4;

/// Per-direction outflow of one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Outflow {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Outflow {
    #[inline]
    pub fn get(&self, direction: Direction) -> f32 {
        match direction {
            Direction::Top => self.top,
            Direction::Bottom => self.bottom,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    #[inline]
    pub fn total(&self) -> f32 {
        self.top + self.bottom + self.left + self.right
    }

    #[inline]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            top: self.top * factor,
            bottom: self.bottom * factor,
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

/// Borrowed host buffers for one tick.
pub struct WaterMapView<'a> {
    pub geometry: GridGeometry,
    /// Terrain or obstacle height per cell.
    pub surface_heights: &'a [f32],
    /// Cells that partially impede flow (dam-like).
    pub partial_obstacles: &'a [bool],
    /// Water height at or above which the flow-slowdown penalty applies.
    pub min_flow_slower_heights: &'a [f32],
    pub depths: &'a mut [f32],
    pub outflows: &'a mut [Outflow],
    pub contaminations: &'a mut [f32],
}

impl WaterMapView<'_> {
    /// Check every buffer against the view's geometry.
    pub fn validate(&self) -> Result<(), EngineError> {
        let g = &self.geometry;
        g.check_buffer("surface_heights", self.surface_heights.len())?;
        g.check_buffer("partial_obstacles", self.partial_obstacles.len())?;
        g.check_buffer("min_flow_slower_heights", self.min_flow_slower_heights.len())?;
        g.check_buffer("depths", self.depths.len())?;
        g.check_buffer("outflows", self.outflows.len())?;
        g.check_buffer("contaminations", self.contaminations.len())?;
        Ok(())
    }
}

/// A host simulation whose water grid the engine updates.
pub trait WaterSimulationHost {
    /// Constants for the tick about to run.
    fn parameters(&self) -> SimulationParameters;

    /// Borrow the grid buffers for one tick.
    fn water_map(&mut self) -> WaterMapView<'_>;
}

/// Owned water grid with a closed border.
#[derive(Debug, Clone)]
pub struct WaterMap {
    pub geometry: GridGeometry,
    pub parameters: SimulationParameters,
    pub surface_heights: Vec<f32>,
    pub partial_obstacles: Vec<bool>,
    pub min_flow_slower_heights: Vec<f32>,
    pub depths: Vec<f32>,
    pub outflows: Vec<Outflow>,
    pub contaminations: Vec<f32>,
}

impl WaterMap {
    /// Dry, flat `width × height` map surrounded by a high border.
    pub fn new(
        width: usize,
        height: usize,
        parameters: SimulationParameters,
    ) -> Result<Self, EngineError> {
        let geometry = GridGeometry::with_border(width, height)?;
        let len = geometry.len();
        let surface_heights = (0..len)
            .map(|i| {
                if geometry.is_map_tile(i) {
                    0.0
                } else {
                    BORDER_HEIGHT
                }
            })
            .collect();

        Ok(Self {
            geometry,
            parameters,
            surface_heights,
            partial_obstacles: vec![false; len],
            min_flow_slower_heights: vec![0.0; len],
            depths: vec![0.0; len],
            outflows: vec![Outflow::default(); len],
            contaminations: vec![0.0; len],
        })
    }

    /// Build a map from a seed, with tick parameters from the config.
    pub fn from_seed(seed: &Seed, config: &SimulationConfig) -> Result<Self, EngineError> {
        let mut map = Self::new(config.width, config.height, config.tick_parameters())?;
        let layers = seed.generate(config.width, config.height);
        for y in 0..config.height {
            for x in 0..config.width {
                let src = layers.idx(x, y);
                let dst = map.geometry.index(x, y);
                map.surface_heights[dst] = layers.surface_heights[src];
                map.partial_obstacles[dst] = layers.partial_obstacles[src];
                map.depths[dst] = layers.depths[src].max(0.0);
                map.contaminations[dst] = layers.contaminations[src].clamp(0.0, 1.0);
            }
        }
        Ok(map)
    }

    #[inline]
    pub fn depth(&self, x: usize, y: usize) -> f32 {
        self.depths[self.geometry.index(x, y)]
    }

    #[inline]
    pub fn contamination(&self, x: usize, y: usize) -> f32 {
        self.contaminations[self.geometry.index(x, y)]
    }

    #[inline]
    pub fn outflow(&self, x: usize, y: usize) -> Outflow {
        self.outflows[self.geometry.index(x, y)]
    }

    pub fn set_depth(&mut self, x: usize, y: usize, depth: f32) {
        let i = self.geometry.index(x, y);
        self.depths[i] = depth;
    }

    pub fn set_contamination(&mut self, x: usize, y: usize, contamination: f32) {
        let i = self.geometry.index(x, y);
        self.contaminations[i] = contamination;
    }

    pub fn set_surface_height(&mut self, x: usize, y: usize, height: f32) {
        let i = self.geometry.index(x, y);
        self.surface_heights[i] = height;
    }

    pub fn set_partial_obstacle(&mut self, x: usize, y: usize, obstacle: bool) {
        let i = self.geometry.index(x, y);
        self.partial_obstacles[i] = obstacle;
    }

    /// Give every border cell the same surface height. Low borders drain water.
    pub fn set_border_height(&mut self, height: f32) {
        for i in 0..self.geometry.len() {
            if !self.geometry.is_map_tile(i) {
                self.surface_heights[i] = height;
            }
        }
    }

    /// Borrow all buffers as a view.
    pub fn view(&mut self) -> WaterMapView<'_> {
        WaterMapView {
            geometry: self.geometry,
            surface_heights: &self.surface_heights,
            partial_obstacles: &self.partial_obstacles,
            min_flow_slower_heights: &self.min_flow_slower_heights,
            depths: &mut self.depths,
            outflows: &mut self.outflows,
            contaminations: &mut self.contaminations,
        }
    }

    /// Total water over map tiles.
    pub fn total_water(&self) -> f32 {
        self.map_tiles().map(|i| self.depths[i]).sum()
    }

    /// Indices of all map tiles in row order.
    pub fn map_tiles(&self) -> impl Iterator<Item = usize> + '_ {
        let g = self.geometry;
        (0..g.height()).flat_map(move |y| (0..g.width()).map(move |x| g.index(x, y)))
    }
}

impl WaterSimulationHost for WaterMap {
    fn parameters(&self) -> SimulationParameters {
        self.parameters
    }

    fn water_map(&mut self) -> WaterMapView<'_> {
        self.view()
    }
}

/// Water map statistics for monitoring.
#[derive(Debug, Clone)]
pub struct WaterMapStats {
    pub total_water: f32,
    pub max_depth: f32,
    pub wet_tiles: usize,
    /// Sum of `depth × contamination` over map tiles.
    pub contaminant_mass: f32,
    pub max_contamination: f32,
}

impl WaterMapStats {
    pub fn from_map(map: &WaterMap) -> Self {
        let mut stats = Self {
            total_water: 0.0,
            max_depth: 0.0,
            wet_tiles: 0,
            contaminant_mass: 0.0,
            max_contamination: 0.0,
        };
        for i in map.map_tiles() {
            let depth = map.depths[i];
            let contamination = map.contaminations[i];
            stats.total_water += depth;
            stats.max_depth = stats.max_depth.max(depth);
            stats.contaminant_mass += depth * contamination;
            stats.max_contamination = stats.max_contamination.max(contamination);
            if depth > 0.0 {
                stats.wet_tiles += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_map_has_high_border() {
        let map = WaterMap::new(3, 2, SimulationParameters::default()).unwrap();
        for i in 0..map.geometry.len() {
            let expected = if map.geometry.is_map_tile(i) {
                0.0
            } else {
                BORDER_HEIGHT
            };
            assert_eq!(map.surface_heights[i], expected);
        }
    }

    #[test]
    fn test_from_seed_places_layers_inside_border() {
        let config = SimulationConfig {
            width: 20,
            height: 20,
            ..Default::default()
        };
        let map = WaterMap::from_seed(&Seed::default(), &config).unwrap();
        assert_eq!(map.depth(10, 10), 2.0);
        assert_eq!(map.contamination(10, 10), 0.5);
        assert_eq!(map.parameters, config.tick_parameters());
        assert!((0..map.geometry.len())
            .filter(|&i| !map.geometry.is_map_tile(i))
            .all(|i| map.depths[i] == 0.0));
    }

    #[test]
    fn test_view_validates() {
        let mut map = WaterMap::new(4, 4, SimulationParameters::default()).unwrap();
        assert!(map.view().validate().is_ok());

        map.contaminations.pop();
        assert!(matches!(
            map.view().validate(),
            Err(EngineError::BufferLength {
                buffer: "contaminations",
                ..
            })
        ));
    }

    #[test]
    fn test_stats_ignore_border() {
        let mut map = WaterMap::new(2, 2, SimulationParameters::default()).unwrap();
        map.set_depth(0, 0, 2.0);
        map.set_contamination(0, 0, 0.5);
        map.set_depth(1, 1, 1.0);
        map.depths[0] = 100.0;

        let stats = WaterMapStats::from_map(&map);
        assert_eq!(stats.total_water, 3.0);
        assert_eq!(stats.max_depth, 2.0);
        assert_eq!(stats.wet_tiles, 2);
        assert_eq!(stats.contaminant_mass, 1.0);
        assert_eq!(stats.max_contamination, 0.5);
    }

    #[test]
    fn test_outflow_helpers() {
        let flow = Outflow {
            top: 1.0,
            bottom: 2.0,
            left: 3.0,
            right: 4.0,
        };
        assert_eq!(flow.total(), 10.0);
        assert_eq!(flow.get(Direction::Left), 3.0);
        assert_eq!(flow.scaled(0.5).right, 2.0);
    }
}
