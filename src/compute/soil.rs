//! Single-field soil engines (moisture and contamination).
//!
//! Same row-parallel pattern as the water engine over one scalar field: a
//! tick snapshots the levels, then every map row computes its new levels
//! from the snapshot in a single stage.

use std::marker::PhantomData;
use std::time::Instant;

use super::{
    Direction, EngineError, GridGeometry, MapRow, RowScheduler, Stage, WaterMap, WorkerPool,
};
use crate::schema::SoilFieldParameters;

/// Which soil quantity an engine simulates.
pub trait SoilFieldKind: Send + Sync + 'static {
    /// Name used in logs.
    const NAME: &'static str;

    /// Source level of a tile given the water above it.
    fn source(depth: f32, contamination: f32, params: &SoilFieldParameters) -> f32;
}

/// Soil moisture: any water saturates the soil below it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Moisture;

impl SoilFieldKind for Moisture {
    const NAME: &'static str = "soil moisture";

    #[inline]
    fn source(depth: f32, _contamination: f32, params: &SoilFieldParameters) -> f32 {
        if depth > 0.0 { params.max_level } else { 0.0 }
    }
}

/// Soil contamination: soil under water takes the water's contamination.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoilContamination;

impl SoilFieldKind for SoilContamination {
    const NAME: &'static str = "soil contamination";

    #[inline]
    fn source(depth: f32, contamination: f32, params: &SoilFieldParameters) -> f32 {
        if depth > 0.0 {
            (contamination * params.max_level).min(params.max_level)
        } else {
            0.0
        }
    }
}

/// Borrowed soil buffers for one tick.
pub struct SoilFieldView<'a> {
    pub geometry: GridGeometry,
    /// Minimum level a tile is held at this tick.
    pub sources: &'a [f32],
    /// Tiles that hold no soil level and block spreading.
    pub barriers: &'a [bool],
    pub levels: &'a mut [f32],
}

impl SoilFieldView<'_> {
    pub fn validate(&self) -> Result<(), EngineError> {
        self.geometry.check_buffer("sources", self.sources.len())?;
        self.geometry.check_buffer("barriers", self.barriers.len())?;
        self.geometry.check_buffer("levels", self.levels.len())?;
        Ok(())
    }
}

/// Owned soil field.
#[derive(Debug, Clone)]
pub struct SoilField {
    pub geometry: GridGeometry,
    pub sources: Vec<f32>,
    pub barriers: Vec<bool>,
    pub levels: Vec<f32>,
}

impl SoilField {
    pub fn new(geometry: GridGeometry) -> Self {
        let len = geometry.len();
        Self {
            geometry,
            sources: vec![0.0; len],
            barriers: vec![false; len],
            levels: vec![0.0; len],
        }
    }

    #[inline]
    pub fn level(&self, x: usize, y: usize) -> f32 {
        self.levels[self.geometry.index(x, y)]
    }

    pub fn set_barrier(&mut self, x: usize, y: usize, barrier: bool) {
        let i = self.geometry.index(x, y);
        self.barriers[i] = barrier;
    }

    /// Recompute sources from the water map's current depths and contamination.
    pub fn update_sources<K: SoilFieldKind>(
        &mut self,
        water: &WaterMap,
        params: &SoilFieldParameters,
    ) -> Result<(), EngineError> {
        if water.geometry != self.geometry {
            return Err(EngineError::GeometryMismatch);
        }
        for ((source, &depth), &contamination) in self
            .sources
            .iter_mut()
            .zip(&water.depths)
            .zip(&water.contaminations)
        {
            *source = K::source(depth, contamination, params);
        }
        Ok(())
    }

    /// Sum of levels over map tiles.
    pub fn total(&self) -> f32 {
        let g = self.geometry;
        (0..g.height())
            .flat_map(|y| (0..g.width()).map(move |x| g.index(x, y)))
            .map(|i| self.levels[i])
            .sum()
    }

    pub fn view(&mut self) -> SoilFieldView<'_> {
        SoilFieldView {
            geometry: self.geometry,
            sources: &self.sources,
            barriers: &self.barriers,
            levels: &mut self.levels,
        }
    }
}

/// Frozen inputs of the spread stage.
#[derive(Clone, Copy)]
pub struct SoilInputs<'a> {
    pub geometry: &'a GridGeometry,
    pub params: &'a SoilFieldParameters,
    pub snapshot: &'a [f32],
    pub sources: &'a [f32],
    pub barriers: &'a [bool],
}

/// New level of one tile.
#[inline]
pub fn soil_level(index: usize, cells: &SoilInputs<'_>) -> f32 {
    if cells.barriers[index] {
        return 0.0;
    }
    let g = cells.geometry;
    let params = cells.params;
    let own = cells.snapshot[index];
    let spread: f32 = Direction::ALL
        .iter()
        .map(|&direction| g.neighbor(index, direction))
        .filter(|&neighbor| g.is_map_tile(neighbor) && !cells.barriers[neighbor])
        .map(|neighbor| cells.snapshot[neighbor] - own)
        .sum();
    let next = own + params.delta_time * (params.spread_rate * spread - params.decay_rate * own);
    next.max(cells.sources[index]).clamp(0.0, params.max_level)
}

/// Row task of the spread stage.
pub fn soil_row(
    row: MapRow,
    cells: &SoilInputs<'_>,
    levels: &mut [f32],
) -> Result<(), EngineError> {
    for x in 0..cells.geometry.width() {
        let level = soil_level(row.start + x, cells);
        if !level.is_finite() {
            return Err(EngineError::NonFinite {
                stage: Stage::SoilSpread,
                x,
                y: row.y,
            });
        }
        levels[row.offset + x] = level;
    }
    Ok(())
}

/// Row-parallel single-field soil engine.
pub struct SoilFieldEngine<K: SoilFieldKind> {
    geometry: GridGeometry,
    scheduler: RowScheduler,
    snapshot: Vec<f32>,
    ticks: u64,
    _kind: PhantomData<K>,
}

pub type SoilMoistureEngine = SoilFieldEngine<Moisture>;
pub type SoilContaminationEngine = SoilFieldEngine<SoilContamination>;

impl<K: SoilFieldKind> SoilFieldEngine<K> {
    pub fn new(geometry: GridGeometry, pool: WorkerPool) -> Self {
        log::debug!(
            "{} engine for {}x{} map, {} worker threads",
            K::NAME,
            geometry.width(),
            geometry.height(),
            pool.threads()
        );
        Self {
            geometry,
            scheduler: RowScheduler::new(geometry, pool),
            snapshot: vec![0.0; geometry.len()],
            ticks: 0,
            _kind: PhantomData,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn use_pool(&mut self, pool: WorkerPool) {
        self.scheduler.set_pool(pool);
    }

    /// Run one tick over borrowed soil buffers.
    pub fn process_simulation(
        &mut self,
        field: SoilFieldView<'_>,
        params: &SoilFieldParameters,
    ) -> Result<(), EngineError> {
        if field.geometry != self.geometry {
            return Err(EngineError::GeometryMismatch);
        }
        field.validate()?;
        params.validate()?;
        let started = Instant::now();

        self.snapshot.copy_from_slice(field.levels);
        let cells = SoilInputs {
            geometry: &self.geometry,
            params,
            snapshot: &self.snapshot,
            sources: field.sources,
            barriers: field.barriers,
        };
        self.scheduler
            .run(Stage::SoilSpread, field.levels, |row, out| soil_row(row, &cells, out))?;

        self.ticks += 1;
        log::trace!("{} tick {} took {:?}", K::NAME, self.ticks, started.elapsed());
        Ok(())
    }
}
