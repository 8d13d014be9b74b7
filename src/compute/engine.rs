//! Water simulation engine - runs one host tick across the worker pool.
//!
//! Stage order per tick:
//!
//! 1. snapshot depths and contamination
//! 2. outflow (into scratch), then commit scratch to the host's outflows
//! 3. movement (depths and moved contamination)
//! 4. diffusion deltas
//! 5. diffusion apply
//!
//! Each stage is a barrier. Within a stage every row task writes only its own
//! row and reads only buffers no task of that stage writes.

use std::time::Instant;

use super::{
    DiffusionInputs, EngineError, GridGeometry, MovementInputs, Outflow, OutflowInputs,
    RowScheduler, Stage, WaterMapView, WaterSimulationHost, WorkerPool, apply_row, delta_row,
    movement_row, outflow_row,
};
use crate::schema::SimulationParameters;

/// Row-parallel water, outflow and contamination update.
pub struct WaterSimulationEngine {
    geometry: GridGeometry,
    scheduler: RowScheduler,
    depth_snapshot: Vec<f32>,
    contamination_snapshot: Vec<f32>,
    scratch_outflows: Vec<Outflow>,
    moved_contamination: Vec<f32>,
    diffusion_deltas: Vec<f32>,
    ticks: u64,
}

impl WaterSimulationEngine {
    /// Create an engine for maps with `geometry`, running on `pool`.
    pub fn new(geometry: GridGeometry, pool: WorkerPool) -> Self {
        let len = geometry.len();
        log::debug!(
            "Water engine for {}x{} map (stride {}), {} worker threads",
            geometry.width(),
            geometry.height(),
            geometry.stride(),
            pool.threads()
        );
        Self {
            geometry,
            scheduler: RowScheduler::new(geometry, pool),
            depth_snapshot: vec![0.0; len],
            contamination_snapshot: vec![0.0; len],
            scratch_outflows: vec![Outflow::default(); len],
            moved_contamination: vec![0.0; len],
            diffusion_deltas: vec![0.0; len],
            ticks: 0,
        }
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn pool(&self) -> &WorkerPool {
        self.scheduler.pool()
    }

    /// Switch the pool subsequent ticks run on.
    pub fn use_pool(&mut self, pool: WorkerPool) {
        self.scheduler.set_pool(pool);
    }

    /// Run one tick against a host.
    pub fn process_host<H: WaterSimulationHost + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> Result<(), EngineError> {
        let params = host.parameters();
        self.process_simulation(host.water_map(), &params)
    }

    /// Run one tick over borrowed host buffers.
    ///
    /// On error the map may hold partial results of the failed stage.
    pub fn process_simulation(
        &mut self,
        map: WaterMapView<'_>,
        params: &SimulationParameters,
    ) -> Result<(), EngineError> {
        if map.geometry != self.geometry {
            return Err(EngineError::GeometryMismatch);
        }
        map.validate()?;
        params.validate()?;
        let started = Instant::now();

        let WaterMapView {
            geometry: _,
            surface_heights,
            partial_obstacles,
            min_flow_slower_heights,
            depths,
            outflows,
            contaminations,
        } = map;
        let Self {
            geometry,
            scheduler,
            depth_snapshot,
            contamination_snapshot,
            scratch_outflows,
            moved_contamination,
            diffusion_deltas,
            ticks,
        } = self;
        let geometry: &GridGeometry = geometry;
        let scheduler: &RowScheduler = scheduler;

        depth_snapshot.copy_from_slice(depths);
        contamination_snapshot.copy_from_slice(contaminations);

        {
            let cells = OutflowInputs {
                geometry,
                params,
                depths: &depth_snapshot[..],
                outflows: &outflows[..],
                surface_heights,
                partial_obstacles,
                min_flow_slower_heights,
            };
            scheduler.run(Stage::Outflow, &mut scratch_outflows[..], |row, out| {
                outflow_row(row, &cells, out)
            })?;
        }
        outflows.copy_from_slice(&scratch_outflows[..]);

        {
            let cells = MovementInputs {
                geometry,
                delta_time: params.delta_time,
                depth_snapshot: &depth_snapshot[..],
                contamination_snapshot: &contamination_snapshot[..],
                outflows: &outflows[..],
            };
            scheduler.run_pair(
                Stage::Movement,
                &mut depths[..],
                &mut moved_contamination[..],
                |row, depths, moved| movement_row(row, &cells, depths, moved),
            )?;
        }

        let cells = DiffusionInputs {
            geometry,
            rate: params.contamination_diffusion_rate,
            delta_time: params.delta_time,
            depths: &depths[..],
            contamination: &moved_contamination[..],
        };
        scheduler.run(Stage::DiffusionDelta, &mut diffusion_deltas[..], |row, out| {
            delta_row(row, &cells, out)
        })?;
        let deltas = &diffusion_deltas[..];
        scheduler.run(Stage::DiffusionApply, &mut contaminations[..], |row, out| {
            apply_row(row, &cells, deltas, out)
        })?;

        *ticks += 1;
        log::trace!("Water tick {} took {:?}", ticks, started.elapsed());
        Ok(())
    }
}
