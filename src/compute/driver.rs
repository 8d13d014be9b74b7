//! Per-tick backend selection.
//!
//! The host decides every tick whether the row-parallel engine, its
//! sequential path, or a GPU engine (run by the host itself) updates the map.

use super::{EngineError, WaterSimulationEngine, WaterSimulationHost, WorkerPool};
use crate::schema::EngineConfig;

/// Engine that updates the water map for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// The host's GPU engine; the driver leaves the map untouched.
    Gpu,
    /// Row tasks on the worker pool.
    Parallel,
    /// Row tasks serially on the calling thread.
    Sequential,
}

/// Runtime switch set by external configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineSwitch {
    pub parallel_enabled: bool,
    pub gpu_active: bool,
}

impl EngineSwitch {
    /// GPU takes priority, then the parallel engine.
    pub fn backend(&self) -> Backend {
        if self.gpu_active {
            Backend::Gpu
        } else if self.parallel_enabled {
            Backend::Parallel
        } else {
            Backend::Sequential
        }
    }
}

impl From<&EngineConfig> for EngineSwitch {
    fn from(config: &EngineConfig) -> Self {
        Self {
            parallel_enabled: config.parallel_enabled,
            gpu_active: config.gpu_active,
        }
    }
}

/// Drives the water engine once per host tick according to the switch.
pub struct SimulationDriver {
    engine: WaterSimulationEngine,
    pool: WorkerPool,
    switch: EngineSwitch,
    active: Option<Backend>,
}

impl SimulationDriver {
    pub fn new(engine: WaterSimulationEngine, pool: WorkerPool, switch: EngineSwitch) -> Self {
        Self {
            engine,
            pool,
            switch,
            active: None,
        }
    }

    pub fn engine(&self) -> &WaterSimulationEngine {
        &self.engine
    }

    pub fn switch(&self) -> EngineSwitch {
        self.switch
    }

    /// Change the switch; takes effect on the next tick.
    pub fn set_switch(&mut self, switch: EngineSwitch) {
        self.switch = switch;
    }

    /// Backend used by the most recent tick.
    pub fn active_backend(&self) -> Option<Backend> {
        self.active
    }

    /// Run one tick on the selected backend and report which one ran.
    pub fn tick<H: WaterSimulationHost + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> Result<Backend, EngineError> {
        let backend = self.switch.backend();
        if self.active != Some(backend) {
            log::info!("Water simulation backend: {:?}", backend);
            match backend {
                Backend::Parallel => self.engine.use_pool(self.pool.clone()),
                Backend::Sequential => self.engine.use_pool(WorkerPool::inline()),
                Backend::Gpu => {}
            }
            self.active = Some(backend);
        }

        if backend != Backend::Gpu {
            self.engine.process_host(host)?;
        }
        Ok(backend)
    }
}
