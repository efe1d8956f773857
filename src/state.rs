//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::memory::{InMemoryRefuelingStore, InMemoryVehicleDirectory};
use crate::repositories::refueling_repository::{PgRefuelingStore, RefuelingStore};
use crate::repositories::vehicle_repository::{VehicleDirectory, VehicleRepository};
use crate::services::ledger_service::LedgerService;
use crate::services::statistics_service::StatisticsService;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub ledger: Arc<LedgerService>,
    pub statistics: Arc<StatisticsService>,
    pub vehicles: Arc<dyn VehicleDirectory>,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        store: Arc<dyn RefuelingStore>,
        vehicles: Arc<dyn VehicleDirectory>,
    ) -> Self {
        let ledger = LedgerService::new(store.clone(), vehicles.clone(), config.max_commit_attempts);
        let statistics = StatisticsService::new(store, vehicles.clone());

        Self {
            config,
            ledger: Arc::new(ledger),
            statistics: Arc::new(statistics),
            vehicles,
        }
    }

    /// Estado respaldado por PostgreSQL
    pub fn postgres(pool: PgPool, config: EnvironmentConfig) -> Self {
        Self::new(
            config,
            Arc::new(PgRefuelingStore::new(pool.clone())),
            Arc::new(VehicleRepository::new(pool)),
        )
    }

    /// Estado en memoria, para desarrollo y tests
    pub fn in_memory(config: EnvironmentConfig) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryRefuelingStore::new()),
            Arc::new(InMemoryVehicleDirectory::new()),
        )
    }
}
