//! Ledger de repostajes
//!
//! Único componente que escribe `consumption`. Cada operación lee la versión
//! de la secuencia del vehículo, consulta los vecinos por odómetro, arma un
//! `RefuelingBatch` con el repostaje afectado y sus sucesores recalculados, y
//! lo confirma de forma atómica. Si otra escritura sobre el mismo vehículo se
//! adelanta, la operación se repite hasta `max_commit_attempts` veces.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::refueling_dto::{CreateRefuelingRequest, UpdateRefuelingRequest};
use crate::models::refueling::{Refueling, RefuelingFilter};
use crate::repositories::refueling_repository::{RefuelingBatch, RefuelingStore};
use crate::repositories::vehicle_repository::VehicleDirectory;
use crate::services::consumption::compute_consumption;
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 3;

pub struct LedgerService {
    store: Arc<dyn RefuelingStore>,
    vehicles: Arc<dyn VehicleDirectory>,
    max_commit_attempts: u32,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn RefuelingStore>,
        vehicles: Arc<dyn VehicleDirectory>,
        max_commit_attempts: u32,
    ) -> Self {
        Self {
            store,
            vehicles,
            max_commit_attempts: max_commit_attempts.max(1),
        }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Refueling> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Refueling", &id))
    }

    pub async fn list(&self, filter: &RefuelingFilter) -> AppResult<Vec<Refueling>> {
        self.store.list(filter).await
    }

    /// Secuencia completa de un vehículo en orden de odómetro
    pub async fn list_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Refueling>> {
        if !self.vehicles.exists(vehicle_id).await? {
            return Err(not_found_error("Vehicle", &vehicle_id));
        }
        self.store.list_by_vehicle(vehicle_id).await
    }

    pub async fn create(&self, request: CreateRefuelingRequest) -> AppResult<Refueling> {
        request.validate()?;

        let vehicle_id = request.vehicle_id;
        if !self.vehicles.exists(vehicle_id).await? {
            return Err(AppError::InvalidVehicleReference(vehicle_id));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let created = self
            .commit_with_retry(vehicle_id, || self.plan_create(&request, id, now))
            .await?;

        info!(
            "⛽ Repostaje {} registrado para vehículo {} (odómetro {}, consumo {:?})",
            created.id, vehicle_id, created.odometer_reading, created.consumption
        );
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, patch: UpdateRefuelingRequest) -> AppResult<Refueling> {
        patch.validate()?;

        let vehicle_id = self.get(id).await?.vehicle_id;
        let now = Utc::now();
        let updated = self
            .commit_with_retry(vehicle_id, || self.plan_update(id, &patch, now))
            .await?;

        info!(
            "✏️ Repostaje {} actualizado (odómetro {}, consumo {:?})",
            id, updated.odometer_reading, updated.consumption
        );
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let vehicle_id = self.get(id).await?.vehicle_id;
        let now = Utc::now();
        self.commit_with_retry(vehicle_id, || self.plan_delete(id, now))
            .await?;

        info!("🗑️ Repostaje {} eliminado del vehículo {}", id, vehicle_id);
        Ok(())
    }

    async fn commit_with_retry<T, P, Fut>(&self, vehicle_id: Uuid, mut plan: P) -> AppResult<T>
    where
        P: FnMut() -> Fut,
        Fut: Future<Output = AppResult<(RefuelingBatch, T)>>,
    {
        for attempt in 1..=self.max_commit_attempts {
            let version = self.store.sequence_version(vehicle_id).await?;
            let (batch, outcome) = plan().await?;
            debug!(
                "Commit de {} escrituras para vehículo {} (versión {}, intento {})",
                batch.writes.len(),
                vehicle_id,
                version,
                attempt
            );

            match self.store.commit(batch, version).await {
                Ok(()) => return Ok(outcome),
                Err(AppError::ConcurrencyConflict(_)) => {
                    warn!(
                        "⚠️ Conflicto de concurrencia en vehículo {} (intento {}/{})",
                        vehicle_id, attempt, self.max_commit_attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::ConcurrencyConflict(vehicle_id))
    }

    async fn plan_create(
        &self,
        request: &CreateRefuelingRequest,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<(RefuelingBatch, Refueling)> {
        let vehicle_id = request.vehicle_id;
        let odometer = request.odometer_reading;

        self.ensure_free_reading(vehicle_id, odometer, None).await?;

        let preceding = self.store.find_preceding(vehicle_id, odometer, None).await?;
        let succeeding = self.store.find_succeeding(vehicle_id, odometer, None).await?;

        let refueling = Refueling {
            id,
            vehicle_id,
            odometer_reading: odometer,
            liters_filled: request.liters_filled,
            cost_per_liter: request.cost_per_liter,
            total_cost: request.total_cost,
            fuel_type: request.fuel_type,
            occurred_at: request.occurred_at,
            consumption: compute_consumption(
                preceding.map(|p| p.odometer_reading),
                odometer,
                request.liters_filled,
            ),
            driver: request.driver.clone(),
            notes: request.notes.as_deref().and_then(non_blank),
            created_at: now,
            updated_at: now,
        };

        let mut batch = RefuelingBatch::new(vehicle_id).insert(refueling.clone());
        // Back-fill: el siguiente repostaje pasa a tener a este como predecesor
        if let Some(next) = succeeding {
            if let Some(next) = recompute(next, Some(odometer), now) {
                batch = batch.update(next);
            }
        }

        Ok((batch, refueling))
    }

    async fn plan_update(
        &self,
        id: Uuid,
        patch: &UpdateRefuelingRequest,
        now: DateTime<Utc>,
    ) -> AppResult<(RefuelingBatch, Refueling)> {
        let current = self.get(id).await?;
        let vehicle_id = current.vehicle_id;
        let old_odometer = current.odometer_reading;

        let mut updated = current;
        apply_patch(&mut updated, patch);
        updated.updated_at = now;

        let new_odometer = updated.odometer_reading;
        let moved = new_odometer != old_odometer;

        if moved {
            self.ensure_free_reading(vehicle_id, new_odometer, Some(id)).await?;
        }

        if patch.touches_consumption() {
            let preceding = self
                .store
                .find_preceding(vehicle_id, new_odometer, Some(id))
                .await?;
            updated.consumption = compute_consumption(
                preceding.map(|p| p.odometer_reading),
                new_odometer,
                updated.liters_filled,
            );
        }

        let mut batch = RefuelingBatch::new(vehicle_id).update(updated.clone());

        if moved {
            // Sucesor antiguo (pierde al repostaje movido) y sucesor nuevo
            // (lo gana); pueden ser el mismo repostaje.
            let old_next = self
                .store
                .find_succeeding(vehicle_id, old_odometer, Some(id))
                .await?;
            let new_next = self
                .store
                .find_succeeding(vehicle_id, new_odometer, Some(id))
                .await?;

            let mut successors: Vec<Refueling> = old_next.into_iter().collect();
            if let Some(new_next) = new_next {
                if successors.iter().all(|s| s.id != new_next.id) {
                    successors.push(new_next);
                }
            }

            for next in successors {
                let preceding = self
                    .reading_before(vehicle_id, next.odometer_reading, &updated)
                    .await?;
                if let Some(next) = recompute(next, preceding, now) {
                    batch = batch.update(next);
                }
            }
        }

        Ok((batch, updated))
    }

    async fn plan_delete(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<(RefuelingBatch, ())> {
        let current = self.get(id).await?;
        let vehicle_id = current.vehicle_id;
        let odometer = current.odometer_reading;

        let preceding = self
            .store
            .find_preceding(vehicle_id, odometer, Some(id))
            .await?;
        let succeeding = self
            .store
            .find_succeeding(vehicle_id, odometer, Some(id))
            .await?;

        let mut batch = RefuelingBatch::new(vehicle_id).delete(id);
        if let Some(next) = succeeding {
            if let Some(next) = recompute(next, preceding.map(|p| p.odometer_reading), now) {
                batch = batch.update(next);
            }
        }

        Ok((batch, ()))
    }

    async fn ensure_free_reading(
        &self,
        vehicle_id: Uuid,
        odometer: Decimal,
        exclude: Option<Uuid>,
    ) -> AppResult<()> {
        if self
            .store
            .find_at_odometer(vehicle_id, odometer, exclude)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateOdometerReading {
                vehicle_id,
                odometer_reading: odometer,
            });
        }
        Ok(())
    }

    /// Lectura del predecesor de `odometer` con el repostaje `moved` ya en su
    /// nueva posición.
    async fn reading_before(
        &self,
        vehicle_id: Uuid,
        odometer: Decimal,
        moved: &Refueling,
    ) -> AppResult<Option<Decimal>> {
        let others = self
            .store
            .find_preceding(vehicle_id, odometer, Some(moved.id))
            .await?
            .map(|p| p.odometer_reading);

        let moved_reading = moved.odometer_reading;
        let moved_is_closer = moved_reading < odometer && others.map_or(true, |p| moved_reading > p);
        Ok(if moved_is_closer { Some(moved_reading) } else { others })
    }
}

fn apply_patch(refueling: &mut Refueling, patch: &UpdateRefuelingRequest) {
    if let Some(occurred_at) = patch.occurred_at {
        refueling.occurred_at = occurred_at;
    }
    if let Some(odometer) = patch.odometer_reading {
        refueling.odometer_reading = odometer;
    }
    if let Some(liters) = patch.liters_filled {
        refueling.liters_filled = liters;
    }
    if let Some(cost_per_liter) = patch.cost_per_liter {
        refueling.cost_per_liter = cost_per_liter;
    }
    if let Some(total_cost) = patch.total_cost {
        refueling.total_cost = total_cost;
    }
    if let Some(fuel_type) = patch.fuel_type {
        refueling.fuel_type = fuel_type;
    }
    if let Some(driver) = &patch.driver {
        refueling.driver = driver.clone();
    }
    // Un string vacío borra las notas
    if let Some(notes) = &patch.notes {
        refueling.notes = non_blank(notes);
    }
}

fn non_blank(notes: &str) -> Option<String> {
    let trimmed = notes.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Recalcula el consumo de un vecino; `None` si no cambia y no hace falta escribirlo
fn recompute(
    mut refueling: Refueling,
    preceding: Option<Decimal>,
    now: DateTime<Utc>,
) -> Option<Refueling> {
    let consumption = compute_consumption(
        preceding,
        refueling.odometer_reading,
        refueling.liters_filled,
    );
    if consumption == refueling.consumption {
        return None;
    }

    refueling.consumption = consumption;
    refueling.updated_at = now;
    Some(refueling)
}
