//! Almacenes en memoria
//!
//! Implementaciones de `RefuelingStore` y `VehicleDirectory` sin base de datos.
//! Se usan cuando no hay `DATABASE_URL` configurada y en los tests.
//!
//! Cada vehículo tiene su propia secuencia protegida por su propio lock, así
//! que las escrituras de vehículos distintos nunca se bloquean entre sí.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::refueling::{Refueling, RefuelingFilter};
use crate::models::vehicle::Vehicle;
use crate::repositories::refueling_repository::{RefuelingBatch, RefuelingStore, RefuelingWrite};
use crate::repositories::vehicle_repository::VehicleDirectory;
use crate::utils::errors::{conflict_error, AppError, AppResult};

#[derive(Debug, Default, Clone)]
struct VehicleSequence {
    version: i64,
    by_odometer: BTreeMap<Decimal, Refueling>,
}

impl VehicleSequence {
    fn find(&self, id: Uuid) -> Option<&Refueling> {
        self.by_odometer.values().find(|r| r.id == id)
    }

    fn remove(&mut self, id: Uuid) -> Option<Refueling> {
        let key = self.find(id)?.odometer_reading;
        self.by_odometer.remove(&key)
    }

    /// Aplica el lote sobre una copia; la secuencia original solo se
    /// reemplaza si todas las escrituras son válidas.
    fn apply(&self, batch: RefuelingBatch) -> AppResult<BTreeMap<Decimal, Refueling>> {
        let mut next = self.clone();
        let mut placed = Vec::new();

        for write in batch.writes {
            match write {
                RefuelingWrite::Delete(id) => {
                    next.remove(id)
                        .ok_or_else(|| AppError::NotFound(format!("Refueling {} not found", id)))?;
                }
                RefuelingWrite::Update(refueling) => {
                    next.remove(refueling.id).ok_or_else(|| {
                        AppError::NotFound(format!("Refueling {} not found", refueling.id))
                    })?;
                    placed.push(refueling);
                }
                RefuelingWrite::Insert(refueling) => {
                    if next.find(refueling.id).is_some() {
                        return Err(AppError::Internal(format!(
                            "Refueling {} already stored",
                            refueling.id
                        )));
                    }
                    placed.push(refueling);
                }
            }
        }

        for refueling in placed {
            let key = refueling.odometer_reading;
            if next.by_odometer.contains_key(&key) {
                return Err(AppError::DuplicateOdometerReading {
                    vehicle_id: batch.vehicle_id,
                    odometer_reading: key,
                });
            }
            next.by_odometer.insert(key, refueling);
        }

        Ok(next.by_odometer)
    }
}

#[derive(Default)]
pub struct InMemoryRefuelingStore {
    sequences: RwLock<HashMap<Uuid, Arc<RwLock<VehicleSequence>>>>,
    owners: RwLock<HashMap<Uuid, Uuid>>,
}

impl InMemoryRefuelingStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn sequence(&self, vehicle_id: Uuid) -> Option<Arc<RwLock<VehicleSequence>>> {
        self.sequences.read().await.get(&vehicle_id).cloned()
    }

    async fn sequence_or_create(&self, vehicle_id: Uuid) -> Arc<RwLock<VehicleSequence>> {
        if let Some(sequence) = self.sequence(vehicle_id).await {
            return sequence;
        }
        self.sequences
            .write()
            .await
            .entry(vehicle_id)
            .or_default()
            .clone()
    }

    async fn neighbor(
        &self,
        vehicle_id: Uuid,
        range: (Bound<Decimal>, Bound<Decimal>),
        exclude: Option<Uuid>,
        descending: bool,
    ) -> Option<Refueling> {
        let sequence = self.sequence(vehicle_id).await?;
        let sequence = sequence.read().await;
        let mut candidates = sequence
            .by_odometer
            .range(range)
            .map(|(_, r)| r)
            .filter(|r| Some(r.id) != exclude);

        let found = if descending {
            candidates.next_back()
        } else {
            candidates.next()
        };
        found.cloned()
    }
}

#[async_trait]
impl RefuelingStore for InMemoryRefuelingStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Refueling>> {
        let vehicle_id = match self.owners.read().await.get(&id).copied() {
            Some(vehicle_id) => vehicle_id,
            None => return Ok(None),
        };

        Ok(match self.sequence(vehicle_id).await {
            Some(sequence) => sequence.read().await.find(id).cloned(),
            None => None,
        })
    }

    async fn find_preceding(
        &self,
        vehicle_id: Uuid,
        odometer: Decimal,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Refueling>> {
        Ok(self
            .neighbor(vehicle_id, (Bound::Unbounded, Bound::Excluded(odometer)), exclude, true)
            .await)
    }

    async fn find_succeeding(
        &self,
        vehicle_id: Uuid,
        odometer: Decimal,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Refueling>> {
        Ok(self
            .neighbor(vehicle_id, (Bound::Excluded(odometer), Bound::Unbounded), exclude, false)
            .await)
    }

    async fn find_at_odometer(
        &self,
        vehicle_id: Uuid,
        odometer: Decimal,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Refueling>> {
        Ok(self
            .neighbor(vehicle_id, (Bound::Included(odometer), Bound::Included(odometer)), exclude, false)
            .await)
    }

    async fn list_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Refueling>> {
        Ok(match self.sequence(vehicle_id).await {
            Some(sequence) => sequence.read().await.by_odometer.values().cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn list(&self, filter: &RefuelingFilter) -> AppResult<Vec<Refueling>> {
        let sequences: Vec<_> = match filter.vehicle_id {
            Some(vehicle_id) => self.sequence(vehicle_id).await.into_iter().collect(),
            None => self.sequences.read().await.values().cloned().collect(),
        };

        let mut refuelings = Vec::new();
        for sequence in sequences {
            let sequence = sequence.read().await;
            refuelings.extend(
                sequence
                    .by_odometer
                    .values()
                    .filter(|r| filter.matches(r))
                    .cloned(),
            );
        }

        refuelings.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(refuelings)
    }

    async fn sequence_version(&self, vehicle_id: Uuid) -> AppResult<i64> {
        Ok(match self.sequence(vehicle_id).await {
            Some(sequence) => sequence.read().await.version,
            None => 0,
        })
    }

    async fn commit(&self, batch: RefuelingBatch, expected_version: i64) -> AppResult<()> {
        let vehicle_id = batch.vehicle_id;
        let sequence = self.sequence_or_create(vehicle_id).await;
        let mut sequence = sequence.write().await;

        if sequence.version != expected_version {
            return Err(AppError::ConcurrencyConflict(vehicle_id));
        }

        let mut deleted = Vec::new();
        let mut stored = Vec::new();
        for write in &batch.writes {
            match write {
                RefuelingWrite::Delete(id) => deleted.push(*id),
                RefuelingWrite::Insert(r) | RefuelingWrite::Update(r) => stored.push(r.id),
            }
        }

        sequence.by_odometer = sequence.apply(batch)?;
        sequence.version += 1;

        let mut owners = self.owners.write().await;
        for id in deleted {
            owners.remove(&id);
        }
        for id in stored {
            owners.insert(id, vehicle_id);
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryVehicleDirectory {
    vehicles: RwLock<HashMap<Uuid, Vehicle>>,
}

impl InMemoryVehicleDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VehicleDirectory for InMemoryVehicleDirectory {
    async fn exists(&self, vehicle_id: Uuid) -> AppResult<bool> {
        Ok(self.vehicles.read().await.contains_key(&vehicle_id))
    }

    async fn find_by_id(&self, vehicle_id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.vehicles.read().await.get(&vehicle_id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self.vehicles.read().await.values().cloned().collect();
        vehicles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(vehicles)
    }

    async fn license_plate_exists(&self, license_plate: &str) -> AppResult<bool> {
        Ok(self
            .vehicles
            .read()
            .await
            .values()
            .any(|v| v.license_plate.eq_ignore_ascii_case(license_plate)))
    }

    async fn create(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        let mut vehicles = self.vehicles.write().await;
        if vehicles
            .values()
            .any(|v| v.license_plate.eq_ignore_ascii_case(&vehicle.license_plate))
        {
            return Err(conflict_error("Vehicle", "license_plate", &vehicle.license_plate));
        }
        vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::refueling::FuelType;
    use chrono::Utc;

    fn refueling(vehicle_id: Uuid, odometer: i64) -> Refueling {
        let now = Utc::now();
        Refueling {
            id: Uuid::new_v4(),
            vehicle_id,
            odometer_reading: Decimal::from(odometer),
            liters_filled: Decimal::from(40),
            cost_per_liter: Decimal::new(599, 2),
            total_cost: Decimal::new(23960, 2),
            fuel_type: FuelType::Gasoline,
            occurred_at: now,
            consumption: None,
            driver: "Bruno".to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seeded(vehicle_id: Uuid, readings: &[i64]) -> (InMemoryRefuelingStore, Vec<Refueling>) {
        let store = InMemoryRefuelingStore::new();
        let mut stored = Vec::new();
        for (version, reading) in readings.iter().enumerate() {
            let r = refueling(vehicle_id, *reading);
            store
                .commit(RefuelingBatch::new(vehicle_id).insert(r.clone()), version as i64)
                .await
                .unwrap();
            stored.push(r);
        }
        (store, stored)
    }

    #[tokio::test]
    async fn test_neighbor_queries() {
        let vehicle_id = Uuid::new_v4();
        let (store, stored) = seeded(vehicle_id, &[1000, 1400, 1200]).await;

        let before = store
            .find_preceding(vehicle_id, Decimal::from(1300), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before.odometer_reading, Decimal::from(1200));

        let after = store
            .find_succeeding(vehicle_id, Decimal::from(1200), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.odometer_reading, Decimal::from(1400));

        // Excluir el propio repostaje salta al siguiente vecino
        let skipping = store
            .find_preceding(vehicle_id, Decimal::from(1300), Some(stored[2].id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(skipping.odometer_reading, Decimal::from(1000));

        assert!(store
            .find_preceding(vehicle_id, Decimal::from(1000), None)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_succeeding(vehicle_id, Decimal::from(1400), None)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_at_odometer(vehicle_id, Decimal::from(1200), None)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_list_by_vehicle_is_ordered_by_odometer() {
        let vehicle_id = Uuid::new_v4();
        let (store, _) = seeded(vehicle_id, &[3000, 1000, 2000]).await;

        let readings: Vec<Decimal> = store
            .list_by_vehicle(vehicle_id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.odometer_reading)
            .collect();
        assert_eq!(
            readings,
            vec![Decimal::from(1000), Decimal::from(2000), Decimal::from(3000)]
        );
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let vehicle_id = Uuid::new_v4();
        let (store, _) = seeded(vehicle_id, &[1000]).await;

        let result = store
            .commit(RefuelingBatch::new(vehicle_id).insert(refueling(vehicle_id, 2000)), 0)
            .await;
        assert!(matches!(result, Err(AppError::ConcurrencyConflict(id)) if id == vehicle_id));
        assert_eq!(store.list_by_vehicle(vehicle_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_sequence_untouched() {
        let vehicle_id = Uuid::new_v4();
        let (store, stored) = seeded(vehicle_id, &[1000, 2000]).await;

        let mut moved = stored[0].clone();
        moved.consumption = Some(Decimal::from(7));
        let batch = RefuelingBatch::new(vehicle_id)
            .update(moved)
            .insert(refueling(vehicle_id, 2000));

        let result = store.commit(batch, 2).await;
        assert!(matches!(result, Err(AppError::DuplicateOdometerReading { .. })));

        let sequence = store.list_by_vehicle(vehicle_id).await.unwrap();
        assert_eq!(sequence, stored);
        assert_eq!(store.sequence_version(vehicle_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_forgets_owner() {
        let vehicle_id = Uuid::new_v4();
        let (store, stored) = seeded(vehicle_id, &[1000]).await;

        store
            .commit(RefuelingBatch::new(vehicle_id).delete(stored[0].id), 1)
            .await
            .unwrap();
        assert!(store.find_by_id(stored[0].id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_directory_rejects_plate_in_other_case() {
        let directory = InMemoryVehicleDirectory::new();
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            license_plate: "FLT3E21".to_string(),
            brand: Some("VW".to_string()),
            model: None,
            year: Some(2020),
            km: Decimal::ZERO,
            vehicle_status: Default::default(),
            created_at: Utc::now(),
        };
        directory.create(vehicle.clone()).await.unwrap();

        assert!(directory.exists(vehicle.id).await.unwrap());
        assert!(directory.license_plate_exists("flt3e21").await.unwrap());

        let clash = Vehicle {
            id: Uuid::new_v4(),
            license_plate: "flt3e21".to_string(),
            ..vehicle
        };
        assert!(matches!(directory.create(clash).await, Err(AppError::Conflict(_))));
        assert_eq!(directory.list().await.unwrap().len(), 1);
    }
}
