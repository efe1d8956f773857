//! Estadísticas de repostajes
//!
//! Vistas de solo lectura sobre el almacén; nunca modifica el consumo.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::refueling::{Refueling, RefuelingFilter};
use crate::models::statistics::{RefuelingSummary, SummaryView, VehicleRefuelingStats};
use crate::repositories::refueling_repository::RefuelingStore;
use crate::repositories::vehicle_repository::VehicleDirectory;
use crate::utils::errors::{AppError, AppResult};

pub struct StatisticsService {
    store: Arc<dyn RefuelingStore>,
    vehicles: Arc<dyn VehicleDirectory>,
}

impl StatisticsService {
    pub fn new(store: Arc<dyn RefuelingStore>, vehicles: Arc<dyn VehicleDirectory>) -> Self {
        Self { store, vehicles }
    }

    pub async fn summary(&self, filter: &RefuelingFilter) -> AppResult<RefuelingSummary> {
        let refuelings = self.store.list(filter).await?;
        let mut summary = summarize(&refuelings)?;

        for stats in &mut summary.per_vehicle {
            stats.license_plate = self
                .vehicles
                .find_by_id(stats.vehicle_id)
                .await?
                .map(|v| v.license_plate);
        }

        tracing::debug!(
            "📊 Resumen calculado sobre {} repostajes de {} vehículos",
            summary.total_refuelings,
            summary.per_vehicle.len()
        );
        Ok(summary)
    }

    /// Resumen listo para presentar, redondeado a dos decimales
    pub async fn get_summary(&self, filter: &RefuelingFilter) -> AppResult<SummaryView> {
        Ok(self.summary(filter).await?.into_view())
    }
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    total_cost: Decimal,
    total_liters: Decimal,
    consumption_sum: Decimal,
    consumption_count: usize,
}

fn checked_sum(total: Decimal, value: Decimal, field: &str) -> AppResult<Decimal> {
    total.checked_add(value).ok_or_else(|| {
        AppError::Internal(format!("Overflow acumulando {} en el resumen de repostajes", field))
    })
}

impl Accumulator {
    fn add(&mut self, refueling: &Refueling) -> AppResult<()> {
        self.total_cost = checked_sum(self.total_cost, refueling.total_cost, "total_cost")?;
        self.total_liters = checked_sum(self.total_liters, refueling.liters_filled, "total_liters")?;
        if let Some(consumption) = refueling.consumption {
            self.consumption_sum = checked_sum(self.consumption_sum, consumption, "consumption")?;
            self.consumption_count += 1;
        }
        self.count += 1;
        Ok(())
    }

    fn average_consumption(&self) -> Option<Decimal> {
        if self.consumption_count == 0 {
            return None;
        }
        self.consumption_sum
            .checked_div(Decimal::from(self.consumption_count))
    }
}

/// Agrega un conjunto de repostajes sin redondear.
///
/// Los repostajes sin consumo cuentan para totales pero no para la media.
/// Una suma que no cabe en `Decimal` devuelve error en lugar de un panic.
pub fn summarize(refuelings: &[Refueling]) -> AppResult<RefuelingSummary> {
    let mut fleet = Accumulator::default();
    let mut by_vehicle: BTreeMap<Uuid, Accumulator> = BTreeMap::new();

    for refueling in refuelings {
        fleet.add(refueling)?;
        by_vehicle.entry(refueling.vehicle_id).or_default().add(refueling)?;
    }

    Ok(RefuelingSummary {
        total_refuelings: fleet.count,
        total_cost: fleet.total_cost,
        total_liters: fleet.total_liters,
        average_consumption: fleet.average_consumption().unwrap_or(Decimal::ZERO),
        per_vehicle: by_vehicle
            .into_iter()
            .map(|(vehicle_id, acc)| VehicleRefuelingStats {
                vehicle_id,
                license_plate: None,
                count: acc.count,
                total_cost: acc.total_cost,
                total_liters: acc.total_liters,
                average_consumption: acc.average_consumption(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::refueling_dto::CreateRefuelingRequest;
    use crate::models::refueling::FuelType;
    use crate::models::vehicle::{Vehicle, VehicleStatus};
    use crate::repositories::memory::{InMemoryRefuelingStore, InMemoryVehicleDirectory};
    use crate::services::ledger_service::LedgerService;
    use crate::utils::validation::MAX_QUANTITY;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn d(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn refueling(vehicle_id: Uuid, cost: Decimal, liters: Decimal, consumption: Option<Decimal>) -> Refueling {
        let now = Utc::now();
        Refueling {
            id: Uuid::new_v4(),
            vehicle_id,
            odometer_reading: Decimal::ZERO,
            liters_filled: liters,
            cost_per_liter: d(6),
            total_cost: cost,
            fuel_type: FuelType::Diesel,
            occurred_at: now,
            consumption,
            driver: "Rita".to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_set_has_zero_average() {
        let summary = summarize(&[]).unwrap();
        assert_eq!(summary.total_refuelings, 0);
        assert_eq!(summary.average_consumption, Decimal::ZERO);
        assert_eq!(summary.total_cost, Decimal::ZERO);
        assert!(summary.per_vehicle.is_empty());
    }

    #[test]
    fn test_null_consumption_is_excluded_from_average() {
        let vehicle_id = Uuid::new_v4();
        let refuelings = vec![
            refueling(vehicle_id, d(60), d(10), None),
            refueling(vehicle_id, d(240), d(40), Some(d(10))),
            refueling(vehicle_id, d(120), d(20), Some(d(5))),
        ];

        let summary = summarize(&refuelings).unwrap();
        assert_eq!(summary.total_refuelings, 3);
        assert_eq!(summary.total_cost, d(420));
        assert_eq!(summary.total_liters, d(70));
        assert_eq!(summary.average_consumption, Decimal::new(75, 1));
    }

    #[test]
    fn test_per_vehicle_average_is_none_without_measurements() {
        let measured = Uuid::new_v4();
        let unmeasured = Uuid::new_v4();
        let refuelings = vec![
            refueling(measured, d(100), d(10), Some(d(12))),
            refueling(unmeasured, d(50), d(5), None),
        ];

        let summary = summarize(&refuelings).unwrap();
        let find = |id: Uuid| summary.per_vehicle.iter().find(|s| s.vehicle_id == id).unwrap();

        assert_eq!(find(measured).average_consumption, Some(d(12)));
        assert_eq!(find(unmeasured).average_consumption, None);
        assert_eq!(find(unmeasured).count, 1);
        assert_eq!(summary.average_consumption, d(12));
    }

    #[test]
    fn test_sums_are_not_rounded_internally() {
        let vehicle_id = Uuid::new_v4();
        // Tres importes de 0.005: redondear cada uno daría 0.03, la suma exacta es 0.015
        let tiny = Decimal::new(5, 3);
        let refuelings = vec![
            refueling(vehicle_id, tiny, tiny, None),
            refueling(vehicle_id, tiny, tiny, None),
            refueling(vehicle_id, tiny, tiny, None),
        ];

        let summary = summarize(&refuelings).unwrap();
        assert_eq!(summary.total_cost, Decimal::new(15, 3));
        assert_eq!(summary.clone().into_view().total_cost, Decimal::new(2, 2));
    }

    #[test]
    fn test_overflowing_sum_is_an_error_not_a_panic() {
        let vehicle_id = Uuid::new_v4();
        let refuelings = vec![
            refueling(vehicle_id, Decimal::MAX, d(10), None),
            refueling(vehicle_id, Decimal::MAX, d(10), None),
        ];

        assert!(matches!(summarize(&refuelings), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_sums_at_the_accepted_bound_fit() {
        let vehicle_id = Uuid::new_v4();
        let refuelings: Vec<Refueling> = (0..1000)
            .map(|_| refueling(vehicle_id, MAX_QUANTITY, MAX_QUANTITY, Some(MAX_QUANTITY)))
            .collect();

        let summary = summarize(&refuelings).unwrap();
        assert_eq!(summary.total_cost, MAX_QUANTITY * d(1000));
        assert_eq!(summary.average_consumption, MAX_QUANTITY);
        assert_eq!(summary.into_view().total_liters, MAX_QUANTITY * d(1000));
    }

    #[tokio::test]
    async fn test_summary_through_the_ledger() {
        let store = Arc::new(InMemoryRefuelingStore::new());
        let directory = Arc::new(InMemoryVehicleDirectory::new());
        let vehicle = directory
            .create(Vehicle {
                id: Uuid::new_v4(),
                license_plate: "QRS4T56".to_string(),
                brand: None,
                model: None,
                year: None,
                km: Decimal::ZERO,
                vehicle_status: VehicleStatus::Active,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let empty = directory
            .create(Vehicle {
                id: Uuid::new_v4(),
                license_plate: "EMP7T89".to_string(),
                brand: None,
                model: None,
                year: None,
                km: Decimal::ZERO,
                vehicle_status: VehicleStatus::Inactive,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let ledger = LedgerService::new(store.clone(), directory.clone(), 3);
        let stats = StatisticsService::new(store, directory);

        for (day, odometer, liters) in [(1, 1000, 10), (5, 1400, 40), (9, 1700, 30)] {
            ledger
                .create(CreateRefuelingRequest {
                    vehicle_id: vehicle.id,
                    occurred_at: Utc.with_ymd_and_hms(2024, 6, day, 8, 0, 0).unwrap(),
                    odometer_reading: d(odometer),
                    liters_filled: d(liters),
                    cost_per_liter: Decimal::new(550, 2),
                    total_cost: Decimal::new(550, 2) * d(liters),
                    fuel_type: FuelType::Gasoline,
                    driver: "Luiz".to_string(),
                    notes: None,
                })
                .await
                .unwrap();
        }

        let view = stats
            .get_summary(&RefuelingFilter::for_vehicle(vehicle.id))
            .await
            .unwrap();
        assert_eq!(view.total_refuelings, 3);
        assert_eq!(view.total_liters, d(80));
        assert_eq!(view.total_cost, d(440));
        // (10 + 10) / 2
        assert_eq!(view.average_consumption, d(10));
        assert_eq!(view.per_vehicle[0].license_plate.as_deref(), Some("QRS4T56"));

        let windowed = stats
            .get_summary(&RefuelingFilter {
                vehicle_id: Some(vehicle.id),
                start_date: NaiveDate::from_ymd_opt(2024, 6, 5),
                end_date: NaiveDate::from_ymd_opt(2024, 6, 30),
            })
            .await
            .unwrap();
        assert_eq!(windowed.total_refuelings, 2);
        assert_eq!(windowed.total_liters, d(70));

        let nothing = stats
            .get_summary(&RefuelingFilter::for_vehicle(empty.id))
            .await
            .unwrap();
        assert_eq!(nothing.total_refuelings, 0);
        assert_eq!(nothing.average_consumption, Decimal::ZERO);
    }
}
