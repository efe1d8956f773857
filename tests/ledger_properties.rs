use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use uuid::Uuid;

use fuel_ledger::dto::refueling_dto::{CreateRefuelingRequest, UpdateRefuelingRequest};
use fuel_ledger::models::refueling::{FuelType, Refueling};
use fuel_ledger::models::vehicle::{Vehicle, VehicleStatus};
use fuel_ledger::repositories::memory::{InMemoryRefuelingStore, InMemoryVehicleDirectory};
use fuel_ledger::repositories::vehicle_repository::VehicleDirectory;
use fuel_ledger::services::consumption::compute_consumption;
use fuel_ledger::services::ledger_service::LedgerService;
use fuel_ledger::utils::errors::AppError;

async fn ledger_with_vehicle() -> (LedgerService, Uuid) {
    let directory = Arc::new(InMemoryVehicleDirectory::new());
    let vehicle = directory
        .create(Vehicle {
            id: Uuid::new_v4(),
            license_plate: "PRP0P00".to_string(),
            brand: None,
            model: None,
            year: None,
            km: Decimal::ZERO,
            vehicle_status: VehicleStatus::Active,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let ledger = LedgerService::new(Arc::new(InMemoryRefuelingStore::new()), directory, 3);
    (ledger, vehicle.id)
}

fn request(vehicle_id: Uuid, odometer: i64, liters: Decimal) -> CreateRefuelingRequest {
    CreateRefuelingRequest {
        vehicle_id,
        occurred_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(odometer),
        odometer_reading: Decimal::from(odometer),
        liters_filled: liters,
        cost_per_liter: Decimal::new(599, 2),
        total_cost: Decimal::new(599, 2) * liters,
        fuel_type: FuelType::Diesel,
        driver: "Ana".to_string(),
        notes: None,
    }
}

/// Comprueba que cada consumo almacenado coincide con recalcularlo desde cero
fn assert_consistent(sequence: &[Refueling]) {
    for (index, refueling) in sequence.iter().enumerate() {
        if index > 0 {
            assert!(sequence[index - 1].odometer_reading < refueling.odometer_reading);
        }
        let preceding = index
            .checked_sub(1)
            .map(|i| sequence[i].odometer_reading);
        let expected = compute_consumption(
            preceding,
            refueling.odometer_reading,
            refueling.liters_filled,
        );
        assert_eq!(
            refueling.consumption, expected,
            "consumo incorrecto en odómetro {}",
            refueling.odometer_reading
        );
    }
}

fn consumption_by_odometer(sequence: &[Refueling]) -> Vec<(Decimal, Option<Decimal>)> {
    sequence
        .iter()
        .map(|r| (r.odometer_reading, r.consumption))
        .collect()
}

fn permutations(items: &[(i64, i64)]) -> Vec<Vec<(i64, i64)>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut result = Vec::new();
    for index in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(index);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            result.push(tail);
        }
    }
    result
}

#[tokio::test]
async fn test_insertion_order_does_not_change_consumption() {
    let readings = [(1000, 30), (1250, 20), (1600, 35), (1610, 3), (2100, 45)];
    let mut reference: Option<Vec<(Decimal, Option<Decimal>)>> = None;

    for order in permutations(&readings) {
        let (ledger, vehicle_id) = ledger_with_vehicle().await;
        for (odometer, liters) in &order {
            ledger
                .create(request(vehicle_id, *odometer, Decimal::from(*liters)))
                .await
                .unwrap();
        }

        let sequence = ledger.list_by_vehicle(vehicle_id).await.unwrap();
        assert_consistent(&sequence);

        let snapshot = consumption_by_odometer(&sequence);
        match &reference {
            Some(expected) => assert_eq!(&snapshot, expected, "orden {:?}", order),
            None => reference = Some(snapshot),
        }
    }
}

#[tokio::test]
async fn test_random_operations_keep_sequence_consistent() {
    let mut rng = StdRng::seed_from_u64(0x5eed_f0e1);

    for _ in 0..20 {
        let (ledger, vehicle_id) = ledger_with_vehicle().await;
        let mut ids: Vec<Uuid> = Vec::new();

        for _ in 0..40 {
            let odometer = rng.gen_range(0..500) * 10;
            let liters = Decimal::new(rng.gen_range(100..6000), 2);

            match rng.gen_range(0..4) {
                0 | 1 => match ledger.create(request(vehicle_id, odometer, liters)).await {
                    Ok(created) => ids.push(created.id),
                    Err(AppError::DuplicateOdometerReading { .. }) => {}
                    Err(e) => panic!("error inesperado al crear: {}", e),
                },
                2 if !ids.is_empty() => {
                    let id = *ids.choose(&mut rng).unwrap();
                    let patch = if rng.gen_bool(0.5) {
                        UpdateRefuelingRequest {
                            odometer_reading: Some(Decimal::from(odometer)),
                            ..UpdateRefuelingRequest::default()
                        }
                    } else {
                        UpdateRefuelingRequest {
                            liters_filled: Some(liters),
                            ..UpdateRefuelingRequest::default()
                        }
                    };
                    match ledger.update(id, patch).await {
                        Ok(_) | Err(AppError::DuplicateOdometerReading { .. }) => {}
                        Err(e) => panic!("error inesperado al actualizar: {}", e),
                    }
                }
                3 if !ids.is_empty() => {
                    let index = rng.gen_range(0..ids.len());
                    let id = ids.swap_remove(index);
                    ledger.delete(id).await.unwrap();
                }
                _ => {}
            }

            let sequence = ledger.list_by_vehicle(vehicle_id).await.unwrap();
            assert_eq!(sequence.len(), ids.len());
            assert_consistent(&sequence);
        }
    }
}
