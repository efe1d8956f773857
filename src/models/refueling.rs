//! Modelo de Refueling
//!
//! Un repostaje registrado para un vehículo. El consumo es un valor derivado
//! que solo calcula el `LedgerService`; nunca lo envía el cliente.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Tipo de combustible - mapea al ENUM fuel_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "fuel_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelType {
    Gasoline,
    Diesel,
    Ethanol,
    Cng,
}

/// Repostaje - mapea a la tabla refuelings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Refueling {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub odometer_reading: Decimal,
    pub liters_filled: Decimal,
    pub cost_per_liter: Decimal,
    pub total_cost: Decimal,
    pub fuel_type: FuelType,
    pub occurred_at: DateTime<Utc>,
    pub consumption: Option<Decimal>,
    pub driver: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filtros para listados y estadísticas de repostajes.
///
/// Las fechas son inclusivas en ambos extremos y se comparan contra
/// `occurred_at`, nunca contra el odómetro.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefuelingFilter {
    pub vehicle_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RefuelingFilter {
    pub fn for_vehicle(vehicle_id: Uuid) -> Self {
        Self {
            vehicle_id: Some(vehicle_id),
            ..Self::default()
        }
    }

    /// Verifica si un repostaje cumple el filtro
    pub fn matches(&self, refueling: &Refueling) -> bool {
        if let Some(vehicle_id) = self.vehicle_id {
            if refueling.vehicle_id != vehicle_id {
                return false;
            }
        }

        let day = refueling.occurred_at.date_naive();
        if let Some(start) = self.start_date {
            if day < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if day > end {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn refueling_on(vehicle_id: Uuid, day: u32) -> Refueling {
        let at = Utc.with_ymd_and_hms(2024, 3, day, 18, 30, 0).unwrap();
        Refueling {
            id: Uuid::new_v4(),
            vehicle_id,
            odometer_reading: Decimal::from(1000),
            liters_filled: Decimal::from(40),
            cost_per_liter: Decimal::new(589, 2),
            total_cost: Decimal::new(23560, 2),
            fuel_type: FuelType::Diesel,
            occurred_at: at,
            consumption: None,
            driver: "Ana".to_string(),
            notes: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_filter_date_range_is_inclusive() {
        let vehicle_id = Uuid::new_v4();
        let filter = RefuelingFilter {
            vehicle_id: None,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 10),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 12),
        };

        assert!(!filter.matches(&refueling_on(vehicle_id, 9)));
        assert!(filter.matches(&refueling_on(vehicle_id, 10)));
        assert!(filter.matches(&refueling_on(vehicle_id, 12)));
        assert!(!filter.matches(&refueling_on(vehicle_id, 13)));
    }

    #[test]
    fn test_filter_by_vehicle() {
        let vehicle_id = Uuid::new_v4();
        let filter = RefuelingFilter::for_vehicle(vehicle_id);

        assert!(filter.matches(&refueling_on(vehicle_id, 1)));
        assert!(!filter.matches(&refueling_on(Uuid::new_v4(), 1)));
    }

    #[test]
    fn test_fuel_type_wire_format() {
        let json = serde_json::to_string(&FuelType::Cng).unwrap();
        assert_eq!(json, "\"CNG\"");

        let parsed: FuelType = serde_json::from_str("\"ETHANOL\"").unwrap();
        assert_eq!(parsed, FuelType::Ethanol);

        assert!(serde_json::from_str::<FuelType>("\"KEROSENE\"").is_err());
    }
}
