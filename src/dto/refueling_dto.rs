use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::refueling::{FuelType, Refueling, RefuelingFilter};
use crate::utils::errors::{validation_error, AppResult};

// Request para registrar un repostaje
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRefuelingRequest {
    pub vehicle_id: Uuid,

    pub occurred_at: DateTime<Utc>,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub odometer_reading: Decimal,

    #[validate(custom = "crate::utils::validation::validate_positive")]
    pub liters_filled: Decimal,

    #[validate(custom = "crate::utils::validation::validate_positive")]
    pub cost_per_liter: Decimal,

    #[validate(custom = "crate::utils::validation::validate_positive")]
    pub total_cost: Decimal,

    pub fuel_type: FuelType,

    #[validate(custom = "crate::utils::validation::validate_not_empty")]
    pub driver: String,

    pub notes: Option<String>,
}

// Request para actualizar un repostaje; el vehículo no se puede cambiar
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRefuelingRequest {
    pub occurred_at: Option<DateTime<Utc>>,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub odometer_reading: Option<Decimal>,

    #[validate(custom = "crate::utils::validation::validate_positive")]
    pub liters_filled: Option<Decimal>,

    #[validate(custom = "crate::utils::validation::validate_positive")]
    pub cost_per_liter: Option<Decimal>,

    #[validate(custom = "crate::utils::validation::validate_positive")]
    pub total_cost: Option<Decimal>,

    pub fuel_type: Option<FuelType>,

    #[validate(custom = "crate::utils::validation::validate_not_empty")]
    pub driver: Option<String>,

    /// `""` borra las notas; ausente las deja como están
    pub notes: Option<String>,
}

impl UpdateRefuelingRequest {
    /// Indica si el cambio afecta al cálculo de consumo
    pub fn touches_consumption(&self) -> bool {
        self.odometer_reading.is_some() || self.liters_filled.is_some()
    }
}

// Response de lectura: el repostaje con la matrícula de su vehículo
#[derive(Debug, Serialize)]
pub struct RefuelingResponse {
    #[serde(flatten)]
    pub refueling: Refueling,
    pub license_plate: Option<String>,
}

// Query string de listados
#[derive(Debug, Default, Deserialize)]
pub struct RefuelingListQuery {
    pub vehicle_id: Option<Uuid>,
}

// Query string de estadísticas
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub vehicle_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl SummaryQuery {
    pub fn into_filter(self) -> AppResult<RefuelingFilter> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(validation_error("end_date", "end_date must not precede start_date"));
            }
        }

        Ok(RefuelingFilter {
            vehicle_id: self.vehicle_id,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}
