use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::models::vehicle::VehicleStatus;

// Request para registrar un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 10))]
    pub license_plate: String,

    pub brand: Option<String>,

    pub model: Option<String>,

    #[validate(range(min = 1900, max = 2100))]
    pub year: Option<i32>,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub km: Option<Decimal>,

    pub vehicle_status: Option<VehicleStatus>,
}
