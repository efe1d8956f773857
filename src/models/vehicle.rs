//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle del directorio de vehículos.
//! El ledger solo necesita saber si un vehículo existe; el resto de campos
//! se muestran en listados y estadísticas.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "vehicle_status", rename_all = "lowercase")]
pub enum VehicleStatus {
    #[default]
    Active,
    Inactive,
    Maintenance,
}

/// Vehicle principal - mapea a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub license_plate: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub km: Decimal,
    pub vehicle_status: VehicleStatus,
    pub created_at: DateTime<Utc>,
}
