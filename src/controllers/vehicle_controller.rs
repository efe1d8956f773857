use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::dto::api_response::ApiResponse;
use crate::dto::vehicle_dto::CreateVehicleRequest;
use crate::models::vehicle::Vehicle;
use crate::repositories::vehicle_repository::VehicleDirectory;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError};

pub struct VehicleController {
    repository: Arc<dyn VehicleDirectory>,
}

impl VehicleController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: state.vehicles.clone(),
        }
    }

    pub async fn create(
        &self,
        request: CreateVehicleRequest,
    ) -> Result<ApiResponse<Vehicle>, AppError> {
        let license_plate = request.license_plate.trim().to_uppercase();
        if license_plate.is_empty() {
            return Err(AppError::BadRequest("La matrícula es requerida".to_string()));
        }

        // Verificar que la matrícula no exista
        if self.repository.license_plate_exists(&license_plate).await? {
            return Err(AppError::Conflict("La matrícula ya está registrada".to_string()));
        }

        let vehicle = self
            .repository
            .create(Vehicle {
                id: Uuid::new_v4(),
                license_plate,
                brand: request.brand,
                model: request.model,
                year: request.year,
                km: request.km.unwrap_or(Decimal::ZERO),
                vehicle_status: request.vehicle_status.unwrap_or_default(),
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!("🚗 Vehículo {} registrado ({})", vehicle.id, vehicle.license_plate);

        Ok(ApiResponse::success_with_message(
            vehicle,
            "Vehículo creado exitosamente".to_string(),
        ))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Vehicle, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &id))
    }

    pub async fn list(&self) -> Result<Vec<Vehicle>, AppError> {
        self.repository.list().await
    }
}
