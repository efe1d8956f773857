use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::dto::api_response::ApiResponse;
use crate::dto::refueling_dto::{
    CreateRefuelingRequest, RefuelingResponse, SummaryQuery, UpdateRefuelingRequest,
};
use crate::models::refueling::{Refueling, RefuelingFilter};
use crate::models::statistics::SummaryView;
use crate::repositories::vehicle_repository::VehicleDirectory;
use crate::services::ledger_service::LedgerService;
use crate::services::statistics_service::StatisticsService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct RefuelingController {
    ledger: Arc<LedgerService>,
    statistics: Arc<StatisticsService>,
    vehicles: Arc<dyn VehicleDirectory>,
}

impl RefuelingController {
    pub fn new(state: &AppState) -> Self {
        Self {
            ledger: state.ledger.clone(),
            statistics: state.statistics.clone(),
            vehicles: state.vehicles.clone(),
        }
    }

    pub async fn create(
        &self,
        request: CreateRefuelingRequest,
    ) -> Result<ApiResponse<Refueling>, AppError> {
        let refueling = self.ledger.create(request).await?;

        Ok(ApiResponse::success_with_message(
            refueling,
            "Repostaje registrado exitosamente".to_string(),
        ))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<RefuelingResponse, AppError> {
        let refueling = self.ledger.get(id).await?;
        let mut responses = self.with_plates(vec![refueling]).await?;
        responses
            .pop()
            .ok_or_else(|| AppError::Internal(format!("Repostaje {} perdido al añadir la matrícula", id)))
    }

    pub async fn list(&self, vehicle_id: Option<Uuid>) -> Result<Vec<RefuelingResponse>, AppError> {
        let filter = RefuelingFilter {
            vehicle_id,
            ..RefuelingFilter::default()
        };
        let refuelings = self.ledger.list(&filter).await?;
        self.with_plates(refuelings).await
    }

    pub async fn list_by_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<RefuelingResponse>, AppError> {
        let refuelings = self.ledger.list_by_vehicle(vehicle_id).await?;
        self.with_plates(refuelings).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateRefuelingRequest,
    ) -> Result<ApiResponse<Refueling>, AppError> {
        let refueling = self.ledger.update(id, request).await?;

        Ok(ApiResponse::success_with_message(
            refueling,
            "Repostaje actualizado exitosamente".to_string(),
        ))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.ledger.delete(id).await
    }

    pub async fn summary(&self, query: SummaryQuery) -> Result<SummaryView, AppError> {
        let filter = query.into_filter()?;
        self.statistics.get_summary(&filter).await
    }

    /// Añade la matrícula del vehículo; una consulta por vehículo distinto
    async fn with_plates(&self, refuelings: Vec<Refueling>) -> Result<Vec<RefuelingResponse>, AppError> {
        let mut plates: HashMap<Uuid, Option<String>> = HashMap::new();
        for refueling in &refuelings {
            if !plates.contains_key(&refueling.vehicle_id) {
                let plate = self
                    .vehicles
                    .find_by_id(refueling.vehicle_id)
                    .await?
                    .map(|v| v.license_plate);
                plates.insert(refueling.vehicle_id, plate);
            }
        }

        Ok(refuelings
            .into_iter()
            .map(|refueling| RefuelingResponse {
                license_plate: plates.get(&refueling.vehicle_id).cloned().flatten(),
                refueling,
            })
            .collect())
    }
}
