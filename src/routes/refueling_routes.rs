use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::refueling_controller::RefuelingController;
use crate::dto::api_response::ApiResponse;
use crate::dto::refueling_dto::{
    CreateRefuelingRequest, RefuelingListQuery, RefuelingResponse, SummaryQuery,
    UpdateRefuelingRequest,
};
use crate::models::refueling::Refueling;
use crate::models::statistics::SummaryView;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::validation::{ApiQuery, ValidatedJson};

pub fn create_refueling_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_refuelings).post(create_refueling))
        .route("/stats/summary", get(get_summary))
        .route(
            "/:id",
            get(get_refueling).put(update_refueling).delete(delete_refueling),
        )
}

async fn create_refueling(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateRefuelingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Refueling>>), AppError> {
    let controller = RefuelingController::new(&state);
    let response = controller.create(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_refuelings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RefuelingListQuery>,
) -> Result<Json<Vec<RefuelingResponse>>, AppError> {
    let controller = RefuelingController::new(&state);
    let response = controller.list(query.vehicle_id).await?;
    Ok(Json(response))
}

async fn get_refueling(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RefuelingResponse>, AppError> {
    let controller = RefuelingController::new(&state);
    let response = controller.get_by_id(id).await?;
    Ok(Json(response))
}

async fn update_refueling(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateRefuelingRequest>,
) -> Result<Json<ApiResponse<Refueling>>, AppError> {
    let controller = RefuelingController::new(&state);
    let response = controller.update(id, request).await?;
    Ok(Json(response))
}

async fn delete_refueling(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let controller = RefuelingController::new(&state);
    controller.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_summary(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<Json<SummaryView>, AppError> {
    let controller = RefuelingController::new(&state);
    let response = controller.summary(query).await?;
    Ok(Json(response))
}
