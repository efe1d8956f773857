use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::vehicle::Vehicle;
use crate::utils::errors::{conflict_error, AppError, AppResult};

/// Directorio de vehículos. El ledger lo consulta antes de crear repostajes.
#[async_trait]
pub trait VehicleDirectory: Send + Sync {
    async fn exists(&self, vehicle_id: Uuid) -> AppResult<bool>;

    async fn find_by_id(&self, vehicle_id: Uuid) -> AppResult<Option<Vehicle>>;

    async fn list(&self) -> AppResult<Vec<Vehicle>>;

    async fn license_plate_exists(&self, license_plate: &str) -> AppResult<bool>;

    async fn create(&self, vehicle: Vehicle) -> AppResult<Vehicle>;
}

pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VehicleDirectory for VehicleRepository {
    async fn exists(&self, vehicle_id: Uuid) -> AppResult<bool> {
        let result: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM vehicles WHERE id = $1)")
            .bind(vehicle_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }

    async fn find_by_id(&self, vehicle_id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, license_plate, brand, model, year, km, vehicle_status, created_at
            FROM vehicles
            WHERE id = $1
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn list(&self) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, license_plate, brand, model, year, km, vehicle_status, created_at
            FROM vehicles
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    async fn license_plate_exists(&self, license_plate: &str) -> AppResult<bool> {
        let result: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM vehicles WHERE UPPER(license_plate) = UPPER($1))",
        )
        .bind(license_plate)
        .fetch_one(&self.pool)
        .await?;

        Ok(result.0)
    }

    async fn create(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        let created = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (id, license_plate, brand, model, year, km, vehicle_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, license_plate, brand, model, year, km, vehicle_status, created_at
            "#,
        )
        .bind(vehicle.id)
        .bind(&vehicle.license_plate)
        .bind(&vehicle.brand)
        .bind(&vehicle.model)
        .bind(vehicle.year)
        .bind(vehicle.km)
        .bind(vehicle.vehicle_status)
        .bind(vehicle.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                conflict_error("Vehicle", "license_plate", &vehicle.license_plate)
            }
            _ => AppError::Database(e),
        })?;

        Ok(created)
    }
}
