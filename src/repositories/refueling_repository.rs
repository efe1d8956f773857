//! Almacén de repostajes
//!
//! `RefuelingStore` fija el contrato de consultas del que depende el ledger:
//! vecinos por odómetro, búsquedas exactas, listados y un commit atómico por
//! vehículo con control de versión optimista.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::refueling::{Refueling, RefuelingFilter};
use crate::utils::errors::{AppError, AppResult};

/// Escritura individual dentro de un lote
#[derive(Debug, Clone, PartialEq)]
pub enum RefuelingWrite {
    Insert(Refueling),
    Update(Refueling),
    Delete(Uuid),
}

/// Conjunto de escrituras sobre la secuencia de un único vehículo.
/// Se aplica entero o no se aplica.
#[derive(Debug, Clone, PartialEq)]
pub struct RefuelingBatch {
    pub vehicle_id: Uuid,
    pub writes: Vec<RefuelingWrite>,
}

impl RefuelingBatch {
    pub fn new(vehicle_id: Uuid) -> Self {
        Self {
            vehicle_id,
            writes: Vec::new(),
        }
    }

    pub fn insert(mut self, refueling: Refueling) -> Self {
        self.writes.push(RefuelingWrite::Insert(refueling));
        self
    }

    pub fn update(mut self, refueling: Refueling) -> Self {
        self.writes.push(RefuelingWrite::Update(refueling));
        self
    }

    pub fn delete(mut self, id: Uuid) -> Self {
        self.writes.push(RefuelingWrite::Delete(id));
        self
    }
}

#[async_trait]
pub trait RefuelingStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Refueling>>;

    /// Repostaje con la mayor lectura estrictamente menor que `odometer`
    async fn find_preceding(
        &self,
        vehicle_id: Uuid,
        odometer: Decimal,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Refueling>>;

    /// Repostaje con la menor lectura estrictamente mayor que `odometer`
    async fn find_succeeding(
        &self,
        vehicle_id: Uuid,
        odometer: Decimal,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Refueling>>;

    async fn find_at_odometer(
        &self,
        vehicle_id: Uuid,
        odometer: Decimal,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Refueling>>;

    /// Secuencia del vehículo en orden ascendente de odómetro
    async fn list_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Refueling>>;

    /// Repostajes filtrados, más recientes primero
    async fn list(&self, filter: &RefuelingFilter) -> AppResult<Vec<Refueling>>;

    async fn sequence_version(&self, vehicle_id: Uuid) -> AppResult<i64>;

    /// Aplica el lote de forma atómica. Falla con `ConcurrencyConflict` si la
    /// versión de la secuencia ya no es `expected_version`.
    async fn commit(&self, batch: RefuelingBatch, expected_version: i64) -> AppResult<()>;
}

/// Implementación PostgreSQL.
///
/// Tablas esperadas:
///
/// ```sql
/// CREATE TABLE refuelings (
///     id UUID PRIMARY KEY,
///     vehicle_id UUID NOT NULL REFERENCES vehicles(id),
///     odometer_reading NUMERIC NOT NULL,
///     liters_filled NUMERIC NOT NULL,
///     cost_per_liter NUMERIC NOT NULL,
///     total_cost NUMERIC NOT NULL,
///     fuel_type fuel_type NOT NULL,
///     occurred_at TIMESTAMPTZ NOT NULL,
///     consumption NUMERIC,
///     driver TEXT NOT NULL,
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL,
///     UNIQUE (vehicle_id, odometer_reading)
/// );
///
/// CREATE TABLE refueling_sequences (
///     vehicle_id UUID PRIMARY KEY,
///     version BIGINT NOT NULL
/// );
/// ```
pub struct PgRefuelingStore {
    pool: PgPool,
}

const SELECT_REFUELING: &str = r#"
    SELECT id, vehicle_id, odometer_reading, liters_filled, cost_per_liter, total_cost,
           fuel_type, occurred_at, consumption, driver, notes, created_at, updated_at
    FROM refuelings
"#;

// Las fechas del filtro son días UTC, igual que `RefuelingFilter::matches`
const FILTER_REFUELINGS: &str = r#"
    WHERE ($1::uuid IS NULL OR vehicle_id = $1)
      AND ($2::date IS NULL OR (occurred_at AT TIME ZONE 'UTC')::date >= $2)
      AND ($3::date IS NULL OR (occurred_at AT TIME ZONE 'UTC')::date <= $3)
    ORDER BY occurred_at DESC
"#;

impl PgRefuelingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_write_error(vehicle_id: Uuid, odometer: Decimal, e: sqlx::Error) -> AppError {
        match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::DuplicateOdometerReading {
                    vehicle_id,
                    odometer_reading: odometer,
                }
            }
            _ => AppError::Database(e),
        }
    }
}

#[async_trait]
impl RefuelingStore for PgRefuelingStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Refueling>> {
        let refueling = sqlx::query_as::<_, Refueling>(&format!("{} WHERE id = $1", SELECT_REFUELING))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(refueling)
    }

    async fn find_preceding(
        &self,
        vehicle_id: Uuid,
        odometer: Decimal,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Refueling>> {
        let refueling = sqlx::query_as::<_, Refueling>(&format!(
            r#"{}
            WHERE vehicle_id = $1 AND odometer_reading < $2
              AND ($3::uuid IS NULL OR id <> $3)
            ORDER BY odometer_reading DESC
            LIMIT 1
            "#,
            SELECT_REFUELING
        ))
        .bind(vehicle_id)
        .bind(odometer)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await?;

        Ok(refueling)
    }

    async fn find_succeeding(
        &self,
        vehicle_id: Uuid,
        odometer: Decimal,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Refueling>> {
        let refueling = sqlx::query_as::<_, Refueling>(&format!(
            r#"{}
            WHERE vehicle_id = $1 AND odometer_reading > $2
              AND ($3::uuid IS NULL OR id <> $3)
            ORDER BY odometer_reading ASC
            LIMIT 1
            "#,
            SELECT_REFUELING
        ))
        .bind(vehicle_id)
        .bind(odometer)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await?;

        Ok(refueling)
    }

    async fn find_at_odometer(
        &self,
        vehicle_id: Uuid,
        odometer: Decimal,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Refueling>> {
        let refueling = sqlx::query_as::<_, Refueling>(&format!(
            r#"{}
            WHERE vehicle_id = $1 AND odometer_reading = $2
              AND ($3::uuid IS NULL OR id <> $3)
            "#,
            SELECT_REFUELING
        ))
        .bind(vehicle_id)
        .bind(odometer)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await?;

        Ok(refueling)
    }

    async fn list_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Refueling>> {
        let refuelings = sqlx::query_as::<_, Refueling>(&format!(
            "{} WHERE vehicle_id = $1 ORDER BY odometer_reading ASC",
            SELECT_REFUELING
        ))
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(refuelings)
    }

    async fn list(&self, filter: &RefuelingFilter) -> AppResult<Vec<Refueling>> {
        let refuelings = sqlx::query_as::<_, Refueling>(&format!(
            "{}{}",
            SELECT_REFUELING, FILTER_REFUELINGS
        ))
        .bind(filter.vehicle_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(refuelings)
    }

    async fn sequence_version(&self, vehicle_id: Uuid) -> AppResult<i64> {
        let version: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM refueling_sequences WHERE vehicle_id = $1")
                .bind(vehicle_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(version.map(|(v,)| v).unwrap_or(0))
    }

    async fn commit(&self, batch: RefuelingBatch, expected_version: i64) -> AppResult<()> {
        let vehicle_id = batch.vehicle_id;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO refueling_sequences (vehicle_id, version) VALUES ($1, 0) ON CONFLICT (vehicle_id) DO NOTHING",
        )
        .bind(vehicle_id)
        .execute(&mut *tx)
        .await?;

        // Compare-and-swap: bloquea la fila de la secuencia hasta el commit
        let bumped = sqlx::query(
            "UPDATE refueling_sequences SET version = version + 1 WHERE vehicle_id = $1 AND version = $2",
        )
        .bind(vehicle_id)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if bumped.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::ConcurrencyConflict(vehicle_id));
        }

        // Orden: borrados, actualizaciones, inserciones
        let mut writes = batch.writes;
        writes.sort_by_key(|write| match write {
            RefuelingWrite::Delete(_) => 0,
            RefuelingWrite::Update(_) => 1,
            RefuelingWrite::Insert(_) => 2,
        });

        for write in writes {
            match write {
                RefuelingWrite::Delete(id) => {
                    sqlx::query("DELETE FROM refuelings WHERE id = $1 AND vehicle_id = $2")
                        .bind(id)
                        .bind(vehicle_id)
                        .execute(&mut *tx)
                        .await?;
                }
                RefuelingWrite::Update(r) => {
                    sqlx::query(
                        r#"
                        UPDATE refuelings
                        SET odometer_reading = $2, liters_filled = $3, cost_per_liter = $4,
                            total_cost = $5, fuel_type = $6, occurred_at = $7, consumption = $8,
                            driver = $9, notes = $10, updated_at = $11
                        WHERE id = $1
                        "#,
                    )
                    .bind(r.id)
                    .bind(r.odometer_reading)
                    .bind(r.liters_filled)
                    .bind(r.cost_per_liter)
                    .bind(r.total_cost)
                    .bind(r.fuel_type)
                    .bind(r.occurred_at)
                    .bind(r.consumption)
                    .bind(&r.driver)
                    .bind(&r.notes)
                    .bind(r.updated_at)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| Self::map_write_error(vehicle_id, r.odometer_reading, e))?;
                }
                RefuelingWrite::Insert(r) => {
                    sqlx::query(
                        r#"
                        INSERT INTO refuelings (id, vehicle_id, odometer_reading, liters_filled,
                            cost_per_liter, total_cost, fuel_type, occurred_at, consumption,
                            driver, notes, created_at, updated_at)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                        "#,
                    )
                    .bind(r.id)
                    .bind(r.vehicle_id)
                    .bind(r.odometer_reading)
                    .bind(r.liters_filled)
                    .bind(r.cost_per_liter)
                    .bind(r.total_cost)
                    .bind(r.fuel_type)
                    .bind(r.occurred_at)
                    .bind(r.consumption)
                    .bind(&r.driver)
                    .bind(&r.notes)
                    .bind(r.created_at)
                    .bind(r.updated_at)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| Self::map_write_error(vehicle_id, r.odometer_reading, e))?;
                }
            }
        }

        tx.commit().await?;
        tracing::debug!("💾 Secuencia del vehículo {} en versión {}", vehicle_id, expected_version + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_window_is_compared_in_utc() {
        let date_conditions: Vec<&str> = FILTER_REFUELINGS
            .lines()
            .filter(|line| line.contains("::date"))
            .collect();

        assert_eq!(date_conditions.len(), 2);
        for condition in date_conditions {
            assert!(condition.contains("(occurred_at AT TIME ZONE 'UTC')::date"));
        }
    }
}
