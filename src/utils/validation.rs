//! Utilidades de validación
//!
//! Validadores custom para `validator` y el extractor `ValidatedJson`, que
//! deserializa y valida el cuerpo antes de que llegue al ledger.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::request::Parts,
    Json,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::utils::errors::AppError;

/// Cota superior de cualquier cantidad aceptada (litros, importes, odómetro, km)
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

fn check_upper_bound(value: &Decimal) -> Result<(), ValidationError> {
    if *value > MAX_QUANTITY {
        let mut error = ValidationError::new("max_quantity");
        error.add_param("actual".into(), &value.to_string());
        error.add_param("max".into(), &MAX_QUANTITY.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un decimal sea estrictamente positivo y no supere `MAX_QUANTITY`
pub fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut error = ValidationError::new("positive");
        error.add_param("actual".into(), &value.to_string());
        return Err(error);
    }
    check_upper_bound(value)
}

/// Validar que un decimal no sea negativo ni supere `MAX_QUANTITY`
pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        let mut error = ValidationError::new("non_negative");
        error.add_param("actual".into(), &value.to_string());
        return Err(error);
    }
    check_upper_bound(value)
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Extractor JSON que además ejecuta las reglas de `validator`
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Extractor de query string con los errores en el mismo formato JSON que
/// el resto de la API
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(ApiQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(&Decimal::new(1, 2)).is_ok());
        assert!(validate_positive(&Decimal::ZERO).is_err());
        assert!(validate_positive(&Decimal::from(-5)).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative(&Decimal::ZERO).is_ok());
        assert!(validate_non_negative(&Decimal::from(1200)).is_ok());
        assert!(validate_non_negative(&Decimal::new(-1, 1)).is_err());
    }

    #[test]
    fn test_quantities_above_the_bound_are_rejected() {
        assert!(validate_positive(&MAX_QUANTITY).is_ok());
        assert!(validate_non_negative(&MAX_QUANTITY).is_ok());
        assert!(validate_positive(&(MAX_QUANTITY + Decimal::new(1, 2))).is_err());
        assert!(validate_non_negative(&Decimal::MAX).is_err());
    }

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("Carla").is_ok());
        assert!(validate_not_empty("   ").is_err());
    }
}
