//! Objetos de transferencia de la API HTTP

pub mod api_response;
pub mod refueling_dto;
pub mod vehicle_dto;
