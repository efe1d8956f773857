//! Servicios del dominio
//!
//! Cálculo de consumo, ledger de repostajes y estadísticas.

pub mod consumption;
pub mod ledger_service;
pub mod statistics_service;
