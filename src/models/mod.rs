//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos del ledger de combustible:
//! repostajes, vehículos y las vistas agregadas de estadísticas.

pub mod refueling;
pub mod statistics;
pub mod vehicle;
