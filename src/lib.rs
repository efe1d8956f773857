//! Fuel Ledger
//!
//! Registro de repostajes por vehículo con consumo (km/l) derivado del
//! repostaje anterior en orden de odómetro, y estadísticas agregadas.

pub mod config;
pub mod controllers;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_app_router;
pub use state::AppState;
