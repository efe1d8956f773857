pub mod memory;
pub mod refueling_repository;
pub mod vehicle_repository;
