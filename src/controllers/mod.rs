pub mod refueling_controller;
pub mod vehicle_controller;
