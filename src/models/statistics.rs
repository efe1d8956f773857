//! Modelos de estadísticas de repostajes
//!
//! `RefuelingSummary` guarda los agregados sin redondear; el redondeo a dos
//! decimales solo ocurre en `into_view`, en la frontera de presentación.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::services::consumption::round_half_away;

/// Agregados exactos para un conjunto filtrado de repostajes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefuelingSummary {
    pub total_refuelings: usize,
    pub total_cost: Decimal,
    pub total_liters: Decimal,
    /// Media de los consumos no nulos; cero si no hay ninguno
    pub average_consumption: Decimal,
    pub per_vehicle: Vec<VehicleRefuelingStats>,
}

/// Agregados exactos de un vehículo
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRefuelingStats {
    pub vehicle_id: Uuid,
    pub license_plate: Option<String>,
    pub count: usize,
    pub total_cost: Decimal,
    pub total_liters: Decimal,
    /// `None` si ningún repostaje del vehículo tiene consumo medido
    pub average_consumption: Option<Decimal>,
}

/// Vista de presentación del resumen, redondeada a dos decimales
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryView {
    pub total_refuelings: usize,
    pub total_cost: Decimal,
    pub total_liters: Decimal,
    pub average_consumption: Decimal,
    pub per_vehicle: Vec<VehicleStatsView>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VehicleStatsView {
    pub vehicle_id: Uuid,
    pub license_plate: Option<String>,
    pub count: usize,
    pub total_cost: Decimal,
    pub total_liters: Decimal,
    pub average_consumption: Option<Decimal>,
}

impl RefuelingSummary {
    pub fn into_view(self) -> SummaryView {
        SummaryView {
            total_refuelings: self.total_refuelings,
            total_cost: round_half_away(self.total_cost),
            total_liters: round_half_away(self.total_liters),
            average_consumption: round_half_away(self.average_consumption),
            per_vehicle: self
                .per_vehicle
                .into_iter()
                .map(VehicleStatsView::from)
                .collect(),
        }
    }
}

impl From<VehicleRefuelingStats> for VehicleStatsView {
    fn from(stats: VehicleRefuelingStats) -> Self {
        Self {
            vehicle_id: stats.vehicle_id,
            license_plate: stats.license_plate,
            count: stats.count,
            total_cost: round_half_away(stats.total_cost),
            total_liters: round_half_away(stats.total_liters),
            average_consumption: stats.average_consumption.map(round_half_away),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_rounds_only_at_the_boundary() {
        let summary = RefuelingSummary {
            total_refuelings: 3,
            total_cost: Decimal::new(100_005, 3),
            total_liters: Decimal::new(33_334, 3),
            average_consumption: Decimal::new(-12_345, 3),
            per_vehicle: vec![VehicleRefuelingStats {
                vehicle_id: Uuid::nil(),
                license_plate: Some("ABC1D23".to_string()),
                count: 3,
                total_cost: Decimal::new(100_005, 3),
                total_liters: Decimal::new(33_334, 3),
                average_consumption: None,
            }],
        };

        let view = summary.into_view();
        assert_eq!(view.total_cost, Decimal::new(10_001, 2));
        assert_eq!(view.total_liters, Decimal::new(3_333, 2));
        assert_eq!(view.average_consumption, Decimal::new(-1_235, 2));
        assert_eq!(view.per_vehicle[0].average_consumption, None);
        assert_eq!(view.per_vehicle[0].total_cost, Decimal::new(10_001, 2));
    }
}
