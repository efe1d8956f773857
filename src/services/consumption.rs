//! Cálculo de consumo
//!
//! Funciones puras, sin I/O. El consumo de un repostaje es la distancia
//! recorrida desde el repostaje anterior dividida entre los litros cargados.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimales con los que se guarda y se presenta el consumo
pub const CONSUMPTION_SCALE: u32 = 2;

/// Redondeo a dos decimales, mitad alejándose de cero
pub fn round_half_away(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CONSUMPTION_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Calcula el consumo de un repostaje respecto a su predecesor.
///
/// Devuelve `None` cuando no hay predecesor (primer repostaje del vehículo)
/// o cuando la distancia recorrida no es positiva. Una distancia no positiva
/// se trata como no medible, no como error.
pub fn compute_consumption(
    preceding_odometer: Option<Decimal>,
    current_odometer: Decimal,
    current_liters: Decimal,
) -> Option<Decimal> {
    let preceding = preceding_odometer?;
    let distance = current_odometer - preceding;
    if distance <= Decimal::ZERO || current_liters <= Decimal::ZERO {
        return None;
    }

    distance.checked_div(current_liters).map(round_half_away)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: i64) -> Decimal {
        Decimal::from(value)
    }

    #[test]
    fn test_first_refueling_has_no_consumption() {
        assert_eq!(compute_consumption(None, d(1000), d(10)), None);
    }

    #[test]
    fn test_consumption_from_predecessor() {
        assert_eq!(compute_consumption(Some(d(1000)), d(1400), d(40)), Some(d(10)));
        assert_eq!(compute_consumption(Some(d(1000)), d(1200), d(20)), Some(d(10)));
        assert_eq!(compute_consumption(Some(d(1200)), d(1400), d(40)), Some(d(5)));
    }

    #[test]
    fn test_non_positive_distance_is_unmeasurable() {
        assert_eq!(compute_consumption(Some(d(1400)), d(1400), d(40)), None);
        assert_eq!(compute_consumption(Some(d(1500)), d(1400), d(40)), None);
    }

    #[test]
    fn test_zero_liters_never_divides() {
        assert_eq!(compute_consumption(Some(d(1000)), d(1400), Decimal::ZERO), None);
    }

    #[test]
    fn test_rounds_to_two_places() {
        // 100 / 3 = 33.333...
        assert_eq!(
            compute_consumption(Some(d(0)), d(100), d(3)),
            Some(Decimal::new(3333, 2))
        );
        // 200 / 3 = 66.666...
        assert_eq!(
            compute_consumption(Some(d(0)), d(200), d(3)),
            Some(Decimal::new(6667, 2))
        );
    }

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        // 1.005 / 1 sits exactly on the midpoint
        assert_eq!(
            compute_consumption(Some(d(0)), Decimal::new(1005, 3), d(1)),
            Some(Decimal::new(101, 2))
        );
        assert_eq!(round_half_away(Decimal::new(-1005, 3)), Decimal::new(-101, 2));
        assert_eq!(round_half_away(Decimal::new(1004, 3)), Decimal::new(100, 2));
    }
}
