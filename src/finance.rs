//! General functions related to finance.
use crate::units::{Dimensionless, Money};

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualise capital costs over the lifetime of an asset.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: Dimensionless) -> Dimensionless {
    if lifetime == 0 {
        return Dimensionless(0.0);
    }
    if discount_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(lifetime as f64);
    }
    let factor = (Dimensionless(1.0) + discount_rate).powi(lifetime as i32);
    (discount_rate * factor) / (factor - Dimensionless(1.0))
}

/// Calculates the annualised cost of an up-front capital outlay
pub fn annual_capital_cost(capital_cost: Money, lifetime: u32, discount_rate: Dimensionless) -> Money {
    capital_cost * capital_recovery_factor(lifetime, discount_rate)
}

/// The factor by which a cash flow `years_from_start` years in the future is discounted to the
/// present.
pub fn discount_factor(years_from_start: u32, discount_rate: Dimensionless) -> Dimensionless {
    Dimensionless(1.0) / (Dimensionless(1.0) + discount_rate).powi(years_from_start as i32)
}

/// Discount factors for each of the given years, relative to the first one.
///
/// `years` must be sorted.
pub fn discount_factors(years: &[u32], discount_rate: Dimensionless) -> Vec<Dimensionless> {
    let Some(&first) = years.first() else {
        return Vec::new();
    };

    years
        .iter()
        .map(|year| discount_factor(year - first, discount_rate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0.05, 0.0)] // Edge case: lifetime==0
    #[case(10, 0.0, 0.1)] // Other edge case: discount_rate==0
    #[case(10, 0.05, 0.1295045749654567)]
    #[case(20, 0.08, 0.10185220882315059)]
    fn test_capital_recovery_factor(
        #[case] lifetime: u32,
        #[case] discount_rate: f64,
        #[case] expected: f64,
    ) {
        let result = capital_recovery_factor(lifetime, Dimensionless(discount_rate));
        assert_approx_eq!(f64, result.0, expected, epsilon = 1e-10);
    }

    #[rstest]
    #[case(1000.0, 10, 0.05, 129.5045749654567)]
    #[case(1000.0, 0, 0.05, 0.0)] // Zero lifetime
    #[case(2000.0, 20, 0.0, 100.0)] // Zero discount rate
    fn test_annual_capital_cost(
        #[case] capital_cost: f64,
        #[case] lifetime: u32,
        #[case] discount_rate: f64,
        #[case] expected: f64,
    ) {
        let result = annual_capital_cost(
            Money(capital_cost),
            lifetime,
            Dimensionless(discount_rate),
        );
        assert_approx_eq!(Money, result, Money(expected), epsilon = 1e-8);
    }

    #[rstest]
    #[case(0, 0.08, 1.0)]
    #[case(1, 0.08, 0.9259259259259258)]
    #[case(3, 0.0, 1.0)]
    #[case(2, 0.1, 0.8264462809917354)]
    fn test_discount_factor(#[case] years: u32, #[case] rate: f64, #[case] expected: f64) {
        assert_approx_eq!(
            f64,
            discount_factor(years, Dimensionless(rate)).value(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_discount_factors_relative_to_first_year() {
        let factors = discount_factors(&[2026, 2027, 2029], Dimensionless(0.1));
        assert_eq!(factors.len(), 3);
        assert_approx_eq!(f64, factors[0].value(), 1.0);
        assert_approx_eq!(f64, factors[1].value(), 1.0 / 1.1);
        assert_approx_eq!(f64, factors[2].value(), 1.0 / 1.331, epsilon = 1e-12);
        assert!(discount_factors(&[], Dimensionless(0.1)).is_empty());
    }
}
