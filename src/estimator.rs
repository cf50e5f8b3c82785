//! # Price Estimator Module
//!
//! Computes a used car's market price from its baseline (new) price using
//! age-based and mileage-based depreciation plus a flat discount for the
//! selected body condition.
//!
//! ## Algorithm
//!
//! 1. `age = reference_year - manufacture_year`
//! 2. Age drop: 0 for `age <= 0`, 5% for the first year, then 3.5% per
//!    additional year, replaced by a flat 40% once the car is older than ten
//!    years.
//! 3. Mileage drop: the difference against an expected 20,000 km per year
//!    costs 1% per 10,000 km above expectation and earns 0.5% per 10,000 km
//!    below it, clamped to `[-5%, +15%]`.
//! 4. The three drops are summed without further clamping and the result is
//!    rounded to a multiple of 5.
//!
//! ```rust
//! use carprice_bot::estimator::PriceEstimator;
//!
//! let estimator = PriceEstimator::new(1404);
//! assert_eq!(estimator.estimate(1000.0, 1403, 20_000, 0.0), 950);
//! ```

use crate::catalog::CarCatalog;

/// Reference year used when none is configured
pub const DEFAULT_REFERENCE_YEAR: i32 = 1404;
/// Number of manufacture years offered by the estimation flow
pub const YEAR_SPAN: i32 = 15;
/// Mileage a car is expected to accumulate per year of age
pub const EXPECTED_KM_PER_YEAR: i64 = 20_000;

const FIRST_YEAR_DROP: f64 = 0.05;
const YEARLY_DROP: f64 = 0.035;
const MAX_AGE_DROP: f64 = 0.40;
const MAX_LINEAR_AGE: i32 = 10;
const MILEAGE_STEP_KM: f64 = 10_000.0;
const EXCESS_MILEAGE_RATE: f64 = 0.01;
const LOW_MILEAGE_RATE: f64 = 0.005;
const MIN_MILEAGE_DROP: f64 = -0.05;
const MAX_MILEAGE_DROP: f64 = 0.15;
const PRICE_STEP: f64 = 5.0;

/// A body/paint damage category with its flat price discount
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionCode {
    /// Localization key of the human-readable label
    pub label_key: &'static str,
    /// Fractional discount in `[0, 1)`
    pub discount: f64,
}

/// Condition categories in display order; the index is what buttons carry
pub const CONDITION_CODES: [ConditionCode; 9] = [
    ConditionCode { label_key: "condition-clean", discount: 0.0 },
    ConditionCode { label_key: "condition-minor-scratches", discount: 0.02 },
    ConditionCode { label_key: "condition-one-spot", discount: 0.04 },
    ConditionCode { label_key: "condition-two-spots", discount: 0.07 },
    ConditionCode { label_key: "condition-part-replaced", discount: 0.05 },
    ConditionCode { label_key: "condition-painted-around", discount: 0.25 },
    ConditionCode { label_key: "condition-roof-pillar", discount: 0.40 },
    ConditionCode { label_key: "condition-fully-painted", discount: 0.35 },
    ConditionCode { label_key: "condition-shell-replaced", discount: 0.30 },
];

/// Look up a condition code by its wire index
pub fn condition(index: usize) -> Option<&'static ConditionCode> {
    CONDITION_CODES.get(index)
}

/// Age-based depreciation fraction
pub fn age_drop(age: i32) -> f64 {
    if age <= 0 {
        0.0
    } else if age > MAX_LINEAR_AGE {
        MAX_AGE_DROP
    } else {
        FIRST_YEAR_DROP + f64::from(age - 1) * YEARLY_DROP
    }
}

/// Mileage-based adjustment relative to the expected mileage for `age`
///
/// Negative values raise the price (low mileage), positive values lower it.
pub fn mileage_drop(age: i32, mileage: u64) -> f64 {
    let expected = i64::from(age) * EXPECTED_KM_PER_YEAR;
    let diff = i64::try_from(mileage)
        .unwrap_or(i64::MAX)
        .saturating_sub(expected);
    let steps = diff as f64 / MILEAGE_STEP_KM;

    let drop = if diff > 0 {
        steps * EXCESS_MILEAGE_RATE
    } else {
        steps * LOW_MILEAGE_RATE
    };

    drop.clamp(MIN_MILEAGE_DROP, MAX_MILEAGE_DROP)
}

/// Deterministic market price estimator anchored to a fixed reference year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceEstimator {
    reference_year: i32,
}

impl Default for PriceEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_YEAR)
    }
}

impl PriceEstimator {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Manufacture years offered to the user, newest first
    pub fn selectable_years(&self) -> Vec<i32> {
        (0..YEAR_SPAN).map(|offset| self.reference_year - offset).collect()
    }

    /// Sum of the three depreciation components
    pub fn total_drop(&self, manufacture_year: i32, mileage: u64, condition_discount: f64) -> f64 {
        let age = self.reference_year - manufacture_year;
        age_drop(age) + mileage_drop(age, mileage) + condition_discount
    }

    /// Estimate the market price in the catalog's price unit
    ///
    /// The result is a multiple of 5. It is negative when the combined drop
    /// exceeds 100%; no floor is applied.
    pub fn estimate(
        &self,
        base_price: f64,
        manufacture_year: i32,
        mileage: u64,
        condition_discount: f64,
    ) -> i64 {
        let total = self.total_drop(manufacture_year, mileage, condition_discount);
        let adjusted = base_price * (1.0 - total);
        ((adjusted / PRICE_STEP).round_ties_even() * PRICE_STEP) as i64
    }
}

/// Baseline price for a model: the market price of its first variant
pub fn baseline_price(catalog: &CarCatalog, brand: &str, model: &str) -> Option<f64> {
    catalog
        .model(brand, model)
        .and_then(|m| m.variants.first())
        .map(|v| v.market_price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_drop_schedule() {
        assert_eq!(age_drop(-2), 0.0);
        assert_eq!(age_drop(0), 0.0);
        assert_eq!(age_drop(1), 0.05);
        assert!((age_drop(3) - 0.12).abs() < 1e-9);
        assert!((age_drop(10) - 0.365).abs() < 1e-9);
        assert_eq!(age_drop(11), 0.40);
        assert_eq!(age_drop(40), 0.40);
    }

    #[test]
    fn test_mileage_drop_direction() {
        // Above expectation lowers the price at 1% per 10,000 km
        assert!((mileage_drop(3, 100_000) - 0.04).abs() < 1e-9);
        // Below expectation raises it at 0.5% per 10,000 km
        assert!((mileage_drop(3, 40_000) + 0.01).abs() < 1e-9);
        assert_eq!(mileage_drop(1, 20_000), 0.0);
    }

    #[test]
    fn test_mileage_drop_clamps() {
        assert_eq!(mileage_drop(0, 5_000_000), 0.15);
        assert_eq!(mileage_drop(10, 0), -0.05);
    }

    #[test]
    fn test_selectable_years_descend_from_reference() {
        let years = PriceEstimator::new(1404).selectable_years();
        assert_eq!(years.len(), 15);
        assert_eq!(years.first(), Some(&1404));
        assert_eq!(years.last(), Some(&1390));
    }

    #[test]
    fn test_condition_lookup() {
        assert_eq!(condition(0).map(|c| c.discount), Some(0.0));
        assert_eq!(condition(6).map(|c| c.discount), Some(0.40));
        assert!(condition(CONDITION_CODES.len()).is_none());
    }
}
