//! Uncertainty calculator - GUM propagation for a three-reading calibration point
//!
//! Turns the three repeated readings of the unit under calibration (UUC), its
//! display resolution and the certified uncertainty of the reference standard
//! into the combined and expanded uncertainty of the calibration point.
//!
//! The model is fixed by the laboratory procedure:
//!
//! ```text
//! mean          = (m1 + m2 + m3) / 3
//! error         = standard - mean
//! repeatability = s / √2            (s = sample std dev, n - 1 = 2)
//! u_res         = resolution / √3   (rectangular)
//! u_c           = √(repeatability² + u_res² + u_std²)
//! U             = k · u_c           (k = 2)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rectangular (uniform) distribution divisor
pub const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Divisor applied to the sample standard deviation of the three readings.
///
/// Laboratory convention: √2, not √n.
pub const REPEATABILITY_DIVISOR: f64 = std::f64::consts::SQRT_2;

/// Bessel-corrected degrees of freedom for three readings (n - 1)
pub const READINGS_DOF: f64 = 2.0;

/// Coverage factor k for the expanded uncertainty (~95 % for a normal distribution)
pub const COVERAGE_FACTOR: f64 = 2.0;

/// Number of repeated readings per calibration point
pub const READINGS_PER_POINT: usize = 3;

/// Calculator failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("invalid input: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl CalcError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { field, .. } => field,
        }
    }
}

/// One calibration direction's raw inputs (before or after adjustment)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSet {
    /// Reference concentration asserted by the calibration gas
    pub standard_value: f64,

    /// First UUC reading
    pub measurement1: f64,

    /// Second UUC reading
    pub measurement2: f64,

    /// Third UUC reading
    pub measurement3: f64,

    /// Smallest displayable increment of the UUC
    pub resolution: f64,

    /// Certified standard uncertainty of the reference
    pub uncertainty_standard: f64,
}

impl MeasurementSet {
    pub fn new(
        standard_value: f64,
        readings: [f64; READINGS_PER_POINT],
        resolution: f64,
        uncertainty_standard: f64,
    ) -> Self {
        let [measurement1, measurement2, measurement3] = readings;
        Self {
            standard_value,
            measurement1,
            measurement2,
            measurement3,
            resolution,
            uncertainty_standard,
        }
    }

    /// The three readings in entry order
    pub fn readings(&self) -> [f64; READINGS_PER_POINT] {
        [self.measurement1, self.measurement2, self.measurement3]
    }

    /// Reject non-finite fields and negative resolution / standard uncertainty
    pub fn validate(&self) -> Result<(), CalcError> {
        let fields = [
            ("standard_value", self.standard_value),
            ("measurement1", self.measurement1),
            ("measurement2", self.measurement2),
            ("measurement3", self.measurement3),
            ("resolution", self.resolution),
            ("uncertainty_standard", self.uncertainty_standard),
        ];

        for (field, value) in fields {
            if !value.is_finite() {
                return Err(CalcError::invalid(
                    field,
                    format!("must be a finite number, got {}", value),
                ));
            }
        }

        if self.resolution < 0.0 {
            return Err(CalcError::invalid(
                "resolution",
                format!("must not be negative, got {}", self.resolution),
            ));
        }

        if self.uncertainty_standard < 0.0 {
            return Err(CalcError::invalid(
                "uncertainty_standard",
                format!("must not be negative, got {}", self.uncertainty_standard),
            ));
        }

        Ok(())
    }
}

/// Derived statistics for one calibration direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBudget {
    /// Arithmetic mean of the three readings
    pub mean_value: f64,

    /// Standard value minus mean (signed)
    pub error: f64,

    /// Sample standard deviation divided by √2
    pub repeatability: f64,

    /// Root-sum-square of repeatability, resolution and standard uncertainty
    pub combined_uncertainty: f64,

    /// Combined uncertainty times the coverage factor
    pub expanded_uncertainty: f64,
}

/// Compute the uncertainty budget of a measurement set
///
/// Fails only on invalid input; identical readings are a valid case and give
/// zero repeatability.
pub fn calculate(set: &MeasurementSet) -> Result<UncertaintyBudget, CalcError> {
    set.validate()?;

    let readings = set.readings();
    let mean_value = (set.measurement1 + set.measurement2 + set.measurement3) / 3.0;
    let error = set.standard_value - mean_value;

    let variance = readings
        .iter()
        .map(|m| (m - mean_value).powi(2))
        .sum::<f64>()
        / READINGS_DOF;
    let std_dev = variance.sqrt();
    let repeatability = std_dev / REPEATABILITY_DIVISOR;

    let resolution_uncertainty = rectangular_uncertainty(set.resolution);

    let combined_uncertainty = (repeatability.powi(2)
        + resolution_uncertainty.powi(2)
        + set.uncertainty_standard.powi(2))
    .sqrt();
    let expanded_uncertainty = combined_uncertainty * COVERAGE_FACTOR;

    Ok(UncertaintyBudget {
        mean_value,
        error,
        repeatability,
        combined_uncertainty,
        expanded_uncertainty,
    })
}

/// Standard uncertainty of a quantity bounded by ±`bound` with no preferred value
pub fn rectangular_uncertainty(bound: f64) -> f64 {
    bound / SQRT_3
}

/// Standard uncertainty of a reference gas from its certified concentration
/// and relative uncertainty in percent
pub fn standard_uncertainty_from_percent(concentration: f64, uncertainty_percent: f64) -> f64 {
    (concentration * uncertainty_percent) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn known_set() -> MeasurementSet {
        MeasurementSet::new(100.0, [100.1, 100.2, 100.3], 0.1, 0.5)
    }

    #[test]
    fn test_known_value_scenario() {
        let budget = calculate(&known_set()).unwrap();

        assert_relative_eq!(budget.mean_value, 100.2, epsilon = 1e-9);
        assert_relative_eq!(budget.error, -0.2, epsilon = 1e-9);
        assert_relative_eq!(budget.repeatability, 0.070_710_678, epsilon = 1e-6);
        assert_relative_eq!(budget.combined_uncertainty, 0.508_265, epsilon = 1e-6);
        assert_relative_eq!(budget.expanded_uncertainty, 1.016_530, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_variance_boundary() {
        let set = MeasurementSet::new(10.0, [10.0, 10.0, 10.0], 0.0, 0.0);
        let budget = calculate(&set).unwrap();

        assert_eq!(budget.mean_value, 10.0);
        assert_eq!(budget.error, 0.0);
        assert_eq!(budget.repeatability, 0.0);
        assert_eq!(budget.combined_uncertainty, 0.0);
        assert_eq!(budget.expanded_uncertainty, 0.0);
    }

    #[test]
    fn test_identical_readings_collapse_to_type_b() {
        let set = MeasurementSet::new(50.0, [49.0, 49.0, 49.0], 1.0, 0.25);
        let budget = calculate(&set).unwrap();

        assert_eq!(budget.repeatability, 0.0);
        let expected = ((1.0 / SQRT_3).powi(2) + 0.25_f64.powi(2)).sqrt();
        assert_relative_eq!(budget.combined_uncertainty, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_error_sign_is_preserved() {
        let low = MeasurementSet::new(100.0, [101.0, 102.0, 103.0], 0.1, 0.1);
        assert!(calculate(&low).unwrap().error < 0.0);

        let high = MeasurementSet::new(100.0, [97.0, 98.0, 99.0], 0.1, 0.1);
        assert!(calculate(&high).unwrap().error > 0.0);
    }

    #[test]
    fn test_negative_resolution_rejected() {
        let mut set = known_set();
        set.resolution = -0.1;
        let err = calculate(&set).unwrap_err();
        assert_eq!(err.field(), "resolution");
    }

    #[test]
    fn test_negative_standard_uncertainty_rejected() {
        let mut set = known_set();
        set.uncertainty_standard = -1.0;
        let err = calculate(&set).unwrap_err();
        assert_eq!(err.field(), "uncertainty_standard");
    }

    #[test]
    fn test_non_finite_fields_rejected() {
        let mut set = known_set();
        set.measurement2 = f64::NAN;
        assert_eq!(calculate(&set).unwrap_err().field(), "measurement2");

        let mut set = known_set();
        set.standard_value = f64::INFINITY;
        assert_eq!(calculate(&set).unwrap_err().field(), "standard_value");
    }

    #[test]
    fn test_error_message_names_field() {
        let mut set = known_set();
        set.resolution = -2.0;
        let msg = calculate(&set).unwrap_err().to_string();
        assert!(msg.contains("resolution"));
        assert!(msg.contains("negative"));
    }

    #[test]
    fn test_negative_readings_are_valid() {
        let set = MeasurementSet::new(-5.0, [-4.0, -5.0, -6.0], 0.5, 0.1);
        let budget = calculate(&set).unwrap();
        assert_relative_eq!(budget.mean_value, -5.0, epsilon = 1e-12);
        assert!(budget.combined_uncertainty > 0.0);
    }

    #[test]
    fn test_directions_are_independent() {
        let before = known_set();
        let mut after = before;
        let before_budget = calculate(&before).unwrap();

        after.measurement1 = 100.0;
        after.measurement2 = 100.0;
        after.measurement3 = 100.0;
        let after_budget = calculate(&after).unwrap();

        assert_eq!(calculate(&before).unwrap(), before_budget);
        assert_eq!(after_budget.repeatability, 0.0);
        assert_ne!(before_budget, after_budget);
    }

    #[test]
    fn test_standard_uncertainty_from_percent() {
        assert_relative_eq!(standard_uncertainty_from_percent(50.0, 2.0), 1.0);
        assert_relative_eq!(standard_uncertainty_from_percent(2500.0, 1.5), 37.5);
        assert_eq!(standard_uncertainty_from_percent(0.0, 5.0), 0.0);
    }

    #[test]
    fn test_rectangular_divisor_matches_sqrt3() {
        assert_relative_eq!(SQRT_3, 3.0_f64.sqrt(), epsilon = 1e-15);
        assert_relative_eq!(rectangular_uncertainty(SQRT_3), 1.0, epsilon = 1e-15);
    }

    fn finite() -> impl Strategy<Value = f64> {
        -1.0e6..1.0e6
    }

    fn non_negative() -> impl Strategy<Value = f64> {
        0.0..1.0e3
    }

    proptest! {
        #[test]
        fn prop_budget_is_non_negative(
            standard in finite(),
            m1 in finite(),
            m2 in finite(),
            m3 in finite(),
            resolution in non_negative(),
            u_std in non_negative(),
        ) {
            let set = MeasurementSet::new(standard, [m1, m2, m3], resolution, u_std);
            let budget = calculate(&set).unwrap();
            prop_assert!(budget.repeatability >= 0.0);
            prop_assert!(budget.combined_uncertainty >= 0.0);
            prop_assert!(budget.expanded_uncertainty >= 0.0);
        }

        #[test]
        fn prop_expanded_is_exactly_k_times_combined(
            standard in finite(),
            m1 in finite(),
            m2 in finite(),
            m3 in finite(),
            resolution in non_negative(),
            u_std in non_negative(),
        ) {
            let set = MeasurementSet::new(standard, [m1, m2, m3], resolution, u_std);
            let budget = calculate(&set).unwrap();
            prop_assert_eq!(budget.expanded_uncertainty, budget.combined_uncertainty * COVERAGE_FACTOR);
        }

        #[test]
        fn prop_calculation_is_deterministic(
            standard in finite(),
            m1 in finite(),
            m2 in finite(),
            m3 in finite(),
            resolution in non_negative(),
            u_std in non_negative(),
        ) {
            let set = MeasurementSet::new(standard, [m1, m2, m3], resolution, u_std);
            let first = calculate(&set).unwrap();
            let second = calculate(&set).unwrap();
            prop_assert_eq!(first.mean_value.to_bits(), second.mean_value.to_bits());
            prop_assert_eq!(first.error.to_bits(), second.error.to_bits());
            prop_assert_eq!(first.combined_uncertainty.to_bits(), second.combined_uncertainty.to_bits());
            prop_assert_eq!(first.expanded_uncertainty.to_bits(), second.expanded_uncertainty.to_bits());
        }
    }
}
