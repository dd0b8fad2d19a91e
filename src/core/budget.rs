//! Uncertainty budget table - printable contributor rows for one direction
//!
//! Presentation layer over an [`UncertaintyBudget`]. Adds the laboratory's
//! gas temperature and gas flow rate effects as display rows and annotates the
//! table with an effective degrees-of-freedom estimate. Nothing here feeds back
//! into the expanded uncertainty.

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::core::uncertainty::{
    CalcError, MeasurementSet, UncertaintyBudget, COVERAGE_FACTOR, READINGS_DOF,
    REPEATABILITY_DIVISOR, SQRT_3,
};

/// Effective degrees of freedom above this value print as ">500"
pub const VEFF_DISPLAY_LIMIT: f64 = 500.0;

/// Sensitivity coefficient used for every contributor of this model
pub const SENSITIVITY_COEFFICIENT: f64 = 1.0;

/// Per-installation bounds of the display-only Type B effects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConstants {
    /// Half-width of the gas temperature effect (rectangular)
    pub gas_temperature_effect: f64,

    /// Half-width of the gas flow rate effect (rectangular)
    pub gas_flow_rate_effect: f64,
}

impl Default for LabConstants {
    fn default() -> Self {
        Self {
            gas_temperature_effect: 0.0,
            gas_flow_rate_effect: 0.0,
        }
    }
}

impl LabConstants {
    /// Reject bounds that are not finite or are negative
    pub fn validate(&self) -> Result<(), CalcError> {
        for (field, value) in [
            ("gas_temperature_effect", self.gas_temperature_effect),
            ("gas_flow_rate_effect", self.gas_flow_rate_effect),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CalcError::InvalidInput {
                    field,
                    reason: format!("must be a finite, non-negative bound, got {}", value),
                });
            }
        }
        Ok(())
    }
}

/// Which measurement set a budget belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// As found, before any adjustment of the UUC
    Before,
    /// As left, after adjusting the UUC
    After,
}

impl Direction {
    /// Machine-readable key ("before" / "after")
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Before => "before",
            Direction::After => "after",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Before => write!(f, "before adjustment"),
            Direction::After => write!(f, "after adjustment"),
        }
    }
}

/// GUM evaluation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationType {
    /// Statistical analysis of repeated observations
    A,
    /// Any other information
    B,
}

impl std::fmt::Display for EvaluationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationType::A => write!(f, "A"),
            EvaluationType::B => write!(f, "B"),
        }
    }
}

/// Probability distribution assigned to a contributor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    Normal,
    Rectangular,
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Distribution::Normal => write!(f, "normal"),
            Distribution::Rectangular => write!(f, "rectangular"),
        }
    }
}

/// One contributor line of the budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRow {
    /// Source of uncertainty
    pub contributor: String,

    pub evaluation: EvaluationType,

    pub distribution: Distribution,

    /// Estimate before dividing (std dev, resolution, bound, ...)
    pub value: f64,

    /// Divisor turning `value` into a standard uncertainty
    pub divisor: f64,

    /// Printable divisor ("√2", "√3", "1")
    pub divisor_label: String,

    pub sensitivity: f64,

    /// Standard uncertainty contribution u_i = value / divisor × c_i
    pub standard_uncertainty: f64,
}

impl BudgetRow {
    fn new(
        contributor: &str,
        evaluation: EvaluationType,
        distribution: Distribution,
        value: f64,
        divisor: f64,
        divisor_label: &str,
    ) -> Self {
        Self {
            contributor: contributor.to_string(),
            evaluation,
            distribution,
            value,
            divisor,
            divisor_label: divisor_label.to_string(),
            sensitivity: SENSITIVITY_COEFFICIENT,
            standard_uncertainty: value / divisor * SENSITIVITY_COEFFICIENT,
        }
    }
}

/// Effective degrees of freedom annotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EffectiveDof {
    /// Ratio rounded to an integer
    Finite(u64),
    /// Ratio above the display limit (or unbounded)
    AboveLimit,
}

impl EffectiveDof {
    /// Classify a raw ratio for display
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio.is_nan() || ratio > VEFF_DISPLAY_LIMIT {
            EffectiveDof::AboveLimit
        } else {
            EffectiveDof::Finite(ratio.round() as u64)
        }
    }
}

impl std::fmt::Display for EffectiveDof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EffectiveDof::Finite(v) => write!(f, "{}", v),
            EffectiveDof::AboveLimit => write!(f, ">{}", VEFF_DISPLAY_LIMIT),
        }
    }
}

/// Welch-Satterthwaite style ratio used by the printed table
///
/// `u_c⁴ / (repeatability⁴ / 2)`. Infinite when repeatability is zero, NaN
/// when both are zero; both display as above the limit.
pub fn effective_dof_ratio(budget: &UncertaintyBudget) -> f64 {
    budget.combined_uncertainty.powi(4) / (budget.repeatability.powi(4) / READINGS_DOF)
}

/// Printable budget for one direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetTable {
    pub direction: Direction,

    /// Contributor rows in display order
    pub rows: Vec<BudgetRow>,

    pub combined_uncertainty: f64,

    pub coverage_factor: f64,

    pub expanded_uncertainty: f64,

    pub effective_dof: EffectiveDof,
}

impl BudgetTable {
    /// Build the contributor rows for a computed budget
    ///
    /// `set` is the measurement set the budget was computed from; it supplies
    /// the resolution and the reference standard uncertainty.
    pub fn build(
        direction: Direction,
        set: &MeasurementSet,
        budget: &UncertaintyBudget,
        constants: &LabConstants,
    ) -> Self {
        let std_dev = budget.repeatability * REPEATABILITY_DIVISOR;

        let rows = vec![
            BudgetRow::new(
                "Repeatability",
                EvaluationType::A,
                Distribution::Normal,
                std_dev,
                REPEATABILITY_DIVISOR,
                "√2",
            ),
            BudgetRow::new(
                "Resolution",
                EvaluationType::B,
                Distribution::Rectangular,
                set.resolution,
                SQRT_3,
                "√3",
            ),
            BudgetRow::new(
                "Standard uncertainty",
                EvaluationType::B,
                Distribution::Normal,
                set.uncertainty_standard,
                1.0,
                "1",
            ),
            BudgetRow::new(
                "Gas temperature effect",
                EvaluationType::B,
                Distribution::Rectangular,
                constants.gas_temperature_effect,
                SQRT_3,
                "√3",
            ),
            BudgetRow::new(
                "Gas flow rate effect",
                EvaluationType::B,
                Distribution::Rectangular,
                constants.gas_flow_rate_effect,
                SQRT_3,
                "√3",
            ),
        ];

        Self {
            direction,
            rows,
            combined_uncertainty: budget.combined_uncertainty,
            coverage_factor: COVERAGE_FACTOR,
            expanded_uncertainty: budget.expanded_uncertainty,
            effective_dof: EffectiveDof::from_ratio(effective_dof_ratio(budget)),
        }
    }

    /// Rows formatted for terminal tables and CSV export
    pub fn display_rows(&self, decimals: usize) -> Vec<DisplayRow> {
        self.rows
            .iter()
            .map(|row| DisplayRow {
                contributor: row.contributor.clone(),
                evaluation: row.evaluation.to_string(),
                distribution: row.distribution.to_string(),
                value: format!("{:.*}", decimals, row.value),
                divisor: row.divisor_label.clone(),
                sensitivity: format!("{:.1}", row.sensitivity),
                standard_uncertainty: format!("{:.*}", decimals, row.standard_uncertainty),
            })
            .collect()
    }

    /// Summary lines printed under the contributor rows
    pub fn summary(&self, decimals: usize) -> Vec<(String, String)> {
        vec![
            (
                "Combined uncertainty (u_c)".to_string(),
                format!("{:.*}", decimals, self.combined_uncertainty),
            ),
            (
                "Effective degrees of freedom".to_string(),
                self.effective_dof.to_string(),
            ),
            (
                "Coverage factor (k)".to_string(),
                format!("{}", self.coverage_factor),
            ),
            (
                "Expanded uncertainty (U)".to_string(),
                format!("{:.*}", decimals, self.expanded_uncertainty),
            ),
        ]
    }
}

/// String-formatted budget row
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct DisplayRow {
    #[tabled(rename = "Contributor")]
    pub contributor: String,
    #[tabled(rename = "Type")]
    pub evaluation: String,
    #[tabled(rename = "Distribution")]
    pub distribution: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Divisor")]
    pub divisor: String,
    #[tabled(rename = "c_i")]
    pub sensitivity: String,
    #[tabled(rename = "u_i")]
    pub standard_uncertainty: String,
}
