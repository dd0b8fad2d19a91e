//! Certificate entity - calibration record with embedded uncertainty budgets
//!
//! A certificate holds the "before adjustment" measurement set and, when the
//! instrument was adjusted, a second "after adjustment" set. Each set is run
//! through the uncertainty calculator independently and the resulting budgets
//! are stored alongside the inputs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::budget::{BudgetTable, Direction, LabConstants};
use crate::core::entity::{Entity, Status};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::uncertainty::{calculate, CalcError, MeasurementSet, UncertaintyBudget};
use crate::entities::equipment::Equipment;
use crate::entities::tool::Tool;

/// Errors from computing a certificate's budgets
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CertificateError {
    #[error("{direction} measurements rejected: {source}")]
    Calc {
        direction: Direction,
        #[source]
        source: CalcError,
    },

    #[error("certificate is marked as adjusted but has no after-adjustment measurements")]
    MissingAfterAdjustment,

    #[error("certificate has no computed budgets; run `calcert cert calc` first")]
    NotCalculated,

    #[error("stored {direction} budget does not match its measurements; run `calcert cert calc` to recompute")]
    StaleResults { direction: Direction },

    #[error("lab constants rejected: {0}")]
    Constants(#[source] CalcError),
}

/// Relative tolerance when comparing stored budgets with a recomputation
const RESULT_TOLERANCE: f64 = 1e-9;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= RESULT_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

fn same_budget(stored: &UncertaintyBudget, fresh: &UncertaintyBudget) -> bool {
    close(stored.mean_value, fresh.mean_value)
        && close(stored.error, fresh.error)
        && close(stored.repeatability, fresh.repeatability)
        && close(stored.combined_uncertainty, fresh.combined_uncertainty)
        && close(stored.expanded_uncertainty, fresh.expanded_uncertainty)
}

/// Ambient conditions during calibration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    /// Ambient temperature in °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Relative humidity in %
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
}

/// Computed budgets (auto-calculated, never edited by hand)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<UncertaintyBudget>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<UncertaintyBudget>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_at: Option<DateTime<Utc>>,
}

/// Calibration certificate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    /// Unique identifier (CERT-...)
    pub id: EntityId,

    /// Printed certificate number
    pub number: String,

    /// Instrument calibrated
    pub equipment: EntityId,

    /// Reference standard used
    pub tool: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<EntityId>,

    pub calibration_date: NaiveDate,

    /// Technician who performed the calibration
    pub technician: String,

    #[serde(default)]
    pub conditions: Conditions,

    /// As-found measurements
    pub before: MeasurementSet,

    /// Whether the instrument was adjusted
    #[serde(default)]
    pub has_adjustment: bool,

    /// As-left measurements, present when adjusted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<MeasurementSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    #[serde(default)]
    pub results: CertificateResults,

    #[serde(default)]
    pub status: Status,

    pub created: DateTime<Utc>,

    pub author: String,
}

/// Assemble a measurement set from a reference standard and instrument readings
///
/// The standard value is the tool's certified concentration and the standard
/// uncertainty is derived from its uncertainty percentage.
pub fn measurement_set(tool: &Tool, resolution: f64, readings: [f64; 3]) -> MeasurementSet {
    MeasurementSet::new(
        tool.concentration,
        readings,
        resolution,
        tool.standard_uncertainty(),
    )
}

impl Certificate {
    /// Create a certificate for one instrument against one reference
    ///
    /// Budgets are not computed here; call [`Certificate::calculate`].
    pub fn new(
        number: impl Into<String>,
        equipment: &Equipment,
        tool: &Tool,
        before: MeasurementSet,
        after: Option<MeasurementSet>,
        technician: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(EntityPrefix::Cert),
            number: number.into(),
            equipment: equipment.id,
            tool: tool.id,
            customer: equipment.customer,
            calibration_date: now.date_naive(),
            technician: technician.into(),
            conditions: Conditions::default(),
            before,
            has_adjustment: after.is_some(),
            after,
            remarks: None,
            results: CertificateResults::default(),
            status: Status::default(),
            created: now,
            author: author.into(),
        }
    }

    /// Measurement sets that take part in the calculation, in print order
    pub fn measurement_sets(&self) -> Result<Vec<(Direction, &MeasurementSet)>, CertificateError> {
        let mut sets = vec![(Direction::Before, &self.before)];
        if self.has_adjustment {
            let after = self
                .after
                .as_ref()
                .ok_or(CertificateError::MissingAfterAdjustment)?;
            sets.push((Direction::After, after));
        }
        Ok(sets)
    }

    /// Compute the budgets for every direction and store them
    ///
    /// All-or-nothing: when any direction is rejected the stored results are
    /// left untouched.
    pub fn calculate(&mut self) -> Result<(), CertificateError> {
        let mut results = CertificateResults::default();

        for (direction, set) in self.measurement_sets()? {
            let budget = calculate(set).map_err(|source| CertificateError::Calc { direction, source })?;
            tracing::debug!(
                certificate = %self.id,
                %direction,
                mean = budget.mean_value,
                expanded = budget.expanded_uncertainty,
                "computed uncertainty budget"
            );
            match direction {
                Direction::Before => results.before = Some(budget),
                Direction::After => results.after = Some(budget),
            }
        }

        results.calculated_at = Some(Utc::now());
        self.results = results;
        Ok(())
    }

    /// Stored budget for a direction
    pub fn budget(&self, direction: Direction) -> Option<&UncertaintyBudget> {
        match direction {
            Direction::Before => self.results.before.as_ref(),
            Direction::After => self.results.after.as_ref(),
        }
    }

    /// Printable budget tables for every computed direction
    pub fn budget_tables(&self, constants: &LabConstants) -> Vec<BudgetTable> {
        let mut tables = Vec::new();
        if let Some(budget) = &self.results.before {
            tables.push(BudgetTable::build(
                Direction::Before,
                &self.before,
                budget,
                constants,
            ));
        }
        if let (Some(set), Some(budget)) = (&self.after, &self.results.after) {
            tables.push(BudgetTable::build(Direction::After, set, budget, constants));
        }
        tables
    }

    /// True when budgets exist for every direction that needs one
    pub fn is_calculated(&self) -> bool {
        self.results.before.is_some() && (!self.has_adjustment || self.results.after.is_some())
    }

    /// Check that the stored budgets exist and still follow from the stored
    /// measurements
    ///
    /// Records are plain files and may be edited after calculation; anything
    /// that is issued or printed goes through this check first.
    pub fn verify(&self) -> Result<(), CertificateError> {
        if !self.is_calculated() {
            return Err(CertificateError::NotCalculated);
        }

        let mut fresh = self.clone();
        fresh.calculate()?;

        for (direction, _) in self.measurement_sets()? {
            let matches = match (self.budget(direction), fresh.budget(direction)) {
                (Some(stored), Some(recomputed)) => same_budget(stored, recomputed),
                _ => false,
            };
            if !matches {
                return Err(CertificateError::StaleResults { direction });
            }
        }
        Ok(())
    }

    /// Budget tables for printing, after verifying the stored results and
    /// the lab constants
    pub fn verified_budget_tables(
        &self,
        constants: &LabConstants,
    ) -> Result<Vec<BudgetTable>, CertificateError> {
        self.verify()?;
        constants.validate().map_err(CertificateError::Constants)?;
        Ok(self.budget_tables(constants))
    }
}

impl Entity for Certificate {
    const PREFIX: EntityPrefix = EntityPrefix::Cert;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        self.number.clone()
    }

    fn status(&self) -> Status {
        self.status
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}
