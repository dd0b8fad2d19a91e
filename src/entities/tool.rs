//! Tool entity - reference standard (certified calibration gas)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, Status};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::uncertainty::standard_uncertainty_from_percent;
use crate::entities::equipment::default_unit;

/// A certified reference standard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Unique identifier (TOOL-...)
    pub id: EntityId,

    /// Descriptive name (e.g. "CO 50 ppm in air")
    pub name: String,

    /// Certified gas
    pub gas: String,

    /// Certified concentration
    pub concentration: f64,

    #[serde(default = "default_unit")]
    pub unit: String,

    /// Certified relative uncertainty in percent of the concentration
    pub uncertainty_percent: f64,

    /// Cylinder lot / batch number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,

    /// Certificate of the reference itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<NaiveDate>,

    #[serde(default)]
    pub status: Status,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        gas: impl Into<String>,
        concentration: f64,
        uncertainty_percent: f64,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Tool),
            name: name.into(),
            gas: gas.into(),
            concentration,
            unit: default_unit(),
            uncertainty_percent,
            lot_number: None,
            certificate_number: None,
            expiry: None,
            status: Status::default(),
            created: Utc::now(),
            author: author.into(),
        }
    }

    /// Standard uncertainty of the reference in concentration units
    pub fn standard_uncertainty(&self) -> f64 {
        standard_uncertainty_from_percent(self.concentration, self.uncertainty_percent)
    }

    /// True when the reference has expired on `date`
    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.expiry.is_some_and(|expiry| expiry < date)
    }
}

impl Entity for Tool {
    const PREFIX: EntityPrefix = EntityPrefix::Tool;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        self.name.clone()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_uncertainty_from_certificate() {
        let tool = Tool::new("CO 50 ppm", "CO", 50.0, 2.0, "tech");
        assert_eq!(tool.standard_uncertainty(), 1.0);
    }

    #[test]
    fn test_expiry() {
        let mut tool = Tool::new("H2S 25 ppm", "H2S", 25.0, 5.0, "tech");
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert!(!tool.is_expired_on(day));

        tool.expiry = NaiveDate::from_ymd_opt(2025, 5, 31);
        assert!(tool.is_expired_on(day));

        tool.expiry = Some(day);
        assert!(!tool.is_expired_on(day));
    }
}
