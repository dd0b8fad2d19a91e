//! Equipment entity - gas detector under calibration (UUC)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, Status};
use crate::core::identity::{EntityId, EntityPrefix};

/// A gas-detection instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    /// Unique identifier (EQP-...)
    pub id: EntityId,

    /// Instrument model
    pub model: String,

    pub serial_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    /// Detected gas (e.g. "CO", "H2S", "CH4")
    pub gas: String,

    /// Display unit
    #[serde(default = "default_unit")]
    pub unit: String,

    /// Lower end of the measuring range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_min: Option<f64>,

    /// Upper end of the measuring range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_max: Option<f64>,

    /// Smallest displayable increment
    pub resolution: f64,

    /// Owning customer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<EntityId>,

    #[serde(default)]
    pub status: Status,

    pub created: DateTime<Utc>,

    pub author: String,
}

pub(crate) fn default_unit() -> String {
    "ppm".to_string()
}

impl Equipment {
    pub fn new(
        model: impl Into<String>,
        serial_number: impl Into<String>,
        gas: impl Into<String>,
        resolution: f64,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Eqp),
            model: model.into(),
            serial_number: serial_number.into(),
            manufacturer: None,
            gas: gas.into(),
            unit: default_unit(),
            range_min: None,
            range_max: None,
            resolution,
            customer: None,
            status: Status::default(),
            created: Utc::now(),
            author: author.into(),
        }
    }

    /// Printable measuring range, e.g. "0-100 ppm"
    pub fn range_label(&self) -> Option<String> {
        match (self.range_min, self.range_max) {
            (Some(min), Some(max)) => Some(format!("{}-{} {}", min, max, self.unit)),
            (None, Some(max)) => Some(format!("0-{} {}", max, self.unit)),
            _ => None,
        }
    }
}

impl Entity for Equipment {
    const PREFIX: EntityPrefix = EntityPrefix::Eqp;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        format!("{} ({})", self.model, self.serial_number)
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
