//! Certificate document rendering
//!
//! Builds a display context from a calculated certificate and its linked
//! records, then renders it through the embedded Tera templates.

use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;
use thiserror::Error;

use crate::core::budget::{BudgetTable, DisplayRow};
use crate::core::config::{Config, Laboratory};
use crate::entities::certificate::{CertificateError, Conditions};
use crate::entities::{Certificate, Customer, Equipment, Tool};

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

/// Name of the certificate document template
pub const CERTIFICATE_TEMPLATE: &str = "certificate.md.tera";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    RenderError(String),

    #[error("certificate {number} cannot be rendered: {source}")]
    Certificate {
        number: String,
        #[source]
        source: CertificateError,
    },
}

/// One line of the results table
#[derive(Debug, Clone, Serialize)]
pub struct ResultLine {
    pub direction: String,
    pub standard: String,
    pub readings: [String; 3],
    pub mean: String,
    pub error: String,
    pub expanded: String,
}

/// One printed uncertainty budget
#[derive(Debug, Clone, Serialize)]
pub struct BudgetSection {
    pub direction: String,
    pub rows: Vec<DisplayRow>,
    pub summary: Vec<(String, String)>,
}

impl BudgetSection {
    fn from_table(table: &BudgetTable, decimals: usize) -> Self {
        Self {
            direction: table.direction.to_string(),
            rows: table.display_rows(decimals),
            summary: table.summary(decimals),
        }
    }
}

/// Everything the certificate template displays
#[derive(Debug, Clone, Serialize)]
pub struct CertificateDocument<'a> {
    pub laboratory: &'a Laboratory,
    pub certificate: &'a Certificate,
    pub customer: Option<&'a Customer>,
    pub equipment: &'a Equipment,
    pub tool: &'a Tool,
    pub range: Option<String>,
    pub conditions: Conditions,
    pub results: Vec<ResultLine>,
    pub budgets: Vec<BudgetSection>,
}

impl<'a> CertificateDocument<'a> {
    /// Assemble the display context; the certificate must be calculated
    pub fn new(
        config: &'a Config,
        certificate: &'a Certificate,
        customer: Option<&'a Customer>,
        equipment: &'a Equipment,
        tool: &'a Tool,
    ) -> Result<Self, TemplateError> {
        let rejected = |source| TemplateError::Certificate {
            number: certificate.number.clone(),
            source,
        };
        let tables = certificate
            .verified_budget_tables(&config.constants)
            .map_err(rejected)?;

        let decimals = config.display.decimals;
        let fmt = |v: f64| format!("{:.*}", decimals, v);

        let measurement_sets = certificate.measurement_sets().map_err(rejected)?;

        let mut results = Vec::new();
        for (direction, set) in measurement_sets {
            let Some(budget) = certificate.budget(direction) else {
                return Err(rejected(CertificateError::NotCalculated));
            };
            results.push(ResultLine {
                direction: direction.to_string(),
                standard: fmt(set.standard_value),
                readings: set.readings().map(fmt),
                mean: fmt(budget.mean_value),
                error: fmt(budget.error),
                expanded: fmt(budget.expanded_uncertainty),
            });
        }

        let budgets = tables
            .iter()
            .map(|table| BudgetSection::from_table(table, decimals))
            .collect();

        Ok(Self {
            laboratory: &config.laboratory,
            certificate,
            customer,
            equipment,
            tool,
            range: equipment.range_label(),
            conditions: certificate.conditions,
            results,
            budgets,
        })
    }
}

/// Template renderer using Tera
pub struct TemplateGenerator {
    tera: Tera,
}

impl TemplateGenerator {
    /// Create a renderer with the embedded templates
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    tera.add_raw_template(filename, template_str)
                        .map_err(|e| TemplateError::RenderError(e.to_string()))?;
                }
            }
        }

        Ok(Self { tera })
    }

    /// Render the certificate document as Markdown
    pub fn render_certificate(&self, doc: &CertificateDocument<'_>) -> Result<String, TemplateError> {
        if !self.tera.get_template_names().any(|n| n == CERTIFICATE_TEMPLATE) {
            return Err(TemplateError::NotFound(CERTIFICATE_TEMPLATE.to_string()));
        }

        let context = tera::Context::from_serialize(doc)
            .map_err(|e| TemplateError::RenderError(e.to_string()))?;
        self.tera
            .render(CERTIFICATE_TEMPLATE, &context)
            .map_err(|e| TemplateError::RenderError(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::budget::LabConstants;
    use crate::entities::certificate::measurement_set;

    fn fixtures() -> (Config, Customer, Equipment, Tool) {
        let mut config = Config::default();
        config.laboratory.name = Some("Gas Cal Lab".to_string());
        config.constants = LabConstants {
            gas_temperature_effect: 0.2,
            gas_flow_rate_effect: 0.4,
        };
        let customer = Customer::new("Acme Mining", "tech");
        let mut eqp = Equipment::new("MX4", "SN-77", "CO", 0.1, "tech");
        eqp.customer = Some(customer.id);
        let tool = Tool::new("CO 100 ppm", "CO", 100.0, 0.5, "tech");
        (config, customer, eqp, tool)
    }

    #[test]
    fn test_render_before_and_after() {
        let (config, customer, eqp, tool) = fixtures();
        let before = measurement_set(&tool, eqp.resolution, [96.0, 97.0, 98.0]);
        let after = measurement_set(&tool, eqp.resolution, [100.1, 100.2, 100.3]);
        let mut cert =
            Certificate::new("CAL-2024-001", &eqp, &tool, before, Some(after), "Sam", "Sam");
        cert.calculate().unwrap();

        let doc = CertificateDocument::new(&config, &cert, Some(&customer), &eqp, &tool).unwrap();
        let out = TemplateGenerator::new()
            .unwrap()
            .render_certificate(&doc)
            .unwrap();

        assert!(out.contains("# Calibration Certificate CAL-2024-001"));
        assert!(out.contains("Gas Cal Lab"));
        assert!(out.contains("Acme Mining"));
        assert!(out.contains("Uncertainty budget (before adjustment)"));
        assert!(out.contains("Uncertainty budget (after adjustment)"));
        assert!(out.contains("| Resolution | B | rectangular | 0.1000 | √3 | 1.0 | 0.0577 |"));
        assert!(out.contains("Expanded uncertainty (U): 1.0165"));
    }

    #[test]
    fn test_uncalculated_certificate_is_rejected() {
        let (config, _, eqp, tool) = fixtures();
        let before = measurement_set(&tool, eqp.resolution, [100.0, 100.0, 100.0]);
        let cert = Certificate::new("CAL-2024-002", &eqp, &tool, before, None, "Sam", "Sam");

        assert!(matches!(
            CertificateDocument::new(&config, &cert, None, &eqp, &tool),
            Err(TemplateError::Certificate {
                source: CertificateError::NotCalculated,
                ..
            })
        ));
    }

    #[test]
    fn test_edited_certificate_is_rejected() {
        let (config, _, eqp, tool) = fixtures();
        let before = measurement_set(&tool, eqp.resolution, [100.0, 100.0, 100.0]);
        let mut cert = Certificate::new("CAL-2024-004", &eqp, &tool, before, None, "Sam", "Sam");
        cert.calculate().unwrap();
        cert.before.resolution = -0.1;

        assert!(matches!(
            CertificateDocument::new(&config, &cert, None, &eqp, &tool),
            Err(TemplateError::Certificate {
                source: CertificateError::Calc { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_lab_constants_are_rejected() {
        let (mut config, _, eqp, tool) = fixtures();
        config.constants.gas_flow_rate_effect = f64::NAN;
        let before = measurement_set(&tool, eqp.resolution, [100.0, 100.0, 100.0]);
        let mut cert = Certificate::new("CAL-2024-005", &eqp, &tool, before, None, "Sam", "Sam");
        cert.calculate().unwrap();

        assert!(matches!(
            CertificateDocument::new(&config, &cert, None, &eqp, &tool),
            Err(TemplateError::Certificate {
                source: CertificateError::Constants(_),
                ..
            })
        ));
    }

    #[test]
    fn test_render_without_customer_or_lab() {
        let (_, _, eqp, tool) = fixtures();
        let config = Config::default();
        let before = measurement_set(&tool, eqp.resolution, [100.0, 100.0, 100.0]);
        let mut cert = Certificate::new("CAL-2024-003", &eqp, &tool, before, None, "Sam", "Sam");
        cert.calculate().unwrap();

        let doc = CertificateDocument::new(&config, &cert, None, &eqp, &tool).unwrap();
        let out = TemplateGenerator::new()
            .unwrap()
            .render_certificate(&doc)
            .unwrap();
        assert!(out.contains("CAL-2024-003"));
        assert!(!out.contains("after adjustment"));
        assert!(out.contains("Effective degrees of freedom: >500"));
    }
}
