//! Document templates

pub mod template;

pub use template::{CertificateDocument, TemplateError, TemplateGenerator};
