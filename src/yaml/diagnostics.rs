//! Diagnostics for malformed YAML records
//!
//! Syntax and schema errors carry the offending file and byte span so miette
//! can point at the exact line.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A YAML error located in its source document
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(
    code(calcert::yaml::syntax),
    help("check indentation and field types against `calcert <type> show --format yaml`")
)]
pub struct YamlSyntaxError {
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl YamlSyntaxError {
    /// Build from a serde_yml error and the document it came from
    pub fn from_serde_error(err: &serde_yml::Error, content: &str, filename: &str) -> Self {
        let span = err.location().map(|loc| {
            let offset = loc.index().min(content.len());
            SourceSpan::from((offset, 1))
        });

        Self {
            message: err.to_string(),
            src: NamedSource::new(filename, content.to_string()),
            span,
        }
    }
}

/// Errors from reading or writing YAML records
#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(YamlSyntaxError),

    #[error("failed to serialize record: {0}")]
    Serialize(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
