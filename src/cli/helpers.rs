//! Shared helper functions for CLI commands

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::project::Project;

/// Locate the project honouring `--project`
pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    let project = match &global.project {
        Some(dir) => Project::discover_from(dir),
        None => Project::discover(),
    };
    project.map_err(|e| miette::miette!("{}", e))
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// clap value parser for finite numbers
pub fn parse_finite(s: &str) -> Result<f64, String> {
    let value: f64 = s.trim().parse().map_err(|_| format!("'{}' is not a number", s))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("'{}' is not a finite number", s))
    }
}

/// clap value parser for finite numbers that must not be negative
pub fn parse_non_negative(s: &str) -> Result<f64, String> {
    let value = parse_finite(s)?;
    if value < 0.0 {
        Err(format!("'{}' must not be negative", s))
    } else {
        Ok(value)
    }
}

/// Collect exactly three readings from a clap `num_args = 3` value
pub fn three_readings(values: &[f64]) -> Result<[f64; 3]> {
    <[f64; 3]>::try_from(values)
        .map_err(|_| miette::miette!("expected exactly 3 readings, got {}", values.len()))
}
