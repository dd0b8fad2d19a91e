//! Output formatting utilities

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::io::Write;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::OutputFormat;
use crate::core::budget::BudgetTable;

/// Determine the effective output format based on context
pub fn effective_format(format: OutputFormat, is_list: bool) -> OutputFormat {
    match format {
        OutputFormat::Auto => {
            if is_list {
                OutputFormat::Table
            } else {
                OutputFormat::Yaml
            }
        }
        other => other,
    }
}

/// Render rows as a terminal table
pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::sharp()).to_string()
}

/// Print tabular rows in a row-oriented format
///
/// Table, TSV and CSV print the flattened cells; JSON and YAML serialize the
/// rows as given.
pub fn print_rows<R: Tabled + Serialize>(rows: &[R], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(rows).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer
                .write_record(R::headers().iter().map(|h| h.to_string()))
                .into_diagnostic()?;
            for row in rows {
                writer
                    .write_record(row.fields().iter().map(|f| f.to_string()))
                    .into_diagnostic()?;
            }
            writer.flush().into_diagnostic()?;
        }
        OutputFormat::Tsv => {
            let mut out = std::io::stdout().lock();
            let headers: Vec<String> = R::headers().iter().map(|h| h.to_string()).collect();
            writeln!(out, "{}", headers.join("\t")).into_diagnostic()?;
            for row in rows {
                let fields: Vec<String> = row
                    .fields()
                    .iter()
                    .map(|f| f.replace(['\t', '\n'], " "))
                    .collect();
                writeln!(out, "{}", fields.join("\t")).into_diagnostic()?;
            }
        }
        _ => println!("{}", render_table(rows)),
    }
    Ok(())
}

/// Print one or more uncertainty budgets
pub fn print_budget_tables(
    tables: &[BudgetTable],
    format: OutputFormat,
    decimals: usize,
) -> Result<()> {
    match effective_format(format, true) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(tables).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(tables).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer
                .write_record([
                    "direction",
                    "contributor",
                    "type",
                    "distribution",
                    "value",
                    "divisor",
                    "c_i",
                    "u_i",
                ])
                .into_diagnostic()?;
            for table in tables {
                let direction = table.direction.as_str();
                for row in table.display_rows(decimals) {
                    writer
                        .write_record([
                            direction,
                            row.contributor.as_str(),
                            row.evaluation.as_str(),
                            row.distribution.as_str(),
                            row.value.as_str(),
                            row.divisor.as_str(),
                            row.sensitivity.as_str(),
                            row.standard_uncertainty.as_str(),
                        ])
                        .into_diagnostic()?;
                }
            }
            writer.flush().into_diagnostic()?;
        }
        OutputFormat::Tsv => {
            for table in tables {
                print_rows(&table.display_rows(decimals), OutputFormat::Tsv)?;
            }
        }
        _ => {
            for (i, table) in tables.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!(
                    "{}",
                    style(format!("Uncertainty budget ({})", table.direction)).bold()
                );
                println!("{}", render_table(&table.display_rows(decimals)));
                for (label, value) in table.summary(decimals) {
                    println!("  {}: {}", style(label).dim(), style(value).cyan());
                }
            }
        }
    }
    Ok(())
}
