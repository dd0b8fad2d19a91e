//! `calcert calc` command - one-off uncertainty budget
//!
//! Runs the calculator on values given on the command line. Works outside a
//! project; lab constants and display options come from the config files when
//! present.

use clap::{ArgGroup, Args, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{open_project, parse_finite, parse_non_negative, three_readings};
use crate::cli::output::print_budget_tables;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::budget::{BudgetTable, Direction};
use crate::core::project::{Project, ProjectError};
use crate::core::uncertainty::{calculate, standard_uncertainty_from_percent, MeasurementSet};
use crate::core::Config;

/// Direction label for the printed table
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum DirectionArg {
    #[default]
    Before,
    After,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Before => Direction::Before,
            DirectionArg::After => Direction::After,
        }
    }
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("reference")
        .required(true)
        .args(["u_std", "concentration"])
))]
pub struct CalcArgs {
    /// Reference value applied to the instrument
    #[arg(long, allow_negative_numbers = true, value_parser = parse_finite)]
    pub standard: f64,

    /// The three instrument readings M1 M2 M3
    #[arg(
        long,
        num_args = 3,
        required = true,
        value_names = ["M1", "M2", "M3"],
        allow_negative_numbers = true,
        value_parser = parse_finite
    )]
    pub readings: Vec<f64>,

    /// Instrument resolution
    #[arg(long, value_parser = parse_non_negative)]
    pub resolution: f64,

    /// Standard uncertainty of the reference
    #[arg(long = "u-std", value_parser = parse_non_negative)]
    pub u_std: Option<f64>,

    /// Certified concentration of the reference gas
    #[arg(long, value_parser = parse_finite, requires = "uncertainty_percent")]
    pub concentration: Option<f64>,

    /// Certified relative uncertainty of the reference gas in percent
    #[arg(long, value_parser = parse_non_negative, requires = "concentration")]
    pub uncertainty_percent: Option<f64>,

    /// Gas temperature effect bound (default: configured constant)
    #[arg(long, value_parser = parse_non_negative)]
    pub temperature_effect: Option<f64>,

    /// Gas flow rate effect bound (default: configured constant)
    #[arg(long, value_parser = parse_non_negative)]
    pub flow_effect: Option<f64>,

    /// Direction label of the table
    #[arg(long, short = 'd', default_value = "before")]
    pub direction: DirectionArg,
}

pub fn run(args: CalcArgs, global: &GlobalOpts) -> Result<()> {
    // An explicit --project must exist; otherwise a project is optional
    let project = match &global.project {
        Some(_) => Some(open_project(global)?),
        None => match Project::discover() {
            Ok(project) => Some(project),
            Err(ProjectError::NotFound(_)) => None,
            Err(e) => return Err(miette::miette!("{}", e)),
        },
    };
    let config = Config::load_for(project.as_ref());

    let u_std = match (args.u_std, args.concentration, args.uncertainty_percent) {
        (Some(u), _, _) => u,
        (None, Some(c), Some(p)) => standard_uncertainty_from_percent(c, p),
        _ => {
            return Err(miette::miette!(
                "either --u-std or --concentration with --uncertainty-percent is required"
            ))
        }
    };

    let set = MeasurementSet::new(
        args.standard,
        three_readings(&args.readings)?,
        args.resolution,
        u_std,
    );
    let budget = calculate(&set).into_diagnostic()?;
    tracing::debug!(?set, ?budget, "one-off calculation");

    let mut constants = config.constants;
    if let Some(bound) = args.temperature_effect {
        constants.gas_temperature_effect = bound;
    }
    if let Some(bound) = args.flow_effect {
        constants.gas_flow_rate_effect = bound;
    }
    constants.validate().map_err(|e| {
        miette::miette!(
            help = "check `constants` in config.yaml",
            "lab constants rejected: {}",
            e
        )
    })?;

    let decimals = config.display.decimals;
    if matches!(global.format, OutputFormat::Auto | OutputFormat::Table) {
        println!("{}: {:.*}", style("Mean").bold(), decimals, budget.mean_value);
        println!("{}: {:.*}", style("Error").bold(), decimals, budget.error);
        println!(
            "{}: {:.*}",
            style("Repeatability").bold(),
            decimals,
            budget.repeatability
        );
        println!();
    }

    let table = BudgetTable::build(args.direction.into(), &set, &budget, &constants);
    print_budget_tables(&[table], global.format, decimals)
}
