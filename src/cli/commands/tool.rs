//! `calcert tool` command - Reference standard management
//!
//! A tool is a certified calibration gas. Its standard uncertainty is
//! derived from the certified concentration and relative uncertainty.

use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use console::style;
use miette::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::entity_cmd::{self, EntityConfig};
use crate::cli::filters::StatusFilter;
use crate::cli::helpers::{open_project, parse_finite, parse_non_negative, truncate_str};
use crate::cli::GlobalOpts;
use crate::core::identity::EntityPrefix;
use crate::core::shortid::ShortIdIndex;
use crate::core::Config;
use crate::entities::Tool;

pub(crate) const ENTITY_CONFIG: EntityConfig = EntityConfig {
    prefix: EntityPrefix::Tool,
    name: "reference standard",
    name_plural: "reference standards",
    command: "tool",
};

#[derive(Subcommand, Debug)]
pub enum ToolCommands {
    /// List reference standards
    List(ListArgs),

    /// Register a reference standard
    New(NewArgs),

    /// Show a reference standard, including its standard uncertainty
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "active")]
    pub status: StatusFilter,

    /// Only standards for this gas (case-insensitive)
    #[arg(long)]
    pub gas: Option<String>,

    /// Hide standards that have expired
    #[arg(long)]
    pub valid: bool,

    /// Print only the number of matches
    #[arg(long)]
    pub count: bool,
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Descriptive name (e.g. "CO 100 ppm in air")
    #[arg(long, short = 'n')]
    pub name: String,

    /// Certified gas
    #[arg(long, short = 'g')]
    pub gas: String,

    /// Certified concentration
    #[arg(long, value_parser = parse_finite)]
    pub concentration: f64,

    /// Certified relative uncertainty in percent
    #[arg(long, value_parser = parse_non_negative)]
    pub uncertainty_percent: f64,

    /// Concentration unit
    #[arg(long, default_value = "ppm")]
    pub unit: String,

    /// Cylinder lot / batch number
    #[arg(long)]
    pub lot: Option<String>,

    /// Number of the standard's own certificate
    #[arg(long)]
    pub certificate: Option<String>,

    /// Expiry date (YYYY-MM-DD)
    #[arg(long)]
    pub expiry: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Tool ID or short ID (TOOL@1)
    pub id: String,
}

/// Row of `tool list`
#[derive(Debug, Serialize, Tabled)]
struct ToolRow {
    #[tabled(rename = "SHORT")]
    short: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "GAS")]
    gas: String,
    #[tabled(rename = "CONCENTRATION")]
    concentration: String,
    #[tabled(rename = "U%")]
    uncertainty_percent: String,
    #[tabled(rename = "EXPIRY")]
    expiry: String,
}

pub fn run(cmd: ToolCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ToolCommands::List(args) => run_list(args, global),
        ToolCommands::New(args) => run_new(args, global),
        ToolCommands::Show(args) => run_show(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let mut records = entity_cmd::load_filtered::<Tool>(&project, args.status)?;

    if let Some(gas) = &args.gas {
        records.retain(|(t, _)| t.gas.eq_ignore_ascii_case(gas));
    }
    if args.valid {
        let today = Utc::now().date_naive();
        records.retain(|(t, _)| !t.is_expired_on(today));
    }

    entity_cmd::output_list(
        &project,
        &records,
        &ENTITY_CONFIG,
        global,
        args.count,
        |t: &Tool, short_ids: &ShortIdIndex| ToolRow {
            short: entity_cmd::short_or_full(&t.id, short_ids),
            name: truncate_str(&t.name, 30),
            gas: t.gas.clone(),
            concentration: format!("{} {}", t.concentration, t.unit),
            uncertainty_percent: format!("{}", t.uncertainty_percent),
            expiry: t
                .expiry
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        },
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));

    let mut tool = Tool::new(
        args.name,
        args.gas,
        args.concentration,
        args.uncertainty_percent,
        config.author(),
    );
    tool.unit = args.unit;
    tool.lot_number = args.lot;
    tool.certificate_number = args.certificate;
    tool.expiry = args.expiry;

    let (path, short_id) = entity_cmd::save_new(&project, &tool)?;
    entity_cmd::output_new_entity(
        &tool.id,
        &path,
        &short_id,
        &ENTITY_CONFIG,
        &format!(
            "{} | u_std = {:.*} {}",
            style(&tool.name).yellow(),
            config.display.decimals,
            tool.standard_uncertainty(),
            tool.unit
        ),
        global,
    );
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let Some((tool, _)) =
        entity_cmd::run_show_generic::<Tool>(&project, &args.id, &ENTITY_CONFIG, global)?
    else {
        return Ok(());
    };
    let decimals = Config::load_for(Some(&project)).display.decimals;

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&tool.id.to_string()).cyan());
    println!("{}: {}", style("Name").bold(), style(&tool.name).yellow());
    println!("{}: {}", style("Gas").bold(), tool.gas);
    println!(
        "{}: {} {}",
        style("Concentration").bold(),
        tool.concentration,
        tool.unit
    );
    println!(
        "{}: {} %",
        style("Certified uncertainty").bold(),
        tool.uncertainty_percent
    );
    println!(
        "{}: {} {}",
        style("Standard uncertainty").bold(),
        style(format!("{:.*}", decimals, tool.standard_uncertainty())).cyan(),
        tool.unit
    );
    if let Some(lot) = &tool.lot_number {
        println!("{}: {}", style("Lot").bold(), lot);
    }
    if let Some(cert) = &tool.certificate_number {
        println!("{}: {}", style("Certificate").bold(), cert);
    }
    if let Some(expiry) = tool.expiry {
        let label = if tool.is_expired_on(Utc::now().date_naive()) {
            style(format!("{} (expired)", expiry)).red()
        } else {
            style(expiry.to_string()).green()
        };
        println!("{}: {}", style("Expiry").bold(), label);
    }
    entity_cmd::print_footer(&tool);

    Ok(())
}
