//! `calcert eqp` command - Equipment (unit under calibration) management

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
use crate::entities::{Customer, Equipment};

pub(crate) const ENTITY_CONFIG: EntityConfig = EntityConfig {
    prefix: EntityPrefix::Eqp,
    name: "equipment",
    name_plural: "equipment",
    command: "eqp",
};

#[derive(Subcommand, Debug)]
pub enum EqpCommands {
    /// List equipment
    List(ListArgs),

    /// Register an instrument
    New(NewArgs),

    /// Show an instrument's details
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "active")]
    pub status: StatusFilter,

    /// Only instruments for this gas (case-insensitive)
    #[arg(long)]
    pub gas: Option<String>,

    /// Only instruments owned by this customer (ID or short ID)
    #[arg(long)]
    pub customer: Option<String>,

    /// Print only the number of matches
    #[arg(long)]
    pub count: bool,
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Instrument model
    #[arg(long, short = 'm')]
    pub model: String,

    /// Serial number
    #[arg(long)]
    pub serial: String,

    /// Detected gas (e.g. CO, H2S, CH4)
    #[arg(long, short = 'g')]
    pub gas: String,

    /// Smallest displayable increment
    #[arg(long, short = 'r', value_parser = parse_non_negative)]
    pub resolution: f64,

    #[arg(long)]
    pub manufacturer: Option<String>,

    /// Display unit
    #[arg(long, default_value = "ppm")]
    pub unit: String,

    /// Lower end of the measuring range
    #[arg(long, value_parser = parse_finite)]
    pub range_min: Option<f64>,

    /// Upper end of the measuring range
    #[arg(long, value_parser = parse_finite)]
    pub range_max: Option<f64>,

    /// Owning customer (ID or short ID)
    #[arg(long, short = 'c')]
    pub customer: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Equipment ID or short ID (EQP@1)
    pub id: String,
}

/// Row of `eqp list`
#[derive(Debug, Serialize, Tabled)]
struct EquipmentRow {
    #[tabled(rename = "SHORT")]
    short: String,
    #[tabled(rename = "MODEL")]
    model: String,
    #[tabled(rename = "SERIAL")]
    serial: String,
    #[tabled(rename = "GAS")]
    gas: String,
    #[tabled(rename = "RESOLUTION")]
    resolution: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

pub fn run(cmd: EqpCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        EqpCommands::List(args) => run_list(args, global),
        EqpCommands::New(args) => run_new(args, global),
        EqpCommands::Show(args) => run_show(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let mut records = entity_cmd::load_filtered::<Equipment>(&project, args.status)?;

    if let Some(gas) = &args.gas {
        records.retain(|(e, _)| e.gas.eq_ignore_ascii_case(gas));
    }
    if let Some(reference) = &args.customer {
        let (customer, _): (Customer, _) =
            entity_cmd::find(&project, reference, &super::cust::ENTITY_CONFIG)?;
        records.retain(|(e, _)| e.customer == Some(customer.id));
    }

    entity_cmd::output_list(
        &project,
        &records,
        &ENTITY_CONFIG,
        global,
        args.count,
        |e: &Equipment, short_ids: &ShortIdIndex| EquipmentRow {
            short: entity_cmd::short_or_full(&e.id, short_ids),
            model: truncate_str(&e.model, 30),
            serial: e.serial_number.clone(),
            gas: e.gas.clone(),
            resolution: format!("{} {}", e.resolution, e.unit),
            status: e.status.to_string(),
        },
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));

    if let (Some(min), Some(max)) = (args.range_min, args.range_max) {
        if min >= max {
            return Err(miette::miette!(
                "range minimum ({}) must be below range maximum ({})",
                min,
                max
            ));
        }
    }

    let mut eqp = Equipment::new(args.model, args.serial, args.gas, args.resolution, config.author());
    eqp.manufacturer = args.manufacturer;
    eqp.unit = args.unit;
    eqp.range_min = args.range_min;
    eqp.range_max = args.range_max;

    if let Some(reference) = &args.customer {
        let (customer, _): (Customer, _) =
            entity_cmd::find(&project, reference, &super::cust::ENTITY_CONFIG)?;
        eqp.customer = Some(customer.id);
    }

    let (path, short_id) = entity_cmd::save_new(&project, &eqp)?;
    entity_cmd::output_new_entity(
        &eqp.id,
        &path,
        &short_id,
        &ENTITY_CONFIG,
        &format!(
            "{} {} | resolution {} {}",
            style(&eqp.model).yellow(),
            eqp.serial_number,
            eqp.resolution,
            eqp.unit
        ),
        global,
    );
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let Some((eqp, _)) =
        entity_cmd::run_show_generic::<Equipment>(&project, &args.id, &ENTITY_CONFIG, global)?
    else {
        return Ok(());
    };

    let short_ids = ShortIdIndex::load(&project);

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&eqp.id.to_string()).cyan());
    println!("{}: {}", style("Model").bold(), style(&eqp.model).yellow());
    println!("{}: {}", style("Serial").bold(), eqp.serial_number);
    if let Some(manufacturer) = &eqp.manufacturer {
        println!("{}: {}", style("Manufacturer").bold(), manufacturer);
    }
    println!("{}: {}", style("Gas").bold(), eqp.gas);
    if let Some(range) = eqp.range_label() {
        println!("{}: {}", style("Range").bold(), range);
    }
    println!("{}: {} {}", style("Resolution").bold(), eqp.resolution, eqp.unit);
    if let Some(customer) = &eqp.customer {
        println!(
            "{}: {}",
            style("Customer").bold(),
            entity_cmd::link_label::<Customer>(&project, customer, &short_ids)
        );
    }
    entity_cmd::print_footer(&eqp);

    Ok(())
}
