//! `calcert cert` command - Calibration certificate management

use chrono::{Datelike, NaiveDate, Utc};
use clap::{Args, Subcommand, ValueEnum};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tabled::Tabled;

use crate::cli::entity_cmd::{self, EntityConfig};
use crate::cli::filters::StatusFilter;
use crate::cli::helpers::{open_project, parse_finite, parse_non_negative, three_readings};
use crate::cli::output::print_budget_tables;
use crate::cli::GlobalOpts;
use crate::core::budget::Direction;
use crate::core::entity::{Entity, Status};
use crate::core::identity::EntityPrefix;
use crate::core::project::Project;
use crate::core::shortid::ShortIdIndex;
use crate::core::{store, Config};
use crate::entities::certificate::measurement_set;
use crate::entities::{Certificate, Customer, Equipment, Tool};
use crate::schema::template::{CertificateDocument, TemplateGenerator};

pub(crate) const ENTITY_CONFIG: EntityConfig = EntityConfig {
    prefix: EntityPrefix::Cert,
    name: "certificate",
    name_plural: "certificates",
    command: "cert",
};

#[derive(Subcommand, Debug)]
pub enum CertCommands {
    /// List certificates
    List(ListArgs),

    /// Record a calibration and compute its uncertainty budgets
    New(NewArgs),

    /// Show a certificate with its results
    Show(ShowArgs),

    /// Recompute the embedded uncertainty budgets
    Calc(CalcArgs),

    /// Print the uncertainty budget table
    Budget(BudgetArgs),

    /// Render the certificate document (Markdown)
    Render(RenderArgs),

    /// Mark a calculated certificate as issued
    Issue(IssueArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "active")]
    pub status: StatusFilter,

    /// Only certificates for this instrument (ID or short ID)
    #[arg(long, short = 'e')]
    pub equipment: Option<String>,

    /// Print only the number of matches
    #[arg(long)]
    pub count: bool,
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Instrument calibrated (ID or short ID)
    #[arg(long, short = 'e')]
    pub equipment: String,

    /// Reference standard used (ID or short ID)
    #[arg(long, short = 't')]
    pub tool: String,

    /// As-found readings M1 M2 M3
    #[arg(
        long,
        num_args = 3,
        value_names = ["M1", "M2", "M3"],
        allow_negative_numbers = true,
        value_parser = parse_finite,
        required_unless_present = "interactive"
    )]
    pub readings: Vec<f64>,

    /// As-left readings M1 M2 M3; marks the certificate as adjusted
    #[arg(
        long,
        num_args = 3,
        value_names = ["M1", "M2", "M3"],
        allow_negative_numbers = true,
        value_parser = parse_finite
    )]
    pub after: Option<Vec<f64>>,

    /// Prompt for the readings
    #[arg(long, short = 'i')]
    pub interactive: bool,

    /// Certificate number (default: CAL-<year>-<sequence>)
    #[arg(long)]
    pub number: Option<String>,

    /// Calibration date (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Technician (default: configured author)
    #[arg(long)]
    pub technician: Option<String>,

    /// Override the instrument resolution for this calibration
    #[arg(long, value_parser = parse_non_negative)]
    pub resolution: Option<f64>,

    /// Ambient temperature in °C
    #[arg(long, allow_negative_numbers = true, value_parser = parse_finite)]
    pub temperature: Option<f64>,

    /// Relative humidity in %
    #[arg(long, value_parser = parse_non_negative)]
    pub humidity: Option<f64>,

    #[arg(long)]
    pub remarks: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Certificate ID or short ID (CERT@1)
    pub id: String,
}

#[derive(Args, Debug)]
pub struct CalcArgs {
    /// Certificate ID or short ID
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub id: Option<String>,

    /// Recompute every draft certificate
    #[arg(long)]
    pub all: bool,

    /// Re-read standard value, standard uncertainty and resolution from the
    /// linked tool and equipment before computing
    #[arg(long)]
    pub refresh: bool,
}

/// Which budgets to print
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum DirectionFilter {
    Before,
    After,
    #[default]
    Both,
}

#[derive(Args, Debug)]
pub struct BudgetArgs {
    /// Certificate ID or short ID
    pub id: String,

    #[arg(long, short = 'd', default_value = "both")]
    pub direction: DirectionFilter,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Certificate ID or short ID
    pub id: String,

    /// Write the document to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Certificate ID or short ID
    pub id: String,
}

/// Row of `cert list`
#[derive(Debug, Serialize, Tabled)]
struct CertificateRow {
    #[tabled(rename = "SHORT")]
    short: String,
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "EQUIPMENT")]
    equipment: String,
    #[tabled(rename = "ADJUSTED")]
    adjusted: String,
    #[tabled(rename = "U")]
    expanded: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

pub fn run(cmd: CertCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CertCommands::List(args) => run_list(args, global),
        CertCommands::New(args) => run_new(args, global),
        CertCommands::Show(args) => run_show(args, global),
        CertCommands::Calc(args) => run_calc(args, global),
        CertCommands::Budget(args) => run_budget(args, global),
        CertCommands::Render(args) => run_render(args, global),
        CertCommands::Issue(args) => run_issue(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let mut records = entity_cmd::load_filtered::<Certificate>(&project, args.status)?;

    if let Some(reference) = &args.equipment {
        let (eqp, _): (Equipment, _) =
            entity_cmd::find(&project, reference, &super::eqp::ENTITY_CONFIG)?;
        records.retain(|(c, _)| c.equipment == eqp.id);
    }

    let decimals = Config::load_for(Some(&project)).display.decimals;

    entity_cmd::output_list(
        &project,
        &records,
        &ENTITY_CONFIG,
        global,
        args.count,
        |c: &Certificate, short_ids: &ShortIdIndex| CertificateRow {
            short: entity_cmd::short_or_full(&c.id, short_ids),
            number: c.number.clone(),
            date: c.calibration_date.to_string(),
            equipment: entity_cmd::short_or_full(&c.equipment, short_ids),
            adjusted: if c.has_adjustment { "yes" } else { "no" }.to_string(),
            expanded: expanded_summary(c, decimals),
            status: c.status.to_string(),
        },
    )
}

/// "U before / U after" for list output
fn expanded_summary(cert: &Certificate, decimals: usize) -> String {
    let fmt = |direction| {
        cert.budget(direction)
            .map(|b| format!("{:.*}", decimals, b.expanded_uncertainty))
            .unwrap_or_else(|| "-".to_string())
    };
    if cert.has_adjustment {
        format!("{} / {}", fmt(Direction::Before), fmt(Direction::After))
    } else {
        fmt(Direction::Before)
    }
}

fn prompt_readings(theme: &ColorfulTheme, label: &str) -> Result<[f64; 3]> {
    let mut readings = [0.0; 3];
    for (i, reading) in readings.iter_mut().enumerate() {
        *reading = Input::with_theme(theme)
            .with_prompt(format!("{} reading {}", label, i + 1))
            .validate_with(|v: &f64| {
                if v.is_finite() {
                    Ok(())
                } else {
                    Err("reading must be a finite number")
                }
            })
            .interact_text()
            .into_diagnostic()?;
    }
    Ok(readings)
}

/// Next free number of the form CAL-<year>-<NNNN>
fn next_certificate_number(project: &Project, date: NaiveDate) -> Result<String> {
    let prefix = format!("CAL-{}-", date.year());
    let existing = store::list::<Certificate>(project)?;
    let highest = existing
        .iter()
        .filter_map(|(c, _)| c.number.strip_prefix(&prefix))
        .filter_map(|seq| seq.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    Ok(format!("{}{:04}", prefix, highest + 1))
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));

    let (eqp, _): (Equipment, _) =
        entity_cmd::find(&project, &args.equipment, &super::eqp::ENTITY_CONFIG)?;
    let (tool, _): (Tool, _) = entity_cmd::find(&project, &args.tool, &super::tool::ENTITY_CONFIG)?;

    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());

    if !eqp.gas.eq_ignore_ascii_case(&tool.gas) {
        eprintln!(
            "{} reference gas {} does not match instrument gas {}",
            style("warning:").yellow().bold(),
            tool.gas,
            eqp.gas
        );
    }
    if tool.is_expired_on(date) {
        eprintln!(
            "{} reference standard {} expired before {}",
            style("warning:").yellow().bold(),
            tool.name,
            date
        );
    }

    let (before, after) = if args.interactive {
        let theme = ColorfulTheme::default();
        println!(
            "{} {} against {}",
            style("◆").cyan(),
            eqp.title(),
            tool.title()
        );
        let before = prompt_readings(&theme, "As-found")?;
        let adjusted = Confirm::with_theme(&theme)
            .with_prompt("Was the instrument adjusted?")
            .default(false)
            .interact()
            .into_diagnostic()?;
        let after = if adjusted {
            Some(prompt_readings(&theme, "As-left")?)
        } else {
            None
        };
        (before, after)
    } else {
        let before = three_readings(&args.readings)?;
        let after = args.after.as_deref().map(three_readings).transpose()?;
        (before, after)
    };

    let resolution = args.resolution.unwrap_or(eqp.resolution);
    let before_set = measurement_set(&tool, resolution, before);
    let after_set = after.map(|readings| measurement_set(&tool, resolution, readings));

    let number = match args.number {
        Some(number) => number,
        None => next_certificate_number(&project, date)?,
    };
    let author = config.author();
    let technician = args.technician.unwrap_or_else(|| author.clone());

    let mut cert = Certificate::new(number, &eqp, &tool, before_set, after_set, technician, author);
    cert.calibration_date = date;
    cert.conditions.temperature = args.temperature;
    cert.conditions.humidity = args.humidity;
    cert.remarks = args.remarks;

    cert.calculate()
        .into_diagnostic()
        .wrap_err("certificate not created")?;

    let (path, short_id) = entity_cmd::save_new(&project, &cert)?;
    entity_cmd::output_new_entity(
        &cert.id,
        &path,
        &short_id,
        &ENTITY_CONFIG,
        &format!(
            "{} | U = {}",
            style(&cert.number).yellow(),
            expanded_summary(&cert, config.display.decimals)
        ),
        global,
    );
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let Some((cert, _)) =
        entity_cmd::run_show_generic::<Certificate>(&project, &args.id, &ENTITY_CONFIG, global)?
    else {
        return Ok(());
    };

    let short_ids = ShortIdIndex::load(&project);
    let decimals = Config::load_for(Some(&project)).display.decimals;
    let fmt = |v: f64| format!("{:.*}", decimals, v);

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&cert.id.to_string()).cyan());
    println!("{}: {}", style("Number").bold(), style(&cert.number).yellow());
    println!(
        "{}: {}",
        style("Equipment").bold(),
        entity_cmd::link_label::<Equipment>(&project, &cert.equipment, &short_ids)
    );
    println!(
        "{}: {}",
        style("Reference").bold(),
        entity_cmd::link_label::<Tool>(&project, &cert.tool, &short_ids)
    );
    if let Some(customer) = &cert.customer {
        println!(
            "{}: {}",
            style("Customer").bold(),
            entity_cmd::link_label::<Customer>(&project, customer, &short_ids)
        );
    }
    println!("{}: {}", style("Date").bold(), cert.calibration_date);
    println!("{}: {}", style("Technician").bold(), cert.technician);
    if let Some(t) = cert.conditions.temperature {
        println!("{}: {} °C", style("Temperature").bold(), t);
    }
    if let Some(h) = cert.conditions.humidity {
        println!("{}: {} %RH", style("Humidity").bold(), h);
    }

    let sets = cert.measurement_sets().into_diagnostic()?;
    for (direction, set) in sets {
        println!();
        println!("{}", style(format!("Results ({})", direction)).bold());
        println!("  Standard: {}", fmt(set.standard_value));
        let readings: Vec<String> = set.readings().iter().map(|r| fmt(*r)).collect();
        println!("  Readings: {}", readings.join(", "));
        match cert.budget(direction) {
            Some(budget) => {
                println!("  Mean:     {}", fmt(budget.mean_value));
                println!("  Error:    {}", fmt(budget.error));
                println!("  u_c:      {}", fmt(budget.combined_uncertainty));
                println!(
                    "  U (k=2):  {}",
                    style(fmt(budget.expanded_uncertainty)).cyan()
                );
            }
            None => println!("  {}", style("not calculated").red()),
        }
    }

    if let Some(remarks) = &cert.remarks {
        println!();
        println!("{}", style("Remarks:").bold());
        println!("{}", remarks);
    }
    entity_cmd::print_footer(&cert);

    Ok(())
}

/// Rebuild the measurement sets from the linked tool and equipment
fn refresh_inputs(project: &Project, cert: &mut Certificate) -> Result<()> {
    let tool: Tool = store::load(&store::record_path(project, &cert.tool))
        .wrap_err_with(|| format!("loading reference standard {}", cert.tool))?;
    let eqp: Equipment = store::load(&store::record_path(project, &cert.equipment))
        .wrap_err_with(|| format!("loading equipment {}", cert.equipment))?;

    cert.before = measurement_set(&tool, eqp.resolution, cert.before.readings());
    if let Some(after) = cert.after {
        cert.after = Some(measurement_set(&tool, eqp.resolution, after.readings()));
    }
    Ok(())
}

fn run_calc(args: CalcArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;

    let targets: Vec<(Certificate, PathBuf)> = match &args.id {
        Some(reference) => {
            let (cert, path): (Certificate, PathBuf) =
                entity_cmd::find(&project, reference, &ENTITY_CONFIG)?;
            if cert.status != Status::Draft {
                return Err(miette::miette!(
                    "certificate {} is {} and can no longer be recalculated",
                    cert.number,
                    cert.status
                ));
            }
            vec![(cert, path)]
        }
        None => store::list::<Certificate>(&project)?
            .into_iter()
            .filter(|(c, _)| c.status == Status::Draft)
            .collect(),
    };

    // Compute everything before writing anything
    let mut updated = Vec::with_capacity(targets.len());
    for (mut cert, path) in targets {
        if args.refresh {
            refresh_inputs(&project, &mut cert)?;
        }
        cert.calculate()
            .into_diagnostic()
            .wrap_err_with(|| format!("certificate {} not updated", cert.number))?;
        updated.push((cert, path));
    }

    for (cert, _) in &updated {
        store::save(&project, cert)?;
        tracing::info!(id = %cert.id, number = %cert.number, "recalculated certificate");
    }

    let decimals = Config::load_for(Some(&project)).display.decimals;
    for (cert, _) in &updated {
        println!(
            "{} {} U = {}",
            style("✓").green(),
            style(&cert.number).yellow(),
            expanded_summary(cert, decimals)
        );
    }
    if updated.is_empty() {
        println!("No draft certificates to calculate.");
    }
    Ok(())
}

fn run_budget(args: BudgetArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));
    let (cert, _): (Certificate, _) = entity_cmd::find(&project, &args.id, &ENTITY_CONFIG)?;

    let tables: Vec<_> = cert
        .verified_budget_tables(&config.constants)
        .map_err(|e| miette::miette!("certificate {}: {}", cert.number, e))?
        .into_iter()
        .filter(|t| match args.direction {
            DirectionFilter::Before => t.direction == Direction::Before,
            DirectionFilter::After => t.direction == Direction::After,
            DirectionFilter::Both => true,
        })
        .collect();

    if tables.is_empty() {
        return Err(miette::miette!(
            "certificate {} has no after-adjustment measurements",
            cert.number
        ));
    }

    print_budget_tables(&tables, global.format, config.display.decimals)
}

fn run_render(args: RenderArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));
    let (cert, _): (Certificate, _) = entity_cmd::find(&project, &args.id, &ENTITY_CONFIG)?;

    let eqp: Equipment = store::load(&store::record_path(&project, &cert.equipment))
        .wrap_err_with(|| format!("loading equipment {}", cert.equipment))?;
    let tool: Tool = store::load(&store::record_path(&project, &cert.tool))
        .wrap_err_with(|| format!("loading reference standard {}", cert.tool))?;
    let customer: Option<Customer> = match &cert.customer {
        Some(id) => match store::load(&store::record_path(&project, id)) {
            Ok(customer) => Some(customer),
            Err(e) => {
                tracing::warn!(customer = %id, error = %e, "customer record unavailable");
                None
            }
        },
        None => None,
    };

    let doc = CertificateDocument::new(&config, &cert, customer.as_ref(), &eqp, &tool)
        .map_err(|e| miette::miette!("{}", e))?;
    let generator = TemplateGenerator::new().map_err(|e| miette::miette!("{}", e))?;
    let rendered = generator
        .render_certificate(&doc)
        .map_err(|e| miette::miette!("{}", e))?;

    match args.output {
        Some(path) => {
            fs::write(&path, rendered).into_diagnostic()?;
            println!(
                "{} Rendered {} to {}",
                style("✓").green(),
                style(&cert.number).yellow(),
                style(path.display()).cyan()
            );
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn run_issue(args: IssueArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (mut cert, _): (Certificate, _) = entity_cmd::find(&project, &args.id, &ENTITY_CONFIG)?;

    if cert.status != Status::Draft {
        return Err(miette::miette!(
            "certificate {} is already {}",
            cert.number,
            cert.status
        ));
    }
    cert.verify()
        .map_err(|e| miette::miette!("certificate {} cannot be issued: {}", cert.number, e))?;

    cert.status = Status::Issued;
    store::save(&project, &cert)?;
    tracing::info!(id = %cert.id, number = %cert.number, "issued certificate");

    println!(
        "{} Issued certificate {}",
        style("✓").green(),
        style(&cert.number).yellow()
    );
    Ok(())
}
