//! `calcert cust` command - Customer management

use clap::{Args, Subcommand};
use console::style;
use miette::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::entity_cmd::{self, EntityConfig};
use crate::cli::filters::StatusFilter;
use crate::cli::helpers::{open_project, truncate_str};
use crate::cli::GlobalOpts;
use crate::core::identity::EntityPrefix;
use crate::core::shortid::ShortIdIndex;
use crate::core::Config;
use crate::entities::Customer;

pub(crate) const ENTITY_CONFIG: EntityConfig = EntityConfig {
    prefix: EntityPrefix::Cust,
    name: "customer",
    name_plural: "customers",
    command: "cust",
};

#[derive(Subcommand, Debug)]
pub enum CustCommands {
    /// List customers
    List(ListArgs),

    /// Create a new customer
    New(NewArgs),

    /// Show a customer's details
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "active")]
    pub status: StatusFilter,

    /// Case-insensitive search in the name
    #[arg(long)]
    pub search: Option<String>,

    /// Print only the number of matches
    #[arg(long)]
    pub count: bool,
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Company or person name
    #[arg(long, short = 'n')]
    pub name: String,

    #[arg(long)]
    pub address: Option<String>,

    /// Contact person
    #[arg(long)]
    pub contact: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Customer ID or short ID (CUST@1)
    pub id: String,
}

/// Row of `cust list`
#[derive(Debug, Serialize, Tabled)]
struct CustomerRow {
    #[tabled(rename = "SHORT")]
    short: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CONTACT")]
    contact: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

pub fn run(cmd: CustCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CustCommands::List(args) => run_list(args, global),
        CustCommands::New(args) => run_new(args, global),
        CustCommands::Show(args) => run_show(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let mut records = entity_cmd::load_filtered::<Customer>(&project, args.status)?;

    if let Some(search) = &args.search {
        let needle = search.to_lowercase();
        records.retain(|(c, _)| c.name.to_lowercase().contains(&needle));
    }

    entity_cmd::output_list(
        &project,
        &records,
        &ENTITY_CONFIG,
        global,
        args.count,
        |c: &Customer, short_ids: &ShortIdIndex| CustomerRow {
            short: entity_cmd::short_or_full(&c.id, short_ids),
            name: truncate_str(&c.name, 40),
            contact: c.contact.clone().unwrap_or_else(|| "-".to_string()),
            status: c.status.to_string(),
        },
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));

    let name = args.name.trim().to_string();
    if name.is_empty() {
        return Err(miette::miette!("customer name must not be empty"));
    }

    let mut customer = Customer::new(name, config.author());
    customer.address = args.address;
    customer.contact = args.contact;
    customer.email = args.email;
    customer.phone = args.phone;

    let (path, short_id) = entity_cmd::save_new(&project, &customer)?;
    entity_cmd::output_new_entity(
        &customer.id,
        &path,
        &short_id,
        &ENTITY_CONFIG,
        &format!("Name: {}", style(&customer.name).yellow()),
        global,
    );
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let Some((cust, _)) =
        entity_cmd::run_show_generic::<Customer>(&project, &args.id, &ENTITY_CONFIG, global)?
    else {
        return Ok(());
    };

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&cust.id.to_string()).cyan());
    println!("{}: {}", style("Name").bold(), style(&cust.name).yellow());
    for (label, value) in [
        ("Address", &cust.address),
        ("Contact", &cust.contact),
        ("Email", &cust.email),
        ("Phone", &cust.phone),
    ] {
        if let Some(value) = value {
            println!("{}: {}", style(label).bold(), value);
        }
    }
    entity_cmd::print_footer(&cust);

    Ok(())
}
