//! Top-level argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::calc::CalcArgs;
use crate::cli::commands::cert::CertCommands;
use crate::cli::commands::cust::CustCommands;
use crate::cli::commands::eqp::EqpCommands;
use crate::cli::commands::init::InitArgs;
use crate::cli::commands::tool::ToolCommands;

/// calcert - calibration certificates and uncertainty budgets for gas detectors
#[derive(Parser, Debug)]
#[command(name = "calcert", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options accepted by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Run as if started in this directory
    #[arg(long = "project", short = 'C', global = true, env = "CALCERT_PROJECT")]
    pub project: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace); logs go to stderr
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Table for lists, pretty text for single records
    #[default]
    Auto,
    /// Raw YAML
    Yaml,
    /// Pretty-printed JSON
    Json,
    /// Tab-separated values
    Tsv,
    /// Comma-separated values
    Csv,
    /// Aligned table
    Table,
    /// Full entity IDs only
    Id,
    /// Short IDs only (CERT@1)
    ShortId,
    /// File paths only
    Path,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a calcert project in the current directory
    Init(InitArgs),

    /// Customer management
    #[command(subcommand)]
    Cust(CustCommands),

    /// Equipment (units under calibration) management
    #[command(subcommand)]
    Eqp(EqpCommands),

    /// Reference standard (calibration gas) management
    #[command(subcommand)]
    Tool(ToolCommands),

    /// Calibration certificate management
    #[command(subcommand)]
    Cert(CertCommands),

    /// One-off uncertainty budget calculation (no project required)
    Calc(CalcArgs),
}
