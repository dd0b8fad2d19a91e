//! `calcert init` command - create a project skeleton

use clap::Args;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::core::project::{Project, PROJECT_DIR};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    pub path: Option<PathBuf>,

    /// Re-initialize an existing project, keeping its records and config
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let root = match args.path {
        Some(path) => path,
        None => std::env::current_dir().map_err(|e| miette::miette!("{}", e))?,
    };

    let project = Project::init(&root, args.force).map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Initialized calcert project in {}",
        style("✓").green(),
        style(project.root().display()).cyan()
    );
    println!(
        "   Edit {} to set laboratory details and constants",
        style(format!("{}/config.yaml", PROJECT_DIR)).yellow()
    );
    println!();
    println!("Next steps:");
    println!("  calcert tool new --name \"CO 100 ppm\" --gas CO --concentration 100 --uncertainty-percent 2");
    println!("  calcert eqp new --model \"GasAlert\" --serial SN-1 --gas CO --resolution 1");
    println!("  calcert cert new --equipment EQP@1 --tool TOOL@1 --readings 99 100 101");

    Ok(())
}
