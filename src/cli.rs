use anyhow::Result;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};

#[derive(Parser, Debug)]
#[command(
    name = "datafinder",
    version,
    about = "Find CMIP5 files covering requested variables and time windows"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve descriptors against local mirrors and, optionally, synda.
    Find(FindArgs),
    /// Summarise an existing manifest.
    Stats { manifest: PathBuf },
    /// Show resolved paths, config and collaborator availability.
    Status,
}

#[derive(Args, Debug, Clone)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["params_file", "user_input"])
))]
pub struct FindArgs {
    #[arg(long, help = "File with one descriptor per line")]
    pub params_file: Option<PathBuf>,
    #[arg(long, requires_all = ["fileparams", "uservars"], help = "Build descriptors from --fileparams and --uservars")]
    pub user_input: bool,
    #[arg(
        long,
        num_args = 7,
        value_names = ["PROJECT", "MODEL", "FREQ", "EXPERIMENT", "ENSEMBLE", "YEAR1", "YEAR2"]
    )]
    pub fileparams: Vec<String>,
    #[arg(long, num_args = 1..)]
    pub uservars: Vec<String>,
    #[arg(long, required = true, help = "Local mirror to search (repeatable)")]
    pub datasource: Vec<String>,
    #[arg(long, default_value_t = false, help = "Query synda for files the mirror lacks")]
    pub synda: bool,
    #[arg(long, default_value_t = false, requires = "synda")]
    pub download: bool,
    #[arg(long, default_value_t = false)]
    pub dryrun: bool,
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("{}: {}", report.command, if report.ok { "ok" } else { "failed" });
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  issue: {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let report = match &cli.command {
        Commands::Find(args) => commands::find::run(args)?,
        Commands::Stats { manifest } => commands::stats::run(manifest)?,
        Commands::Status => commands::status::run()?,
    };
    print_report(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!("{} finished with {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
