mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::schedule::{RemainingYearsArgs, ScheduleArgs, SetEntryArgs};
use commands::valuation::{ProjectArgs, SensitivityArgs};

/// Franchise restaurant DCF valuations
#[derive(Parser)]
#[command(
    name = "franval",
    version,
    about = "Franchise restaurant DCF valuations",
    long_about = "Values a franchise restaurant by projecting yearly free cash flows over \
                  the remaining contract term and discounting them to the effective date. \
                  Works on JSON valuation workbooks read from a file or stdin."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Remaining contract term in fractional years
    RemainingYears(RemainingYearsArgs),
    /// Empty yearly entry template sized to the contract term
    Schedule(ScheduleArgs),
    /// Edit one field of one yearly entry in a workbook
    SetEntry(SetEntryArgs),
    /// Project cash flows and compute the valuation price
    Project(ProjectArgs),
    /// Discount rate x sales growth sensitivity grid
    Sensitivity(SensitivityArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// Logs go to stderr so stdout stays machine-readable.
///
/// Honours `RUST_LOG`; defaults to `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::RemainingYears(args) => commands::schedule::run_remaining_years(args),
        Commands::Schedule(args) => commands::schedule::run_schedule(args),
        Commands::SetEntry(args) => commands::schedule::run_set_entry(args),
        Commands::Project(args) => commands::valuation::run_project(args),
        Commands::Sensitivity(args) => commands::valuation::run_sensitivity(args),
        Commands::Version => {
            println!("franval {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
