use clap::Args;
use serde_json::{json, Value};

use franchise_valuation_core::valuation::duration::{display_years, parse_calendar_date};
use franchise_valuation_core::valuation::{ValuationWorkbook, YearlySchedule};

use crate::input;

/// Arguments for remaining-term resolution
#[derive(Args)]
pub struct RemainingYearsArgs {
    /// Valuation effective date (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long)]
    pub effective_date: String,

    /// Franchise contract end date (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long)]
    pub contract_end_date: String,
}

/// Arguments for building the yearly entry template
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to a JSON workbook whose entries are resized to its horizon
    #[arg(long)]
    pub input: Option<String>,

    /// Valuation effective date (overrides the workbook)
    #[arg(long)]
    pub effective_date: Option<String>,

    /// Franchise contract end date (overrides the workbook)
    #[arg(long)]
    pub contract_end_date: Option<String>,

    /// Copy the workbook's seed assumptions into year 0
    #[arg(long)]
    pub seed: bool,
}

/// Arguments for a single yearly entry edit
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct SetEntryArgs {
    /// Path to the JSON workbook to edit (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Zero-based projection year
    #[arg(long)]
    pub year: usize,

    /// Field name, e.g. sales, operating_cost_percent, rentPercent
    #[arg(long)]
    pub field: String,

    /// New value; thousands separators allowed, empty means zero
    #[arg(long)]
    pub value: String,

    /// Write the edited workbook back to --input
    #[arg(long, requires = "input")]
    pub in_place: bool,
}

pub fn run_remaining_years(args: RemainingYearsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let effective = parse_calendar_date(&args.effective_date)?;
    let end = parse_calendar_date(&args.contract_end_date)?;

    let mut workbook = ValuationWorkbook::default();
    workbook.assumptions.effective_date = Some(effective);
    workbook.assumptions.contract_end_date = Some(end);
    let years = workbook.assumptions.remaining_years();

    Ok(json!({
        "remaining_years": display_years(years).to_string(),
        "remaining_years_exact": years.to_string(),
        "projection_years": workbook.assumptions.projection_year_count(),
    }))
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut workbook: ValuationWorkbook = input::load(args.input.as_deref())?.unwrap_or_default();

    if let Some(ref raw) = args.effective_date {
        workbook.assumptions.effective_date = Some(parse_calendar_date(raw)?);
    }
    if let Some(ref raw) = args.contract_end_date {
        workbook.assumptions.contract_end_date = Some(parse_calendar_date(raw)?);
    }
    let dates = &workbook.assumptions;
    if dates.effective_date.is_none() || dates.contract_end_date.is_none() {
        return Err("--effective-date and --contract-end-date are required".into());
    }

    let mut schedule = YearlySchedule::from_entries(std::mem::take(&mut workbook.entries));
    if schedule.resize_for(workbook.assumptions.remaining_years()) {
        tracing::info!(years = schedule.len(), "entries reset for new horizon");
    }
    if args.seed {
        schedule.seed_first_year(&workbook.assumptions)?;
    }
    workbook.entries = schedule.into_entries();

    Ok(serde_json::to_value(workbook)?)
}

pub fn run_set_entry(args: SetEntryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut workbook: ValuationWorkbook = input::load(args.input.as_deref())?
        .ok_or("--input workbook is required (or pipe it on stdin)")?;

    let mut schedule = YearlySchedule::from_entries(std::mem::take(&mut workbook.entries));
    schedule.set_field_str(args.year, &args.field, &args.value)?;
    workbook.entries = schedule.into_entries();

    if args.in_place {
        if let Some(ref path) = args.input {
            input::file::write_json(path, &workbook)?;
        }
    }

    Ok(serde_json::to_value(workbook)?)
}
