use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use franchise_valuation_core::valuation::duration::parse_calendar_date;
use franchise_valuation_core::valuation::sensitivity::{self, SensitivityInput};
use franchise_valuation_core::valuation::{self, ValuationWorkbook};
use franchise_valuation_core::SensitivityVariable;

use crate::input;

/// Arguments for a valuation run
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ProjectArgs {
    /// Path to JSON workbook (assumptions + yearly entries)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the valuation effective date
    #[arg(long)]
    pub effective_date: Option<String>,

    /// Override the franchise contract end date
    #[arg(long)]
    pub contract_end_date: Option<String>,

    /// Override the discount rate (percent, e.g. 21 for 21%)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Override the annual sales growth rate (percent)
    #[arg(long)]
    pub growth_rate: Option<Decimal>,

    /// Override the annual inflation rate for miscellaneous costs (percent)
    #[arg(long)]
    pub inflation_rate: Option<Decimal>,
}

/// Arguments for the sensitivity grid
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct SensitivityArgs {
    /// Path to JSON workbook (assumptions + yearly entries)
    #[arg(long)]
    pub input: Option<String>,

    /// Lowest discount rate (default: workbook rate - 5)
    #[arg(long)]
    pub discount_min: Option<Decimal>,

    /// Highest discount rate (default: workbook rate + 5)
    #[arg(long)]
    pub discount_max: Option<Decimal>,

    /// Discount rate step
    #[arg(long, default_value = "2.5")]
    pub discount_step: Decimal,

    /// Lowest sales growth rate (default: workbook rate - 2)
    #[arg(long)]
    pub growth_min: Option<Decimal>,

    /// Highest sales growth rate (default: workbook rate + 2)
    #[arg(long)]
    pub growth_max: Option<Decimal>,

    /// Sales growth rate step
    #[arg(long, default_value = "1")]
    pub growth_step: Decimal,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut workbook: ValuationWorkbook = input::load(args.input.as_deref())?
        .ok_or("--input workbook is required (or pipe it on stdin)")?;

    let a = &mut workbook.assumptions;
    if let Some(ref raw) = args.effective_date {
        a.effective_date = Some(parse_calendar_date(raw)?);
    }
    if let Some(ref raw) = args.contract_end_date {
        a.contract_end_date = Some(parse_calendar_date(raw)?);
    }
    if let Some(rate) = args.discount_rate {
        a.discount_rate_percent = rate;
    }
    if let Some(rate) = args.growth_rate {
        a.sales_growth_rate_percent = rate;
    }
    if let Some(rate) = args.inflation_rate {
        a.inflation_rate_percent = rate;
    }

    let result = valuation::run_valuation(&workbook)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let workbook: ValuationWorkbook = input::load(args.input.as_deref())?
        .ok_or("--input workbook is required (or pipe it on stdin)")?;

    let discount = workbook.assumptions.discount_rate_percent;
    let growth = workbook.assumptions.sales_growth_rate_percent;

    let input = SensitivityInput {
        discount_rate: SensitivityVariable {
            name: "discount_rate_percent".into(),
            min: args.discount_min.unwrap_or(discount - Decimal::from(5)),
            max: args.discount_max.unwrap_or(discount + Decimal::from(5)),
            step: args.discount_step,
        },
        sales_growth_rate: SensitivityVariable {
            name: "sales_growth_rate_percent".into(),
            min: args.growth_min.unwrap_or(growth - Decimal::from(2)),
            max: args.growth_max.unwrap_or(growth + Decimal::from(2)),
            step: args.growth_step,
        },
        workbook,
    };

    let result = sensitivity::run_sensitivity(&input)?;
    Ok(serde_json::to_value(result)?)
}
