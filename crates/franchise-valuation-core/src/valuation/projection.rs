use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::ValuationError;
use crate::time_value::{compound, discount_divisor, percent_of};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Years};
use crate::ValuationResult;

use super::assumptions::{ValuationAssumptions, ValuationWorkbook, YearlyEntry};
use super::duration::{display_years, projection_year_count};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Cash flow and present value of one projection year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPeriod {
    pub period_index: usize,
    /// Length of the period in years; below one only for the final period
    pub time_to_next_year: Years,
    pub is_partial: bool,
    /// Years from the effective date to the period end, rounded for display
    pub period_end_offset: Years,
    /// Unrounded period end used as the discounting exponent
    pub discount_time: Years,
    pub operating_amount: Money,
    pub rent_amount: Money,
    /// Operating amount less rent and fixed charges (full-year basis)
    pub cashflow: Money,
    pub cash_after_reinvestment: Money,
    /// Cash after reinvestment plus depreciation, prorated for a partial year
    pub free_cash_flow: Money,
    pub discount_factor: Decimal,
    pub present_value: Money,
    /// The entry as used: sales and miscellaneous hold the compounded values
    pub resolved_entry: YearlyEntry,
}

/// Full projection of a valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSchedule {
    pub remaining_years: Years,
    pub periods: Vec<ProjectionPeriod>,
    /// Undiscounted sum of free cash flows
    pub total_free_cash_flow: Money,
    /// Valuation price: sum of period present values
    pub total_present_value: Money,
}

impl ProjectionSchedule {
    /// The valuation price, or `None` when no period produced a cash flow.
    ///
    /// An empty schedule is an undefined valuation, not a price of zero.
    pub fn valuation(&self) -> Option<Money> {
        if self.periods.is_empty() {
            None
        } else {
            Some(self.total_present_value)
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.periods.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project yearly free cash flows over the remaining contract term and
/// discount them to the effective date.
///
/// Later years' sales compound year 0's sales at the growth rate and later
/// years' miscellaneous costs inflate year 0's amount; every other line is
/// read from the year's own entry. A year whose resolved sales are zero is
/// skipped. The final period is prorated when the term ends mid-year.
///
/// The calculation is deterministic: identical inputs give identical output.
pub fn compute_projections(
    assumptions: &ValuationAssumptions,
    entries: &[YearlyEntry],
) -> ValuationResult<ProjectionSchedule> {
    let remaining_years = assumptions.remaining_years();
    let mut periods = Vec::with_capacity(entries.len());
    let mut current_time = Decimal::ZERO;

    for (index, entry) in entries.iter().enumerate() {
        let time_to_next_year = (remaining_years - current_time).min(Decimal::ONE);
        if time_to_next_year <= Decimal::ZERO {
            break;
        }

        let sales = resolve_sales(entries, assumptions.sales_growth_rate_percent, index)?;
        if sales.is_zero() {
            trace!(period = index, "no sales, skipping period");
            current_time += time_to_next_year;
            continue;
        }
        let miscellaneous =
            resolve_miscellaneous(entries, assumptions.inflation_rate_percent, index)?;

        let period = project_period(
            index,
            entry,
            sales,
            miscellaneous,
            current_time,
            time_to_next_year,
            assumptions.discount_rate_percent,
        )?;
        trace!(
            period = index,
            fcf = %period.free_cash_flow,
            pv = %period.present_value,
            "projected period"
        );
        periods.push(period);

        current_time += time_to_next_year;
    }

    let total_free_cash_flow = checked_total(periods.iter().map(|p| p.free_cash_flow))
        .ok_or_else(|| overflow_total("free cash flow"))?;
    let total_present_value = checked_total(periods.iter().map(|p| p.present_value))
        .ok_or_else(|| overflow_total("present value"))?;

    if periods.is_empty() {
        warn!(%remaining_years, "valuation undefined: no projection periods");
    } else {
        debug!(
            periods = periods.len(),
            %total_present_value,
            "projection complete"
        );
    }

    Ok(ProjectionSchedule {
        remaining_years,
        periods,
        total_free_cash_flow,
        total_present_value,
    })
}

/// Sales used for period `index`: year 0 as entered, later years compounded
/// from year 0 at `growth_rate` percent.
pub fn resolve_sales(
    entries: &[YearlyEntry],
    growth_rate: Percent,
    index: usize,
) -> ValuationResult<Money> {
    compound_from_first(entries, |e| e.sales, growth_rate, index)
}

/// Miscellaneous cost for period `index`: year 0 as entered, later years
/// inflated from year 0 at `inflation_rate` percent. Amounts stored on later
/// entries are ignored.
pub fn resolve_miscellaneous(
    entries: &[YearlyEntry],
    inflation_rate: Percent,
    index: usize,
) -> ValuationResult<Money> {
    compound_from_first(entries, |e| e.miscellaneous, inflation_rate, index)
}

/// Run the projection for a workbook and wrap it in the standard envelope.
pub fn run_valuation(
    workbook: &ValuationWorkbook,
) -> ValuationResult<ComputationOutput<ProjectionSchedule>> {
    let start = Instant::now();
    let mut warnings = collect_warnings(workbook);

    let schedule = compute_projections(&workbook.assumptions, &workbook.entries)?;

    if schedule.is_undefined() {
        warnings.push("No projection periods: valuation is undefined".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Franchise DCF (fractional final year, end-of-period discounting)",
        &workbook.assumptions,
        warnings,
        elapsed,
        schedule,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn compound_from_first(
    entries: &[YearlyEntry],
    field: impl Fn(&YearlyEntry) -> Money,
    rate: Percent,
    index: usize,
) -> ValuationResult<Money> {
    let Some(first) = entries.first() else {
        return Ok(Decimal::ZERO);
    };
    let years = u32::try_from(index).unwrap_or(u32::MAX);
    compound(field(first), rate, years)
}

fn checked_total(amounts: impl Iterator<Item = Money>) -> Option<Money> {
    amounts.fold(Some(Decimal::ZERO), |acc, amount| acc?.checked_add(amount))
}

fn overflow_total(line: &str) -> ValuationError {
    ValuationError::FinancialImpossibility(format!("Total {line} overflows"))
}

fn project_period(
    index: usize,
    entry: &YearlyEntry,
    sales: Money,
    miscellaneous: Money,
    current_time: Years,
    time_to_next_year: Years,
    discount_rate: Percent,
) -> ValuationResult<ProjectionPeriod> {
    let overflow = |line: &str| {
        ValuationError::FinancialImpossibility(format!("{line} of period {index} overflows"))
    };

    let operating_amount = percent_of(sales, entry.operating_cost_percent)?;
    let rent_amount = percent_of(sales, entry.rent_percent)?;

    // Rent, service fees and fixed charges come out of the operating margin
    let cashflow = [
        rent_amount,
        entry.service_fees,
        entry.rent_index,
        miscellaneous,
        entry.loan_payment,
    ]
    .into_iter()
    .try_fold(operating_amount, |acc, c| acc.checked_sub(c))
    .ok_or_else(|| overflow("Cashflow"))?;
    let cash_after_reinvestment = cashflow
        .checked_sub(entry.reinvestment)
        .ok_or_else(|| overflow("Cash after reinvestment"))?;

    // Depreciation is non-cash and is added back
    let mut free_cash_flow = cash_after_reinvestment
        .checked_add(entry.depreciation)
        .ok_or_else(|| overflow("Free cash flow"))?;

    let is_partial = time_to_next_year < Decimal::ONE;
    if is_partial {
        free_cash_flow = free_cash_flow
            .checked_mul(time_to_next_year)
            .ok_or_else(|| overflow("Prorated free cash flow"))?;
    }

    let discount_time = current_time + time_to_next_year;
    let divisor = discount_divisor(discount_rate, discount_time)?;
    let present_value = free_cash_flow.checked_div(divisor).ok_or_else(|| {
        ValuationError::FinancialImpossibility(format!(
            "Present value of period {index} overflows at {discount_rate}%"
        ))
    })?;
    let discount_factor = Decimal::ONE.checked_div(divisor).unwrap_or(Decimal::ZERO);

    Ok(ProjectionPeriod {
        period_index: index,
        time_to_next_year,
        is_partial,
        period_end_offset: display_years(discount_time),
        discount_time,
        operating_amount,
        rent_amount,
        cashflow,
        cash_after_reinvestment,
        free_cash_flow,
        discount_factor,
        present_value,
        resolved_entry: YearlyEntry {
            sales,
            miscellaneous,
            ..entry.clone()
        },
    })
}

fn collect_warnings(workbook: &ValuationWorkbook) -> Vec<String> {
    let a = &workbook.assumptions;
    let mut warnings = Vec::new();

    if a.effective_date.is_none() || a.contract_end_date.is_none() {
        warnings.push("Effective date or contract end date missing; horizon is zero".into());
        return warnings;
    }

    let remaining_years = a.remaining_years();
    if remaining_years <= Decimal::ZERO {
        warnings.push(format!(
            "Contract end date is not after the effective date ({} years); no periods projected",
            display_years(remaining_years)
        ));
        return warnings;
    }

    let expected = projection_year_count(remaining_years);
    if workbook.entries.len() < expected {
        warnings.push(format!(
            "Only {} of {expected} yearly entries provided; projection stops early",
            workbook.entries.len()
        ));
    } else if workbook.entries.len() > expected {
        warnings.push(format!(
            "{} yearly entries beyond the {expected}-year horizon are ignored",
            workbook.entries.len() - expected
        ));
    }

    if workbook.entries.first().is_some_and(|e| e.sales.is_zero()) {
        warnings.push("Year 0 sales are zero; every period is skipped".into());
    }

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
