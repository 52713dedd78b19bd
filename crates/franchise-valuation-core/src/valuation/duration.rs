//! Remaining-term resolution between a valuation's effective date and the
//! franchise contract's end date.
//!
//! The year count is calendar aware: whole calendar months are counted from
//! the effective date (clamping the day to shorter months), and the residual
//! is the elapsed share of the enclosing month in actual days. A contract
//! ending exactly on an anniversary therefore yields a whole number of years.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::trace;

use crate::error::ValuationError;
use crate::types::Years;
use crate::ValuationResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);
const DISPLAY_DECIMALS: u32 = 4;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Fractional years between `effective_date` and `contract_end_date`.
///
/// Returns zero when either date is missing. When the contract ends before the
/// effective date the result is negative; callers treat any non-positive value
/// as "no projection periods".
pub fn resolve_remaining_years(
    effective_date: Option<NaiveDate>,
    contract_end_date: Option<NaiveDate>,
) -> Years {
    let (start, end) = match (effective_date, contract_end_date) {
        (Some(s), Some(e)) => (s, e),
        _ => return Decimal::ZERO,
    };

    let years = if end >= start {
        month_span(start, end) / MONTHS_PER_YEAR
    } else {
        -(month_span(end, start) / MONTHS_PER_YEAR)
    };

    trace!(%start, %end, %years, "resolved remaining years");
    years
}

/// Number of projection periods for a horizon: the ceiling of a positive
/// horizon, zero otherwise.
pub fn projection_year_count(remaining_years: Years) -> usize {
    if remaining_years <= Decimal::ZERO {
        return 0;
    }
    remaining_years.ceil().to_usize().unwrap_or(0)
}

/// Round a year count to the precision shown to users.
pub fn display_years(years: Years) -> Years {
    years.round_dp(DISPLAY_DECIMALS)
}

/// Parse a calendar date in ISO (`2031-06-30`) or day-month-year
/// (`30/06/2031`, `30-06-2031`, `30.06.2031`) form.
pub fn parse_calendar_date(raw: &str) -> ValuationResult<NaiveDate> {
    let trimmed = raw.trim();
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    Err(ValuationError::DateError(format!(
        "'{raw}' is not a date (expected YYYY-MM-DD or DD/MM/YYYY)"
    )))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Fractional calendar months from `start` to `end`; requires `start <= end`.
fn month_span(start: NaiveDate, end: NaiveDate) -> Decimal {
    let mut whole = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;

    // The anchor `whole` months out lands in end's month; step back if it
    // overshoots so that anchor <= end < next anchor.
    let mut anchor = add_months(start, whole);
    if anchor > end {
        whole -= 1;
        anchor = add_months(start, whole);
    }
    let next = add_months(start, whole + 1);

    let elapsed = (end - anchor).num_days();
    let span = (next - anchor).num_days();
    let fraction = if span == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(elapsed) / Decimal::from(span)
    };

    Decimal::from(whole) + fraction
}

/// Add a number of months to a date, clamping the day to the month's max.
fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let total_months = date.year() * 12 + date.month() as i32 - 1 + months;
    let new_year = total_months.div_euclid(12);
    let new_month = (total_months.rem_euclid(12) + 1) as u32;
    let day = date.day().min(days_in_month(new_year, new_month));
    NaiveDate::from_ymd_opt(new_year, new_month, day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn years(start: NaiveDate, end: NaiveDate) -> Years {
        resolve_remaining_years(Some(start), Some(end))
    }

    #[test]
    fn test_missing_dates_yield_zero() {
        let end = Some(date(2030, 1, 1));
        assert_eq!(resolve_remaining_years(None, end), Decimal::ZERO);
        assert_eq!(resolve_remaining_years(end, None), Decimal::ZERO);
        assert_eq!(resolve_remaining_years(None, None), Decimal::ZERO);
    }

    #[test]
    fn test_whole_anniversaries_are_exact() {
        assert_eq!(years(date(2024, 3, 15), date(2025, 3, 15)), dec!(1));
        assert_eq!(years(date(2024, 3, 15), date(2034, 3, 15)), dec!(10));
        assert_eq!(years(date(2024, 1, 1), date(2024, 1, 1)), Decimal::ZERO);
    }

    #[test]
    fn test_half_year() {
        assert_eq!(years(date(2024, 1, 1), date(2025, 7, 1)), dec!(1.5));
    }

    #[test]
    fn test_partial_month_uses_actual_days() {
        // 1 Jan -> 16 Jan is 15 of January's 31 days
        let y = years(date(2025, 1, 1), date(2025, 1, 16));
        let expected = dec!(15) / dec!(31) / dec!(12);
        assert_eq!(y, expected);
        assert_eq!(display_years(y), dec!(0.0403));
    }

    #[test]
    fn test_month_end_clamping() {
        // 31 Jan + 1 month clamps to 28 Feb in a common year
        let one_month = years(date(2025, 1, 31), date(2025, 2, 28));
        assert_eq!(one_month, dec!(1) / dec!(12));
        // Leap-day start reaches its anniversary on 28 Feb
        assert_eq!(years(date(2024, 2, 29), date(2025, 2, 28)), dec!(1));
    }

    #[test]
    fn test_reversed_dates_are_negative() {
        let y = years(date(2026, 6, 30), date(2025, 6, 30));
        assert_eq!(y, dec!(-1));
        assert_eq!(projection_year_count(y), 0);
    }

    #[test]
    fn test_projection_year_count() {
        assert_eq!(projection_year_count(dec!(0)), 0);
        assert_eq!(projection_year_count(dec!(-0.5)), 0);
        assert_eq!(projection_year_count(dec!(0.0001)), 1);
        assert_eq!(projection_year_count(dec!(1)), 1);
        assert_eq!(projection_year_count(dec!(1.5)), 2);
        assert_eq!(projection_year_count(dec!(12.9999)), 13);
    }

    #[test]
    fn test_parse_calendar_date_formats() {
        let expected = date(2031, 6, 30);
        assert_eq!(parse_calendar_date("2031-06-30").unwrap(), expected);
        assert_eq!(parse_calendar_date("30/06/2031").unwrap(), expected);
        assert_eq!(parse_calendar_date(" 30.06.2031 ").unwrap(), expected);
        assert!(parse_calendar_date("06/30/2031").is_err());
        assert!(parse_calendar_date("soon").is_err());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(256))]

        #[test]
        fn prop_non_decreasing_in_contract_end(
            start_offset in 0i64..20_000,
            end_offset in 0i64..20_000,
            step in 1i64..400,
        ) {
            let base = date(1990, 1, 1);
            let start = base + chrono::Duration::days(start_offset);
            let end = base + chrono::Duration::days(end_offset);
            let later_end = end + chrono::Duration::days(step);
            prop_assert!(years(start, later_end) >= years(start, end));
        }

        #[test]
        fn prop_non_increasing_in_effective_date(
            start_offset in 0i64..20_000,
            end_offset in 0i64..20_000,
            step in 1i64..400,
        ) {
            let base = date(1990, 1, 1);
            let start = base + chrono::Duration::days(start_offset);
            let end = base + chrono::Duration::days(end_offset);
            let later_start = start + chrono::Duration::days(step);
            prop_assert!(years(later_start, end) <= years(start, end));
        }

        #[test]
        fn prop_reversal_negates(
            start_offset in 0i64..20_000,
            end_offset in 0i64..20_000,
        ) {
            let base = date(1990, 1, 1);
            let a = base + chrono::Duration::days(start_offset);
            let b = base + chrono::Duration::days(end_offset);
            prop_assert!(years(a, b) == -years(b, a));
        }
    }
}
