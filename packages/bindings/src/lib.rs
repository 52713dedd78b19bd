use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use franchise_valuation_core::valuation::{
    self, duration, sensitivity, ValuationAssumptions, ValuationWorkbook, YearlySchedule,
};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[derive(Deserialize)]
struct DateRange {
    effective_date: Option<String>,
    contract_end_date: Option<String>,
}

#[derive(Deserialize)]
struct EntryEdit {
    workbook: ValuationWorkbook,
    year: usize,
    field: String,
    value: String,
}

// ---------------------------------------------------------------------------
// Horizon + schedule
// ---------------------------------------------------------------------------

#[napi]
pub fn resolve_remaining_years(input_json: String) -> NapiResult<String> {
    let range: DateRange = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let parse = |raw: Option<String>| {
        raw.filter(|s| !s.trim().is_empty())
            .map(|s| duration::parse_calendar_date(&s))
            .transpose()
    };
    let effective = parse(range.effective_date).map_err(to_napi_error)?;
    let end = parse(range.contract_end_date).map_err(to_napi_error)?;

    let years = duration::resolve_remaining_years(effective, end);
    serde_json::to_string(&serde_json::json!({
        "remaining_years": duration::display_years(years),
        "projection_years": duration::projection_year_count(years),
    }))
    .map_err(to_napi_error)
}

/// Resize a workbook's entries to its horizon; destructive when the year
/// count changes.
#[napi]
pub fn build_schedule(input_json: String) -> NapiResult<String> {
    let mut workbook: ValuationWorkbook =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let mut schedule = YearlySchedule::from_entries(std::mem::take(&mut workbook.entries));
    schedule.resize_for(workbook.assumptions.remaining_years());
    workbook.entries = schedule.into_entries();
    serde_json::to_string(&workbook).map_err(to_napi_error)
}

#[napi]
pub fn seed_schedule(input_json: String) -> NapiResult<String> {
    let assumptions: ValuationAssumptions =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let mut schedule = YearlySchedule::for_remaining_years(assumptions.remaining_years());
    schedule
        .seed_first_year(&assumptions)
        .map_err(to_napi_error)?;
    serde_json::to_string(&schedule).map_err(to_napi_error)
}

#[napi]
pub fn set_entry_field(input_json: String) -> NapiResult<String> {
    let edit: EntryEdit = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let mut workbook = edit.workbook;
    let mut schedule = YearlySchedule::from_entries(std::mem::take(&mut workbook.entries));
    schedule
        .set_field_str(edit.year, &edit.field, &edit.value)
        .map_err(to_napi_error)?;
    workbook.entries = schedule.into_entries();
    serde_json::to_string(&workbook).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_projections(input_json: String) -> NapiResult<String> {
    let workbook: ValuationWorkbook = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = valuation::run_valuation(&workbook).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn sensitivity_grid(input_json: String) -> NapiResult<String> {
    let input: sensitivity::SensitivityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = sensitivity::run_sensitivity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
