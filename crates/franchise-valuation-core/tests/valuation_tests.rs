use chrono::NaiveDate;
use franchise_valuation_core::valuation::{
    compute_projections, resolve_remaining_years, run_valuation, ValuationAssumptions,
    ValuationWorkbook, YearlyEntry, YearlyField, YearlySchedule,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn restaurant_assumptions() -> ValuationAssumptions {
    ValuationAssumptions {
        base_sales: dec!(2454919),
        base_operating_cost_percent: dec!(30),
        base_rent: dec!(245491.9),
        sales_growth_rate_percent: dec!(3.0),
        discount_rate_percent: dec!(21.0),
        inflation_rate_percent: dec!(2.0),
        effective_date: date(2025, 1, 1),
        contract_end_date: date(2027, 1, 1),
        ..Default::default()
    }
}

// ===========================================================================
// Duration + schedule lifecycle
// ===========================================================================

#[test]
fn test_horizon_drives_schedule_length() {
    let mut assumptions = restaurant_assumptions();
    let mut schedule = YearlySchedule::for_remaining_years(assumptions.remaining_years());
    assert_eq!(schedule.len(), 2);

    schedule
        .set_field(0, YearlyField::Sales, dec!(1000))
        .unwrap();

    // Extending the contract by four months adds a partial third year
    assumptions.contract_end_date = date(2027, 5, 1);
    assert!(schedule.resize_for(assumptions.remaining_years()));
    assert_eq!(schedule.len(), 3);
    assert_eq!(schedule.get(0).unwrap().sales, Decimal::ZERO);
}

#[test]
fn test_reversed_contract_dates_short_circuit() {
    let mut assumptions = restaurant_assumptions();
    assumptions.contract_end_date = date(2024, 6, 30);

    let years = assumptions.remaining_years();
    assert!(years < Decimal::ZERO);
    assert!(YearlySchedule::for_remaining_years(years).is_empty());

    let entries = vec![YearlyEntry {
        sales: dec!(100000),
        operating_cost_percent: dec!(40),
        ..Default::default()
    }];
    let schedule = compute_projections(&assumptions, &entries).unwrap();
    assert!(schedule.periods.is_empty());
    assert_eq!(schedule.valuation(), None);
}

#[test]
fn test_remaining_years_four_decimal_display() {
    let years = resolve_remaining_years(date(2025, 3, 10), date(2040, 8, 22));
    // 185 whole months to 10 Aug 2040, then 12 of the 31 days to 10 Sep
    let expected = (dec!(185) + dec!(12) / dec!(31)) / dec!(12);
    assert_eq!(years, expected);
    assert_eq!(years.round_dp(4), dec!(15.4489));
}

// ===========================================================================
// Projection
// ===========================================================================

#[test]
fn test_end_to_end_restaurant_valuation() {
    let assumptions = restaurant_assumptions();
    assert_eq!(assumptions.remaining_years(), dec!(2));

    let mut schedule = YearlySchedule::for_remaining_years(assumptions.remaining_years());
    schedule.seed_first_year(&assumptions).unwrap();
    schedule
        .set_field(1, YearlyField::OperatingCostPercent, dec!(30))
        .unwrap();
    schedule
        .set_field(1, YearlyField::RentPercent, dec!(10))
        .unwrap();

    let result = compute_projections(&assumptions, schedule.entries()).unwrap();
    assert_eq!(result.periods.len(), 2);

    // Year 0: cashflow = 2,454,919 * (30% - 10%) = 490,983.8
    let y0 = &result.periods[0];
    assert_eq!(y0.cashflow, dec!(490983.8));
    assert!((y0.present_value - dec!(490983.8) / dec!(1.21)).abs() < dec!(0.000001));

    // Year 1: sales = 2,454,919 * 1.03 = 2,528,566.57
    let y1 = &result.periods[1];
    assert_eq!(y1.resolved_entry.sales, dec!(2528566.57));
    assert_eq!(y1.free_cash_flow, dec!(505713.314));
    assert!(
        (y1.present_value - y1.free_cash_flow / dec!(1.4641)).abs() < dec!(0.000001),
        "Expected PV = FCF / 1.21^2, got {}",
        y1.present_value
    );

    assert_eq!(
        result.total_present_value,
        y0.present_value + y1.present_value
    );
    assert_eq!(result.valuation(), Some(result.total_present_value));
}

#[test]
fn test_partial_final_year_is_prorated_and_discounted_fractionally() {
    let mut assumptions = restaurant_assumptions();
    assumptions.contract_end_date = date(2026, 7, 1);
    assert_eq!(assumptions.remaining_years(), dec!(1.5));

    let entry = YearlyEntry {
        sales: dec!(1000000),
        operating_cost_percent: dec!(20),
        depreciation: dec!(10000),
        ..Default::default()
    };
    let result = compute_projections(&assumptions, &[entry.clone(), entry]).unwrap();
    let last = &result.periods[1];

    // Full-year FCF = 1,030,000 * 20% + 10,000 = 216,000; half of it
    assert_eq!(last.time_to_next_year, dec!(0.5));
    assert_eq!(last.free_cash_flow, dec!(108000));
    assert_eq!(last.period_end_offset, dec!(1.5));
    // 1.21^1.5 = 1.331
    assert!(
        (last.present_value - dec!(108000) / dec!(1.331)).abs() < dec!(1),
        "got {}",
        last.present_value
    );
}

#[test]
fn test_zero_sales_year_excluded_not_zero_filled() {
    let mut assumptions = restaurant_assumptions();
    assumptions.sales_growth_rate_percent = dec!(-100);
    let entries = vec![
        YearlyEntry {
            sales: dec!(500000),
            operating_cost_percent: dec!(10),
            ..Default::default()
        };
        2
    ];

    let result = compute_projections(&assumptions, &entries).unwrap();
    assert_eq!(result.periods.len(), 1);
    assert_eq!(result.periods[0].period_index, 0);
}

#[test]
fn test_editing_unused_later_sales_does_not_change_price() {
    let assumptions = restaurant_assumptions();
    let mut schedule = YearlySchedule::for_remaining_years(assumptions.remaining_years());
    schedule.seed_first_year(&assumptions).unwrap();
    let before = compute_projections(&assumptions, schedule.entries()).unwrap();

    schedule
        .set_field(1, YearlyField::Sales, dec!(9999999))
        .unwrap();
    schedule
        .set_field(1, YearlyField::Miscellaneous, dec!(9999999))
        .unwrap();
    let after = compute_projections(&assumptions, schedule.entries()).unwrap();

    assert_eq!(before.total_present_value, after.total_present_value);
}

// ===========================================================================
// Workbook I/O
// ===========================================================================

#[test]
fn test_workbook_from_json() {
    let json = r#"{
        "valuation_id": "val-42",
        "restaurant_id": "rest-7",
        "assumptions": {
            "discount_rate_percent": 21,
            "sales_growth_rate_percent": "3.0",
            "effective_date": "2025-01-01",
            "contract_end_date": "2026-01-01"
        },
        "entries": [
            { "sales": 2454919, "operating_cost_percent": 30, "rent_percent": 10 }
        ]
    }"#;

    let workbook: ValuationWorkbook = serde_json::from_str(json).unwrap();
    assert_eq!(workbook.restaurant_id.as_deref(), Some("rest-7"));

    let out = run_valuation(&workbook).unwrap();
    assert!(out.warnings.is_empty(), "warnings: {:?}", out.warnings);
    assert_eq!(out.result.periods.len(), 1);
    assert_eq!(out.result.periods[0].cashflow, dec!(490983.8));
}
