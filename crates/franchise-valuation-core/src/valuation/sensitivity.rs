use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::ValuationError;
use crate::types::*;
use crate::ValuationResult;

use super::assumptions::ValuationWorkbook;
use super::projection::compute_projections;

/// Upper bound on the number of valuations a single grid may run.
const MAX_GRID_CELLS: usize = 10_000;

/// Input for a discount-rate by sales-growth sensitivity grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    /// Base case valuation
    pub workbook: ValuationWorkbook,
    /// Discount rate sweep (rows), in percent
    pub discount_rate: SensitivityVariable,
    /// Sales growth rate sweep (columns), in percent
    pub sales_growth_rate: SensitivityVariable,
}

/// Output of the sensitivity grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub discount_rate_values: Vec<Percent>,
    pub sales_growth_rate_values: Vec<Percent>,
    /// matrix[i][j] = valuation at discount_rate_values[i], sales_growth_rate_values[j];
    /// `None` where the valuation is undefined or could not be computed
    pub matrix: Vec<Vec<Option<Money>>>,
    /// Valuation at the grid point closest to the workbook's own rates
    pub base_case_value: Option<Money>,
    /// Position of the base case in the matrix (row, col)
    pub base_case_position: (usize, usize),
}

/// Generate the sweep values for a sensitivity variable from min to max with step.
fn generate_sweep_values(var: &SensitivityVariable) -> ValuationResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(ValuationError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Min must be <= max".into(),
        });
    }

    let range = var.max.checked_sub(var.min);
    let points = range
        .and_then(|span| span.checked_div(var.step))
        .and_then(|steps| steps.floor().to_usize())
        .and_then(|steps| steps.checked_add(1));
    let Some(points) = points.filter(|&n| n <= MAX_GRID_CELLS) else {
        return Err(ValuationError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: format!("Sweep exceeds {MAX_GRID_CELLS} points"),
        });
    };

    let mut values = Vec::with_capacity(points + 1);
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        match current.checked_add(var.step) {
            Some(next) => current = next,
            None => break,
        }
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Revalue the workbook at every (discount rate, sales growth) grid point.
pub fn run_sensitivity(
    input: &SensitivityInput,
) -> ValuationResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let base = &input.workbook.assumptions;
    if base.remaining_years() <= Decimal::ZERO {
        return Err(ValuationError::InsufficientData(
            "Sensitivity grid needs a positive remaining contract term".into(),
        ));
    }

    let discount_values = generate_sweep_values(&input.discount_rate)?;
    let growth_values = generate_sweep_values(&input.sales_growth_rate)?;
    let cells = discount_values.len() * growth_values.len();
    if cells > MAX_GRID_CELLS {
        return Err(ValuationError::InvalidInput {
            field: "sensitivity".into(),
            reason: format!("Grid of {cells} cells exceeds the {MAX_GRID_CELLS}-cell limit"),
        });
    }

    let mut matrix = Vec::with_capacity(discount_values.len());
    for &discount in &discount_values {
        let mut row = Vec::with_capacity(growth_values.len());
        for &growth in &growth_values {
            let mut assumptions = base.clone();
            assumptions.discount_rate_percent = discount;
            assumptions.sales_growth_rate_percent = growth;

            match compute_projections(&assumptions, &input.workbook.entries) {
                Ok(schedule) => row.push(schedule.valuation()),
                Err(e) => {
                    warnings.push(format!(
                        "Evaluation failed at discount {discount}%, growth {growth}%: {e}"
                    ));
                    row.push(None);
                }
            }
        }
        matrix.push(row);
    }

    let base_row = closest_index(&discount_values, base.discount_rate_percent);
    let base_col = closest_index(&growth_values, base.sales_growth_rate_percent);
    let base_case_value = matrix
        .get(base_row)
        .and_then(|row| row.get(base_col))
        .copied()
        .flatten();

    if base_case_value.is_none() {
        warnings.push("Base case valuation is undefined".into());
    }
    debug!(
        rows = discount_values.len(),
        cols = growth_values.len(),
        "sensitivity grid evaluated"
    );

    let output = SensitivityOutput {
        discount_rate_values: discount_values,
        sales_growth_rate_values: growth_values,
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Franchise DCF sensitivity: discount rate x sales growth",
        &serde_json::json!({
            "discount_rate": input.discount_rate,
            "sales_growth_rate": input.sales_growth_rate,
            "valuation_id": input.workbook.valuation_id,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::assumptions::{ValuationAssumptions, YearlyEntry};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn variable(name: &str, min: Decimal, max: Decimal, step: Decimal) -> SensitivityVariable {
        SensitivityVariable {
            name: name.into(),
            min,
            max,
            step,
        }
    }

    fn sample_input() -> SensitivityInput {
        let entry = YearlyEntry {
            sales: dec!(1000000),
            operating_cost_percent: dec!(25),
            rent_percent: dec!(8),
            ..Default::default()
        };
        SensitivityInput {
            workbook: ValuationWorkbook {
                valuation_id: Some("val-1".into()),
                restaurant_id: None,
                assumptions: ValuationAssumptions {
                    discount_rate_percent: dec!(15),
                    sales_growth_rate_percent: dec!(3),
                    effective_date: NaiveDate::from_ymd_opt(2025, 1, 1),
                    contract_end_date: NaiveDate::from_ymd_opt(2028, 1, 1),
                    ..Default::default()
                },
                entries: vec![entry; 3],
            },
            discount_rate: variable("discount_rate", dec!(10), dec!(20), dec!(5)),
            sales_growth_rate: variable("sales_growth_rate", dec!(0), dec!(6), dec!(3)),
        }
    }

    #[test]
    fn test_sweep_values_include_max() {
        let values = generate_sweep_values(&variable("x", dec!(0), dec!(10), dec!(4))).unwrap();
        assert_eq!(values, vec![dec!(0), dec!(4), dec!(8), dec!(10)]);
    }

    #[test]
    fn test_sweep_rejects_bad_step_and_range() {
        assert!(generate_sweep_values(&variable("x", dec!(0), dec!(1), dec!(0))).is_err());
        assert!(generate_sweep_values(&variable("x", dec!(2), dec!(1), dec!(1))).is_err());
    }

    #[test]
    fn test_sweep_rejects_too_many_points() {
        let fine = variable("x", dec!(0), dec!(10), dec!(0.0000000001));
        assert!(generate_sweep_values(&fine).is_err());

        let at_limit = variable("x", dec!(1), dec!(10000), dec!(1));
        assert_eq!(generate_sweep_values(&at_limit).unwrap().len(), 10_000);
    }

    #[test]
    fn test_sweep_near_decimal_max_terminates() {
        let top = variable("x", Decimal::MAX - dec!(1), Decimal::MAX, dec!(1));
        let values = generate_sweep_values(&top).unwrap();
        assert_eq!(values, vec![Decimal::MAX - dec!(1), Decimal::MAX]);
    }

    #[test]
    fn test_grid_cell_limit() {
        let mut input = sample_input();
        input.discount_rate = variable("discount_rate", dec!(1), dec!(200), dec!(1));
        input.sales_growth_rate = variable("sales_growth_rate", dec!(1), dec!(200), dec!(1));

        let err = run_sensitivity(&input).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidInput { .. }));
    }

    #[test]
    fn test_grid_shape_and_base_case() {
        let input = sample_input();
        let out = run_sensitivity(&input).unwrap().result;

        assert_eq!(out.matrix.len(), 3);
        assert!(out.matrix.iter().all(|row| row.len() == 3));
        assert_eq!(out.base_case_position, (1, 1));

        let direct = compute_projections(&input.workbook.assumptions, &input.workbook.entries)
            .unwrap()
            .valuation();
        assert_eq!(out.base_case_value, direct);
    }

    #[test]
    fn test_higher_discount_lowers_value() {
        let out = run_sensitivity(&sample_input()).unwrap().result;
        for col in 0..out.sales_growth_rate_values.len() {
            let low = out.matrix[0][col].unwrap();
            let high = out.matrix[2][col].unwrap();
            assert!(low > high, "discount sweep not decreasing in column {col}");
        }
    }

    #[test]
    fn test_invalid_discount_cells_are_null() {
        let mut input = sample_input();
        input.discount_rate = variable("discount_rate", dec!(-100), dec!(-100), dec!(1));
        let out = run_sensitivity(&input).unwrap();
        assert!(out.result.matrix[0].iter().all(Option::is_none));
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_requires_positive_horizon() {
        let mut input = sample_input();
        input.workbook.assumptions.contract_end_date = None;
        assert!(run_sensitivity(&input).is_err());
    }
}
