use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::ValuationError;
use crate::types::{Money, Percent, Years};
use crate::ValuationResult;

use super::duration::{projection_year_count, resolve_remaining_years};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Global parameters of one restaurant valuation.
///
/// Every field defaults to zero (or `None` for the dates) so a partially
/// filled form still deserializes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationAssumptions {
    /// Seed annual sales
    pub base_sales: Money,
    /// P.A.C.: operating margin as a percentage of sales
    pub base_operating_cost_percent: Percent,
    /// Seed annual rent
    pub base_rent: Money,
    pub service_fees: Money,
    pub depreciation: Money,
    pub interest: Money,
    pub rent_index: Money,
    pub miscellaneous: Money,
    pub loan_payment: Money,
    /// Annual inflation applied to miscellaneous costs (21.0 = 21%)
    pub inflation_rate_percent: Percent,
    /// Annual discount rate (21.0 = 21%)
    pub discount_rate_percent: Percent,
    /// Annual sales growth (3.0 = 3%)
    pub sales_growth_rate_percent: Percent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_end_date: Option<NaiveDate>,
}

impl ValuationAssumptions {
    /// Remaining contract term, recomputed from the two dates on every call.
    pub fn remaining_years(&self) -> Years {
        resolve_remaining_years(self.effective_date, self.contract_end_date)
    }

    /// Number of yearly entries the current horizon calls for.
    pub fn projection_year_count(&self) -> usize {
        projection_year_count(self.remaining_years())
    }
}

/// Operating assumptions for one projection year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearlyEntry {
    pub sales: Money,
    pub operating_cost_percent: Percent,
    pub rent_percent: Percent,
    pub service_fees: Money,
    pub depreciation: Money,
    pub interest: Money,
    pub rent_index: Money,
    pub loan_payment: Money,
    /// Only year 0 is read; later years are inflated from it
    pub miscellaneous: Money,
    pub reinvestment: Money,
}

impl YearlyEntry {
    pub fn get(&self, field: YearlyField) -> Decimal {
        match field {
            YearlyField::Sales => self.sales,
            YearlyField::OperatingCostPercent => self.operating_cost_percent,
            YearlyField::RentPercent => self.rent_percent,
            YearlyField::ServiceFees => self.service_fees,
            YearlyField::Depreciation => self.depreciation,
            YearlyField::Interest => self.interest,
            YearlyField::RentIndex => self.rent_index,
            YearlyField::LoanPayment => self.loan_payment,
            YearlyField::Miscellaneous => self.miscellaneous,
            YearlyField::Reinvestment => self.reinvestment,
        }
    }

    fn slot(&mut self, field: YearlyField) -> &mut Decimal {
        match field {
            YearlyField::Sales => &mut self.sales,
            YearlyField::OperatingCostPercent => &mut self.operating_cost_percent,
            YearlyField::RentPercent => &mut self.rent_percent,
            YearlyField::ServiceFees => &mut self.service_fees,
            YearlyField::Depreciation => &mut self.depreciation,
            YearlyField::Interest => &mut self.interest,
            YearlyField::RentIndex => &mut self.rent_index,
            YearlyField::LoanPayment => &mut self.loan_payment,
            YearlyField::Miscellaneous => &mut self.miscellaneous,
            YearlyField::Reinvestment => &mut self.reinvestment,
        }
    }
}

/// Editable field of a [`YearlyEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearlyField {
    Sales,
    OperatingCostPercent,
    RentPercent,
    ServiceFees,
    Depreciation,
    Interest,
    RentIndex,
    LoanPayment,
    Miscellaneous,
    Reinvestment,
}

impl YearlyField {
    pub const ALL: [YearlyField; 10] = [
        YearlyField::Sales,
        YearlyField::OperatingCostPercent,
        YearlyField::RentPercent,
        YearlyField::ServiceFees,
        YearlyField::Depreciation,
        YearlyField::Interest,
        YearlyField::RentIndex,
        YearlyField::LoanPayment,
        YearlyField::Miscellaneous,
        YearlyField::Reinvestment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            YearlyField::Sales => "sales",
            YearlyField::OperatingCostPercent => "operating_cost_percent",
            YearlyField::RentPercent => "rent_percent",
            YearlyField::ServiceFees => "service_fees",
            YearlyField::Depreciation => "depreciation",
            YearlyField::Interest => "interest",
            YearlyField::RentIndex => "rent_index",
            YearlyField::LoanPayment => "loan_payment",
            YearlyField::Miscellaneous => "miscellaneous",
            YearlyField::Reinvestment => "reinvestment",
        }
    }
}

impl fmt::Display for YearlyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for YearlyField {
    type Err = ValuationError;

    /// Accepts snake_case, camelCase or kebab-case names, plus `pac`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let field = match key.as_str() {
            "sales" => YearlyField::Sales,
            "operatingcostpercent" | "pac" => YearlyField::OperatingCostPercent,
            "rentpercent" => YearlyField::RentPercent,
            "servicefees" => YearlyField::ServiceFees,
            "depreciation" => YearlyField::Depreciation,
            "interest" => YearlyField::Interest,
            "rentindex" => YearlyField::RentIndex,
            "loanpayment" => YearlyField::LoanPayment,
            "miscellaneous" => YearlyField::Miscellaneous,
            "reinvestment" => YearlyField::Reinvestment,
            _ => {
                return Err(ValuationError::InvalidInput {
                    field: "field".into(),
                    reason: format!("Unknown yearly field '{s}'"),
                })
            }
        };
        Ok(field)
    }
}

/// Assumptions and yearly entries of one restaurant valuation, as exchanged
/// with whatever layer stores and edits them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationWorkbook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<String>,
    #[serde(default)]
    pub assumptions: ValuationAssumptions,
    #[serde(default)]
    pub entries: Vec<YearlyEntry>,
}

// ---------------------------------------------------------------------------
// Yearly schedule
// ---------------------------------------------------------------------------

/// Ordered set of yearly entries sized to the valuation horizon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct YearlySchedule {
    entries: Vec<YearlyEntry>,
}

impl YearlySchedule {
    /// Zeroed entries for `ceil(remaining_years)` projection years.
    pub fn for_remaining_years(remaining_years: Years) -> Self {
        Self {
            entries: vec![YearlyEntry::default(); projection_year_count(remaining_years)],
        }
    }

    pub fn from_entries(entries: Vec<YearlyEntry>) -> Self {
        Self { entries }
    }

    /// Rebuild the schedule when the horizon's year count changes.
    ///
    /// The rebuild is destructive: every entry returns to zero, including
    /// years that exist under both the old and new horizon. Returns whether a
    /// rebuild happened.
    pub fn resize_for(&mut self, remaining_years: Years) -> bool {
        let target = projection_year_count(remaining_years);
        if target == self.entries.len() {
            return false;
        }
        debug!(
            from = self.entries.len(),
            to = target,
            "horizon changed, resetting yearly entries"
        );
        self.entries = vec![YearlyEntry::default(); target];
        true
    }

    /// Replace one field of one year, leaving everything else untouched.
    pub fn set_field(
        &mut self,
        index: usize,
        field: YearlyField,
        value: Decimal,
    ) -> ValuationResult<()> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or_else(|| ValuationError::InvalidInput {
                field: "year".into(),
                reason: format!("Year index {index} is outside the {len}-year schedule"),
            })?;
        *entry.slot(field) = value;
        Ok(())
    }

    /// Text-form edit: parses the field name and the raw numeric input.
    pub fn set_field_str(&mut self, index: usize, field: &str, raw: &str) -> ValuationResult<()> {
        let field: YearlyField = field.parse()?;
        let value = parse_amount(raw).map_err(|reason| ValuationError::InvalidInput {
            field: field.to_string(),
            reason,
        })?;
        self.set_field(index, field, value)
    }

    /// Copy the valuation's seed magnitudes into year 0.
    ///
    /// Rent is entered per year as a share of sales, so the seed rent is
    /// converted to a percentage of seed sales (left at zero without sales).
    pub fn seed_first_year(&mut self, assumptions: &ValuationAssumptions) -> ValuationResult<()> {
        let rent_percent = rent_share_percent(assumptions.base_rent, assumptions.base_sales)?;
        let Some(first) = self.entries.first_mut() else {
            return Ok(());
        };
        first.sales = assumptions.base_sales;
        first.operating_cost_percent = assumptions.base_operating_cost_percent;
        first.rent_percent = rent_percent;
        first.service_fees = assumptions.service_fees;
        first.depreciation = assumptions.depreciation;
        first.interest = assumptions.interest;
        first.rent_index = assumptions.rent_index;
        first.miscellaneous = assumptions.miscellaneous;
        first.loan_payment = assumptions.loan_payment;
        Ok(())
    }

    pub fn entries(&self) -> &[YearlyEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&YearlyEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<YearlyEntry> {
        self.entries
    }
}

/// Rent as a percentage of sales; zero when there are no sales.
fn rent_share_percent(rent: Money, sales: Money) -> ValuationResult<Percent> {
    if sales.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let overflow = || {
        ValuationError::FinancialImpossibility(format!("Rent share {rent}/{sales} overflows"))
    };
    let share = rent.checked_div(sales).ok_or_else(overflow)?;
    share.checked_mul(dec!(100)).ok_or_else(overflow)
}

/// Parse user-entered numbers: surrounding whitespace and thousands
/// separators are ignored, and an empty field counts as zero.
pub fn parse_amount(raw: &str) -> Result<Decimal, String> {
    let normalized = raw.trim().replace(',', "");
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }
    normalized
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&normalized))
        .map_err(|e| format!("'{raw}' is not a number: {e}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
