use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::ValuationError;
use crate::types::{Money, Percent, Years};
use crate::ValuationResult;

const ONE_HUNDRED: Decimal = dec!(100);

/// Growth multiplier for a percentage rate (3.0 -> 1.03).
pub fn one_plus(rate: Percent) -> Decimal {
    Decimal::ONE + rate / ONE_HUNDRED
}

/// Share of `base` that a percentage represents (`base * pct / 100`).
pub fn percent_of(base: Money, pct: Percent) -> ValuationResult<Money> {
    let scaled = base.checked_mul(pct).ok_or_else(|| {
        ValuationError::FinancialImpossibility(format!("{pct}% of {base} overflows"))
    })?;
    Ok(scaled / ONE_HUNDRED)
}

/// Compound `base` at `rate` percent for a whole number of years.
///
/// Compounding is always anchored on the year-0 value, never chained from the
/// previous year's rounded result.
pub fn compound(base: Money, rate: Percent, years: u32) -> ValuationResult<Money> {
    if years == 0 || base.is_zero() {
        return Ok(base);
    }

    let factor = one_plus(rate)
        .checked_powu(u64::from(years))
        .ok_or_else(|| {
            ValuationError::FinancialImpossibility(format!(
                "Compounding {rate}% over {years} years overflows"
            ))
        })?;

    base.checked_mul(factor).ok_or_else(|| {
        ValuationError::FinancialImpossibility(format!(
            "Compounded value of {base} at {rate}% over {years} years overflows"
        ))
    })
}

/// Divisor `(1 + rate/100)^t` used to discount an amount received at `t` years.
pub fn discount_divisor(rate: Percent, t: Years) -> ValuationResult<Decimal> {
    if rate <= dec!(-100) {
        return Err(ValuationError::InvalidInput {
            field: "discount_rate_percent".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let divisor = one_plus(rate).checked_powd(t).ok_or_else(|| {
        ValuationError::FinancialImpossibility(format!(
            "Discounting at {rate}% over {t} years overflows"
        ))
    })?;

    if divisor.is_zero() {
        return Err(ValuationError::FinancialImpossibility(format!(
            "Discount divisor underflows to zero at {rate}% over {t} years"
        )));
    }

    Ok(divisor)
}

/// Present value of `amount` received `t` years after the effective date.
pub fn present_value(amount: Money, rate: Percent, t: Years) -> ValuationResult<Money> {
    let divisor = discount_divisor(rate, t)?;
    amount.checked_div(divisor).ok_or_else(|| {
        ValuationError::FinancialImpossibility(format!(
            "Present value of {amount} at {rate}% over {t} years overflows"
        ))
    })
}
