//! Franchise restaurant DCF valuation.
//!
//! Dates resolve to a remaining term ([`duration`]), the term sizes the
//! editable yearly schedule ([`assumptions`]), and the schedule plus global
//! rates produce discounted cash flows ([`projection`]).

pub mod assumptions;
pub mod duration;
pub mod projection;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

pub use assumptions::{
    ValuationAssumptions, ValuationWorkbook, YearlyEntry, YearlyField, YearlySchedule,
};
pub use duration::{projection_year_count, resolve_remaining_years};
pub use projection::{
    compute_projections, resolve_miscellaneous, resolve_sales, run_valuation, ProjectionPeriod,
    ProjectionSchedule,
};
