pub mod schedule;
pub mod valuation;
