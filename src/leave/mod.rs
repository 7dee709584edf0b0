//! Leave bookkeeping that does not need a database: day counting, policy
//! rules, opening balances, analytics folds and report rendering.

pub mod allowance;
pub mod analytics;
pub mod calendar;
pub mod days;
pub mod export;
pub mod rules;

/// Rounds to one decimal place, as every percentage and day average is reported.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
