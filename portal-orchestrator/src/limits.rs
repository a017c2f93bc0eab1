//! Usage limit crossing detection.
//!
//! Pure decision logic applied on every total-usage write and re-applied on
//! every limit write. Notification fan-out is the caller's job; this module
//! only classifies the transition.

use rust_decimal::Decimal;

/// Outcome of comparing a usage transition against the configured limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    NoCrossing,
    SoftCrossing,
    HardCrossing,
}

/// Classify a usage transition from `old_total_usage` to `new_total_usage`
/// against a `soft_limit`/`hard_limit` pair.
///
/// A hard crossing happens iff `old < hard <= new`; otherwise a soft
/// crossing iff `old < soft <= new`. Hard takes precedence when both hold.
/// A usage decrease never produces a crossing.
pub fn evaluate_crossing(
    old_total_usage: Decimal,
    new_total_usage: Decimal,
    soft_limit: Decimal,
    hard_limit: Decimal,
) -> Crossing {
    if old_total_usage < hard_limit && hard_limit <= new_total_usage {
        Crossing::HardCrossing
    } else if old_total_usage < soft_limit && soft_limit <= new_total_usage {
        Crossing::SoftCrossing
    } else {
        Crossing::NoCrossing
    }
}
