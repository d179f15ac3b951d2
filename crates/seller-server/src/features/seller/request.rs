//! Request defaulting helpers
//!
//! Callers send partial request bodies. A field that is missing, empty or zero
//! falls back to the resource default.

use chrono::{Months, NaiveDate};

pub(crate) fn text(value: Option<String>, default: impl Into<String>) -> String {
    value
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.into())
}

pub(crate) fn list<T>(value: Option<Vec<T>>, default: impl FnOnce() -> Vec<T>) -> Vec<T> {
    value.filter(|v| !v.is_empty()).unwrap_or_else(default)
}

pub(crate) fn count(value: Option<u32>, default: u32) -> u32 {
    value.filter(|n| *n != 0).unwrap_or(default)
}

/// Same calendar day one month earlier, clamped to the month end
pub(crate) fn month_before(date: NaiveDate) -> NaiveDate {
    date.checked_sub_months(Months::new(1)).unwrap_or(date)
}
