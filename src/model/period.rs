use chrono::{Datelike, Months, NaiveDate};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::{EvaluationError, Result};

pub const MIN_TAHUN: i32 = 2000;
pub const MAX_TAHUN: i32 = 2100;

/// One evaluation month (`bulan`/`tahun`), always a valid calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    first: NaiveDate,
    next: NaiveDate,
}

impl Period {
    pub fn new(bulan: u32, tahun: i32) -> Result<Self> {
        if !(1..=12).contains(&bulan) {
            return Err(EvaluationError::Validation(format!(
                "bulan must be between 1 and 12, got {bulan}"
            )));
        }
        if !(MIN_TAHUN..=MAX_TAHUN).contains(&tahun) {
            return Err(EvaluationError::Validation(format!(
                "tahun must be between {MIN_TAHUN} and {MAX_TAHUN}, got {tahun}"
            )));
        }

        let first = NaiveDate::from_ymd_opt(tahun, bulan, 1)
            .ok_or_else(|| EvaluationError::Validation(format!("invalid month {bulan}/{tahun}")))?;
        let next = first
            .checked_add_months(Months::new(1))
            .ok_or_else(|| EvaluationError::Validation(format!("invalid month {bulan}/{tahun}")))?;

        Ok(Self { first, next })
    }

    pub fn bulan(&self) -> u32 {
        self.first.month()
    }

    pub fn tahun(&self) -> i32 {
        self.first.year()
    }

    /// Inclusive lower bound of the month.
    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    /// Exclusive upper bound: the first day of the following month.
    pub fn end_exclusive(&self) -> NaiveDate {
        self.next
    }

    /// Every calendar day of the month in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let next = self.next;
        self.first.iter_days().take_while(move |d| *d < next)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Period", 2)?;
        state.serialize_field("bulan", &self.bulan())?;
        state.serialize_field("tahun", &self.tahun())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_month() {
        assert!(matches!(Period::new(0, 2025), Err(EvaluationError::Validation(_))));
        assert!(matches!(Period::new(13, 2025), Err(EvaluationError::Validation(_))));
        assert!(matches!(Period::new(5, 1999), Err(EvaluationError::Validation(_))));
    }

    #[test]
    fn december_rolls_into_next_year() {
        let period = Period::new(12, 2024).unwrap();
        assert_eq!(period.end_exclusive(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(period.days().count(), 31);
    }

    #[test]
    fn leap_february_has_29_days() {
        assert_eq!(Period::new(2, 2024).unwrap().days().count(), 29);
        assert_eq!(Period::new(2, 2025).unwrap().days().count(), 28);
    }
}
