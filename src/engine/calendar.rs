use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::Result;
use crate::model::period::Period;
use crate::repo::HolidaySource;

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Days of `period` an intern is expected to attend, ascending. Weekends and
/// any day `is_holiday` accepts are excluded.
pub fn working_days<F>(period: Period, is_holiday: F) -> Vec<NaiveDate>
where
    F: Fn(NaiveDate) -> bool,
{
    period
        .days()
        .filter(|day| !is_weekend(*day) && !is_holiday(*day))
        .collect()
}

/// Loads the month's holiday configuration and derives the working days.
#[derive(Clone)]
pub struct WorkingCalendar {
    holidays: Arc<dyn HolidaySource>,
}

impl WorkingCalendar {
    pub fn new(holidays: Arc<dyn HolidaySource>) -> Self {
        Self { holidays }
    }

    pub async fn working_days(&self, period: Period) -> Result<Vec<NaiveDate>> {
        let holidays = self
            .holidays
            .holidays_between(period.first_day(), period.end_exclusive())
            .await?;

        Ok(working_days(period, |day| holidays.contains(&day)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::memory::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn excludes_weekends() {
        // March 2025 starts on a Saturday: 31 days, 10 weekend days.
        let days = working_days(Period::new(3, 2025).unwrap(), |_| false);

        assert_eq!(days.len(), 21);
        assert_eq!(days.first(), Some(&date(2025, 3, 3)));
        assert!(days.iter().all(|d| !is_weekend(*d)));
        assert!(days.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn excludes_holidays() {
        let period = Period::new(3, 2025).unwrap();
        let days = working_days(period, |d| d == date(2025, 3, 31));

        assert_eq!(days.len(), 20);
        assert!(!days.contains(&date(2025, 3, 31)));
    }

    #[test]
    fn every_day_a_holiday_yields_empty_calendar() {
        assert!(working_days(Period::new(6, 2025).unwrap(), |_| true).is_empty());
    }

    #[actix_web::test]
    async fn calendar_only_consults_holidays_of_its_month() {
        let store = Arc::new(MemoryStore::new());
        store.add_holiday(date(2025, 3, 31));
        store.add_holiday(date(2025, 4, 1));

        let calendar = WorkingCalendar::new(store);
        let march = calendar.working_days(Period::new(3, 2025).unwrap()).await.unwrap();
        let april = calendar.working_days(Period::new(4, 2025).unwrap()).await.unwrap();

        assert_eq!(march.len(), 20);
        assert!(!april.contains(&date(2025, 4, 1)));
        assert_eq!(april.len(), 21);
    }
}
