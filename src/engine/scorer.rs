use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::engine::calendar::WorkingCalendar;
use crate::error::Result;
use crate::model::attendance::AttendanceRecord;
use crate::model::period::Period;
use crate::model::user::UserId;
use crate::repo::AttendanceSource;

pub const MAX_ABSEN: f64 = 35.0;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDetail {
    #[schema(example = 20)]
    pub total_working_days: u32,
    #[schema(example = 20)]
    pub attended_days: u32,
    #[schema(example = 650)]
    pub total_points: u32,
    #[schema(example = 32.5)]
    pub avg_points: f64,
}

/// Attendance-derived part of an evaluation, `absen` in `[0, 35]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct AttendanceScore {
    #[schema(example = 32.5)]
    pub absen: f64,
    pub detail: AttendanceDetail,
}

/// Scores `records` against a month's working days.
///
/// Records dated outside `working_days` earn nothing. Rows are not
/// de-duplicated per day: two rows for the same user and day both count.
pub fn tally(working_days: &[NaiveDate], records: &[AttendanceRecord]) -> AttendanceScore {
    let total_working_days = working_days.len() as u32;
    if total_working_days == 0 {
        return AttendanceScore::default();
    }

    let mut total_points = 0u32;
    let mut attended_days = 0u32;
    for record in records
        .iter()
        .filter(|r| working_days.binary_search(&r.day()).is_ok())
    {
        total_points += record.status.points();
        if record.status.is_present() {
            attended_days += 1;
        }
    }

    let avg_points = round2(f64::from(total_points) / f64::from(total_working_days));

    AttendanceScore {
        absen: avg_points.min(MAX_ABSEN),
        detail: AttendanceDetail {
            total_working_days,
            attended_days,
            total_points,
            avg_points,
        },
    }
}

#[derive(Clone)]
pub struct AttendanceScorer {
    calendar: WorkingCalendar,
    attendance: Arc<dyn AttendanceSource>,
}

impl AttendanceScorer {
    pub fn new(calendar: WorkingCalendar, attendance: Arc<dyn AttendanceSource>) -> Self {
        Self {
            calendar,
            attendance,
        }
    }

    pub fn calendar(&self) -> &WorkingCalendar {
        &self.calendar
    }

    #[instrument(name = "score_attendance", skip(self, period), fields(bulan = period.bulan(), tahun = period.tahun()))]
    pub async fn score(&self, user_id: UserId, period: Period) -> Result<AttendanceScore> {
        let (days, records) =
            futures::try_join!(self.calendar.working_days(period), self.records(user_id, period))?;

        let score = tally(&days, &records);
        debug!(absen = score.absen, total_points = score.detail.total_points, "Attendance scored");
        Ok(score)
    }

    /// Same as [`score`](Self::score) against an already loaded calendar, so
    /// a listing pays for one calendar lookup instead of one per intern.
    pub async fn score_against(
        &self,
        user_id: UserId,
        period: Period,
        working_days: &[NaiveDate],
    ) -> Result<AttendanceScore> {
        if working_days.is_empty() {
            return Ok(AttendanceScore::default());
        }

        let records = self.records(user_id, period).await?;
        Ok(tally(working_days, &records))
    }

    async fn records(&self, user_id: UserId, period: Period) -> Result<Vec<AttendanceRecord>> {
        self.attendance
            .records_between(user_id, period.first_day(), period.end_exclusive())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::calendar::working_days;
    use crate::model::attendance::AttendanceStatus;
    use crate::repo::memory::MemoryStore;
    use chrono::Duration;
    use proptest::prelude::*;

    const USER: UserId = 1;

    // February 2025 starts on a Saturday: exactly 20 working days.
    fn february() -> Period {
        Period::new(2, 2025).unwrap()
    }

    fn record(day: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            user_id: USER,
            date: day.and_hms_opt(8, 15, 0).unwrap(),
            status,
        }
    }

    fn scorer(store: Arc<MemoryStore>) -> AttendanceScorer {
        AttendanceScorer::new(WorkingCalendar::new(store.clone()), store)
    }

    #[test]
    fn full_attendance_scores_the_maximum() {
        let days = working_days(february(), |_| false);
        assert_eq!(days.len(), 20);

        let records: Vec<_> = days.iter().map(|d| record(*d, AttendanceStatus::Hadir)).collect();
        let score = tally(&days, &records);

        assert_eq!(score.absen, 35.0);
        assert_eq!(score.detail.total_points, 700);
        assert_eq!(score.detail.attended_days, 20);
    }

    #[test]
    fn late_days_earn_thirty_points() {
        let days = working_days(february(), |_| false);
        let records: Vec<_> = days
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let status = if i < 10 { AttendanceStatus::Hadir } else { AttendanceStatus::Telat };
                record(*d, status)
            })
            .collect();

        let score = tally(&days, &records);

        assert_eq!(score.detail.total_points, 650);
        assert_eq!(score.detail.avg_points, 32.5);
        assert_eq!(score.absen, 32.5);
    }

    #[test]
    fn averages_are_rounded_to_two_decimals() {
        let days = working_days(february(), |_| false);
        let records = vec![
            record(days[0], AttendanceStatus::Hadir),
            record(days[1], AttendanceStatus::Telat),
            record(days[2], AttendanceStatus::Telat),
        ];

        // 95 / 20 = 4.75
        assert_eq!(tally(&days, &records).absen, 4.75);

        let three_days = &days[..3];
        let records = vec![record(days[0], AttendanceStatus::Hadir)];
        // 35 / 3 = 11.666..
        assert_eq!(tally(three_days, &records).absen, 11.67);
    }

    #[test]
    fn weekend_check_in_is_ignored() {
        let days = working_days(february(), |_| false);
        let saturday = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let records = vec![
            record(days[0], AttendanceStatus::Hadir),
            record(saturday, AttendanceStatus::Hadir),
        ];

        let score = tally(&days, &records);

        assert_eq!(score.detail.total_working_days, 20);
        assert_eq!(score.detail.total_points, 35);
        assert_eq!(score.detail.attended_days, 1);
    }

    #[test]
    fn empty_calendar_scores_zero() {
        let records = vec![record(
            NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            AttendanceStatus::Hadir,
        )];

        assert_eq!(tally(&[], &records), AttendanceScore::default());
    }

    // Duplicate rows for one day are counted twice. This pins the behaviour
    // for when the attendance table's (user, date) key is ever violated.
    #[test]
    fn duplicate_rows_for_one_day_inflate_the_score() {
        let days = working_days(february(), |_| false);
        let records = vec![
            record(days[0], AttendanceStatus::Hadir),
            record(days[0], AttendanceStatus::Hadir),
        ];

        let score = tally(&days, &records);

        assert_eq!(score.detail.total_points, 70);
        assert_eq!(score.detail.attended_days, 2);
        assert_eq!(score.absen, 3.5);
    }

    #[test]
    fn duplicates_cannot_push_absen_past_the_cap() {
        let days = working_days(february(), |_| false);
        let records: Vec<_> = days
            .iter()
            .flat_map(|d| [record(*d, AttendanceStatus::Hadir), record(*d, AttendanceStatus::Hadir)])
            .collect();

        let score = tally(&days, &records);

        assert_eq!(score.detail.avg_points, 70.0);
        assert_eq!(score.absen, MAX_ABSEN);
    }

    #[actix_web::test]
    async fn scorer_strips_time_and_ignores_other_users() {
        let store = Arc::new(MemoryStore::new());
        let monday = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        store.add_attendance(AttendanceRecord {
            user_id: USER,
            date: monday.and_hms_opt(23, 59, 59).unwrap(),
            status: AttendanceStatus::Telat,
        });
        store.add_attendance(AttendanceRecord {
            user_id: USER + 1,
            date: monday.and_hms_opt(8, 0, 0).unwrap(),
            status: AttendanceStatus::Hadir,
        });

        let score = scorer(store).score(USER, february()).await.unwrap();

        assert_eq!(score.detail.total_points, 30);
        assert_eq!(score.absen, 1.5);
    }

    #[actix_web::test]
    async fn all_holiday_month_scores_zero() {
        let store = Arc::new(MemoryStore::new());
        for day in february().days() {
            store.add_holiday(day);
            store.add_attendance(record(day, AttendanceStatus::Hadir));
        }

        let score = scorer(store).score(USER, february()).await.unwrap();

        assert_eq!(score.absen, 0.0);
        assert_eq!(score.detail.total_working_days, 0);
    }

    proptest! {
        #[test]
        fn absen_is_always_within_bounds(
            entries in prop::collection::vec((0i64..28, 0usize..5), 0..80),
            holiday_mask in prop::collection::vec(any::<bool>(), 28),
        ) {
            let period = february();
            let first = period.first_day();
            let days = working_days(period, |d| {
                holiday_mask[(d - first).num_days() as usize]
            });
            let statuses = [
                AttendanceStatus::Hadir,
                AttendanceStatus::Telat,
                AttendanceStatus::Izin,
                AttendanceStatus::Sakit,
                AttendanceStatus::Alpha,
            ];
            let records: Vec<_> = entries
                .iter()
                .map(|(offset, s)| record(first + Duration::days(*offset), statuses[*s]))
                .collect();

            let score = tally(&days, &records);

            prop_assert!(score.absen >= 0.0);
            prop_assert!(score.absen <= MAX_ABSEN);
            if days.is_empty() {
                prop_assert_eq!(score.absen, 0.0);
            }
        }
    }
}
