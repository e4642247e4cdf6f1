use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::EvaluationError;
use crate::model::user::UserId;

pub const HADIR_POINTS: u32 = 35;
pub const TELAT_POINTS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum AttendanceStatus {
    Hadir,
    Telat,
    Izin,
    Sakit,
    Alpha,
}

impl AttendanceStatus {
    /// Points a single working day earns toward the monthly average.
    pub fn points(self) -> u32 {
        match self {
            AttendanceStatus::Hadir => HADIR_POINTS,
            AttendanceStatus::Telat => TELAT_POINTS,
            AttendanceStatus::Izin | AttendanceStatus::Sakit | AttendanceStatus::Alpha => 0,
        }
    }

    pub fn is_present(self) -> bool {
        matches!(self, AttendanceStatus::Hadir | AttendanceStatus::Telat)
    }
}

/// One check-in row owned by the attendance module. Read-only here.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub user_id: UserId,
    pub date: NaiveDateTime,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    /// The calendar day of the record with the time of day stripped.
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub user_id: u64,
    pub date: NaiveDateTime,
    pub status: String,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = EvaluationError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<AttendanceStatus>().map_err(|e: strum::ParseError| {
            EvaluationError::Internal(format!(
                "unknown attendance status '{}' for user {}: {e}",
                row.status, row.user_id
            ))
        })?;

        Ok(Self {
            user_id: row.user_id,
            date: row.date,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_hadir_and_telat_earn_points() {
        assert_eq!(AttendanceStatus::Hadir.points(), 35);
        assert_eq!(AttendanceStatus::Telat.points(), 30);
        for status in [AttendanceStatus::Izin, AttendanceStatus::Sakit, AttendanceStatus::Alpha] {
            assert_eq!(status.points(), 0);
            assert!(!status.is_present());
        }
    }

    #[test]
    fn row_with_unknown_status_is_rejected() {
        let row = AttendanceRow {
            user_id: 7,
            date: NaiveDate::from_ymd_opt(2025, 3, 3)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            status: "Cuti".to_string(),
        };
        assert!(AttendanceRecord::try_from(row).is_err());
    }
}
