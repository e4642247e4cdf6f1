use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::{EvaluationError, Result};
use crate::model::period::Period;
use crate::model::user::{Owner, UserId};

pub const MAX_MANUAL_SCORE: f64 = 30.0;
pub const LAPORAN_BONUS: f64 = 5.0;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum EvaluationStatus {
    #[default]
    Draft,
    Final,
}

/// Identity of an evaluation: one per intern per month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvaluationKey {
    pub user_id: UserId,
    pub period: Period,
}

/// A write request for the manually entered fields. Absent fields fall back
/// to their defaults; the previous value is not merged in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreInput {
    pub kuantitas: Option<f64>,
    pub kualitas: Option<f64>,
    pub laporan: Option<bool>,
    pub status: Option<EvaluationStatus>,
}

impl ScoreInput {
    pub fn validate(self) -> Result<ManualScores> {
        Ok(ManualScores {
            kuantitas: manual_score("kuantitas", self.kuantitas.unwrap_or(0.0))?,
            kualitas: manual_score("kualitas", self.kualitas.unwrap_or(0.0))?,
            laporan: self.laporan.unwrap_or(false),
            status: self.status.unwrap_or_default(),
        })
    }
}

fn manual_score(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=MAX_MANUAL_SCORE).contains(&value) {
        Ok(value)
    } else {
        Err(EvaluationError::Validation(format!(
            "{field} must be between 0 and {MAX_MANUAL_SCORE}, got {value}"
        )))
    }
}

/// The persisted, validated manual part of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ManualScores {
    pub kuantitas: f64,
    pub kualitas: f64,
    pub laporan: bool,
    pub status: EvaluationStatus,
}

impl ManualScores {
    pub fn laporan_bonus(&self) -> f64 {
        if self.laporan { LAPORAN_BONUS } else { 0.0 }
    }
}

/// A Final evaluation only accepts writes that keep it Final.
pub fn ensure_editable(current: EvaluationStatus, requested: EvaluationStatus) -> Result<()> {
    if current == EvaluationStatus::Final && requested != EvaluationStatus::Final {
        return Err(EvaluationError::Conflict(
            "Evaluation is already Final; reset it to Draft before editing".to_string(),
        ));
    }
    Ok(())
}

/// Stored evaluation. `absen` and `hasil` are deliberately absent: they are
/// recomputed from attendance on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: u64,
    #[serde(rename = "user")]
    pub owner: Owner,
    #[serde(flatten)]
    pub period: Period,
    #[serde(flatten)]
    pub scores: ManualScores,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Evaluation {
    pub fn key(&self) -> EvaluationKey {
        EvaluationKey {
            user_id: self.owner.id(),
            period: self.period,
        }
    }

    pub fn is_final(&self) -> bool {
        self.scores.status == EvaluationStatus::Final
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct EvaluationRow {
    pub id: u64,
    pub user_id: u64,
    pub bulan: u8,
    pub tahun: u16,
    pub kuantitas: f64,
    pub kualitas: f64,
    pub laporan: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn parse_status(raw: &str) -> Result<EvaluationStatus> {
    raw.parse::<EvaluationStatus>()
        .map_err(|_| EvaluationError::Internal(format!("unknown evaluation status '{raw}'")))
}

impl TryFrom<EvaluationRow> for Evaluation {
    type Error = EvaluationError;

    fn try_from(row: EvaluationRow) -> Result<Self> {
        let period = Period::new(u32::from(row.bulan), i32::from(row.tahun)).map_err(|e| {
            EvaluationError::Internal(format!("evaluation {} has an invalid period: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            owner: Owner::Unresolved { id: row.user_id },
            period,
            scores: ManualScores {
                kuantitas: row.kuantitas,
                kualitas: row.kualitas,
                laporan: row.laporan,
                status: parse_status(&row.status)?,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_take_defaults() {
        let scores = ScoreInput::default().validate().unwrap();
        assert_eq!(
            scores,
            ManualScores {
                kuantitas: 0.0,
                kualitas: 0.0,
                laporan: false,
                status: EvaluationStatus::Draft,
            }
        );
    }

    #[test]
    fn manual_scores_are_bounded() {
        for bad in [-0.5, 30.01, f64::NAN, f64::INFINITY] {
            let input = ScoreInput {
                kualitas: Some(bad),
                ..Default::default()
            };
            assert!(matches!(input.validate(), Err(EvaluationError::Validation(_))));
        }

        let edge = ScoreInput {
            kuantitas: Some(30.0),
            kualitas: Some(0.0),
            ..Default::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn final_accepts_only_final_writes() {
        use EvaluationStatus::{Draft, Final};

        assert!(ensure_editable(Draft, Draft).is_ok());
        assert!(ensure_editable(Draft, Final).is_ok());
        assert!(ensure_editable(Final, Final).is_ok());
        assert!(matches!(
            ensure_editable(Final, Draft),
            Err(EvaluationError::Conflict(_))
        ));
    }

    #[test]
    fn status_round_trips_through_text_column() {
        assert_eq!(parse_status("Final").unwrap(), EvaluationStatus::Final);
        assert_eq!(EvaluationStatus::Draft.to_string(), "Draft");
        assert!(parse_status("final").is_err());
    }
}
