use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;
use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, error};

use crate::engine::scorer::{AttendanceScore, AttendanceScorer, round2};
use crate::error::Result;
use crate::model::evaluation::{Evaluation, ManualScores};
use crate::model::period::Period;

pub const MAX_HASIL: f64 = 100.0;

/// `absen + kuantitas + kualitas + laporan bonus`, rounded to two decimals.
pub fn composite(absen: f64, scores: &ManualScores) -> f64 {
    round2(absen + scores.kuantitas + scores.kualitas + scores.laporan_bonus())
}

/// An evaluation with its read-time fields attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEvaluation {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    pub absen: f64,
    pub hasil: f64,
}

impl ScoredEvaluation {
    /// The only place `absen` and `hasil` are attached to a record.
    pub fn project(evaluation: Evaluation, attendance: &AttendanceScore) -> Self {
        let absen = attendance.absen;
        let hasil = composite(absen, &evaluation.scores);

        debug_assert!(
            (0.0..=MAX_HASIL).contains(&hasil),
            "hasil {hasil} out of range for evaluation {}",
            evaluation.id
        );
        if !(0.0..=MAX_HASIL).contains(&hasil) {
            error!(id = evaluation.id, hasil, "Composite score out of range");
        }

        Self {
            evaluation,
            absen,
            hasil,
        }
    }
}

/// `hasil` descending, then owner name ascending (unresolved owners last),
/// then user id ascending.
pub fn rank_order(a: &ScoredEvaluation, b: &ScoredEvaluation) -> Ordering {
    b.hasil
        .total_cmp(&a.hasil)
        .then_with(|| match (a.evaluation.owner.name(), b.evaluation.owner.name()) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.evaluation.owner.id().cmp(&b.evaluation.owner.id()))
}

#[derive(Clone)]
pub struct RankingAggregator {
    scorer: AttendanceScorer,
}

impl RankingAggregator {
    pub fn new(scorer: AttendanceScorer) -> Self {
        Self { scorer }
    }

    /// Scores every record against fresh attendance and sorts by rank.
    ///
    /// Each month's calendar is loaded once; the per-record attendance
    /// queries run concurrently and are joined back by position.
    pub async fn assemble(&self, records: Vec<Evaluation>) -> Result<Vec<ScoredEvaluation>> {
        let mut periods: Vec<Period> = records.iter().map(|r| r.period).collect();
        periods.sort();
        periods.dedup();

        let calendars = try_join_all(
            periods
                .iter()
                .map(|period| self.scorer.calendar().working_days(*period)),
        )
        .await?;
        let calendars: HashMap<Period, Vec<NaiveDate>> =
            periods.into_iter().zip(calendars).collect();

        let scores = try_join_all(records.iter().map(|record| {
            let days = calendars
                .get(&record.period)
                .map(Vec::as_slice)
                .unwrap_or_default();
            self.scorer
                .score_against(record.owner.id(), record.period, days)
        }))
        .await?;

        let mut ranked: Vec<ScoredEvaluation> = records
            .into_iter()
            .zip(scores.iter())
            .map(|(record, score)| ScoredEvaluation::project(record, score))
            .collect();
        ranked.sort_by(rank_order);

        debug!(count = ranked.len(), "Evaluations assembled");
        Ok(ranked)
    }

    pub async fn assemble_one(&self, record: Evaluation) -> Result<ScoredEvaluation> {
        let score = self.scorer.score(record.owner.id(), record.period).await?;
        Ok(ScoredEvaluation::project(record, &score))
    }
}
