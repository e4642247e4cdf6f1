//! Performance evaluation engine.
//!
//! `WorkingCalendar` feeds `AttendanceScorer`; `EvaluationStore` owns the
//! manual fields. The two meet only in `RankingAggregator`, on every read.

pub mod calendar;
pub mod ranking;
pub mod scorer;
pub mod store;

use std::sync::Arc;

use tracing::instrument;

use crate::error::{EvaluationError, Result};
use crate::model::evaluation::{Evaluation, EvaluationKey, ScoreInput};
use crate::model::period::Period;
use crate::model::user::UserId;
use crate::repo::{AttendanceSource, EvaluationRepository, HolidaySource, IdentityDirectory};

use calendar::WorkingCalendar;
use ranking::{RankingAggregator, ScoredEvaluation};
use scorer::{AttendanceScore, AttendanceScorer};
use store::EvaluationStore;

/// Entry point used by the HTTP handlers.
#[derive(Clone)]
pub struct EvaluationEngine {
    scorer: AttendanceScorer,
    store: EvaluationStore,
    ranking: RankingAggregator,
    identities: Arc<dyn IdentityDirectory>,
}

impl EvaluationEngine {
    pub fn new(
        attendance: Arc<dyn AttendanceSource>,
        holidays: Arc<dyn HolidaySource>,
        evaluations: Arc<dyn EvaluationRepository>,
        identities: Arc<dyn IdentityDirectory>,
    ) -> Self {
        let scorer = AttendanceScorer::new(WorkingCalendar::new(holidays), attendance);

        Self {
            ranking: RankingAggregator::new(scorer.clone()),
            store: EvaluationStore::new(evaluations, identities.clone()),
            scorer,
            identities,
        }
    }

    /// Builds the engine over one backend serving every collaborator.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: AttendanceSource + HolidaySource + EvaluationRepository + IdentityDirectory + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store)
    }

    #[instrument(skip(self, period), fields(bulan = period.bulan(), tahun = period.tahun()))]
    pub async fn calculate(&self, user_id: UserId, period: Period) -> Result<AttendanceScore> {
        let (user, score) = futures::try_join!(
            self.identities.find_user(user_id),
            self.scorer.score(user_id, period)
        )?;

        if user.is_none() {
            return Err(EvaluationError::NotFound(format!("User {user_id} not found")));
        }
        Ok(score)
    }

    pub async fn upsert(&self, key: EvaluationKey, input: ScoreInput) -> Result<ScoredEvaluation> {
        let evaluation = self.store.upsert(key, input).await?;
        self.ranking.assemble_one(evaluation).await
    }

    pub async fn list(&self, period: Period) -> Result<Vec<ScoredEvaluation>> {
        let records = self.store.list_by_month(period).await?;
        self.ranking.assemble(records).await
    }

    pub async fn ranking(&self, period: Period) -> Result<Vec<ScoredEvaluation>> {
        let records = self.store.list_final_by_month(period).await?;
        self.ranking.assemble(records).await
    }

    pub async fn reset_to_draft(&self, id: u64) -> Result<Evaluation> {
        self.store.reset_to_draft(id).await
    }

    pub async fn delete_draft(&self, id: u64) -> Result<()> {
        self.store.delete(id).await
    }

    pub async fn purge_finals(&self, period: Period) -> Result<u64> {
        self.store.delete_all_final(period).await
    }
}
