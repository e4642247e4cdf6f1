use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::{EvaluationError, Result};
use crate::model::evaluation::{Evaluation, EvaluationKey, EvaluationStatus, ScoreInput};
use crate::model::period::Period;
use crate::model::user::{Owner, UserId};
use crate::repo::{EvaluationRepository, IdentityDirectory};

/// Manual evaluation fields and their Draft/Final lifecycle.
#[derive(Clone)]
pub struct EvaluationStore {
    repo: Arc<dyn EvaluationRepository>,
    identities: Arc<dyn IdentityDirectory>,
}

impl EvaluationStore {
    pub fn new(repo: Arc<dyn EvaluationRepository>, identities: Arc<dyn IdentityDirectory>) -> Self {
        Self { repo, identities }
    }

    #[instrument(skip(self, key, input), fields(user_id = key.user_id, bulan = key.period.bulan(), tahun = key.period.tahun()))]
    pub async fn upsert(&self, key: EvaluationKey, input: ScoreInput) -> Result<Evaluation> {
        let scores = input.validate()?;

        let owner = self
            .identities
            .find_user(key.user_id)
            .await?
            .ok_or_else(|| EvaluationError::NotFound(format!("User {} not found", key.user_id)))?;

        let mut evaluation = self.repo.upsert(key, scores).await?;
        evaluation.owner = Owner::Resolved(owner);

        info!(id = evaluation.id, status = %evaluation.scores.status, "Evaluation saved");
        Ok(evaluation)
    }

    pub async fn list_by_month(&self, period: Period) -> Result<Vec<Evaluation>> {
        let records = self.repo.list(period, None).await?;
        self.resolve_owners(records).await
    }

    pub async fn list_final_by_month(&self, period: Period) -> Result<Vec<Evaluation>> {
        let records = self.repo.list(period, Some(EvaluationStatus::Final)).await?;
        self.resolve_owners(records).await
    }

    #[instrument(skip(self))]
    pub async fn reset_to_draft(&self, id: u64) -> Result<Evaluation> {
        let evaluation = self.repo.reset_to_draft(id).await?;
        info!("Evaluation reset to Draft");
        Ok(evaluation)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: u64) -> Result<()> {
        self.repo.delete_draft(id).await?;
        info!("Draft evaluation deleted");
        Ok(())
    }

    #[instrument(skip(self, period), fields(bulan = period.bulan(), tahun = period.tahun()))]
    pub async fn delete_all_final(&self, period: Period) -> Result<u64> {
        let deleted = self.repo.delete_final(period).await?;
        info!(deleted, "Final evaluations purged");
        Ok(deleted)
    }

    /// Joins the identity display fields onto each record in one lookup.
    async fn resolve_owners(&self, records: Vec<Evaluation>) -> Result<Vec<Evaluation>> {
        let ids: Vec<UserId> = records
            .iter()
            .map(|r| r.owner.id())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let directory = self.identities.find_users(&ids).await?;

        Ok(records
            .into_iter()
            .map(|mut record| {
                record.owner = record.owner.resolve(&directory);
                record
            })
            .collect())
    }
}
