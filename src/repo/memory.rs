//! In-process store backing every collaborator trait. Used by the test
//! suites; each trait operation runs under a single lock so the per-key
//! atomicity guarantees match the MySQL store.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::error::{EvaluationError, Result};
use crate::model::attendance::AttendanceRecord;
use crate::model::evaluation::{
    Evaluation, EvaluationKey, EvaluationStatus, ManualScores, ensure_editable,
};
use crate::model::period::Period;
use crate::model::user::{Owner, UserId, UserSummary};
use crate::repo::{AttendanceSource, EvaluationRepository, HolidaySource, IdentityDirectory};

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, UserSummary>,
    // Duplicate (user, day) rows are accepted on purpose so the scorer's
    // behaviour on a broken upstream invariant stays testable.
    attendance: Vec<AttendanceRecord>,
    holidays: BTreeSet<NaiveDate>,
    evaluations: BTreeMap<u64, Evaluation>,
    keys: HashMap<EvaluationKey, u64>,
    next_id: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: UserSummary) {
        self.seed().users.insert(user.id, user);
    }

    pub fn add_attendance(&self, record: AttendanceRecord) {
        self.seed().attendance.push(record);
    }

    pub fn add_holiday(&self, date: NaiveDate) {
        self.seed().holidays.insert(date);
    }

    /// Number of stored evaluations, regardless of status.
    pub fn evaluation_count(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .evaluations
            .len()
    }

    fn seed(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| EvaluationError::Internal("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| EvaluationError::Internal("memory store lock poisoned".to_string()))
    }
}

fn not_found(id: u64) -> EvaluationError {
    EvaluationError::NotFound(format!("Evaluation {id} not found"))
}

#[async_trait]
impl AttendanceSource for MemoryStore {
    async fn records_between(
        &self,
        user_id: UserId,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        let inner = self.read()?;
        Ok(inner
            .attendance
            .iter()
            .filter(|r| r.user_id == user_id && from <= r.day() && r.day() < until)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HolidaySource for MemoryStore {
    async fn holidays_between(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<HashSet<NaiveDate>> {
        let inner = self.read()?;
        Ok(inner.holidays.range(from..until).copied().collect())
    }
}

#[async_trait]
impl IdentityDirectory for MemoryStore {
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserSummary>> {
        Ok(self.read()?.users.get(&user_id).cloned())
    }

    async fn find_users(&self, ids: &[UserId]) -> Result<HashMap<UserId, UserSummary>> {
        let inner = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.users.get(id).map(|u| (*id, u.clone())))
            .collect())
    }
}

#[async_trait]
impl EvaluationRepository for MemoryStore {
    async fn upsert(&self, key: EvaluationKey, scores: ManualScores) -> Result<Evaluation> {
        let mut inner = self.write()?;
        let now = Utc::now();

        if let Some(id) = inner.keys.get(&key).copied() {
            let existing = inner
                .evaluations
                .get_mut(&id)
                .ok_or_else(|| EvaluationError::Internal(format!("dangling key for evaluation {id}")))?;
            ensure_editable(existing.scores.status, scores.status)?;

            if existing.scores != scores {
                existing.scores = scores;
                existing.updated_at = now;
            }
            return Ok(existing.clone());
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let evaluation = Evaluation {
            id,
            owner: Owner::Unresolved { id: key.user_id },
            period: key.period,
            scores,
            created_at: now,
            updated_at: now,
        };
        inner.keys.insert(key, id);
        inner.evaluations.insert(id, evaluation.clone());

        Ok(evaluation)
    }

    async fn find(&self, id: u64) -> Result<Option<Evaluation>> {
        Ok(self.read()?.evaluations.get(&id).cloned())
    }

    async fn list(
        &self,
        period: Period,
        status: Option<EvaluationStatus>,
    ) -> Result<Vec<Evaluation>> {
        let inner = self.read()?;
        Ok(inner
            .evaluations
            .values()
            .filter(|e| e.period == period)
            .filter(|e| status.is_none_or(|s| e.scores.status == s))
            .cloned()
            .collect())
    }

    async fn reset_to_draft(&self, id: u64) -> Result<Evaluation> {
        let mut inner = self.write()?;
        let evaluation = inner.evaluations.get_mut(&id).ok_or_else(|| not_found(id))?;

        if !evaluation.is_final() {
            return Err(EvaluationError::InvalidState(format!(
                "Evaluation {id} is not Final"
            )));
        }
        evaluation.scores.status = EvaluationStatus::Draft;
        evaluation.updated_at = Utc::now();

        Ok(evaluation.clone())
    }

    async fn delete_draft(&self, id: u64) -> Result<()> {
        let mut inner = self.write()?;
        let evaluation = inner.evaluations.get(&id).ok_or_else(|| not_found(id))?;

        if evaluation.is_final() {
            return Err(EvaluationError::InvalidState(format!(
                "Evaluation {id} is Final; reset it to Draft before deleting"
            )));
        }
        let key = evaluation.key();
        inner.evaluations.remove(&id);
        inner.keys.remove(&key);

        Ok(())
    }

    async fn delete_final(&self, period: Period) -> Result<u64> {
        let mut inner = self.write()?;
        let doomed: Vec<(u64, EvaluationKey)> = inner
            .evaluations
            .values()
            .filter(|e| e.period == period && e.is_final())
            .map(|e| (e.id, e.key()))
            .collect();

        for (id, key) in &doomed {
            inner.evaluations.remove(id);
            inner.keys.remove(key);
        }

        Ok(doomed.len() as u64)
    }
}
