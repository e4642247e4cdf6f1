//! Storage seams of the evaluation engine.
//!
//! Attendance, holidays and identities are owned by other parts of the
//! dashboard and only read here. Evaluations are owned by this service and
//! every mutation on them is atomic per key.

pub mod memory;
pub mod mysql;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::model::attendance::AttendanceRecord;
use crate::model::evaluation::{Evaluation, EvaluationKey, EvaluationStatus, ManualScores};
use crate::model::period::Period;
use crate::model::user::{UserId, UserSummary};

#[async_trait]
pub trait AttendanceSource: Send + Sync {
    /// Records of one user dated in `[from, until)`.
    async fn records_between(
        &self,
        user_id: UserId,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>>;
}

#[async_trait]
pub trait HolidaySource: Send + Sync {
    /// Configured holidays dated in `[from, until)`.
    async fn holidays_between(&self, from: NaiveDate, until: NaiveDate)
    -> Result<HashSet<NaiveDate>>;
}

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserSummary>>;

    /// Unknown ids are simply missing from the returned map.
    async fn find_users(&self, ids: &[UserId]) -> Result<HashMap<UserId, UserSummary>>;
}

#[async_trait]
pub trait EvaluationRepository: Send + Sync {
    /// Creates or replaces the manual fields for `key` in one atomic step.
    /// Fails with `Conflict` when the stored record is Final and `scores`
    /// would move it back to Draft.
    async fn upsert(&self, key: EvaluationKey, scores: ManualScores) -> Result<Evaluation>;

    async fn find(&self, id: u64) -> Result<Option<Evaluation>>;

    /// Evaluations of one month ordered by id, optionally narrowed to a status.
    async fn list(&self, period: Period, status: Option<EvaluationStatus>)
    -> Result<Vec<Evaluation>>;

    /// Final -> Draft. `NotFound` for unknown ids, `InvalidState` otherwise.
    async fn reset_to_draft(&self, id: u64) -> Result<Evaluation>;

    /// Removes a Draft. `NotFound` for unknown ids, `InvalidState` for Finals.
    async fn delete_draft(&self, id: u64) -> Result<()>;

    /// Removes every Final evaluation of the month, returning how many.
    async fn delete_final(&self, period: Period) -> Result<u64>;
}
