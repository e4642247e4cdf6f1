use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::MySqlPool;
use tracing::debug;

use crate::error::{EvaluationError, Result};
use crate::model::attendance::{AttendanceRecord, AttendanceRow};
use crate::model::evaluation::{
    Evaluation, EvaluationKey, EvaluationRow, EvaluationStatus, ManualScores, ensure_editable,
    parse_status,
};
use crate::model::holiday::Holiday;
use crate::model::period::Period;
use crate::model::user::{UserId, UserSummary};
use crate::repo::{AttendanceSource, EvaluationRepository, HolidaySource, IdentityDirectory};

const EVALUATION_COLUMNS: &str = r#"
    id, user_id, bulan, tahun, kuantitas, kualitas, laporan, status, created_at, updated_at
"#;

// `status` is assigned last: the guards before it must read the stored value.
const UPSERT_EVALUATION_SQL: &str = r#"
    INSERT INTO evaluations (user_id, bulan, tahun, kuantitas, kualitas, laporan, status)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON DUPLICATE KEY UPDATE
        kuantitas = IF(status = 'Final' AND VALUES(status) <> 'Final', kuantitas, VALUES(kuantitas)),
        kualitas = IF(status = 'Final' AND VALUES(status) <> 'Final', kualitas, VALUES(kualitas)),
        laporan = IF(status = 'Final' AND VALUES(status) <> 'Final', laporan, VALUES(laporan)),
        status = IF(status = 'Final' AND VALUES(status) <> 'Final', status, VALUES(status))
"#;

/// Production store over the dashboard's MySQL schema (`sql/schema.sql`).
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Prefixes storage failures with what was being done. Logging happens once,
/// when the error is rendered.
fn storage_error(context: &'static str) -> impl Fn(sqlx::Error) -> EvaluationError {
    move |e| match EvaluationError::from(e) {
        EvaluationError::Internal(details) => {
            EvaluationError::Internal(format!("{context}: {details}"))
        }
        other => other,
    }
}

fn not_found(id: u64) -> EvaluationError {
    EvaluationError::NotFound(format!("Evaluation {id} not found"))
}

#[async_trait]
impl AttendanceSource for MySqlStore {
    async fn records_between(
        &self,
        user_id: UserId,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT user_id, `date`, status
            FROM attendance
            WHERE user_id = ?
            AND `date` >= ?
            AND `date` < ?
            ORDER BY `date`
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("Failed to fetch attendance"))?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }
}

#[async_trait]
impl HolidaySource for MySqlStore {
    async fn holidays_between(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<HashSet<NaiveDate>> {
        let holidays = sqlx::query_as::<_, Holiday>(
            r#"
            SELECT `date`, name
            FROM holidays
            WHERE `date` >= ?
            AND `date` < ?
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("Failed to fetch holidays"))?;

        debug!(count = holidays.len(), %from, %until, "Loaded holidays");
        Ok(holidays.into_iter().map(|h| h.date).collect())
    }
}

#[async_trait]
impl IdentityDirectory for MySqlStore {
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserSummary>> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, email, instansi
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("Failed to fetch user"))
    }

    async fn find_users(&self, ids: &[UserId]) -> Result<HashMap<UserId, UserSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, name, email, instansi FROM users WHERE id IN ({})",
            placeholders
        );

        let mut query = sqlx::query_as::<_, UserSummary>(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        let users = query
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("Failed to fetch users"))?;

        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }
}

impl MySqlStore {
    async fn status_of(&self, id: u64) -> Result<Option<EvaluationStatus>> {
        let status = sqlx::query_scalar::<_, String>("SELECT status FROM evaluations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to fetch evaluation status"))?;

        status.as_deref().map(parse_status).transpose()
    }
}

#[async_trait]
impl EvaluationRepository for MySqlStore {
    async fn upsert(&self, key: EvaluationKey, scores: ManualScores) -> Result<Evaluation> {
        let bulan = key.period.bulan();
        let tahun = key.period.tahun();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_error("Failed to begin upsert transaction"))?;

        // Concurrent first writes of a key serialize on the unique index and
        // the later one becomes an update. A Final row keeps its values
        // unless the write is Final too.
        sqlx::query(UPSERT_EVALUATION_SQL)
            .bind(key.user_id)
            .bind(bulan)
            .bind(tahun)
            .bind(scores.kuantitas)
            .bind(scores.kualitas)
            .bind(scores.laporan)
            .bind(scores.status.to_string())
            .execute(&mut *tx)
            .await
            .map_err(storage_error("Failed to upsert evaluation"))?;

        let sql = format!(
            "SELECT {} FROM evaluations WHERE user_id = ? AND bulan = ? AND tahun = ?",
            EVALUATION_COLUMNS
        );
        let row = sqlx::query_as::<_, EvaluationRow>(&sql)
            .bind(key.user_id)
            .bind(bulan)
            .bind(tahun)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage_error("Failed to reload evaluation"))?;

        tx.commit()
            .await
            .map_err(storage_error("Failed to commit evaluation"))?;

        let stored = Evaluation::try_from(row)?;
        ensure_editable(stored.scores.status, scores.status)?;
        Ok(stored)
    }

    async fn find(&self, id: u64) -> Result<Option<Evaluation>> {
        let sql = format!("SELECT {} FROM evaluations WHERE id = ?", EVALUATION_COLUMNS);
        let row = sqlx::query_as::<_, EvaluationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to fetch evaluation"))?;

        row.map(Evaluation::try_from).transpose()
    }

    async fn list(
        &self,
        period: Period,
        status: Option<EvaluationStatus>,
    ) -> Result<Vec<Evaluation>> {
        let mut where_sql = String::from(" WHERE bulan = ? AND tahun = ?");
        if status.is_some() {
            where_sql.push_str(" AND status = ?");
        }
        let sql = format!(
            "SELECT {} FROM evaluations{} ORDER BY id",
            EVALUATION_COLUMNS, where_sql
        );

        let mut query = sqlx::query_as::<_, EvaluationRow>(&sql)
            .bind(period.bulan())
            .bind(period.tahun());
        if let Some(status) = status {
            query = query.bind(status.to_string());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("Failed to list evaluations"))?;

        rows.into_iter().map(Evaluation::try_from).collect()
    }

    async fn reset_to_draft(&self, id: u64) -> Result<Evaluation> {
        let result = sqlx::query(
            r#"
            UPDATE evaluations
            SET status = 'Draft'
            WHERE id = ?
            AND status = 'Final'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to reset evaluation"))?;

        if result.rows_affected() == 0 {
            return match self.status_of(id).await? {
                None => Err(not_found(id)),
                Some(_) => Err(EvaluationError::InvalidState(format!(
                    "Evaluation {id} is not Final"
                ))),
            };
        }

        self.find(id).await?.ok_or_else(|| not_found(id))
    }

    async fn delete_draft(&self, id: u64) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM evaluations
            WHERE id = ?
            AND status = 'Draft'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to delete evaluation"))?;

        if result.rows_affected() == 0 {
            return match self.status_of(id).await? {
                None => Err(not_found(id)),
                Some(_) => Err(EvaluationError::InvalidState(format!(
                    "Evaluation {id} is Final; reset it to Draft before deleting"
                ))),
            };
        }

        Ok(())
    }

    async fn delete_final(&self, period: Period) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM evaluations
            WHERE bulan = ?
            AND tahun = ?
            AND status = 'Final'
            "#,
        )
        .bind(period.bulan())
        .bind(period.tahun())
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to purge final evaluations"))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_carry_their_context() {
        let err = storage_error("Failed to fetch holidays")(sqlx::Error::RowNotFound);

        match err {
            EvaluationError::Internal(details) => {
                assert!(details.starts_with("Failed to fetch holidays: "));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn upsert_is_a_single_guarded_statement() {
        let sql = UPSERT_EVALUATION_SQL;

        assert!(sql.contains("ON DUPLICATE KEY UPDATE"));
        assert!(!sql.contains("FOR UPDATE"));
        assert_eq!(sql.matches("IF(status = 'Final' AND VALUES(status) <> 'Final'").count(), 4);

        // Guards read the stored status, so it must be assigned last.
        let status_assignment = sql.find("status = IF(").unwrap();
        for column in ["kuantitas = IF(", "kualitas = IF(", "laporan = IF("] {
            assert!(sql.find(column).unwrap() < status_assignment, "{column}");
        }
    }
}
