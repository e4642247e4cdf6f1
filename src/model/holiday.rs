use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A configured non-working day. Authored outside this service.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}
