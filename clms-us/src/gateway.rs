//! Persistence gateway for the unlock scheduler
//!
//! The scheduler reads batches and rosters, and writes unlock records,
//! exclusively through the [`UnlockGateway`] trait. The production
//! implementation runs over the shared SQLite pool; tests substitute a
//! recording mock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use clms_common::db::models::{Batch, Enrollment};
use clms_common::{Error, Result};

/// Persistence operations the unlock scheduler depends on
#[async_trait]
pub trait UnlockGateway: Send + Sync {
    /// All batches currently flagged active
    async fn active_batches(&self) -> Result<Vec<Batch>>;

    /// Every student enrolled in the given batch
    async fn batch_roster(&self, batch_id: Uuid) -> Result<Vec<Enrollment>>;

    /// Mark `week` of `batch_id` unlocked for the given roster.
    ///
    /// Idempotent upsert keyed by (batch, week, student): students already
    /// holding an unlock record for this week are left untouched. Returns
    /// the number of newly written unlock records (0 when a previous run
    /// already unlocked this week for the whole roster).
    async fn mark_week_unlocked(
        &self,
        batch_id: Uuid,
        week: u32,
        roster: &[Enrollment],
    ) -> Result<u64>;
}

/// Delegation impl so shared handles satisfy the gateway trait
#[async_trait]
impl<G: UnlockGateway> UnlockGateway for std::sync::Arc<G> {
    async fn active_batches(&self) -> Result<Vec<Batch>> {
        self.as_ref().active_batches().await
    }

    async fn batch_roster(&self, batch_id: Uuid) -> Result<Vec<Enrollment>> {
        self.as_ref().batch_roster(batch_id).await
    }

    async fn mark_week_unlocked(
        &self,
        batch_id: Uuid,
        week: u32,
        roster: &[Enrollment],
    ) -> Result<u64> {
        self.as_ref().mark_week_unlocked(batch_id, week, roster).await
    }
}

/// SQLite-backed gateway over the shared database
pub struct SqliteUnlockGateway {
    db: SqlitePool,
}

impl SqliteUnlockGateway {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Parse a guid column stored as TEXT
fn parse_guid(raw: &str, context: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Internal(format!("Invalid {} guid '{}': {}", context, raw, e)))
}

/// Parse a start_date column stored as RFC3339 TEXT
fn parse_start_date(raw: &str, batch: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid start_date '{}' for batch {}: {}", raw, batch, e)))
}

#[async_trait]
impl UnlockGateway for SqliteUnlockGateway {
    async fn active_batches(&self) -> Result<Vec<Batch>> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            "SELECT guid, name, start_date FROM batches WHERE active = 1 ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        let mut batches = Vec::with_capacity(rows.len());
        for (guid, name, start_date) in rows {
            batches.push(Batch {
                guid: parse_guid(&guid, "batch")?,
                start_date: parse_start_date(&start_date, &name)?,
                name,
                active: true,
            });
        }

        Ok(batches)
    }

    async fn batch_roster(&self, batch_id: Uuid) -> Result<Vec<Enrollment>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT u.guid, u.username
            FROM users u
            JOIN batch_users bu ON bu.user_id = u.guid
            WHERE bu.batch_id = ?
            ORDER BY u.username
            "#,
        )
        .bind(batch_id.to_string())
        .fetch_all(&self.db)
        .await?;

        let mut roster = Vec::with_capacity(rows.len());
        for (guid, username) in rows {
            roster.push(Enrollment {
                user_id: parse_guid(&guid, "user")?,
                username,
            });
        }

        Ok(roster)
    }

    async fn mark_week_unlocked(
        &self,
        batch_id: Uuid,
        week: u32,
        roster: &[Enrollment],
    ) -> Result<u64> {
        let unlocked_at = clms_common::time::now().to_rfc3339();
        let mut written = 0u64;

        for student in roster {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO content_unlocks (batch_id, week, user_id, unlocked_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(batch_id.to_string())
            .bind(week as i64)
            .bind(student.user_id.to_string())
            .bind(&unlocked_at)
            .execute(&self.db)
            .await?;

            written += result.rows_affected();
        }

        Ok(written)
    }
}
