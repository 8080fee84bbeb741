//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// A cohort of students progressing through a course on a shared schedule,
/// anchored by a start date. The current week is derived from the start
/// date, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub guid: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub active: bool,
}

/// A student enrolled in a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub user_id: Uuid,
    pub username: String,
}

/// One unlock record: week `week` of batch `batch_id` made visible to
/// student `user_id`. Unique per (batch, week, student).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUnlock {
    pub batch_id: Uuid,
    pub week: u32,
    pub user_id: Uuid,
    pub unlocked_at: DateTime<Utc>,
}
