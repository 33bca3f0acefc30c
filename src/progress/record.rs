use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use utoipa::ToSchema;

/// What kind of item a progress row belongs to. Lessons and assessments are
/// leaves; paths and class instances are derived aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ItemType {
    Lesson,
    Assessment,
    Path,
    ClassInstance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Passed,
    Failed,
    Completed,
}

impl std::str::FromStr for ItemType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lesson" => Ok(ItemType::Lesson),
            "assessment" => Ok(ItemType::Assessment),
            "path" => Ok(ItemType::Path),
            "class_instance" => Ok(ItemType::ClassInstance),
            _ => Err(crate::error::Error::UnknownItemType(s.to_string())),
        }
    }
}

impl ProgressStatus {
    /// Ordering used by the monotonicity gate when percentages are equal.
    /// `failed` ranks with `in_progress`: a failed attempt is still activity.
    pub fn priority(self) -> u8 {
        match self {
            ProgressStatus::NotStarted => 0,
            ProgressStatus::InProgress | ProgressStatus::Failed => 1,
            ProgressStatus::Passed => 2,
            ProgressStatus::Completed => 3,
        }
    }
}

impl Default for ProgressStatus {
    fn default() -> Self {
        ProgressStatus::NotStarted
    }
}

/// One persisted progress row, keyed by (user, item type, item id).
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct ProgressRecord {
    pub user_id: String,
    pub item_type: ItemType,
    pub item_id: i64,
    pub status: ProgressStatus,
    pub progress_percentage: i64,
    pub last_position: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Inbound leaf update from a lesson viewer or quiz grader. All fields are
/// optional; missing ones are filled in from the current record before the
/// gate runs.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProgressUpdate {
    pub status: Option<ProgressStatus>,
    pub progress_percentage: Option<i64>,
    pub last_position: Option<String>,
}

pub async fn get_progress(
    database: &SqlitePool,
    user_id: &str,
    item_type: ItemType,
    item_id: i64,
) -> anyhow::Result<Option<ProgressRecord>> {
    let record = sqlx::query_as::<_, ProgressRecord>(
        "select user_id, item_type, item_id, status, progress_percentage, last_position, updated_at \
         from progress where user_id = ? and item_type = ? and item_id = ?",
    )
    .bind(user_id)
    .bind(item_type)
    .bind(item_id)
    .fetch_optional(database)
    .await?;
    Ok(record)
}

pub async fn list_user_progress(
    database: &SqlitePool,
    user_id: &str,
) -> anyhow::Result<Vec<ProgressRecord>> {
    let records = sqlx::query_as::<_, ProgressRecord>(
        "select user_id, item_type, item_id, status, progress_percentage, last_position, updated_at \
         from progress where user_id = ? order by item_type, item_id",
    )
    .bind(user_id)
    .fetch_all(database)
    .await?;
    Ok(records)
}

/// Idempotent upsert by key. An omitted `last_position` keeps whatever resume
/// marker is already stored, so status-only updates don't lose it.
pub async fn upsert_progress(database: &SqlitePool, record: &ProgressRecord) -> anyhow::Result<()> {
    sqlx::query(
        "insert into progress (user_id, item_type, item_id, status, progress_percentage, last_position, updated_at) \
         values (?, ?, ?, ?, ?, ?, ?) \
         on conflict (user_id, item_type, item_id) do update set \
            status = excluded.status, \
            progress_percentage = excluded.progress_percentage, \
            last_position = coalesce(excluded.last_position, progress.last_position), \
            updated_at = excluded.updated_at",
    )
    .bind(&record.user_id)
    .bind(record.item_type)
    .bind(record.item_id)
    .bind(record.status)
    .bind(record.progress_percentage)
    .bind(&record.last_position)
    .bind(record.updated_at)
    .execute(database)
    .await?;
    Ok(())
}
