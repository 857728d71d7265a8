use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::ActivitiesRow;

const SQL_LOAD_ACTIVITY_BY_ID: &str = r#"
SELECT
  a.activity_id,
  a.host_id,
  a.host_name,
  a.title,
  a.description,
  a.location,
  a.scheduled_at,
  a.max_participants,
  (
    SELECT COUNT(*)
    FROM applications ap
    WHERE ap.activity_id = a.activity_id
      AND ap.status = 'accepted'
  ) AS current_participants_count,
  a.status,
  a.tags,
  a.roles,
  a.images,
  a.cancel_reason
FROM activities a
WHERE a.activity_id = ?
LIMIT 1
"#;

pub async fn load_activity_by_id(
    pool: &SqlitePool,
    activity_id: i64,
) -> sqlx::Result<Option<ActivitiesRow>> {
    sqlx::query_as::<_, ActivitiesRow>(SQL_LOAD_ACTIVITY_BY_ID)
        .bind(activity_id)
        .fetch_optional(pool)
        .await
}

const SQL_INSERT_ACTIVITY: &str = r#"
INSERT INTO activities (
  host_id,
  host_name,
  title,
  description,
  location,
  scheduled_at,
  max_participants,
  status,
  tags,
  roles,
  images
) VALUES (?, ?, ?, ?, ?, ?, ?, 'open', ?, ?, ?)
"#;

pub struct NewActivity<'a> {
    pub host_id: i64,
    pub host_name: Option<&'a str>,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub max_participants: i64,
    pub tags: &'a [String],
    pub roles: &'a [String],
    pub images: &'a [String],
}

pub async fn insert_activity(pool: &SqlitePool, new: NewActivity<'_>) -> sqlx::Result<i64> {
    let tags = serde_json::to_string(new.tags).unwrap_or_else(|_| "[]".to_string());
    let roles = serde_json::to_string(new.roles).unwrap_or_else(|_| "[]".to_string());
    let images = serde_json::to_string(new.images).unwrap_or_else(|_| "[]".to_string());
    let res = sqlx::query(SQL_INSERT_ACTIVITY)
        .bind(new.host_id)
        .bind(new.host_name)
        .bind(new.title)
        .bind(new.description)
        .bind(new.location)
        .bind(new.scheduled_at)
        .bind(new.max_participants)
        .bind(tags)
        .bind(roles)
        .bind(images)
        .execute(pool)
        .await?;
    Ok(res.last_insert_rowid())
}

const SQL_UPDATE_OPEN_ACTIVITY: &str = r#"
UPDATE activities
SET
  title = COALESCE(?, title),
  description = COALESCE(?, description),
  location = COALESCE(?, location),
  scheduled_at = COALESCE(?, scheduled_at),
  max_participants = COALESCE(?, max_participants),
  tags = COALESCE(?, tags),
  roles = COALESCE(?, roles),
  images = COALESCE(?, images)
WHERE activity_id = ?
  AND status = 'open'
  AND (
    ? IS NULL
    OR ? <= 0
    OR ? >= (
      SELECT COUNT(*)
      FROM applications ap
      WHERE ap.activity_id = activities.activity_id
        AND ap.status = 'accepted'
    )
  )
"#;

#[derive(Default)]
pub struct ActivityChanges<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub max_participants: Option<i64>,
    pub tags: Option<&'a [String]>,
    pub roles: Option<&'a [String]>,
    pub images: Option<&'a [String]>,
}

/// Zero rows means the activity is not open any more, or the new maximum
/// would fall below the accepted count at the time of the write.
pub async fn update_open_activity(
    pool: &SqlitePool,
    activity_id: i64,
    changes: ActivityChanges<'_>,
) -> sqlx::Result<u64> {
    let as_json = |items: Option<&[String]>| {
        items.map(|v| serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string()))
    };
    let res = sqlx::query(SQL_UPDATE_OPEN_ACTIVITY)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.location)
        .bind(changes.scheduled_at)
        .bind(changes.max_participants)
        .bind(as_json(changes.tags))
        .bind(as_json(changes.roles))
        .bind(as_json(changes.images))
        .bind(activity_id)
        .bind(changes.max_participants)
        .bind(changes.max_participants)
        .bind(changes.max_participants)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_CANCEL_OPEN_ACTIVITY: &str = r#"
UPDATE activities
SET status = 'cancelled', cancel_reason = ?
WHERE activity_id = ?
  AND status = 'open'
"#;

/// Returns the number of rows changed; zero means the activity was no longer open.
pub async fn cancel_open_activity(
    pool: &SqlitePool,
    activity_id: i64,
    reason: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_CANCEL_OPEN_ACTIVITY)
        .bind(reason)
        .bind(activity_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_MARK_ENDED: &str = r#"
UPDATE activities
SET status = 'ended'
WHERE activity_id = ?
  AND status = 'open'
"#;

pub async fn mark_ended(pool: &SqlitePool, activity_id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_MARK_ENDED)
        .bind(activity_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_END_ELAPSED_ACTIVITIES: &str = r#"
UPDATE activities
SET status = 'ended'
WHERE status = 'open'
  AND scheduled_at IS NOT NULL
  AND datetime(scheduled_at) <= datetime(?)
"#;

pub async fn end_elapsed_activities(pool: &SqlitePool, now: DateTime<Utc>) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_END_ELAPSED_ACTIVITIES)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
