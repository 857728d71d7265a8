use sqlx::SqlitePool;

use crate::models::ApplicationsRow;

const SQL_LOAD_APPLICATION: &str = r#"
SELECT
  activity_id,
  user_id,
  status,
  message,
  applied_at
FROM applications
WHERE activity_id = ?
  AND user_id = ?
LIMIT 1
"#;

pub async fn load_application(
    pool: &SqlitePool,
    activity_id: i64,
    user_id: i64,
) -> sqlx::Result<Option<ApplicationsRow>> {
    sqlx::query_as::<_, ApplicationsRow>(SQL_LOAD_APPLICATION)
        .bind(activity_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

const SQL_INSERT_APPLICATION: &str = r#"
INSERT INTO applications (
  activity_id,
  user_id,
  status,
  message
) VALUES (?, ?, 'pending', ?)
"#;

pub async fn insert_pending_application(
    pool: &SqlitePool,
    activity_id: i64,
    user_id: i64,
    message: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_APPLICATION)
        .bind(activity_id)
        .bind(user_id)
        .bind(message)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_DELETE_PENDING_APPLICATION: &str = r#"
DELETE FROM applications
WHERE activity_id = ?
  AND user_id = ?
  AND status = 'pending'
"#;

pub async fn delete_pending_application(
    pool: &SqlitePool,
    activity_id: i64,
    user_id: i64,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_PENDING_APPLICATION)
        .bind(activity_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_DECIDE_PENDING_APPLICATION: &str = r#"
UPDATE applications
SET status = ?, updated_at = CURRENT_TIMESTAMP
WHERE activity_id = ?
  AND user_id = ?
  AND status = 'pending'
  AND EXISTS (
    SELECT 1
    FROM activities a
    WHERE a.activity_id = applications.activity_id
      AND a.status = 'open'
      AND (
        ? = 'rejected'
        OR a.max_participants <= 0
        OR (
          SELECT COUNT(*)
          FROM applications acc
          WHERE acc.activity_id = a.activity_id
            AND acc.status = 'accepted'
        ) < a.max_participants
      )
  )
"#;

/// Only a pending row of an open activity moves, and an accept only while a
/// seat is left. The capacity check runs inside the UPDATE so concurrent
/// accepts are serialized by SQLite's write lock. Zero rows affected means one
/// of those conditions failed.
pub async fn decide_pending_application(
    pool: &SqlitePool,
    activity_id: i64,
    user_id: i64,
    status: &str, // accepted|rejected
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DECIDE_PENDING_APPLICATION)
        .bind(status)
        .bind(activity_id)
        .bind(user_id)
        .bind(status)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_LIST_APPLICATIONS_FOR_ACTIVITY: &str = r#"
SELECT
  activity_id,
  user_id,
  status,
  message,
  applied_at
FROM applications
WHERE activity_id = ?
ORDER BY
  CASE status
    WHEN 'pending' THEN 0
    WHEN 'accepted' THEN 1
    ELSE 2
  END,
  datetime(applied_at) ASC,
  id ASC
"#;

pub async fn list_applications_for_activity(
    pool: &SqlitePool,
    activity_id: i64,
) -> sqlx::Result<Vec<ApplicationsRow>> {
    sqlx::query_as::<_, ApplicationsRow>(SQL_LIST_APPLICATIONS_FOR_ACTIVITY)
        .bind(activity_id)
        .fetch_all(pool)
        .await
}

const SQL_LIST_ACCEPTED_USER_IDS: &str = r#"
SELECT user_id
FROM applications
WHERE activity_id = ?
  AND status = 'accepted'
ORDER BY datetime(updated_at) ASC, id ASC
"#;

pub async fn list_accepted_user_ids(pool: &SqlitePool, activity_id: i64) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar::<_, i64>(SQL_LIST_ACCEPTED_USER_IDS)
        .bind(activity_id)
        .fetch_all(pool)
        .await
}

const SQL_LIST_APPLICATIONS_BY_USER: &str = r#"
SELECT
  activity_id,
  user_id,
  status,
  message,
  applied_at
FROM applications
WHERE user_id = ?
ORDER BY datetime(applied_at) DESC, id DESC
"#;

pub async fn list_applications_by_user(
    pool: &SqlitePool,
    user_id: i64,
) -> sqlx::Result<Vec<ApplicationsRow>> {
    sqlx::query_as::<_, ApplicationsRow>(SQL_LIST_APPLICATIONS_BY_USER)
        .bind(user_id)
        .fetch_all(pool)
        .await
}
