use sqlx::SqlitePool;

use crate::models::NotificationsRow;

const SQL_INSERT_NOTIFICATION: &str = r#"
INSERT INTO notifications (
  user_id,
  actor_id,
  kind,
  reference_id,
  content
) VALUES (?, ?, ?, ?, ?)
"#;

pub struct NewNotification<'a> {
    pub user_id: i64,
    pub actor_id: i64,
    pub kind: &'a str, // join_request|accepted|rejected|activity_cancelled
    pub reference_id: &'a str,
    pub content: &'a str,
}

pub async fn insert_notification(
    pool: &SqlitePool,
    notification: NewNotification<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_NOTIFICATION)
        .bind(notification.user_id)
        .bind(notification.actor_id)
        .bind(notification.kind)
        .bind(notification.reference_id)
        .bind(notification.content)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_LIST_FOR_USER: &str = r#"
SELECT
  id,
  user_id,
  actor_id,
  kind,
  reference_id,
  content,
  created_at
FROM notifications
WHERE user_id = ?
ORDER BY id DESC
"#;

pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> sqlx::Result<Vec<NotificationsRow>> {
    sqlx::query_as::<_, NotificationsRow>(SQL_LIST_FOR_USER)
        .bind(user_id)
        .fetch_all(pool)
        .await
}
