use chrono::{DateTime, Utc};

// Written by the local store only; delivery is somebody else's job.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationsRow {
    pub id: i64,
    pub user_id: i64,
    pub actor_id: i64,
    pub kind: String,
    pub reference_id: String,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}
