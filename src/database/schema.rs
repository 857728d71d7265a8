use sqlx::SqlitePool;

// Unique indexes carry the exactly-once guarantees for applications and ratings.
const SQL_SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS activities (
  activity_id INTEGER PRIMARY KEY AUTOINCREMENT,
  host_id INTEGER NOT NULL,
  host_name TEXT,
  title TEXT NOT NULL,
  description TEXT,
  location TEXT,
  scheduled_at TEXT,
  max_participants INTEGER NOT NULL DEFAULT 0,
  status TEXT NOT NULL DEFAULT 'open',
  tags TEXT,
  roles TEXT,
  images TEXT,
  cancel_reason TEXT,
  created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS applications (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  activity_id INTEGER NOT NULL REFERENCES activities(activity_id),
  user_id INTEGER NOT NULL,
  status TEXT NOT NULL DEFAULT 'pending',
  message TEXT,
  applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
  updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
  UNIQUE (activity_id, user_id)
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS ratings (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  activity_id INTEGER NOT NULL REFERENCES activities(activity_id),
  rater_id INTEGER NOT NULL,
  target_id INTEGER NOT NULL,
  score INTEGER NOT NULL CHECK (score BETWEEN 1 AND 5),
  comment TEXT,
  created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
  UNIQUE (activity_id, rater_id, target_id),
  CHECK (rater_id <> target_id)
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS notifications (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL,
  actor_id INTEGER NOT NULL,
  kind TEXT NOT NULL,
  reference_id TEXT NOT NULL,
  content TEXT NOT NULL,
  is_read INTEGER NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS current_user (
  user_id INTEGER NOT NULL
)
"#,
];

pub async fn ensure_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    for statement in SQL_SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
