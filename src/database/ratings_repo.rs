use sqlx::SqlitePool;

use crate::models::RatingsRow;

const SQL_INSERT_RATING: &str = r#"
INSERT INTO ratings (
  activity_id,
  rater_id,
  target_id,
  score,
  comment
) VALUES (?, ?, ?, ?, ?)
"#;

pub struct NewRating<'a> {
    pub activity_id: i64,
    pub rater_id: i64,
    pub target_id: i64,
    pub score: i64,
    pub comment: &'a str,
}

pub async fn insert_rating(pool: &SqlitePool, rating: NewRating<'_>) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_RATING)
        .bind(rating.activity_id)
        .bind(rating.rater_id)
        .bind(rating.target_id)
        .bind(rating.score)
        .bind(rating.comment)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_LIST_GIVEN: &str = r#"
SELECT
  activity_id,
  rater_id,
  target_id,
  score,
  comment,
  created_at
FROM ratings
WHERE activity_id = ?
  AND rater_id = ?
ORDER BY id ASC
"#;

pub async fn list_given(
    pool: &SqlitePool,
    activity_id: i64,
    rater_id: i64,
) -> sqlx::Result<Vec<RatingsRow>> {
    sqlx::query_as::<_, RatingsRow>(SQL_LIST_GIVEN)
        .bind(activity_id)
        .bind(rater_id)
        .fetch_all(pool)
        .await
}

const SQL_LIST_RECEIVED: &str = r#"
SELECT
  activity_id,
  rater_id,
  target_id,
  score,
  comment,
  created_at
FROM ratings
WHERE target_id = ?
ORDER BY datetime(created_at) DESC, id DESC
"#;

pub async fn list_received(pool: &SqlitePool, target_id: i64) -> sqlx::Result<Vec<RatingsRow>> {
    sqlx::query_as::<_, RatingsRow>(SQL_LIST_RECEIVED)
        .bind(target_id)
        .fetch_all(pool)
        .await
}

const SQL_RATING_EXISTS: &str = r#"
SELECT COUNT(*)
FROM ratings
WHERE activity_id = ?
  AND rater_id = ?
  AND target_id = ?
"#;

pub async fn rating_exists(
    pool: &SqlitePool,
    activity_id: i64,
    rater_id: i64,
    target_id: i64,
) -> sqlx::Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(SQL_RATING_EXISTS)
        .bind(activity_id)
        .bind(rater_id)
        .bind(target_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}
