use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::activity::{ActivityId, UserId};

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;
pub const MAX_COMMENT_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub activity_id: ActivityId,
    pub rater_id: UserId,
    pub target_id: UserId,
    pub score: i64,
    pub comment: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A rating the current user already left, as seen from the rater's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GivenRating {
    pub target_user_id: UserId,
    pub score: i64,
    pub comment: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RatingsRow {
    pub activity_id: i64,
    pub rater_id: i64,
    pub target_id: i64,
    pub score: i64,
    pub comment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<RatingsRow> for Rating {
    fn from(row: RatingsRow) -> Self {
        Rating {
            activity_id: row.activity_id,
            rater_id: row.rater_id,
            target_id: row.target_id,
            score: row.score,
            comment: row.comment.unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

impl From<RatingsRow> for GivenRating {
    fn from(row: RatingsRow) -> Self {
        GivenRating {
            target_user_id: row.target_id,
            score: row.score,
            comment: row.comment.unwrap_or_default(),
        }
    }
}

pub fn score_in_range(score: i64) -> bool {
    (MIN_SCORE..=MAX_SCORE).contains(&score)
}

// Counted in characters, not bytes: comments are mostly CJK text.
pub fn comment_fits(comment: &str) -> bool {
    comment.chars().count() <= MAX_COMMENT_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bounds() {
        assert!(!score_in_range(0));
        assert!(score_in_range(1));
        assert!(score_in_range(5));
        assert!(!score_in_range(6));
    }

    #[test]
    fn comment_limit_counts_chars() {
        let hundred_cjk: String = std::iter::repeat('好').take(100).collect();
        assert!(comment_fits(&hundred_cjk));
        let too_long: String = std::iter::repeat('a').take(101).collect();
        assert!(!comment_fits(&too_long));
    }
}
