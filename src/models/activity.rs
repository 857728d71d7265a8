use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ActivityId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Open,
    Ended,
    Cancelled,
}

impl ActivityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityStatus::Open => "open",
            ActivityStatus::Ended => "ended",
            ActivityStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a stored or upstream status. The legacy `full` status is folded
    /// into `open`: fullness is always derived from the live counts.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" | "full" => Some(ActivityStatus::Open),
            "ended" => Some(ActivityStatus::Ended),
            "cancelled" | "canceled" => Some(ActivityStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRef {
    pub id: UserId,
    pub name: Option<String>,
}

/// Normalized activity shape. Every gateway produces exactly this.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub max_participants: i64,
    /// Owned by the collaborator. Read fresh on every fetch, never adjusted locally.
    pub current_participants: i64,
    pub status: ActivityStatus,
    pub host: HostRef,
    pub tags: Vec<String>,
    pub roles: Vec<String>,
    pub images: Vec<String>,
    pub cancel_reason: Option<String>,
}

impl Activity {
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn is_hosted_by(&self, user_id: UserId) -> bool {
        self.host.id == user_id
    }
}

/// Host input for a new activity. Images are stored URLs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, alias = "eventTime")]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Zero means no limit.
    #[serde(default)]
    pub max_participants: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Host edit of an open activity. Absent fields keep their value; status only
/// moves through cancellation or the end of the event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(alias = "eventTime")]
    pub scheduled_at: Option<DateTime<Utc>>,
    pub max_participants: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub roles: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

// Row shape of the local `activities` table joined with its accepted count.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivitiesRow {
    pub activity_id: i64,
    pub host_id: i64,
    pub host_name: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub max_participants: i64,
    pub current_participants_count: i64,
    pub status: String,
    pub tags: Option<String>,
    pub roles: Option<String>,
    pub images: Option<String>,
    pub cancel_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_full_status_reads_as_open() {
        assert_eq!(ActivityStatus::parse("full"), Some(ActivityStatus::Open));
        assert_eq!(ActivityStatus::parse(" Cancelled "), Some(ActivityStatus::Cancelled));
        assert_eq!(ActivityStatus::parse("archived"), None);
    }

    #[test]
    fn cover_is_first_image() {
        let activity = Activity {
            id: 1,
            title: "Golden hour".into(),
            description: String::new(),
            location: String::new(),
            scheduled_at: None,
            max_participants: 3,
            current_participants: 0,
            status: ActivityStatus::Open,
            host: HostRef { id: 9, name: None },
            tags: vec![],
            roles: vec![],
            images: vec!["a.jpg".into(), "b.jpg".into()],
            cancel_reason: None,
        };
        assert_eq!(activity.cover_image(), Some("a.jpg"));
        assert!(activity.is_hosted_by(9));
    }
}
