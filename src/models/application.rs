use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::activity::{ActivityId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pending" => Some(ApplicationStatus::Pending),
            "accepted" => Some(ApplicationStatus::Accepted),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

/// A host's verdict on one pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    Rejected,
}

impl Decision {
    pub fn as_status(self) -> ApplicationStatus {
        match self {
            Decision::Accepted => ApplicationStatus::Accepted,
            Decision::Rejected => ApplicationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub activity_id: ActivityId,
    pub user_id: UserId,
    pub status: ApplicationStatus,
    pub message: String,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Entry of the host-only applicant list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub user_id: UserId,
    pub status: ApplicationStatus,
    pub message: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApplicationsRow {
    pub activity_id: i64,
    pub user_id: i64,
    pub status: String,
    pub message: Option<String>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl ApplicationsRow {
    /// Rows with an unknown status are skipped by callers.
    pub fn into_application(self) -> Option<Application> {
        let status = ApplicationStatus::parse(&self.status)?;
        Some(Application {
            activity_id: self.activity_id,
            user_id: self.user_id,
            status,
            message: self.message.unwrap_or_default(),
            applied_at: self.applied_at,
        })
    }
}
