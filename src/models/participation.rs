use serde::{Deserialize, Serialize};

/// Relationship of the current user to one activity. Derived per view, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipationView {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "applied")]
    Applied,
    #[serde(rename = "joined")]
    Joined,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "isHost")]
    IsHost,
}

impl ParticipationView {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipationView::Idle => "idle",
            ParticipationView::Applied => "applied",
            ParticipationView::Joined => "joined",
            ParticipationView::Rejected => "rejected",
            ParticipationView::IsHost => "isHost",
        }
    }

    /// Members of the event: the only views allowed into the rating workflow.
    pub fn is_member(self) -> bool {
        matches!(self, ParticipationView::Joined | ParticipationView::IsHost)
    }
}
