use serde::Serialize;

use crate::models::{Activity, ActivityStatus, ParticipationView};

/// Capacity guard. A non-positive maximum means "no limit".
pub fn is_full(max_participants: i64, current_participants: i64) -> bool {
    max_participants > 0 && current_participants >= max_participants
}

/// Event lifecycle guard. Cancellation counts as ended.
pub fn is_ended(status: ActivityStatus) -> bool {
    matches!(status, ActivityStatus::Ended | ActivityStatus::Cancelled)
}

pub fn activity_is_full(activity: &Activity) -> bool {
    is_full(activity.max_participants, activity.current_participants)
}

pub fn activity_is_ended(activity: &Activity) -> bool {
    is_ended(activity.status)
}

/// Which affordances one viewer gets for one activity, computed from live counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionAvailability {
    pub is_full: bool,
    pub is_ended: bool,
    pub can_apply: bool,
    pub can_cancel_application: bool,
    pub can_manage_applicants: bool,
    pub can_cancel_activity: bool,
    pub can_rate: bool,
}

impl ActionAvailability {
    pub fn for_view(activity: &Activity, view: ParticipationView, signed_in: bool) -> Self {
        let full = activity_is_full(activity);
        let ended = activity_is_ended(activity);
        if !signed_in {
            return Self {
                is_full: full,
                is_ended: ended,
                can_apply: false,
                can_cancel_application: false,
                can_manage_applicants: false,
                can_cancel_activity: false,
                can_rate: false,
            };
        }

        Self {
            is_full: full,
            is_ended: ended,
            can_apply: view == ParticipationView::Idle && !full && !ended,
            can_cancel_application: view == ParticipationView::Applied && !ended,
            can_manage_applicants: view == ParticipationView::IsHost && !ended,
            can_cancel_activity: view == ParticipationView::IsHost
                && activity.status == ActivityStatus::Open,
            can_rate: ended && view.is_member(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HostRef;

    fn activity(max: i64, current: i64, status: ActivityStatus) -> Activity {
        Activity {
            id: 7,
            title: "Harbour night walk".into(),
            description: String::new(),
            location: "Keelung".into(),
            scheduled_at: None,
            max_participants: max,
            current_participants: current,
            status,
            host: HostRef { id: 1, name: None },
            tags: vec![],
            roles: vec![],
            images: vec![],
            cancel_reason: None,
        }
    }

    #[test]
    fn capacity_guard() {
        assert!(is_full(3, 3));
        assert!(is_full(3, 4));
        assert!(!is_full(3, 2));
        assert!(!is_full(0, 10));
    }

    #[test]
    fn lifecycle_guard() {
        assert!(!is_ended(ActivityStatus::Open));
        assert!(is_ended(ActivityStatus::Ended));
        assert!(is_ended(ActivityStatus::Cancelled));
    }

    #[test]
    fn full_activity_hides_apply_for_every_non_member_view() {
        let a = activity(3, 3, ActivityStatus::Open);
        for view in [
            ParticipationView::Idle,
            ParticipationView::Applied,
            ParticipationView::Rejected,
        ] {
            let actions = ActionAvailability::for_view(&a, view, true);
            assert!(actions.is_full);
            assert!(!actions.can_apply, "{:?}", view);
        }
    }

    #[test]
    fn ended_activity_swaps_application_actions_for_rating() {
        let open = activity(5, 1, ActivityStatus::Open);
        let joined_open = ActionAvailability::for_view(&open, ParticipationView::Joined, true);
        assert!(!joined_open.can_rate);

        let ended = activity(5, 1, ActivityStatus::Ended);
        let joined = ActionAvailability::for_view(&ended, ParticipationView::Joined, true);
        assert!(joined.can_rate);
        assert!(!joined.can_apply);

        let host = ActionAvailability::for_view(&ended, ParticipationView::IsHost, true);
        assert!(host.can_rate);
        assert!(!host.can_manage_applicants);
        assert!(!host.can_cancel_activity);

        let applied = ActionAvailability::for_view(&ended, ParticipationView::Applied, true);
        assert!(!applied.can_cancel_application);
        assert!(!applied.can_rate);
    }

    #[test]
    fn signed_out_viewer_gets_nothing() {
        let a = activity(5, 0, ActivityStatus::Open);
        let actions = ActionAvailability::for_view(&a, ParticipationView::Idle, false);
        assert!(!actions.can_apply);
        assert!(!actions.can_rate);
    }

    #[test]
    fn rejected_viewer_cannot_reapply() {
        let a = activity(5, 0, ActivityStatus::Open);
        let actions = ActionAvailability::for_view(&a, ParticipationView::Rejected, true);
        assert!(!actions.can_apply);
    }
}
