use tracing::warn;

use crate::models::{Activity, ApplicationStatus, ParticipationView, UserId};
use crate::services::gateway::ActivityGateway;
use crate::services::session::SessionContext;

/// First match wins: signed out, host, no application, then the application status.
pub fn resolve_participation(
    activity: &Activity,
    user_id: Option<UserId>,
    application: Option<ApplicationStatus>,
) -> ParticipationView {
    let Some(user_id) = user_id else {
        return ParticipationView::Idle;
    };
    if activity.is_hosted_by(user_id) {
        return ParticipationView::IsHost;
    }
    match application {
        None => ParticipationView::Idle,
        Some(ApplicationStatus::Accepted) => ParticipationView::Joined,
        Some(ApplicationStatus::Pending) => ParticipationView::Applied,
        Some(ApplicationStatus::Rejected) => ParticipationView::Rejected,
    }
}

/// Resolves the view, asking the collaborator for the application status only
/// when needed. A failed lookup degrades to `idle`.
pub async fn load_participation(
    gateway: &dyn ActivityGateway,
    session: Option<&SessionContext>,
    activity: &Activity,
) -> ParticipationView {
    let Some(session) = session else {
        return ParticipationView::Idle;
    };
    if activity.is_hosted_by(session.user_id) {
        return ParticipationView::IsHost;
    }

    match gateway.my_application_status(session, activity.id).await {
        Ok(status) => resolve_participation(activity, Some(session.user_id), status),
        Err(e) => {
            warn!(
                activity_id = activity.id,
                user_id = session.user_id,
                "application status lookup failed, showing idle: {}",
                e
            );
            ParticipationView::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityStatus, HostRef};

    fn activity() -> Activity {
        Activity {
            id: 1,
            title: "Portrait session".into(),
            description: String::new(),
            location: String::new(),
            scheduled_at: None,
            max_participants: 4,
            current_participants: 0,
            status: ActivityStatus::Open,
            host: HostRef { id: 10, name: Some("nanami".into()) },
            tags: vec![],
            roles: vec![],
            images: vec![],
            cancel_reason: None,
        }
    }

    #[test]
    fn precedence() {
        let a = activity();
        assert_eq!(
            resolve_participation(&a, None, Some(ApplicationStatus::Accepted)),
            ParticipationView::Idle
        );
        assert_eq!(
            resolve_participation(&a, Some(10), Some(ApplicationStatus::Rejected)),
            ParticipationView::IsHost
        );
        assert_eq!(resolve_participation(&a, Some(2), None), ParticipationView::Idle);
        assert_eq!(
            resolve_participation(&a, Some(2), Some(ApplicationStatus::Accepted)),
            ParticipationView::Joined
        );
        assert_eq!(
            resolve_participation(&a, Some(2), Some(ApplicationStatus::Pending)),
            ParticipationView::Applied
        );
        assert_eq!(
            resolve_participation(&a, Some(2), Some(ApplicationStatus::Rejected)),
            ParticipationView::Rejected
        );
    }
}
