use serde::Serialize;
use tracing::warn;

use crate::error::ParticipationResult;
use crate::models::{Activity, ActivityId, ParticipationView};
use crate::services::activity_guards::ActionAvailability;
use crate::services::gateway::ActivityGateway;
use crate::services::participation_service::load_participation;
use crate::services::session::SessionContext;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDetailView {
    pub activity: Activity,
    pub cover_image: Option<String>,
    pub capacity_pct: i64,
    pub participation: ParticipationView,
    pub actions: ActionAvailability,
}

/// Built fresh per request: the participant count and the guards derived
/// from it are never cached between views.
pub async fn load_activity_detail_view(
    gateway: &dyn ActivityGateway,
    session: Option<&SessionContext>,
    activity_id: ActivityId,
) -> ParticipationResult<ActivityDetailView> {
    let activity = gateway.get_activity(activity_id).await?;
    let participation = load_participation(gateway, session, &activity).await;
    Ok(build_view(activity, participation, session.is_some()))
}

/// Answer of a confirmed command: the viewer's participation afterwards and,
/// when it could be re-read, the fresh detail view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    pub activity_id: ActivityId,
    pub participation: ParticipationView,
    pub detail: Option<ActivityDetailView>,
}

/// Called only after the collaborator confirmed the command, so a failed
/// re-read is logged and answered with the known post-state, never an error.
pub async fn load_after_command(
    gateway: &dyn ActivityGateway,
    session: &SessionContext,
    activity_id: ActivityId,
    known: ParticipationView,
) -> CommandOutcome {
    match load_activity_detail_view(gateway, Some(session), activity_id).await {
        Ok(detail) => CommandOutcome {
            activity_id,
            participation: detail.participation,
            detail: Some(detail),
        },
        Err(e) => {
            warn!(activity_id, "re-read after command failed: {}", e);
            CommandOutcome {
                activity_id,
                participation: known,
                detail: None,
            }
        }
    }
}

fn build_view(
    activity: Activity,
    participation: ParticipationView,
    signed_in: bool,
) -> ActivityDetailView {
    let actions = ActionAvailability::for_view(&activity, participation, signed_in);
    ActivityDetailView {
        cover_image: activity.cover_image().map(str::to_string),
        capacity_pct: compute_capacity_pct(activity.current_participants, activity.max_participants),
        participation,
        actions,
        activity,
    }
}

fn compute_capacity_pct(current: i64, max: i64) -> i64 {
    if max <= 0 {
        return 0;
    }
    let pct = (current.saturating_mul(100)) / max;
    pct.clamp(0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_pct_is_clamped() {
        assert_eq!(compute_capacity_pct(0, 0), 0);
        assert_eq!(compute_capacity_pct(1, 3), 33);
        assert_eq!(compute_capacity_pct(5, 3), 100);
    }
}
