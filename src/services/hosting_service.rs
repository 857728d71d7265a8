use tracing::{info, warn};

use crate::error::{ParticipationError, ParticipationResult};
use crate::models::{ActivityDraft, ActivityId, ActivityPatch, ActivityStatus};
use crate::services::application_service::ensure_host;
use crate::services::gateway::ActivityGateway;
use crate::services::session::SessionContext;

/// Host creates an activity; it starts `open` with nobody accepted.
pub async fn create_activity(
    gateway: &dyn ActivityGateway,
    session: &SessionContext,
    draft: &ActivityDraft,
) -> ParticipationResult<ActivityId> {
    if draft.title.trim().is_empty() {
        return Err(ParticipationError::validation("a title is required"));
    }
    if draft.max_participants < 0 {
        return Err(ParticipationError::validation(
            "the participant limit cannot be negative",
        ));
    }

    let activity_id = match gateway.create_activity(session, draft).await {
        Ok(id) => id,
        Err(e) => {
            warn!(host_id = session.user_id, "create activity failed: {}", e);
            return Err(e);
        }
    };
    info!(activity_id, host_id = session.user_id, "activity created");
    Ok(activity_id)
}

/// Host edit while the activity is open. The limit may not drop below the
/// participants already accepted; the collaborator re-checks that on write.
pub async fn update_activity(
    gateway: &dyn ActivityGateway,
    session: &SessionContext,
    activity_id: ActivityId,
    patch: &ActivityPatch,
) -> ParticipationResult<()> {
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ParticipationError::validation("a title is required"));
    }

    let activity = gateway.get_activity(activity_id).await?;
    ensure_host(&activity, session)?;
    if activity.status != ActivityStatus::Open {
        return Err(ParticipationError::conflict(format!(
            "an activity that is {} cannot be edited",
            activity.status.as_str()
        )));
    }
    if let Some(max) = patch.max_participants {
        if max < 0 {
            return Err(ParticipationError::validation(
                "the participant limit cannot be negative",
            ));
        }
        if max > 0 && max < activity.current_participants {
            return Err(ParticipationError::conflict(format!(
                "the participant limit cannot drop below the {} accepted participants",
                activity.current_participants
            )));
        }
    }

    if let Err(e) = gateway.update_activity(session, activity_id, patch).await {
        warn!(activity_id, "update activity failed: {}", e);
        return Err(e);
    }
    info!(activity_id, host_id = session.user_id, "activity updated");
    Ok(())
}
