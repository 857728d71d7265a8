use tracing::{info, warn};

use crate::error::{ParticipationError, ParticipationResult};
use crate::models::{Activity, ActivityId, ActivityStatus};
use crate::services::application_service::ensure_host;
use crate::services::gateway::ActivityGateway;
use crate::services::session::SessionContext;

/// Host-only `open -> cancelled`. Returns the activity as the collaborator now
/// reports it; if that read fails, the pre-cancel activity with the new status
/// and reason.
pub async fn cancel_activity(
    gateway: &dyn ActivityGateway,
    session: &SessionContext,
    activity_id: ActivityId,
    reason: &str,
) -> ParticipationResult<Activity> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ParticipationError::validation(
            "a cancellation reason is required",
        ));
    }

    let activity = gateway.get_activity(activity_id).await?;
    ensure_host(&activity, session)?;
    if activity.status != ActivityStatus::Open {
        return Err(ParticipationError::conflict(format!(
            "an activity that is {} cannot be cancelled",
            activity.status.as_str()
        )));
    }

    if let Err(e) = gateway.cancel_activity(session, activity_id, reason).await {
        warn!(activity_id, "cancel activity failed: {}", e);
        return Err(e);
    }
    info!(activity_id, host_id = session.user_id, "activity cancelled");

    match gateway.get_activity(activity_id).await {
        Ok(fresh) => Ok(fresh),
        Err(e) => {
            // The cancellation is confirmed; report its known outcome instead.
            warn!(activity_id, "re-fetch after cancellation failed: {}", e);
            Ok(Activity {
                status: ActivityStatus::Cancelled,
                cancel_reason: Some(reason.to_string()),
                ..activity
            })
        }
    }
}
