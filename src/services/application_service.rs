use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ParticipationError, ParticipationResult};
use crate::models::{Activity, ActivityId, Applicant, ApplicationStatus, Decision, ParticipationView, UserId};
use crate::services::activity_guards::{activity_is_ended, activity_is_full};
use crate::services::gateway::ActivityGateway;
use crate::services::participation_service::load_participation;
use crate::services::session::SessionContext;

/// `idle --apply--> applied`. The activity is fetched fresh so the capacity
/// and lifecycle checks never run against a stale count.
pub async fn apply(
    gateway: &dyn ActivityGateway,
    session: &SessionContext,
    activity_id: ActivityId,
    message: &str,
) -> ParticipationResult<ParticipationView> {
    let activity = gateway.get_activity(activity_id).await?;
    if activity.is_hosted_by(session.user_id) {
        return Err(ParticipationError::forbidden(
            "the host cannot apply to their own activity",
        ));
    }
    if activity_is_ended(&activity) {
        return Err(ParticipationError::conflict(
            "this activity is no longer open for applications",
        ));
    }
    if activity_is_full(&activity) {
        return Err(ParticipationError::conflict("this activity is full"));
    }

    match load_participation(gateway, Some(session), &activity).await {
        ParticipationView::Idle => {}
        ParticipationView::Applied | ParticipationView::Joined => {
            return Err(ParticipationError::conflict(
                "you have already applied to this activity",
            ));
        }
        ParticipationView::Rejected => {
            return Err(ParticipationError::conflict(
                "your application to this activity was declined",
            ));
        }
        ParticipationView::IsHost => {
            return Err(ParticipationError::forbidden(
                "the host cannot apply to their own activity",
            ));
        }
    }

    if let Err(e) = gateway
        .apply_to_activity(session, activity_id, message.trim())
        .await
    {
        warn!(activity_id, user_id = session.user_id, "apply failed: {}", e);
        return Err(e);
    }

    info!(activity_id, user_id = session.user_id, "application submitted");
    Ok(ParticipationView::Applied)
}

/// `applied --cancel--> idle`. Only a pending application can be withdrawn;
/// the record is removed, so the user may apply again later.
pub async fn cancel_application(
    gateway: &dyn ActivityGateway,
    session: &SessionContext,
    activity_id: ActivityId,
) -> ParticipationResult<ParticipationView> {
    let activity = gateway.get_activity(activity_id).await?;
    if activity_is_ended(&activity) {
        return Err(ParticipationError::conflict(
            "applications can no longer change for this activity",
        ));
    }

    match gateway.my_application_status(session, activity_id).await? {
        Some(ApplicationStatus::Pending) => {}
        Some(status) => {
            return Err(ParticipationError::conflict(format!(
                "an application that was {} cannot be withdrawn",
                status.as_str()
            )));
        }
        None => return Err(ParticipationError::NotFound("application")),
    }

    if let Err(e) = gateway.cancel_my_application(session, activity_id).await {
        warn!(
            activity_id,
            user_id = session.user_id,
            "cancel application failed: {}",
            e
        );
        return Err(e);
    }

    info!(activity_id, user_id = session.user_id, "application withdrawn");
    Ok(ParticipationView::Idle)
}

pub async fn list_applicants(
    gateway: &dyn ActivityGateway,
    session: &SessionContext,
    activity_id: ActivityId,
) -> ParticipationResult<Vec<Applicant>> {
    let activity = gateway.get_activity(activity_id).await?;
    ensure_host(&activity, session)?;
    gateway.list_applicants(session, activity_id).await
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub applicant: Applicant,
    /// Re-fetched after the decision; carries the collaborator's count.
    /// `None` when the re-fetch failed: the decision itself still stands.
    pub activity: Option<Activity>,
}

/// `pending --accept/reject--> accepted/rejected`, one applicant at a time.
pub async fn decide_applicant(
    gateway: &dyn ActivityGateway,
    session: &SessionContext,
    activity_id: ActivityId,
    applicant_id: UserId,
    decision: Decision,
) -> ParticipationResult<DecisionOutcome> {
    let activity = gateway.get_activity(activity_id).await?;
    ensure_host(&activity, session)?;
    if activity_is_ended(&activity) {
        return Err(ParticipationError::conflict(
            "applications can no longer change for this activity",
        ));
    }

    let applicants = gateway.list_applicants(session, activity_id).await?;
    let Some(applicant) = applicants.into_iter().find(|a| a.user_id == applicant_id) else {
        return Err(ParticipationError::NotFound("applicant"));
    };
    if applicant.status != ApplicationStatus::Pending {
        return Err(ParticipationError::conflict(format!(
            "this application was already {}",
            applicant.status.as_str()
        )));
    }
    if decision == Decision::Accepted && activity_is_full(&activity) {
        return Err(ParticipationError::conflict("this activity is full"));
    }

    if let Err(e) = gateway
        .decide_applicant(session, activity_id, applicant_id, decision)
        .await
    {
        warn!(activity_id, applicant_id, "applicant decision failed: {}", e);
        return Err(e);
    }
    info!(
        activity_id,
        applicant_id,
        decision = decision.as_status().as_str(),
        "applicant decided"
    );

    let activity = match gateway.get_activity(activity_id).await {
        Ok(activity) => Some(activity),
        Err(e) => {
            warn!(activity_id, "re-fetch after decision failed: {}", e);
            None
        }
    };
    Ok(DecisionOutcome {
        applicant: Applicant {
            status: decision.as_status(),
            ..applicant
        },
        activity,
    })
}

pub(crate) fn ensure_host(activity: &Activity, session: &SessionContext) -> ParticipationResult<()> {
    if activity.is_hosted_by(session.user_id) {
        Ok(())
    } else {
        Err(ParticipationError::forbidden(
            "only the host can manage this activity",
        ))
    }
}
