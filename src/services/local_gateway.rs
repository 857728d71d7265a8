use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::warn;

use crate::database::{activities_repo, applications_repo, notifications_repo, ratings_repo};
use crate::error::{ParticipationError, ParticipationResult};
use crate::models::rating::{comment_fits, score_in_range};
use crate::models::{
    ActivitiesRow, Activity, ActivityDraft, ActivityId, ActivityPatch, ActivityStatus, Applicant,
    Application, ApplicationStatus, Decision, GivenRating, HostRef, Rating, UserId,
};
use crate::services::activity_guards::{activity_is_ended, activity_is_full};
use crate::services::gateway::ActivityGateway;
use crate::services::session::SessionContext;

/// SQLite-backed collaborator for offline/local use. Plays the server's role:
/// every rule is re-checked here regardless of what the caller checked.
#[derive(Debug, Clone)]
pub struct SqliteActivityGateway {
    pool: SqlitePool,
}

impl SqliteActivityGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load(&self, activity_id: ActivityId) -> ParticipationResult<Activity> {
        let row = activities_repo::load_activity_by_id(&self.pool, activity_id)
            .await?
            .ok_or(ParticipationError::NotFound("activity"))?;
        activity_from_row(row)
    }

    async fn load_hosted(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<Activity> {
        let activity = self.load(activity_id).await?;
        if !activity.is_hosted_by(session.user_id) {
            return Err(ParticipationError::forbidden(
                "only the host can manage this activity",
            ));
        }
        Ok(activity)
    }

    async fn is_member(&self, activity: &Activity, user_id: UserId) -> ParticipationResult<bool> {
        if activity.is_hosted_by(user_id) {
            return Ok(true);
        }
        let row = applications_repo::load_application(&self.pool, activity.id, user_id).await?;
        Ok(row.map(|r| r.status == ApplicationStatus::Accepted.as_str()).unwrap_or(false))
    }

    // The conditional UPDATE does not say which condition failed, so look again.
    async fn decision_refused(
        &self,
        activity_id: ActivityId,
        applicant_id: UserId,
        decision: Decision,
    ) -> ParticipationError {
        let still_pending = matches!(
            applications_repo::load_application(&self.pool, activity_id, applicant_id).await,
            Ok(Some(row)) if row.status == ApplicationStatus::Pending.as_str()
        );
        if !still_pending {
            return ParticipationError::conflict("only a pending application can be decided");
        }
        if decision == Decision::Accepted {
            return ParticipationError::conflict("this activity is full");
        }
        ParticipationError::conflict("applications can no longer change for this activity")
    }

    // Notifications are best-effort: a failed insert never undoes the transition.
    async fn notify(
        &self,
        user_id: UserId,
        actor_id: UserId,
        kind: &str,
        activity_id: ActivityId,
        content: &str,
    ) {
        let reference_id = activity_id.to_string();
        let res = notifications_repo::insert_notification(
            &self.pool,
            notifications_repo::NewNotification {
                user_id,
                actor_id,
                kind,
                reference_id: &reference_id,
                content,
            },
        )
        .await;
        if let Err(e) = res {
            warn!(user_id, kind, "notification insert failed: {}", e);
        }
    }
}

#[async_trait]
impl ActivityGateway for SqliteActivityGateway {
    async fn get_activity(&self, activity_id: ActivityId) -> ParticipationResult<Activity> {
        self.load(activity_id).await
    }

    async fn my_application_status(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<Option<ApplicationStatus>> {
        let row =
            applications_repo::load_application(&self.pool, activity_id, session.user_id).await?;
        Ok(row.and_then(|r| ApplicationStatus::parse(&r.status)))
    }

    async fn apply_to_activity(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        message: &str,
    ) -> ParticipationResult<()> {
        let activity = self.load(activity_id).await?;
        if activity.is_hosted_by(session.user_id) {
            return Err(ParticipationError::forbidden(
                "the host cannot apply to their own activity",
            ));
        }
        if activity.status != ActivityStatus::Open || activity_is_full(&activity) {
            return Err(ParticipationError::conflict(
                "this activity is not open for applications",
            ));
        }
        if applications_repo::load_application(&self.pool, activity_id, session.user_id)
            .await?
            .is_some()
        {
            return Err(ParticipationError::conflict(
                "you have already applied to this activity",
            ));
        }

        applications_repo::insert_pending_application(
            &self.pool,
            activity_id,
            session.user_id,
            message,
        )
        .await
        .map_err(|e| unique_violation_as_conflict(e, "you have already applied to this activity"))?;

        self.notify(
            activity.host.id,
            session.user_id,
            "join_request",
            activity_id,
            &activity.title,
        )
        .await;
        Ok(())
    }

    async fn cancel_my_application(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<()> {
        let removed =
            applications_repo::delete_pending_application(&self.pool, activity_id, session.user_id)
                .await?;
        if removed == 0 {
            return Err(ParticipationError::conflict(
                "there is no pending application to withdraw",
            ));
        }
        Ok(())
    }

    async fn list_applicants(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<Vec<Applicant>> {
        self.load_hosted(session, activity_id).await?;
        let rows = applications_repo::list_applications_for_activity(&self.pool, activity_id).await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.into_application())
            .map(|a| Applicant {
                user_id: a.user_id,
                status: a.status,
                message: a.message,
            })
            .collect())
    }

    async fn decide_applicant(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        applicant_id: UserId,
        decision: Decision,
    ) -> ParticipationResult<()> {
        let activity = self.load_hosted(session, activity_id).await?;
        if activity_is_ended(&activity) {
            return Err(ParticipationError::conflict(
                "applications can no longer change for this activity",
            ));
        }
        if decision == Decision::Accepted && activity_is_full(&activity) {
            return Err(ParticipationError::conflict("this activity is full"));
        }

        let status = decision.as_status();
        let changed = applications_repo::decide_pending_application(
            &self.pool,
            activity_id,
            applicant_id,
            status.as_str(),
        )
        .await?;
        if changed == 0 {
            return Err(self.decision_refused(activity_id, applicant_id, decision).await);
        }

        self.notify(
            applicant_id,
            session.user_id,
            status.as_str(),
            activity_id,
            &activity.title,
        )
        .await;
        Ok(())
    }

    async fn list_accepted_participants(
        &self,
        activity_id: ActivityId,
    ) -> ParticipationResult<Vec<UserId>> {
        Ok(applications_repo::list_accepted_user_ids(&self.pool, activity_id).await?)
    }

    async fn list_ratings_given_by_me(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<Vec<GivenRating>> {
        let rows = ratings_repo::list_given(&self.pool, activity_id, session.user_id).await?;
        Ok(rows.into_iter().map(GivenRating::from).collect())
    }

    async fn submit_rating(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        target_user_id: UserId,
        score: i64,
        comment: &str,
    ) -> ParticipationResult<()> {
        let activity = self.load(activity_id).await?;
        if !activity_is_ended(&activity) {
            return Err(ParticipationError::conflict(
                "ratings open once the activity has ended",
            ));
        }
        if session.user_id == target_user_id {
            return Err(ParticipationError::validation("you cannot rate yourself"));
        }
        if !score_in_range(score) {
            return Err(ParticipationError::validation("score must be between 1 and 5"));
        }
        if !comment_fits(comment) {
            return Err(ParticipationError::validation("comment is too long"));
        }
        if !self.is_member(&activity, session.user_id).await? {
            return Err(ParticipationError::forbidden(
                "only the host and accepted participants can rate",
            ));
        }
        if !self.is_member(&activity, target_user_id).await? {
            return Err(ParticipationError::validation(
                "that user did not take part in this activity",
            ));
        }
        if ratings_repo::rating_exists(&self.pool, activity_id, session.user_id, target_user_id)
            .await?
        {
            return Err(ParticipationError::conflict(
                "you have already rated this participant",
            ));
        }

        ratings_repo::insert_rating(
            &self.pool,
            ratings_repo::NewRating {
                activity_id,
                rater_id: session.user_id,
                target_id: target_user_id,
                score,
                comment,
            },
        )
        .await
        .map_err(|e| unique_violation_as_conflict(e, "you have already rated this participant"))?;
        Ok(())
    }

    async fn cancel_activity(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        reason: &str,
    ) -> ParticipationResult<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ParticipationError::validation(
                "a cancellation reason is required",
            ));
        }
        let activity = self.load_hosted(session, activity_id).await?;

        let changed = activities_repo::cancel_open_activity(&self.pool, activity_id, reason).await?;
        if changed == 0 {
            return Err(ParticipationError::conflict(
                "only an open activity can be cancelled",
            ));
        }

        let content = format!("{} was cancelled: {}", activity.title, reason);
        let participants = applications_repo::list_accepted_user_ids(&self.pool, activity_id).await?;
        for user_id in participants {
            self.notify(user_id, session.user_id, "activity_cancelled", activity_id, &content)
                .await;
        }
        Ok(())
    }

    async fn create_activity(
        &self,
        session: &SessionContext,
        draft: &ActivityDraft,
    ) -> ParticipationResult<ActivityId> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ParticipationError::validation("a title is required"));
        }
        if draft.max_participants < 0 {
            return Err(ParticipationError::validation(
                "the participant limit cannot be negative",
            ));
        }

        let activity_id = activities_repo::insert_activity(
            &self.pool,
            activities_repo::NewActivity {
                host_id: session.user_id,
                host_name: None,
                title,
                description: non_empty(&draft.description),
                location: non_empty(&draft.location),
                scheduled_at: draft.scheduled_at,
                max_participants: draft.max_participants,
                tags: &draft.tags,
                roles: &draft.roles,
                images: &draft.images,
            },
        )
        .await?;
        Ok(activity_id)
    }

    async fn update_activity(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        patch: &ActivityPatch,
    ) -> ParticipationResult<()> {
        let activity = self.load_hosted(session, activity_id).await?;
        if activity.status != ActivityStatus::Open {
            return Err(ParticipationError::conflict(
                "only an open activity can be edited",
            ));
        }
        if let Some(title) = patch.title.as_deref() {
            if title.trim().is_empty() {
                return Err(ParticipationError::validation("a title is required"));
            }
        }
        if patch.max_participants.is_some_and(|max| max < 0) {
            return Err(ParticipationError::validation(
                "the participant limit cannot be negative",
            ));
        }

        let changed = activities_repo::update_open_activity(
            &self.pool,
            activity_id,
            activities_repo::ActivityChanges {
                title: patch.title.as_deref().map(str::trim),
                description: patch.description.as_deref(),
                location: patch.location.as_deref(),
                scheduled_at: patch.scheduled_at,
                max_participants: patch.max_participants,
                tags: patch.tags.as_deref(),
                roles: patch.roles.as_deref(),
                images: patch.images.as_deref(),
            },
        )
        .await?;
        if changed == 0 {
            let now = self.load(activity_id).await?;
            if now.status != ActivityStatus::Open {
                return Err(ParticipationError::conflict(
                    "only an open activity can be edited",
                ));
            }
            return Err(ParticipationError::conflict(format!(
                "the participant limit cannot drop below the {} accepted participants",
                now.current_participants
            )));
        }
        Ok(())
    }

    async fn list_my_applications(
        &self,
        session: &SessionContext,
    ) -> ParticipationResult<Vec<Application>> {
        let rows = applications_repo::list_applications_by_user(&self.pool, session.user_id).await?;
        Ok(rows.into_iter().filter_map(|r| r.into_application()).collect())
    }

    async fn list_ratings_received(&self, user_id: UserId) -> ParticipationResult<Vec<Rating>> {
        let rows = ratings_repo::list_received(&self.pool, user_id).await?;
        Ok(rows.into_iter().map(Rating::from).collect())
    }
}

fn activity_from_row(row: ActivitiesRow) -> ParticipationResult<Activity> {
    let status = ActivityStatus::parse(&row.status).ok_or_else(|| {
        ParticipationError::conflict(format!("activity has unknown status '{}'", row.status))
    })?;
    Ok(Activity {
        id: row.activity_id,
        title: row.title,
        description: row.description.unwrap_or_default(),
        location: row.location.unwrap_or_default(),
        scheduled_at: row.scheduled_at,
        max_participants: row.max_participants,
        current_participants: row.current_participants_count,
        status,
        host: HostRef {
            id: row.host_id,
            name: row.host_name,
        },
        tags: parse_string_array_json(row.tags.as_deref()),
        roles: parse_string_array_json(row.roles.as_deref()),
        images: parse_string_array_json(row.images.as_deref()),
        cancel_reason: row.cancel_reason,
    })
}

fn non_empty(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_string_array_json(json: Option<&str>) -> Vec<String> {
    let Some(raw) = json else {
        return Vec::new();
    };
    serde_json::from_str::<Vec<String>>(raw).unwrap_or_default()
}

fn unique_violation_as_conflict(err: sqlx::Error, message: &str) -> ParticipationError {
    let is_unique = err
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if is_unique {
        ParticipationError::conflict(message)
    } else {
        ParticipationError::Database(err)
    }
}
