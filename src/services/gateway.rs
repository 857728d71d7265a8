use async_trait::async_trait;

use crate::error::ParticipationResult;
use crate::models::{
    Activity, ActivityDraft, ActivityId, ActivityPatch, Applicant, Application, ApplicationStatus,
    Decision, GivenRating, Rating, UserId,
};
use crate::services::session::SessionContext;

/// Call contract of the activity/rating collaborator.
///
/// Implementations own every piece of persistent state: the workflows never
/// write locally and treat each call as confirmed only when it returns `Ok`.
/// Exactly-once for applications `(activity, user)` and ratings
/// `(activity, rater, target)` is enforced on this side of the seam.
#[async_trait]
pub trait ActivityGateway: Send + Sync {
    async fn get_activity(&self, activity_id: ActivityId) -> ParticipationResult<Activity>;

    /// `None` when the session user never applied (or withdrew).
    async fn my_application_status(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<Option<ApplicationStatus>>;

    async fn apply_to_activity(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        message: &str,
    ) -> ParticipationResult<()>;

    async fn cancel_my_application(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<()>;

    /// Host-only.
    async fn list_applicants(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<Vec<Applicant>>;

    /// Host-only. Must refuse deciding an application that is not pending.
    async fn decide_applicant(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        applicant_id: UserId,
        decision: Decision,
    ) -> ParticipationResult<()>;

    async fn list_accepted_participants(
        &self,
        activity_id: ActivityId,
    ) -> ParticipationResult<Vec<UserId>>;

    async fn list_ratings_given_by_me(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<Vec<GivenRating>>;

    async fn submit_rating(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        target_user_id: UserId,
        score: i64,
        comment: &str,
    ) -> ParticipationResult<()>;

    /// Host-only. Notifying accepted participants is the implementation's side effect.
    async fn cancel_activity(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        reason: &str,
    ) -> ParticipationResult<()>;

    /// Creates an `open` activity hosted by the session user.
    async fn create_activity(
        &self,
        session: &SessionContext,
        draft: &ActivityDraft,
    ) -> ParticipationResult<ActivityId>;

    /// Host-only, open activities only. Must refuse a maximum below the
    /// accepted count.
    async fn update_activity(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        patch: &ActivityPatch,
    ) -> ParticipationResult<()>;

    async fn list_my_applications(
        &self,
        session: &SessionContext,
    ) -> ParticipationResult<Vec<Application>>;

    async fn list_ratings_received(&self, user_id: UserId) -> ParticipationResult<Vec<Rating>>;
}
