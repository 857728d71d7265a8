use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ParticipationError, ParticipationResult};
use crate::models::rating::{comment_fits, score_in_range, MAX_COMMENT_CHARS};
use crate::models::{ActivityId, GivenRating, Rating, UserId};
use crate::services::activity_guards::activity_is_ended;
use crate::services::gateway::ActivityGateway;
use crate::services::participation_service::load_participation;
use crate::services::session::SessionContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingTarget {
    pub user_id: UserId,
    pub is_host: bool,
    pub is_rated: bool,
    /// Read-only once present.
    pub my_rating: Option<GivenRating>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum RatingProgress {
    Next {
        #[serde(rename = "targetUserId")]
        target_user_id: UserId,
    },
    Completed,
}

/// Post-event rating workflow for one rater on one activity.
///
/// The roster is `{host} ∪ accepted participants`, minus the rater, host first.
/// State only changes after the collaborator confirms a submission.
#[derive(Debug, Clone)]
pub struct RatingSession {
    activity_id: ActivityId,
    rater_id: UserId,
    targets: Vec<RatingTarget>,
    selected: Option<UserId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSessionView {
    pub activity_id: ActivityId,
    pub targets: Vec<RatingTarget>,
    pub selected_user_id: Option<UserId>,
    pub completed: bool,
}

impl RatingSession {
    /// Enters the workflow. Requires an ended (or cancelled) activity and a
    /// viewer who is the host or an accepted participant.
    pub async fn open(
        gateway: &dyn ActivityGateway,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<Self> {
        let activity = gateway.get_activity(activity_id).await?;
        if !activity_is_ended(&activity) {
            return Err(ParticipationError::conflict(
                "ratings open once the activity has ended",
            ));
        }
        let view = load_participation(gateway, Some(session), &activity).await;
        if !view.is_member() {
            return Err(ParticipationError::forbidden(
                "only the host and accepted participants can rate",
            ));
        }

        let accepted = gateway.list_accepted_participants(activity_id).await?;
        let given = gateway.list_ratings_given_by_me(session, activity_id).await?;
        Ok(Self::from_parts(
            activity_id,
            session.user_id,
            activity.host.id,
            &accepted,
            &given,
        ))
    }

    pub fn from_parts(
        activity_id: ActivityId,
        rater_id: UserId,
        host_id: UserId,
        accepted: &[UserId],
        given: &[GivenRating],
    ) -> Self {
        let mut targets: Vec<RatingTarget> = Vec::with_capacity(accepted.len() + 1);
        let candidates = std::iter::once((host_id, true)).chain(accepted.iter().map(|id| (*id, false)));
        for (user_id, is_host) in candidates {
            if user_id == rater_id || targets.iter().any(|t| t.user_id == user_id) {
                continue;
            }
            let my_rating = given.iter().find(|r| r.target_user_id == user_id).cloned();
            targets.push(RatingTarget {
                user_id,
                is_host,
                is_rated: my_rating.is_some(),
                my_rating,
            });
        }

        let mut session = Self {
            activity_id,
            rater_id,
            targets,
            selected: None,
        };
        session.selected = session.default_selection();
        session
    }

    pub fn activity_id(&self) -> ActivityId {
        self.activity_id
    }

    pub fn targets(&self) -> &[RatingTarget] {
        &self.targets
    }

    pub fn selected(&self) -> Option<UserId> {
        self.selected
    }

    pub fn is_complete(&self) -> bool {
        self.targets.iter().all(|t| t.is_rated)
    }

    pub fn target(&self, user_id: UserId) -> Option<&RatingTarget> {
        self.targets.iter().find(|t| t.user_id == user_id)
    }

    /// Rated targets can be selected too; they display read-only.
    pub fn select(&mut self, user_id: UserId) -> ParticipationResult<()> {
        if self.target(user_id).is_none() {
            return Err(ParticipationError::NotFound("rating target"));
        }
        self.selected = Some(user_id);
        Ok(())
    }

    pub async fn submit(
        &mut self,
        gateway: &dyn ActivityGateway,
        session: &SessionContext,
        target_user_id: UserId,
        score: i64,
        comment: &str,
    ) -> ParticipationResult<RatingProgress> {
        if session.user_id != self.rater_id {
            return Err(ParticipationError::forbidden(
                "this rating session belongs to another user",
            ));
        }
        let comment = comment.trim();
        self.check_submission(target_user_id, score, comment)?;

        if let Err(e) = gateway
            .submit_rating(session, self.activity_id, target_user_id, score, comment)
            .await
        {
            warn!(
                activity_id = self.activity_id,
                target_user_id,
                "rating submission failed: {}",
                e
            );
            return Err(e);
        }

        if let Some(target) = self.targets.iter_mut().find(|t| t.user_id == target_user_id) {
            target.is_rated = true;
            target.my_rating = Some(GivenRating {
                target_user_id,
                score,
                comment: comment.to_string(),
            });
        }
        info!(
            activity_id = self.activity_id,
            rater_id = self.rater_id,
            target_user_id,
            "rating submitted"
        );

        self.selected = self.default_selection();
        Ok(match self.first_unrated() {
            Some(next) => RatingProgress::Next {
                target_user_id: next,
            },
            None => RatingProgress::Completed,
        })
    }

    pub fn view(&self) -> RatingSessionView {
        RatingSessionView {
            activity_id: self.activity_id,
            targets: self.targets.clone(),
            selected_user_id: self.selected,
            completed: self.is_complete(),
        }
    }

    fn check_submission(&self, target_user_id: UserId, score: i64, comment: &str) -> ParticipationResult<()> {
        let Some(target) = self.target(target_user_id) else {
            return Err(ParticipationError::validation(
                "that user is not someone you can rate for this activity",
            ));
        };
        if target.is_rated {
            return Err(ParticipationError::conflict(
                "you have already rated this participant",
            ));
        }
        if !score_in_range(score) {
            return Err(ParticipationError::validation("score must be between 1 and 5"));
        }
        if !comment_fits(comment) {
            return Err(ParticipationError::validation(format!(
                "comment must be at most {} characters",
                MAX_COMMENT_CHARS
            )));
        }
        Ok(())
    }

    fn first_unrated(&self) -> Option<UserId> {
        self.targets.iter().find(|t| !t.is_rated).map(|t| t.user_id)
    }

    fn default_selection(&self) -> Option<UserId> {
        self.first_unrated()
            .or_else(|| self.targets.first().map(|t| t.user_id))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub user_id: UserId,
    pub average_score: f64,
    pub review_count: usize,
    pub reviews: Vec<Rating>,
}

pub async fn load_review_summary(
    gateway: &dyn ActivityGateway,
    user_id: UserId,
) -> ParticipationResult<ReviewSummary> {
    let reviews = gateway.list_ratings_received(user_id).await?;
    Ok(ReviewSummary {
        user_id,
        average_score: average_score(&reviews),
        review_count: reviews.len(),
        reviews,
    })
}

// One decimal, 0.0 when nobody rated yet.
fn average_score(reviews: &[Rating]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: i64 = reviews.iter().map(|r| r.score).sum();
    let avg = total as f64 / reviews.len() as f64;
    (avg * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn given(target: UserId, score: i64) -> GivenRating {
        GivenRating {
            target_user_id: target,
            score,
            comment: "great light".into(),
        }
    }

    #[test]
    fn roster_excludes_self_for_every_role() {
        // Participant view.
        let s = RatingSession::from_parts(1, 2, 10, &[2, 3, 4], &[]);
        let ids: Vec<_> = s.targets().iter().map(|t| t.user_id).collect();
        assert_eq!(ids, vec![10, 3, 4]);
        assert!(s.targets()[0].is_host);

        // Host view.
        let s = RatingSession::from_parts(1, 10, 10, &[2, 3], &[]);
        let ids: Vec<_> = s.targets().iter().map(|t| t.user_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn roster_deduplicates_host_listed_as_participant() {
        let s = RatingSession::from_parts(1, 2, 10, &[10, 3], &[]);
        let ids: Vec<_> = s.targets().iter().map(|t| t.user_id).collect();
        assert_eq!(ids, vec![10, 3]);
    }

    #[test]
    fn selects_first_unrated_then_first_when_all_rated() {
        let s = RatingSession::from_parts(1, 2, 10, &[3, 4], &[given(10, 5)]);
        assert_eq!(s.selected(), Some(3));
        assert!(s.target(10).unwrap().is_rated);
        assert_eq!(s.target(10).unwrap().my_rating.as_ref().unwrap().score, 5);

        let s = RatingSession::from_parts(1, 2, 10, &[3], &[given(10, 4), given(3, 2)]);
        assert!(s.is_complete());
        assert_eq!(s.selected(), Some(10));
    }

    #[test]
    fn empty_roster_is_complete_with_no_selection() {
        let s = RatingSession::from_parts(1, 10, 10, &[], &[]);
        assert!(s.is_complete());
        assert_eq!(s.selected(), None);
    }

    #[test]
    fn submission_checks() {
        let s = RatingSession::from_parts(1, 2, 10, &[3], &[given(10, 5)]);
        assert!(matches!(
            s.check_submission(99, 5, ""),
            Err(ParticipationError::Validation(_))
        ));
        assert!(matches!(
            s.check_submission(2, 5, ""),
            Err(ParticipationError::Validation(_))
        ));
        assert!(matches!(
            s.check_submission(10, 5, ""),
            Err(ParticipationError::Conflict(_))
        ));
        assert!(matches!(
            s.check_submission(3, 0, ""),
            Err(ParticipationError::Validation(_))
        ));
        let long: String = "x".repeat(101);
        assert!(matches!(
            s.check_submission(3, 4, &long),
            Err(ParticipationError::Validation(_))
        ));
        assert!(s.check_submission(3, 4, "thanks!").is_ok());
    }

    #[test]
    fn select_rejects_unknown_target() {
        let mut s = RatingSession::from_parts(1, 2, 10, &[3], &[]);
        assert!(s.select(3).is_ok());
        assert_eq!(s.selected(), Some(3));
        assert!(s.select(77).is_err());
        assert_eq!(s.selected(), Some(3));
    }

    #[test]
    fn average_rounds_to_one_decimal() {
        let r = |score| Rating {
            activity_id: 1,
            rater_id: 2,
            target_id: 3,
            score,
            comment: String::new(),
            created_at: None,
        };
        assert_eq!(average_score(&[]), 0.0);
        assert_eq!(average_score(&[r(5), r(4), r(4)]), 4.3);
    }
}
