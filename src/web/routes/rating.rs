use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{ActivityId, UserId};
use crate::services::in_flight::Gesture;
use crate::services::rating_service::{RatingProgress, RatingSession, RatingSessionView};
use crate::services::session::SessionContext;
use crate::web::routes::activity::require_session;
use crate::web::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RatingSessionQuery {
    pub target: Option<UserId>,
}

/// `?target=` preselects a roster member; otherwise the first unrated one is.
pub async fn rating_session_handler(
    session: Option<Extension<SessionContext>>,
    Path(activity_id): Path<ActivityId>,
    Query(query): Query<RatingSessionQuery>,
    State(state): State<AppState>,
) -> Response {
    let result = async {
        let session = require_session(session)?;
        let mut rating = RatingSession::open(state.gateway.as_ref(), &session, activity_id).await?;
        if let Some(target) = query.target {
            rating.select(target)?;
        }
        Ok::<_, crate::error::ParticipationError>(rating)
    }
    .await;

    match result {
        Ok(rating) => Json(rating.view()).into_response(),
        Err(e) => {
            warn!("Rating session load failed for activity {}: {}", activity_id, e);
            e.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateForm {
    pub target_user_id: UserId,
    #[serde(alias = "rating")]
    pub score: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub progress: RatingProgress,
    pub session: RatingSessionView,
}

/// The roster is rebuilt from the collaborator on every submission, so a
/// rating given from another tab is seen as already rated.
pub async fn rate_handler(
    session: Option<Extension<SessionContext>>,
    Path(activity_id): Path<ActivityId>,
    State(state): State<AppState>,
    Json(form): Json<RateForm>,
) -> Response {
    let result = async {
        let session = require_session(session)?;
        let _guard = state.in_flight.begin(
            session.user_id,
            activity_id,
            Gesture::SubmitRating(form.target_user_id),
        )?;
        let mut rating = RatingSession::open(state.gateway.as_ref(), &session, activity_id).await?;
        let progress = rating
            .submit(
                state.gateway.as_ref(),
                &session,
                form.target_user_id,
                form.score,
                &form.comment,
            )
            .await?;
        Ok::<_, crate::error::ParticipationError>(RateResponse {
            progress,
            session: rating.view(),
        })
    }
    .await;

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            warn!(
                "Rating of {} for activity {} failed: {}",
                form.target_user_id, activity_id, e
            );
            e.into_response()
        }
    }
}
