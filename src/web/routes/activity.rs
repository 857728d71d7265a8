use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use tracing::warn;

use crate::error::{ParticipationError, ParticipationResult};
use crate::models::{ActivityDraft, ActivityId, ActivityPatch, Decision, ParticipationView, UserId};
use crate::services::activity_detail_service;
use crate::services::application_service;
use crate::services::cancellation_service;
use crate::services::hosting_service;
use crate::services::in_flight::Gesture;
use crate::services::session::SessionContext;
use crate::web::AppState;

pub(crate) fn require_session(
    session: Option<Extension<SessionContext>>,
) -> ParticipationResult<SessionContext> {
    session
        .map(|Extension(s)| s)
        .ok_or(ParticipationError::Unauthenticated)
}

pub async fn activity_detail_handler(
    session: Option<Extension<SessionContext>>,
    Path(activity_id): Path<ActivityId>,
    State(state): State<AppState>,
) -> Response {
    let session = session.map(|Extension(s)| s);
    match activity_detail_service::load_activity_detail_view(
        state.gateway.as_ref(),
        session.as_ref(),
        activity_id,
    )
    .await
    {
        Ok(view) => Json(view).into_response(),
        Err(e) => {
            warn!("Activity detail load failed for {}: {}", activity_id, e);
            e.into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplyForm {
    #[serde(default)]
    pub message: String,
}

pub async fn apply_handler(
    session: Option<Extension<SessionContext>>,
    Path(activity_id): Path<ActivityId>,
    State(state): State<AppState>,
    form: Option<Json<ApplyForm>>,
) -> Response {
    let result = async {
        let session = require_session(session)?;
        let _guard = state
            .in_flight
            .begin(session.user_id, activity_id, Gesture::Apply)?;
        let message = form.map(|Json(f)| f.message).unwrap_or_default();
        application_service::apply(state.gateway.as_ref(), &session, activity_id, &message)
            .await?;
        Ok::<_, ParticipationError>(activity_detail_service::load_after_command(
            state.gateway.as_ref(),
            &session,
            activity_id,
            ParticipationView::Applied,
        )
        .await)
    }
    .await;

    match result {
        Ok(view) => Json(view).into_response(),
        Err(e) => {
            warn!("Apply failed for activity {}: {}", activity_id, e);
            e.into_response()
        }
    }
}

pub async fn cancel_application_handler(
    session: Option<Extension<SessionContext>>,
    Path(activity_id): Path<ActivityId>,
    State(state): State<AppState>,
) -> Response {
    let result = async {
        let session = require_session(session)?;
        let _guard = state
            .in_flight
            .begin(session.user_id, activity_id, Gesture::CancelApplication)?;
        application_service::cancel_application(state.gateway.as_ref(), &session, activity_id)
            .await?;
        Ok::<_, ParticipationError>(activity_detail_service::load_after_command(
            state.gateway.as_ref(),
            &session,
            activity_id,
            ParticipationView::Idle,
        )
        .await)
    }
    .await;

    match result {
        Ok(view) => Json(view).into_response(),
        Err(e) => {
            warn!("Cancel application failed for activity {}: {}", activity_id, e);
            e.into_response()
        }
    }
}

pub async fn applicants_handler(
    session: Option<Extension<SessionContext>>,
    Path(activity_id): Path<ActivityId>,
    State(state): State<AppState>,
) -> Response {
    let result = async {
        let session = require_session(session)?;
        application_service::list_applicants(state.gateway.as_ref(), &session, activity_id).await
    }
    .await;

    match result {
        Ok(applicants) => Json(applicants).into_response(),
        Err(e) => {
            warn!("Applicant list failed for activity {}: {}", activity_id, e);
            e.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DecisionForm {
    pub status: Decision,
}

pub async fn decide_applicant_handler(
    session: Option<Extension<SessionContext>>,
    Path((activity_id, applicant_id)): Path<(ActivityId, UserId)>,
    State(state): State<AppState>,
    Json(form): Json<DecisionForm>,
) -> Response {
    let result = async {
        let session = require_session(session)?;
        let _guard = state.in_flight.begin(
            session.user_id,
            activity_id,
            Gesture::Decide(applicant_id),
        )?;
        application_service::decide_applicant(
            state.gateway.as_ref(),
            &session,
            activity_id,
            applicant_id,
            form.status,
        )
        .await
    }
    .await;

    match result {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            warn!(
                "Decision on applicant {} for activity {} failed: {}",
                applicant_id, activity_id, e
            );
            e.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CancelActivityForm {
    #[serde(default)]
    pub reason: String,
}

pub async fn cancel_activity_handler(
    session: Option<Extension<SessionContext>>,
    Path(activity_id): Path<ActivityId>,
    State(state): State<AppState>,
    Json(form): Json<CancelActivityForm>,
) -> Response {
    let result = async {
        let session = require_session(session)?;
        let _guard = state
            .in_flight
            .begin(session.user_id, activity_id, Gesture::CancelActivity)?;
        cancellation_service::cancel_activity(
            state.gateway.as_ref(),
            &session,
            activity_id,
            &form.reason,
        )
        .await?;
        Ok::<_, ParticipationError>(activity_detail_service::load_after_command(
            state.gateway.as_ref(),
            &session,
            activity_id,
            ParticipationView::IsHost,
        )
        .await)
    }
    .await;

    match result {
        Ok(view) => Json(view).into_response(),
        Err(e) => {
            warn!("Activity cancellation failed for {}: {}", activity_id, e);
            e.into_response()
        }
    }
}

pub async fn create_activity_handler(
    session: Option<Extension<SessionContext>>,
    State(state): State<AppState>,
    Json(draft): Json<ActivityDraft>,
) -> Response {
    let result = async {
        let session = require_session(session)?;
        let _guard = state
            .in_flight
            .begin(session.user_id, 0, Gesture::CreateActivity)?;
        let activity_id =
            hosting_service::create_activity(state.gateway.as_ref(), &session, &draft).await?;
        Ok::<_, ParticipationError>(
            activity_detail_service::load_after_command(
                state.gateway.as_ref(),
                &session,
                activity_id,
                ParticipationView::IsHost,
            )
            .await,
        )
    }
    .await;

    match result {
        Ok(outcome) => (StatusCode::CREATED, Json(outcome)).into_response(),
        Err(e) => {
            warn!("Activity creation failed: {}", e);
            e.into_response()
        }
    }
}

pub async fn update_activity_handler(
    session: Option<Extension<SessionContext>>,
    Path(activity_id): Path<ActivityId>,
    State(state): State<AppState>,
    Json(patch): Json<ActivityPatch>,
) -> Response {
    let result = async {
        let session = require_session(session)?;
        let _guard = state
            .in_flight
            .begin(session.user_id, activity_id, Gesture::EditActivity)?;
        hosting_service::update_activity(state.gateway.as_ref(), &session, activity_id, &patch)
            .await?;
        Ok::<_, ParticipationError>(
            activity_detail_service::load_after_command(
                state.gateway.as_ref(),
                &session,
                activity_id,
                ParticipationView::IsHost,
            )
            .await,
        )
    }
    .await;

    match result {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            warn!("Activity update failed for {}: {}", activity_id, e);
            e.into_response()
        }
    }
}
