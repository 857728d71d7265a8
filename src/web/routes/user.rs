use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::warn;

use crate::models::UserId;
use crate::services::rating_service;
use crate::services::session::SessionContext;
use crate::web::routes::activity::require_session;
use crate::web::AppState;

pub async fn my_applications_handler(
    session: Option<Extension<SessionContext>>,
    State(state): State<AppState>,
) -> Response {
    let result = async {
        let session = require_session(session)?;
        state.gateway.list_my_applications(&session).await
    }
    .await;

    match result {
        Ok(applications) => Json(applications).into_response(),
        Err(e) => {
            warn!("Application list failed: {}", e);
            e.into_response()
        }
    }
}

pub async fn user_reviews_handler(
    Path(user_id): Path<UserId>,
    State(state): State<AppState>,
) -> Response {
    match rating_service::load_review_summary(state.gateway.as_ref(), user_id).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => {
            warn!("Review summary load failed for {}: {}", user_id, e);
            e.into_response()
        }
    }
}
