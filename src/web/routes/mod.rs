use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::web::middleware::auth as auth_middleware;
use crate::web::AppState;

pub mod activity;
pub mod rating;
pub mod user;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/activities", post(activity::create_activity_handler))
        .route(
            "/activities/:activity_id",
            get(activity::activity_detail_handler).put(activity::update_activity_handler),
        )
        .route(
            "/activities/:activity_id/apply",
            post(activity::apply_handler).delete(activity::cancel_application_handler),
        )
        .route(
            "/activities/:activity_id/applicants",
            get(activity::applicants_handler),
        )
        .route(
            "/activities/:activity_id/applicants/:user_id/status",
            put(activity::decide_applicant_handler),
        )
        .route(
            "/activities/:activity_id/cancel",
            post(activity::cancel_activity_handler),
        )
        .route(
            "/activities/:activity_id/rating",
            get(rating::rating_session_handler),
        )
        .route("/activities/:activity_id/rate", post(rating::rate_handler))
        .route("/me/applications", get(user::my_applications_handler))
        .route("/users/:user_id/reviews", get(user::user_reviews_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::attach_session,
        ))
        // Layers
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::{engine::general_purpose, Engine as _};
    use serde_json::Value;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    use super::*;
    use crate::database::{activities_repo, schema};
    use crate::services::local_gateway::SqliteActivityGateway;

    const HOST: i64 = 1;
    const MEMBER: i64 = 2;

    async fn setup() -> (Router, SqlitePool, i64) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        schema::ensure_schema(&pool).await.unwrap();
        let activity_id = activities_repo::insert_activity(
            &pool,
            activities_repo::NewActivity {
                host_id: HOST,
                host_name: Some("mei"),
                title: "Golden hour portraits",
                description: Some("Bring a reflector"),
                location: Some("Riverside park"),
                scheduled_at: None,
                max_participants: 3,
                tags: &[],
                roles: &[],
                images: &[],
            },
        )
        .await
        .unwrap();

        let gateway = Arc::new(SqliteActivityGateway::new(pool.clone()));
        let app = router(AppState::new(gateway, pool.clone()));
        (app, pool, activity_id)
    }

    fn bearer(user_id: i64) -> String {
        let payload = format!(r#"{{"userId":{}}}"#, user_id);
        format!(
            "Bearer e30.{}.sig",
            general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes())
        )
    }

    fn request(method: &str, uri: &str, user_id: Option<i64>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header("authorization", bearer(user_id));
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn anonymous_viewer_sees_detail_without_actions() {
        let (app, _pool, id) = setup().await;
        let resp = app
            .clone()
            .oneshot(request("GET", &format!("/activities/{}", id), None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(CACHE_CONTROL).unwrap(), "no-store");

        let (_, body) = send(&app, request("GET", &format!("/activities/{}", id), None, None)).await;
        assert_eq!(body["participation"], "idle");
        assert_eq!(body["actions"]["canApply"], false);
        assert_eq!(body["activity"]["title"], "Golden hour portraits");
    }

    #[tokio::test]
    async fn apply_requires_a_session() {
        let (app, _pool, id) = setup().await;
        let (status, body) = send(
            &app,
            request("POST", &format!("/activities/{}/apply", id), None, None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authorization");
    }

    #[tokio::test]
    async fn apply_then_accept_moves_member_to_joined() {
        let (app, _pool, id) = setup().await;

        let (status, body) = send(
            &app,
            request(
                "POST",
                &format!("/activities/{}/apply", id),
                Some(MEMBER),
                Some(serde_json::json!({ "message": "I shoot film" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["participation"], "applied");
        assert_eq!(body["detail"]["actions"]["canCancelApplication"], true);

        let (status, _) = send(
            &app,
            request("POST", &format!("/activities/{}/apply", id), Some(MEMBER), None),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            request(
                "PUT",
                &format!("/activities/{}/applicants/{}/status", id, MEMBER),
                Some(MEMBER),
                Some(serde_json::json!({ "status": "accepted" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            request(
                "PUT",
                &format!("/activities/{}/applicants/{}/status", id, MEMBER),
                Some(HOST),
                Some(serde_json::json!({ "status": "accepted" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applicant"]["status"], "accepted");
        assert_eq!(body["activity"]["currentParticipants"], 1);

        let (_, body) = send(
            &app,
            request("GET", &format!("/activities/{}", id), Some(MEMBER), None),
        )
        .await;
        assert_eq!(body["participation"], "joined");
    }

    #[tokio::test]
    async fn rating_is_closed_until_the_activity_ends() {
        let (app, _pool, id) = setup().await;
        let (status, body) = send(
            &app,
            request("GET", &format!("/activities/{}/rating", id), Some(HOST), None),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "state_conflict");
    }

    #[tokio::test]
    async fn reviews_are_public() {
        let (app, _pool, _id) = setup().await;
        let (status, body) = send(
            &app,
            request("GET", &format!("/users/{}/reviews", HOST), None, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reviewCount"], 0);
    }

    #[tokio::test]
    async fn withdrawing_returns_the_idle_view() {
        let (app, _pool, id) = setup().await;
        send(
            &app,
            request("POST", &format!("/activities/{}/apply", id), Some(MEMBER), None),
        )
        .await;

        let (status, body) = send(
            &app,
            request("DELETE", &format!("/activities/{}/apply", id), Some(MEMBER), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["participation"], "idle");
        assert_eq!(body["detail"]["actions"]["canApply"], true);
    }

    #[tokio::test]
    async fn host_creates_then_edits_an_activity() {
        let (app, _pool, _id) = setup().await;
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/activities",
                Some(HOST),
                Some(serde_json::json!({
                    "title": "Night markets on 35mm",
                    "location": "Old town",
                    "maxParticipants": 2,
                    "tags": ["film", "street"]
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["participation"], "isHost");
        assert_eq!(body["detail"]["activity"]["maxParticipants"], 2);
        let created = body["activityId"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            request(
                "PUT",
                &format!("/activities/{}", created),
                Some(MEMBER),
                Some(serde_json::json!({ "title": "Mine now" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            request(
                "PUT",
                &format!("/activities/{}", created),
                Some(HOST),
                Some(serde_json::json!({ "title": "Night markets on 120", "maxParticipants": 4 })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["detail"]["activity"]["title"], "Night markets on 120");
        assert_eq!(body["detail"]["activity"]["maxParticipants"], 4);
    }

    #[tokio::test]
    async fn create_rejects_a_blank_title() {
        let (app, _pool, _id) = setup().await;
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/activities",
                Some(HOST),
                Some(serde_json::json!({ "title": "   " })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "state_conflict");
    }

    #[tokio::test]
    async fn host_cancellation_returns_the_cancelled_detail() {
        let (app, _pool, id) = setup().await;
        let (status, body) = send(
            &app,
            request(
                "POST",
                &format!("/activities/{}/cancel", id),
                Some(HOST),
                Some(serde_json::json!({ "reason": "Storm warning" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["participation"], "isHost");
        assert_eq!(body["detail"]["activity"]["status"], "cancelled");
    }

    #[tokio::test]
    async fn rating_target_can_be_chosen_by_query() {
        let (app, pool, id) = setup().await;
        for user in [MEMBER, 3] {
            send(
                &app,
                request("POST", &format!("/activities/{}/apply", id), Some(user), None),
            )
            .await;
            send(
                &app,
                request(
                    "PUT",
                    &format!("/activities/{}/applicants/{}/status", id, user),
                    Some(HOST),
                    Some(serde_json::json!({ "status": "accepted" })),
                ),
            )
            .await;
        }
        activities_repo::mark_ended(&pool, id).await.unwrap();

        let (status, body) = send(
            &app,
            request("GET", &format!("/activities/{}/rating", id), Some(MEMBER), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selectedUserId"], HOST);

        let (status, body) = send(
            &app,
            request(
                "GET",
                &format!("/activities/{}/rating?target=3", id),
                Some(MEMBER),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selectedUserId"], 3);

        let (status, _) = send(
            &app,
            request(
                "GET",
                &format!("/activities/{}/rating?target={}", id, MEMBER),
                Some(MEMBER),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
