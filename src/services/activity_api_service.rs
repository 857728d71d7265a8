use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ParticipationError, ParticipationResult};
use crate::models::{
    Activity, ActivityDraft, ActivityId, ActivityPatch, ActivityStatus, Applicant, Application,
    ApplicationStatus, Decision, GivenRating, HostRef, Rating, UserId,
};
use crate::services::gateway::ActivityGateway;
use crate::services::session::SessionContext;

/// Client for the remote activity/rating REST service (`/api/v1`).
#[derive(Debug, Clone)]
pub struct RemoteActivityGateway {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteActivityGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        session: Option<&SessionContext>,
    ) -> ParticipationResult<Option<T>> {
        let url = self.url(path);
        let resp = self
            .client
            .get(&url)
            .headers(bearer_headers(session))
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;
        read_envelope(resp, &url).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        session: &SessionContext,
        body: Option<Value>,
    ) -> ParticipationResult<Option<T>> {
        let url = self.url(path);
        let mut request = self
            .client
            .request(method, &url)
            .headers(bearer_headers(Some(session)));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let resp = request.send().await.map_err(|e| connect_failed(&url, e))?;
        read_envelope(resp, &url).await
    }

    async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        session: &SessionContext,
        body: Option<Value>,
    ) -> ParticipationResult<()> {
        self.send::<Value>(method, path, session, body).await?;
        Ok(())
    }
}

fn bearer_headers(session: Option<&SessionContext>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let token = session.and_then(|s| s.access_token.as_deref());
    if let Some(value) = token.and_then(|t| HeaderValue::from_str(&format!("Bearer {}", t)).ok()) {
        headers.insert(AUTHORIZATION, value);
    }
    headers
}

fn connect_failed(url: &str, err: impl ToString) -> ParticipationError {
    ParticipationError::Upstream {
        status: 502,
        message: format!("{} ({})", err.to_string(), url),
    }
}

/// Every response is wrapped as `{ code, message, data }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

async fn read_envelope<T: DeserializeOwned>(
    resp: reqwest::Response,
    url: &str,
) -> ParticipationResult<Option<T>> {
    let status = resp.status().as_u16();
    let bytes = resp.bytes().await.map_err(|e| connect_failed(url, e))?;
    decode_envelope(status, &bytes, url)
}

// An empty 2xx body carries no data; an unreadable one is an upstream fault,
// never "not found".
fn decode_envelope<T: DeserializeOwned>(
    status: u16,
    bytes: &[u8],
    url: &str,
) -> ParticipationResult<Option<T>> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_slice::<Value>(bytes)
            .ok()
            .and_then(|body| body.get("message").and_then(|v| v.as_str()).map(str::to_string))
            .unwrap_or_else(|| "request failed".to_string());
        return Err(map_status(status, message));
    }
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let envelope: Envelope<T> =
        serde_json::from_slice(bytes).map_err(|e| connect_failed(url, e))?;
    Ok(envelope.data)
}

/// Upstream status onto the local taxonomy. The service reports most state
/// conflicts ("already applied", "not open") as 400.
fn map_status(status: u16, message: String) -> ParticipationError {
    match status {
        401 => ParticipationError::Unauthenticated,
        403 => ParticipationError::Forbidden(message),
        404 => ParticipationError::NotFound("activity"),
        400 | 409 | 422 => ParticipationError::Conflict(message),
        _ => ParticipationError::Upstream { status, message },
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    #[serde(default, alias = "ID")]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Activity as the service sends it. The host id shows up under several
/// spellings; only `normalize_activity` looks at them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActivity {
    #[serde(alias = "ID")]
    pub id: i64,
    #[serde(default, alias = "hostID", alias = "host_id")]
    pub host_id: Option<i64>,
    #[serde(default)]
    pub host: Option<RawUser>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub max_participants: Option<i64>,
    #[serde(default)]
    pub current_participants: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
}

pub fn normalize_activity(raw: RawActivity) -> ParticipationResult<Activity> {
    let host = raw.host.unwrap_or_default();
    let host_id = raw.host_id.filter(|id| *id > 0).or(host.id).ok_or_else(|| {
        ParticipationError::Upstream {
            status: 502,
            message: format!("activity {} has no host", raw.id),
        }
    })?;
    let status_raw = raw.status.unwrap_or_else(|| "open".to_string());
    let status = ActivityStatus::parse(&status_raw).ok_or_else(|| ParticipationError::Upstream {
        status: 502,
        message: format!("activity {} has unknown status '{}'", raw.id, status_raw),
    })?;

    Ok(Activity {
        id: raw.id,
        title: raw.title,
        description: raw.description.unwrap_or_default(),
        location: raw.location.unwrap_or_default(),
        scheduled_at: raw.event_time.as_deref().and_then(parse_event_time),
        max_participants: raw.max_participants.unwrap_or(0),
        current_participants: raw.current_participants.unwrap_or(0),
        status,
        host: HostRef {
            id: host_id,
            name: host.username.or(host.name),
        },
        tags: parse_tags(raw.tags),
        roles: raw.roles.unwrap_or_default(),
        images: raw
            .images
            .unwrap_or_default()
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect(),
        cancel_reason: raw.cancel_reason.filter(|s| !s.trim().is_empty()),
    })
}

// The zero time of the upstream service means "not scheduled".
fn parse_event_time(raw: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim()).ok()?.with_timezone(&Utc);
    if parsed.year() <= 1 {
        return None;
    }
    Some(parsed)
}

/// Tags arrive either as an array or as a JSON-encoded string of one.
fn parse_tags(value: Option<Value>) -> Vec<String> {
    let strings = |items: Vec<Value>| {
        items
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    };
    match value {
        Some(Value::Array(items)) => strings(items),
        Some(Value::String(raw)) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Vec::new();
            }
            match serde_json::from_str::<Vec<Value>>(raw) {
                Ok(items) => strings(items),
                Err(_) => raw
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            }
        }
        _ => Vec::new(),
    }
}

fn draft_body(draft: &ActivityDraft) -> Value {
    serde_json::json!({
        "title": draft.title.trim(),
        "description": draft.description,
        "location": draft.location,
        "eventTime": draft.scheduled_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        "maxParticipants": draft.max_participants,
        "images": draft.images,
        "tags": encode_tags(&draft.tags),
        "roles": draft.roles,
    })
}

// The service treats empty strings and empty lists as "leave unchanged".
fn patch_body(patch: &ActivityPatch) -> Value {
    let mut body = serde_json::Map::new();
    let mut put = |key: &str, value: Value| {
        body.insert(key.to_string(), value);
    };
    if let Some(title) = &patch.title {
        put("title", Value::from(title.trim()));
    }
    if let Some(description) = &patch.description {
        put("description", Value::from(description.as_str()));
    }
    if let Some(location) = &patch.location {
        put("location", Value::from(location.as_str()));
    }
    if let Some(at) = patch.scheduled_at {
        put("eventTime", Value::from(at.to_rfc3339()));
    }
    if let Some(max) = patch.max_participants {
        put("maxParticipants", Value::from(max));
    }
    if let Some(tags) = &patch.tags {
        put("tags", Value::from(encode_tags(tags)));
    }
    if let Some(roles) = &patch.roles {
        put("roles", Value::from(roles.clone()));
    }
    if let Some(images) = &patch.images {
        put("images", Value::from(images.clone()));
    }
    Value::Object(body)
}

/// Tags travel as a JSON-encoded string.
fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParticipant {
    #[serde(default, alias = "userID", alias = "user_id")]
    user_id: Option<i64>,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    activity_id: Option<i64>,
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    applied_at: Option<DateTime<Utc>>,
}

impl RawParticipant {
    fn user_id(&self) -> Option<UserId> {
        self.user_id
            .filter(|id| *id > 0)
            .or_else(|| self.user.as_ref().and_then(|u| u.id))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRating {
    #[serde(default)]
    activity_id: i64,
    #[serde(default)]
    rater_id: i64,
    target_id: i64,
    score: i64,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<RawRating> for Rating {
    fn from(raw: RawRating) -> Self {
        Rating {
            activity_id: raw.activity_id,
            rater_id: raw.rater_id,
            target_id: raw.target_id,
            score: raw.score,
            comment: raw.comment.unwrap_or_default(),
            created_at: raw.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawActivityRatings {
    #[serde(default)]
    given: Vec<RawRating>,
}

#[async_trait]
impl ActivityGateway for RemoteActivityGateway {
    async fn get_activity(&self, activity_id: ActivityId) -> ParticipationResult<Activity> {
        let raw: RawActivity = self
            .get(&format!("/activities/{}", activity_id), None)
            .await?
            .ok_or(ParticipationError::NotFound("activity"))?;
        normalize_activity(raw)
    }

    async fn my_application_status(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<Option<ApplicationStatus>> {
        let payload: Option<StatusPayload> = self
            .get(&format!("/activities/{}/status", activity_id), Some(session))
            .await?;
        // "idle" and "host" both mean there is no application record.
        Ok(payload.and_then(|p| ApplicationStatus::parse(&p.status)))
    }

    async fn apply_to_activity(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        message: &str,
    ) -> ParticipationResult<()> {
        self.send_json(
            reqwest::Method::POST,
            &format!("/activities/{}/apply", activity_id),
            session,
            Some(serde_json::json!({ "message": message })),
        )
        .await
    }

    async fn cancel_my_application(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<()> {
        self.send_json(
            reqwest::Method::DELETE,
            &format!("/activities/{}/apply", activity_id),
            session,
            None,
        )
        .await
    }

    async fn list_applicants(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<Vec<Applicant>> {
        let raw: Vec<RawParticipant> = self
            .get(&format!("/activities/{}/applicants", activity_id), Some(session))
            .await?
            .unwrap_or_default();
        Ok(raw
            .into_iter()
            .filter_map(|p| {
                Some(Applicant {
                    user_id: p.user_id()?,
                    status: ApplicationStatus::parse(&p.status)?,
                    message: p.message.unwrap_or_default(),
                })
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
        self.send_json(
            reqwest::Method::PUT,
            &format!("/activities/{}/applicants/{}/status", activity_id, applicant_id),
            session,
            Some(serde_json::json!({ "status": decision.as_status().as_str() })),
        )
        .await
    }

    async fn list_accepted_participants(
        &self,
        activity_id: ActivityId,
    ) -> ParticipationResult<Vec<UserId>> {
        let raw: Vec<RawParticipant> = self
            .get(&format!("/activities/{}/participants", activity_id), None)
            .await?
            .unwrap_or_default();
        Ok(raw
            .iter()
            .filter(|p| p.status == ApplicationStatus::Accepted.as_str())
            .filter_map(|p| p.user_id())
            .collect())
    }

    async fn list_ratings_given_by_me(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
    ) -> ParticipationResult<Vec<GivenRating>> {
        let raw: RawActivityRatings = self
            .get(&format!("/activities/{}/ratings", activity_id), Some(session))
            .await?
            .unwrap_or_default();
        Ok(raw
            .given
            .into_iter()
            .map(|r| GivenRating {
                target_user_id: r.target_id,
                score: r.score,
                comment: r.comment.unwrap_or_default(),
            })
            .collect())
    }

    async fn submit_rating(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        target_user_id: UserId,
        score: i64,
        comment: &str,
    ) -> ParticipationResult<()> {
        self.send_json(
            reqwest::Method::POST,
            &format!("/activities/{}/rate", activity_id),
            session,
            Some(serde_json::json!({
                "targetUserId": target_user_id,
                "rating": score,
                "comment": comment,
            })),
        )
        .await
    }

    async fn cancel_activity(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        reason: &str,
    ) -> ParticipationResult<()> {
        self.send_json(
            reqwest::Method::POST,
            &format!("/activities/{}/cancel", activity_id),
            session,
            Some(serde_json::json!({ "reason": reason })),
        )
        .await
    }

    async fn create_activity(
        &self,
        session: &SessionContext,
        draft: &ActivityDraft,
    ) -> ParticipationResult<ActivityId> {
        let created: RawActivity = self
            .send(
                reqwest::Method::POST,
                "/activities",
                session,
                Some(draft_body(draft)),
            )
            .await?
            .ok_or_else(|| ParticipationError::Upstream {
                status: 502,
                message: "created activity missing from response".to_string(),
            })?;
        Ok(created.id)
    }

    async fn update_activity(
        &self,
        session: &SessionContext,
        activity_id: ActivityId,
        patch: &ActivityPatch,
    ) -> ParticipationResult<()> {
        self.send_json(
            reqwest::Method::PUT,
            &format!("/activities/{}", activity_id),
            session,
            Some(patch_body(patch)),
        )
        .await
    }

    async fn list_my_applications(
        &self,
        session: &SessionContext,
    ) -> ParticipationResult<Vec<Application>> {
        let raw: Vec<RawParticipant> = self
            .get("/users/me/applications", Some(session))
            .await?
            .unwrap_or_default();
        Ok(raw
            .into_iter()
            .filter_map(|p| {
                Some(Application {
                    activity_id: p.activity_id?,
                    user_id: p.user_id().unwrap_or(session.user_id),
                    status: ApplicationStatus::parse(&p.status)?,
                    message: p.message.unwrap_or_default(),
                    applied_at: p.applied_at,
                })
            })
            .collect())
    }

    async fn list_ratings_received(&self, user_id: UserId) -> ParticipationResult<Vec<Rating>> {
        let raw: Vec<RawRating> = self
            .get(&format!("/users/{}/reviews", user_id), None)
            .await?
            .unwrap_or_default();
        Ok(raw.into_iter().map(Rating::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: Value) -> RawActivity {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn host_id_is_found_under_any_spelling() {
        for body in [
            serde_json::json!({ "id": 1, "hostId": 7 }),
            serde_json::json!({ "id": 1, "hostID": 7 }),
            serde_json::json!({ "id": 1, "host_id": 7 }),
            serde_json::json!({ "id": 1, "host": { "id": 7, "username": "kiki" } }),
            serde_json::json!({ "ID": 1, "host": { "ID": 7 } }),
        ] {
            let activity = normalize_activity(raw(body.clone())).unwrap();
            assert_eq!(activity.host.id, 7, "{}", body);
        }
    }

    #[test]
    fn missing_host_is_an_upstream_error() {
        let err = normalize_activity(raw(serde_json::json!({ "id": 1 }))).unwrap_err();
        assert!(matches!(err, ParticipationError::Upstream { .. }));
    }

    #[test]
    fn normalizes_status_tags_and_time() {
        let activity = normalize_activity(raw(serde_json::json!({
            "id": 3,
            "hostId": 2,
            "title": "Rooftop portraits",
            "status": "full",
            "maxParticipants": 3,
            "currentParticipants": 3,
            "tags": "[\"portrait\",\"rooftop\"]",
            "images": ["cover.jpg", ""],
            "eventTime": "0001-01-01T00:00:00Z"
        })))
        .unwrap();
        assert_eq!(activity.status, ActivityStatus::Open);
        assert_eq!(activity.tags, vec!["portrait", "rooftop"]);
        assert_eq!(activity.images, vec!["cover.jpg"]);
        assert!(activity.scheduled_at.is_none());
        assert_eq!(activity.current_participants, 3);
    }

    #[test]
    fn plain_tag_strings_are_split() {
        assert_eq!(
            parse_tags(Some(Value::String("film, street".into()))),
            vec!["film", "street"]
        );
        assert!(parse_tags(None).is_empty());
    }

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert!(matches!(
            map_status(401, String::new()),
            ParticipationError::Unauthenticated
        ));
        assert!(matches!(
            map_status(403, "host only".into()),
            ParticipationError::Forbidden(_)
        ));
        assert!(matches!(
            map_status(400, "already applied".into()),
            ParticipationError::Conflict(_)
        ));
        assert!(matches!(
            map_status(503, String::new()),
            ParticipationError::Upstream { status: 503, .. }
        ));
    }

    #[test]
    fn unreadable_success_body_is_an_upstream_fault() {
        let url = "http://svc/api/v1/activities/1";
        let err = decode_envelope::<RawActivity>(200, b"<html>gateway</html>", url).unwrap_err();
        assert!(matches!(err, ParticipationError::Upstream { status: 502, .. }));

        let empty = decode_envelope::<RawActivity>(204, b"", url).unwrap();
        assert!(empty.is_none());

        let ok = decode_envelope::<RawActivity>(
            200,
            br#"{"code":0,"message":"ok","data":{"id":1,"hostId":2}}"#,
            url,
        )
        .unwrap();
        assert_eq!(ok.map(|a| a.id), Some(1));
    }

    #[test]
    fn error_body_message_is_kept() {
        let err = decode_envelope::<Value>(
            400,
            br#"{"code":400,"message":"already applied"}"#,
            "http://svc",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "already applied");

        let err = decode_envelope::<Value>(500, b"oops", "http://svc").unwrap_err();
        assert!(matches!(err, ParticipationError::Upstream { status: 500, .. }));
    }

    #[test]
    fn patch_body_only_carries_present_fields() {
        let body = patch_body(&ActivityPatch {
            max_participants: Some(6),
            tags: Some(vec!["film".into()]),
            ..ActivityPatch::default()
        });
        assert_eq!(
            body,
            serde_json::json!({ "maxParticipants": 6, "tags": "[\"film\"]" })
        );
    }
}
