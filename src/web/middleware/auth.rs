use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::database::current_user_repo;
use crate::services::session::SessionContext;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JwtPayload {
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    sub: Option<String>,
}

/// Attaches a `SessionContext` extension when the caller can be identified.
/// Never rejects: read routes serve anonymous viewers, and mutating handlers
/// answer `Unauthenticated` themselves.
pub async fn attach_session(
    State(pool): State<SqlitePool>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(request.headers()) {
        if let Some(user_id) = user_id_from_jwt(&token) {
            request
                .extensions_mut()
                .insert(SessionContext::with_token(user_id, token));
            return next.run(request).await;
        }
        debug!("access token present but unreadable, trying local fallback");
    }

    // Fallback for offline/local usage: use the current_user table
    if let Ok(Some(user_id)) = current_user_repo::load_current_user_id(&pool).await {
        request
            .extensions_mut()
            .insert(SessionContext::new(user_id));
    }

    next.run(request).await
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|hv| hv.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get(header::COOKIE)
        .and_then(|hv| hv.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .map(str::trim)
                .find_map(|c| c.strip_prefix("access_token="))
                .map(str::to_string)
        })
}

/// Reads the user id from the payload segment. The signature is checked by
/// the activity service, which receives the same token.
fn user_id_from_jwt(token: &str) -> Option<i64> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .ok()?;
    let payload: JwtPayload = serde_json::from_slice(&payload_bytes).ok()?;
    payload
        .user_id
        .or_else(|| payload.sub.as_deref().and_then(|s| s.parse().ok()))
        .filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(payload: &str) -> String {
        format!(
            "e30.{}.sig",
            general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes())
        )
    }

    #[test]
    fn reads_user_id_claim() {
        assert_eq!(user_id_from_jwt(&token(r#"{"userId":42}"#)), Some(42));
        assert_eq!(user_id_from_jwt(&token(r#"{"sub":"7"}"#)), Some(7));
        assert_eq!(user_id_from_jwt(&token(r#"{"userId":0}"#)), None);
        assert_eq!(user_id_from_jwt("not-a-jwt"), None);
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; access_token=abc".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, "Bearer xyz".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
    }
}
