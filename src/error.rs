use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Coarse classes the UI cares about. All of them are non-fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    StateConflict,
    Transient,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Authorization => "authorization",
            ErrorKind::StateConflict => "state_conflict",
            ErrorKind::Transient => "transient",
        }
    }
}

#[derive(Debug, Error)]
pub enum ParticipationError {
    #[error("sign in to continue")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("this action is already in progress")]
    InFlight,

    #[error("activity service responded with {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ParticipationError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        ParticipationError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ParticipationError::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ParticipationError::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ParticipationError::Unauthenticated | ParticipationError::Forbidden(_) => {
                ErrorKind::Authorization
            }
            ParticipationError::NotFound(_)
            | ParticipationError::Conflict(_)
            | ParticipationError::Validation(_)
            | ParticipationError::InFlight => ErrorKind::StateConflict,
            ParticipationError::Upstream { .. } | ParticipationError::Database(_) => {
                ErrorKind::Transient
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ParticipationError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ParticipationError::Forbidden(_) => StatusCode::FORBIDDEN,
            ParticipationError::NotFound(_) => StatusCode::NOT_FOUND,
            ParticipationError::Conflict(_) | ParticipationError::InFlight => StatusCode::CONFLICT,
            ParticipationError::Validation(_) => StatusCode::BAD_REQUEST,
            ParticipationError::Upstream { .. } | ParticipationError::Database(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ParticipationError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.kind().as_str(),
            "message": self.to_string(),
        }));
        (self.status_code(), body).into_response()
    }
}

pub type ParticipationResult<T> = Result<T, ParticipationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let forbidden = ParticipationError::forbidden("only the host can do that");
        assert_eq!(forbidden.kind(), ErrorKind::Authorization);
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

        let dup = ParticipationError::conflict("already rated");
        assert_eq!(dup.kind(), ErrorKind::StateConflict);
        assert_eq!(dup.status_code(), StatusCode::CONFLICT);

        let down = ParticipationError::Upstream {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(down.kind(), ErrorKind::Transient);
        assert_eq!(down.status_code(), StatusCode::BAD_GATEWAY);
    }
}
