use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Local SQLite store, for offline use and development.
    Local,
    /// The remote activity/rating REST service.
    Remote,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub backend: BackendMode,
    pub activity_api_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://lensmeet.db?mode=rwc".to_string());
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);
        let backend = parse_backend(env::var("ACTIVITY_BACKEND").ok().as_deref());
        let activity_api_url = env::var("ACTIVITY_API_URL")
            .unwrap_or_else(|_| "http://localhost:8080/api/v1".to_string());

        Self {
            database_url,
            host,
            port,
            backend,
            activity_api_url,
        }
    }
}

fn parse_backend(raw: Option<&str>) -> BackendMode {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("remote") => BackendMode::Remote,
        _ => BackendMode::Local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_defaults_to_local() {
        assert_eq!(parse_backend(None), BackendMode::Local);
        assert_eq!(parse_backend(Some("bogus")), BackendMode::Local);
        assert_eq!(parse_backend(Some(" Remote ")), BackendMode::Remote);
    }
}
