use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use lensmeet::config::{AppConfig, BackendMode};
use lensmeet::database::schema;
use lensmeet::services::activity_api_service::RemoteActivityGateway;
use lensmeet::services::gateway::ActivityGateway;
use lensmeet::services::local_gateway::SqliteActivityGateway;
use lensmeet::web::{routes, AppState};

#[tokio::main]
async fn main() {
    dotenv().ok();

    // 1. Logging
    tracing_subscriber::fmt::init();

    // 2. Database
    let config = AppConfig::from_env();
    info!("connecting to database: {}", config.database_url);

    let pool = SqlitePoolOptions::new()
        .connect(&config.database_url)
        .await
        .expect("cannot connect to database");
    schema::ensure_schema(&pool)
        .await
        .expect("cannot prepare database schema");

    // 3. Activity collaborator
    let gateway: Arc<dyn ActivityGateway> = match config.backend {
        BackendMode::Local => Arc::new(SqliteActivityGateway::new(pool.clone())),
        BackendMode::Remote => {
            info!("using remote activity service at {}", config.activity_api_url);
            Arc::new(RemoteActivityGateway::new(config.activity_api_url.clone()))
        }
    };

    let app = routes::router(AppState::new(gateway, pool));

    // 4. Serve (with fallback port)
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("cannot parse host/port");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!(
                "could not bind {}: {}. trying fallback {}:{}",
                addr,
                e,
                config.host,
                config.port + 1
            );
            let fallback: SocketAddr = format!("{}:{}", config.host, config.port + 1)
                .parse()
                .expect("cannot parse fallback address");
            tokio::net::TcpListener::bind(fallback)
                .await
                .expect("cannot bind fallback port")
        }
    };

    let bound_addr = listener.local_addr().expect("listener has no local address");
    info!("server listening on http://{}", bound_addr);

    axum::serve(listener, app).await.expect("server error");
}
