use chrono::Utc;
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;

use lensmeet::config::AppConfig;
use lensmeet::database::{activities_repo, schema};

/// Moves open activities whose start time has passed to `ended`, which
/// opens the rating workflow for them. Run from cron against the local store.
#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    let pool = SqlitePoolOptions::new()
        .connect(&config.database_url)
        .await
        .expect("cannot connect to database");

    if let Err(e) = schema::ensure_schema(&pool).await {
        eprintln!("schema check failed: {}", e);
        std::process::exit(1);
    }

    match activities_repo::end_elapsed_activities(&pool, Utc::now()).await {
        Ok(ended) => {
            println!("close elapsed activities: ended={}", ended);
        }
        Err(e) => {
            eprintln!("close elapsed activities failed: {}", e);
            std::process::exit(1);
        }
    }
}
