use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod clock;
mod config;
mod conflicts;
mod db;
mod error;
mod models;
mod routes;
mod schedule;
mod store;

use config::Config;
use schedule::ScheduleService;
use store::PgSessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "course_scheduler=info,axum=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let pool = db::connect(&config.database_url).await?;
    // crate-relative path for sqlx migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgSessionStore::new(pool));
    let schedule = ScheduleService::new(store, config.rooms.clone(), config.conflict_policy);
    tracing::info!(
        policy = ?config.conflict_policy,
        rooms = schedule.engine().rooms().len(),
        "conflict engine ready"
    );

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::router(schedule))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)),
        );

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
