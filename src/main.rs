//! NatureVita API server entry point

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use naturevita::email::{ConsoleMailer, Mailer, SmtpMailer};
use naturevita::routes::api_router;
use naturevita::{AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(
            SmtpMailer::new(smtp).map_err(|e| anyhow::anyhow!("smtp setup failed: {e}"))?,
        ),
        None => {
            tracing::warn!("SMTP not configured, emails will be logged to stdout");
            Arc::new(ConsoleMailer)
        }
    };

    if config.gateway.is_none() {
        tracing::warn!("payment gateway not configured, payment endpoints will refuse requests");
    }

    let port = config.port;
    let state = AppState::new(db, config, mailer);

    let app = api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("NatureVita API listening on 0.0.0.0:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}
