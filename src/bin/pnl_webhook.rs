//! Webhook server binary.
//!
//! A thin shim over the library crate: load environment, initialise
//! tracing, wire the production stage adapters, serve `/webhook`.

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use pnl_extractor::{webhook, AppConfig, PipelineStages};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignore if missing).
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing required configuration (storage credentials, bucket, LLM key)
    // is fatal here at startup rather than a per-request surprise.
    let config = Arc::new(AppConfig::from_env().context("configuration")?);
    let bind_addr = config.bind_addr();

    let stages = web::Data::new(
        PipelineStages::production(Arc::clone(&config)).context("stage wiring")?,
    );

    tracing::info!("Starting PnL webhook server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(stages.clone())
            .configure(webhook::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
