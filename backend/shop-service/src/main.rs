/// Shop Service - Main entry point
use actix_middleware::{init_tracing, RequestIdMiddleware};
use actix_web::{App, HttpServer};
use anyhow::{Context, Result};
use shop_service::{config::Config, repo::InMemoryAccountRepo, AppState};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration from environment")?;
    init_tracing(config.log_format);

    let state = AppState::new(&config, Arc::new(InMemoryAccountRepo::new()))
        .context("Failed to initialize JWT codec")?;

    tracing::info!(
        "Starting shop-service on {}:{}",
        config.server_host,
        config.server_port
    );

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(RequestIdMiddleware)
            .configure(|cfg| state.configure(cfg))
    })
    .bind((config.server_host.as_str(), config.server_port))
    .context("Failed to bind HTTP listener")?
    .run()
    .await
    .context("HTTP server error")?;

    tracing::info!("shop-service shutdown complete");
    Ok(())
}
