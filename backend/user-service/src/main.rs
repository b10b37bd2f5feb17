/// User Service Main Entry Point
///
/// Starts the gRPC server with tonic-health reporting and graceful shutdown.
use actix_middleware::init_tracing;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tonic::transport::Server;
use tracing::{error, info};
use user_service::grpc::{UserGrpcService, UserServer};
use user_service::{build_service, config::Config, repo::InMemoryUserRepo};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration from environment")?;
    init_tracing(config.log_format);

    let addr = config.listen_addr().context("Invalid server address")?;
    let service = build_service(&config, Arc::new(InMemoryUserRepo::new()))
        .context("Failed to initialize JWT codec")?;

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<UserServer<UserGrpcService>>()
        .await;

    info!("Starting user-service gRPC server on {}", addr);

    Server::builder()
        .add_service(health_service)
        .add_service(service.into_server())
        .serve_with_shutdown(addr, shutdown_signal())
        .await
        .context("gRPC server error")?;

    info!("user-service shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
