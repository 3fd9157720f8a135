use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docgest::api::{create_router, AppState};
use docgest::config::Config;
use docgest::extract::ClaudeClient;
use docgest::pathstore;
use docgest::pipeline::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docgest=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::from_env();
    cfg.validate()?;

    let claude = Arc::new(ClaudeClient::new(
        cfg.anthropic_api_key.clone(),
        cfg.anthropic_model.clone(),
    ));
    let pathstore = Arc::new(pathstore::Client::new(
        cfg.pathstore_url.clone(),
        cfg.pathstore_api_key.clone(),
    ));

    let orchestrator = Arc::new(Orchestrator::new(&cfg, claude.clone(), pathstore));
    orchestrator.start();

    let state = Arc::new(AppState {
        orchestrator: orchestrator.clone(),
        claude,
        cfg: cfg.clone(),
    });

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!(%addr, model = %cfg.anthropic_model, "starting docgest");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain the pipeline before exiting so in-flight jobs observe
    // cancellation and workers join cleanly.
    orchestrator.stop().await;
    info!("docgest shut down gracefully");

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    info!("shutdown signal received...");
}
