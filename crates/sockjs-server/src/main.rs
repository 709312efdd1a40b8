//! SockJS server binary.
//!
//! Reads the YAML config named by `SOCKJS_CONFIG` (default `sockjs.yaml`) and
//! serves every configured endpoint.

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use sockjs_server::{app_state, config, router};

const DEFAULT_CONFIG: &str = "sockjs.yaml";

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "sockjs-server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::var("SOCKJS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.server.listen.parse()?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, "sockjs-server starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;
    Ok(())
}

async fn shutdown_signal(state: app_state::AppState) {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler; run until killed
        std::future::pending::<()>().await;
    }
    state.metrics().set_draining();
    tracing::info!("shutdown signal received, draining");
}
