//! metrik engine binary.
//!
//! - Loads strict YAML config (`metrik.yaml` or argv[1]); missing file runs
//!   on defaults.
//! - Starts the engine (definition registry, durable store, samplers).
//! - Serves the HTTP/WS API until ctrl-c, then stops the engine so the
//!   durable store closes after every background task has finished.

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use metrik_engine::{config, engine::MetricsEngine, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "metrik.yaml".to_string());
    let cfg = if std::path::Path::new(&path).exists() {
        config::load_from_file(&path).expect("config load failed")
    } else {
        tracing::info!(%path, "config file not found, using defaults");
        config::EngineConfig::default()
    };

    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .expect("server.listen must be a valid SocketAddr");

    let engine = MetricsEngine::new(cfg);
    if !engine.start().await {
        tracing::error!("metrics engine failed to start");
        return;
    }

    let app = router::build_router(engine.clone());

    tracing::info!(%listen, "metrik-engine starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    let shutdown_engine = engine.clone();
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    });

    if let Err(e) = serve.await {
        tracing::error!(error = %e, "server failed");
    }

    shutdown_engine.stop().await;
}
