use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voice_relay::{
    create_router, AppState, Config, ConnectionHub, MemoryStore, NatsClient, NatsProviderFactory,
    Orchestrator, OrchestratorConfig,
};

#[derive(Parser, Debug)]
#[command(name = "voice-relay", about = "Real-time speech translation relay")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/voice-relay")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let recordings_dir = cfg.recordings.dir();
    std::fs::create_dir_all(&recordings_dir)
        .with_context(|| format!("Failed to create {}", recordings_dir.display()))?;
    info!("Recordings directory: {}", recordings_dir.display());

    let nats = NatsClient::connect(&cfg.provider.nats_url).await?;
    let providers = Arc::new(NatsProviderFactory::new(
        nats,
        cfg.provider.start_timeout(),
        cfg.provider.stop_timeout(),
    ));

    let store = Arc::new(MemoryStore::new());
    let hub = Arc::new(ConnectionHub::new(cfg.service.max_send_queue));

    let mut orchestrator_config = OrchestratorConfig::new(recordings_dir);
    orchestrator_config.drain_timeout = cfg.session.drain_timeout();

    let orchestrator = Orchestrator::new(store.clone(), providers, hub.clone(), orchestrator_config);
    let state = AppState::new(orchestrator.clone(), hub, store, cfg.auth.tokens);
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    orchestrator.shutdown().await;
    Ok(())
}
