//! Binary entrypoint: boots the ingestion supervisor, the fan-in
//! pipeline, and the Axum HTTP server serving the poll/report/query
//! endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flashpoint_engine::api::{self, AppState};
use flashpoint_engine::cache::EventCache;
use flashpoint_engine::config;
use flashpoint_engine::ingest::connectors;
use flashpoint_engine::ingest::supervisor::{Supervisor, SupervisorCfg};
use flashpoint_engine::metrics::Metrics;
use flashpoint_engine::pipeline;
use flashpoint_engine::rag::embed::build_embedder;
use flashpoint_engine::rag::generate::build_gen_client;
use flashpoint_engine::rag::index::RetrievalIndex;
use flashpoint_engine::rag::service::QueryService;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("flashpoint_engine=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = config::load_default().context("loading engine config")?;
    let metrics = Metrics::init(cfg.cache_capacity);

    // Shared state: the only two resources written by concurrent producers.
    let cache = Arc::new(EventCache::new(cfg.cache_capacity));
    let index = Arc::new(RetrievalIndex::new(
        build_embedder(&cfg.embedding),
        cfg.index_max_entries,
    ));
    let query = Arc::new(QueryService::new(
        index.clone(),
        build_gen_client(&cfg.generation),
        Duration::from_secs(cfg.query_timeout_secs),
        cfg.default_k,
    ));

    // Connector assembly + supervision; the merge receiver feeds the
    // enrichment/cache/index pipeline.
    let conns = connectors::build_all(&cfg)?;
    tracing::info!(connectors = conns.len(), "starting supervisor");
    let (supervisor, rx) = Supervisor::start(
        conns,
        SupervisorCfg {
            channel_capacity: cfg.channel_capacity,
            restart_delay: Duration::from_secs(cfg.restart_delay_secs),
        },
    )?;
    let _pipeline = pipeline::spawn(rx, cache.clone(), index.clone());

    let state = AppState {
        cache,
        index,
        query,
    };
    let app = api::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    tracing::info!(bind = %cfg.bind, "flashpoint engine listening");
    axum::serve(listener, app).await?;

    supervisor.abort_all();
    Ok(())
}
