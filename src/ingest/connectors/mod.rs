// src/ingest/connectors/mod.rs
pub mod channel;
pub mod forum;
pub mod news;
pub mod replay;
pub mod rss;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use metrics::counter;
use tokio::time::MissedTickBehavior;

use crate::config::{self, ConnectorSpec, EngineConfig};
use crate::ingest::types::{CanonicalEvent, Connector, ConnectorError, Emitter, PollError};

/// Shared loop shape of every polling connector: fetch, emit the unseen
/// batch, sleep the interval, repeat forever.
///
/// A ticker keeps the cadence, so a fetch that fails (or times out) fast
/// does not shift the next scheduled fetch. A rate-limit signal takes the
/// explicit `cooldown` instead of the normal interval, then polling
/// resumes.
pub async fn poll_loop<F, Fut>(
    name: &str,
    interval: Duration,
    cooldown: Duration,
    emit: &Emitter,
    mut poll_once: F,
) -> Result<(), ConnectorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<CanonicalEvent>, PollError>>,
{
    let mut ticker = tokio::time::interval(interval);
    // After a cool-down, fire once immediately and resume spacing from
    // there instead of bursting through missed ticks.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match poll_once().await {
            Ok(batch) => {
                if !batch.is_empty() {
                    tracing::info!(connector = name, count = batch.len(), "ingested new items");
                }
                for ev in batch {
                    counter!("connector_events_total").increment(1);
                    emit.emit(ev).await?;
                }
            }
            Err(PollError::RateLimited) => {
                tracing::warn!(connector = name, cooldown_secs = cooldown.as_secs(), "rate limited, cooling down");
                counter!("connector_rate_limited_total").increment(1);
                tokio::time::sleep(cooldown).await;
            }
            Err(PollError::Transient(e)) => {
                tracing::warn!(connector = name, error = ?e, "fetch failed");
                counter!("connector_errors_total").increment(1);
            }
        }
    }
}

/// HTTP client shared by the polling connectors: bounded timeouts on every
/// external fetch.
pub fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent("flashpoint-engine/0.1 (+multi-source osint ingestion)")
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(10))
        .build()?;
    Ok(client)
}

/// Assemble live connectors from the configured descriptor list.
///
/// One wiring path for every run profile. A descriptor whose secret or
/// bootstrap artifact cannot be resolved is reported and skipped; it never
/// aborts the rest of the assembly.
pub fn build_all(cfg: &EngineConfig) -> Result<Vec<Arc<dyn Connector>>> {
    let mut out: Vec<Arc<dyn Connector>> = Vec::with_capacity(cfg.connectors.len());
    for spec in &cfg.connectors {
        match build_one(spec) {
            Ok(c) => out.push(c),
            Err(e) => {
                tracing::error!(error = ?e, "connector disabled by configuration error");
            }
        }
    }
    Ok(out)
}

fn build_one(spec: &ConnectorSpec) -> Result<Arc<dyn Connector>> {
    Ok(match spec {
        ConnectorSpec::News {
            api_key,
            query,
            endpoint,
            bias,
            poll_secs,
            cooldown_secs,
        } => {
            let key = config::resolve_secret(api_key, "NEWS_API_KEY")?;
            Arc::new(news::NewsConnector::new(
                endpoint.clone(),
                key,
                query.clone(),
                bias.clone(),
                Duration::from_secs(*poll_secs),
                Duration::from_secs(*cooldown_secs),
            )?)
        }
        ConnectorSpec::Rss {
            url,
            source,
            bias,
            poll_secs,
            cooldown_secs,
        } => Arc::new(rss::RssConnector::new(
            url.clone(),
            source.clone(),
            bias.clone(),
            Duration::from_secs(*poll_secs),
            Duration::from_secs(*cooldown_secs),
        )?),
        ConnectorSpec::Forum {
            subreddits,
            base_url,
            post_limit,
            poll_secs,
            cooldown_secs,
        } => Arc::new(forum::ForumConnector::new(
            base_url.clone(),
            subreddits.clone(),
            *post_limit,
            Duration::from_secs(*poll_secs),
            Duration::from_secs(*cooldown_secs),
        )?),
        ConnectorSpec::Channel {
            gateway_url,
            session_path,
            channels,
            backfill_limit,
        } => {
            let transport = Arc::new(channel::HttpBridgeTransport::new(gateway_url.clone())?);
            Arc::new(channel::ChannelConnector::new(
                transport,
                session_path.clone(),
                channels
                    .iter()
                    .map(|c| (c.name.clone(), c.bias.clone()))
                    .collect(),
                *backfill_limit,
            ))
        }
        ConnectorSpec::Replay {
            path,
            interval_secs,
        } => Arc::new(replay::ReplayConnector::new(
            path.clone(),
            Duration::from_secs(*interval_secs),
        )),
    })
}
