// src/ingest/connectors/channel.rs
//! Push-streaming channel connector.
//!
//! The channel protocol itself is an external collaborator behind the
//! [`ChannelTransport`] trait; this connector only owns the subscription
//! lifecycle: verify the one-time session artifact, run a bounded
//! historical backfill per channel, then consume the live feed until the
//! transport fails (at which point the supervisor restarts the loop).

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::ingest::types::{CanonicalEvent, Connector, ConnectorError, Emitter};
use crate::ingest::{normalize_text, DedupSet};

/// One message pushed (or backfilled) from a subscribed channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMessage {
    pub channel: String,
    pub id: u64,
    pub text: String,
    pub timestamp: f64,
    /// Dereferenceable origin reference, minted by the transport.
    pub url: String,
}

/// Transport side of the subscription: session check, bounded history,
/// and a long-poll for the next live message.
#[async_trait::async_trait]
pub trait ChannelTransport: Send + Sync + 'static {
    async fn connect(&self) -> Result<()>;
    async fn backfill(&self, channel: &str, limit: usize) -> Result<Vec<ChannelMessage>>;
    async fn next_message(&self) -> Result<ChannelMessage>;
}

pub struct ChannelConnector {
    transport: std::sync::Arc<dyn ChannelTransport>,
    session_path: PathBuf,
    /// (channel name, bias tag); messages from unlisted channels get "Unknown".
    channels: Vec<(String, String)>,
    backfill_limit: usize,
    seen: Mutex<DedupSet>,
}

impl ChannelConnector {
    pub fn new(
        transport: std::sync::Arc<dyn ChannelTransport>,
        session_path: PathBuf,
        channels: Vec<(String, String)>,
        backfill_limit: usize,
    ) -> Self {
        Self {
            transport,
            session_path,
            channels,
            backfill_limit,
            seen: Mutex::new(DedupSet::default()),
        }
    }

    fn bias_for(&self, channel: &str) -> String {
        self.channels
            .iter()
            .find(|(name, _)| name == channel)
            .map(|(_, bias)| bias.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn to_event(&self, msg: ChannelMessage) -> Option<CanonicalEvent> {
        let key = format!("{}/{}", msg.channel, msg.id);
        if !self
            .seen
            .lock()
            .expect("channel dedup mutex poisoned")
            .insert(&key)
        {
            return None;
        }
        let text = normalize_text(&msg.text);
        if text.is_empty() {
            return None;
        }
        Some(CanonicalEvent {
            source: "Channel".to_string(),
            text,
            url: msg.url,
            timestamp: msg.timestamp,
            bias: self.bias_for(&msg.channel),
            lat: None,
            lon: None,
        })
    }
}

#[async_trait::async_trait]
impl Connector for ChannelConnector {
    fn name(&self) -> &str {
        "channel"
    }

    fn id_domain(&self) -> String {
        let mut names: Vec<&str> = self.channels.iter().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        format!("channel:msg-id:{}", names.join("+"))
    }

    async fn run(&self, emit: &Emitter) -> Result<(), ConnectorError> {
        // Session artifact comes from the out-of-band auth bootstrap; a
        // missing artifact is a configuration problem, not a retry case.
        if !self.session_path.exists() {
            return Err(ConnectorError::FatalConfig(anyhow!(
                "session artifact not found at {}",
                self.session_path.display()
            )));
        }
        self.transport
            .connect()
            .await
            .map_err(|e| ConnectorError::FatalConfig(e.context("channel session rejected")))?;
        tracing::info!(channels = self.channels.len(), "channel connector connected");

        // Bounded historical backfill, once, before the live phase. A
        // failing channel is logged and skipped.
        for (channel, _) in &self.channels {
            match self.transport.backfill(channel, self.backfill_limit).await {
                Ok(history) => {
                    for msg in history {
                        if let Some(ev) = self.to_event(msg) {
                            emit.emit(ev).await?;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(channel = %channel, error = ?e, "backfill failed");
                    metrics::counter!("connector_errors_total").increment(1);
                }
            }
        }

        tracing::info!("channel history loaded, listening for live messages");
        loop {
            match self.transport.next_message().await {
                Ok(msg) => {
                    if let Some(ev) = self.to_event(msg) {
                        metrics::counter!("connector_events_total").increment(1);
                        emit.emit(ev).await?;
                    }
                }
                Err(e) => {
                    // Lost subscription; hand control back so the
                    // supervisor can restart the whole loop.
                    return Err(ConnectorError::Other(e.context("channel subscription lost")));
                }
            }
        }
    }
}

/// HTTP bridge implementation of the transport: a local gateway process
/// owns the real protocol session and exposes history + long-poll
/// endpoints.
pub struct HttpBridgeTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpBridgeTransport {
    pub fn new(base_url: String) -> Result<Self> {
        // Long-poll needs a generous read timeout; connect stays bounded.
        let http = reqwest::Client::builder()
            .user_agent("flashpoint-engine/0.1 (+channel bridge)")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(40))
            .build()?;
        Ok(Self { base_url, http })
    }
}

#[async_trait::async_trait]
impl ChannelTransport for HttpBridgeTransport {
    async fn connect(&self) -> Result<()> {
        let resp = self
            .http
            .get(format!("{}/session/check", self.base_url))
            .send()
            .await
            .context("bridge session check")?;
        if !resp.status().is_success() {
            anyhow::bail!("bridge session check returned {}", resp.status());
        }
        Ok(())
    }

    async fn backfill(&self, channel: &str, limit: usize) -> Result<Vec<ChannelMessage>> {
        let resp = self
            .http
            .get(format!(
                "{}/channels/{}/history?limit={}",
                self.base_url, channel, limit
            ))
            .send()
            .await
            .context("bridge history get")?;
        if !resp.status().is_success() {
            anyhow::bail!("bridge history returned {}", resp.status());
        }
        resp.json().await.context("bridge history payload")
    }

    async fn next_message(&self) -> Result<ChannelMessage> {
        let resp = self
            .http
            .get(format!("{}/updates?timeout=25", self.base_url))
            .send()
            .await
            .context("bridge long-poll")?;
        if !resp.status().is_success() {
            anyhow::bail!("bridge long-poll returned {}", resp.status());
        }
        resp.json().await.context("bridge update payload")
    }
}
