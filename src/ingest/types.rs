// src/ingest/types.rs
use std::fmt;

use sha2::{Digest, Sha256};
use tokio::sync::mpsc;

/// Normalized record shape every source converges to before it enters the
/// cache or the retrieval index. Immutable once emitted; only the
/// geo-enrichment step fills `lat`/`lon` before the event is stored.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CanonicalEvent {
    /// Short origin label, e.g. "News/Reuters" or "Forum".
    pub source: String,
    /// Primary content (title + body, normalized to plain text).
    pub text: String,
    /// Origin reference; dedup key for URL-bearing sources.
    pub url: String,
    /// Unix seconds. Publish time where the producer supplies one,
    /// ingestion time for replayed events.
    pub timestamp: f64,
    /// Free-form provenance tag ("Pro Russia", "US/Western", ...).
    /// Analytics only, never used for routing.
    pub bias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl CanonicalEvent {
    /// Boundary validation: required fields must be non-empty.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.source.trim().is_empty() {
            return Err("empty source");
        }
        if self.text.trim().is_empty() {
            return Err("empty text");
        }
        Ok(())
    }

    /// Stable hex identity for the retrieval index (url + text digest).
    pub fn id(&self) -> String {
        let mut h = Sha256::new();
        h.update(self.url.as_bytes());
        h.update(b"\x1f");
        h.update(self.text.as_bytes());
        let out = h.finalize();
        out.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// How a connector's run loop ended, from the supervisor's point of view.
#[derive(Debug)]
pub enum ConnectorError {
    /// Credential/session/file problem at startup. The supervisor reports
    /// it and does not restart this connector.
    FatalConfig(anyhow::Error),
    /// The merge channel is gone; the pipeline is shutting down.
    ChannelClosed,
    /// Anything else; the supervisor restarts after a delay.
    Other(anyhow::Error),
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorError::FatalConfig(e) => write!(f, "fatal configuration error: {e}"),
            ConnectorError::ChannelClosed => write!(f, "merge channel closed"),
            ConnectorError::Other(e) => write!(f, "connector error: {e}"),
        }
    }
}

impl std::error::Error for ConnectorError {}

/// One fetch attempt of a polling connector.
#[derive(Debug)]
pub enum PollError {
    /// Provider-specific "too many requests" signal. Not an error: the
    /// loop cools down for longer than the normal interval and resumes.
    RateLimited,
    /// Timeout, non-2xx status, malformed payload. Logged; the loop
    /// continues on the normal cadence.
    Transient(anyhow::Error),
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::RateLimited => write!(f, "rate limited by provider"),
            PollError::Transient(e) => write!(f, "transient fetch failure: {e}"),
        }
    }
}

impl std::error::Error for PollError {}

/// Sending half of the supervisor's merge channel, handed to each
/// connector. Per-connector emission order is preserved end-to-end.
#[derive(Clone)]
pub struct Emitter {
    tx: mpsc::Sender<CanonicalEvent>,
}

impl Emitter {
    pub fn new(tx: mpsc::Sender<CanonicalEvent>) -> Self {
        Self { tx }
    }

    pub async fn emit(&self, event: CanonicalEvent) -> Result<(), ConnectorError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| ConnectorError::ChannelClosed)
    }
}

/// One external producer adapted to the canonical event shape.
///
/// `run` is a long-lived loop; returning from it is abnormal and the
/// supervisor reruns it after a delay (except for `FatalConfig`).
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Label for logs and metrics.
    fn name(&self) -> &str;

    /// Identity domain of this connector's dedup scope, e.g.
    /// "url:rt.com/rss" or "forum:post-id:worldnews". Two connectors may
    /// only be merged when their domains are disjoint; the supervisor
    /// rejects a configuration where two connectors share a domain.
    fn id_domain(&self) -> String;

    async fn run(&self, emit: &Emitter) -> Result<(), ConnectorError>;
}
