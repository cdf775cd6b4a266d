// src/ingest/connectors/replay.rs
//! JSONL replay connector for demos and load tests.
//!
//! Reads canonical records from a file, rewrites each timestamp to the
//! ingestion time, and emits at a controlled rate, looping from the top
//! at EOF. Malformed lines are skipped.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use metrics::counter;

use crate::ingest::types::{CanonicalEvent, Connector, ConnectorError, Emitter};

pub struct ReplayConnector {
    path: PathBuf,
    interval: Duration,
}

impl ReplayConnector {
    pub fn new(path: PathBuf, interval: Duration) -> Self {
        Self { path, interval }
    }
}

#[async_trait::async_trait]
impl Connector for ReplayConnector {
    fn name(&self) -> &str {
        "replay"
    }

    fn id_domain(&self) -> String {
        format!("replay:{}", self.path.display())
    }

    async fn run(&self, emit: &Emitter) -> Result<(), ConnectorError> {
        if !self.path.exists() {
            return Err(ConnectorError::FatalConfig(anyhow!(
                "replay file not found: {}",
                self.path.display()
            )));
        }
        tracing::info!(path = %self.path.display(), "replay connector started");

        loop {
            let content = match tokio::fs::read_to_string(&self.path).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(error = ?e, "replay read failed");
                    counter!("connector_errors_total").increment(1);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let mut ev: CanonicalEvent = match serde_json::from_str(line) {
                    Ok(ev) => ev,
                    Err(_) => continue,
                };
                // Replayed events are "fresh" at ingestion time.
                ev.timestamp = chrono::Utc::now().timestamp() as f64;
                counter!("connector_events_total").increment(1);
                emit.emit(ev).await?;
                tokio::time::sleep(self.interval).await;
            }
        }
    }
}
