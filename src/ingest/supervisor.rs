// src/ingest/supervisor.rs
//! Connector supervision and fan-in merge.
//!
//! Each connector runs as its own tokio task holding a clone of the merge
//! sender; a stall in one connector never blocks delivery from another.
//! Per-connector emission order is preserved by the channel; no global
//! order across connectors is imposed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ingest::types::{CanonicalEvent, Connector, ConnectorError, Emitter};

#[derive(Clone, Copy, Debug)]
pub struct SupervisorCfg {
    pub channel_capacity: usize,
    pub restart_delay: Duration,
}

impl Default for SupervisorCfg {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            restart_delay: Duration::from_secs(5),
        }
    }
}

/// Owns the lifetime of all configured connectors.
pub struct Supervisor {
    handles: Vec<JoinHandle<()>>,
}

impl Supervisor {
    /// Start every configured connector and return the merged receiver.
    ///
    /// Rejects the configuration before spawning anything when two
    /// connectors declare the same identity domain: merging streams whose
    /// dedup scopes can collide would silently produce duplicate
    /// identities downstream.
    pub fn start(
        connectors: Vec<Arc<dyn Connector>>,
        cfg: SupervisorCfg,
    ) -> Result<(Self, mpsc::Receiver<CanonicalEvent>)> {
        let mut domains: HashMap<String, String> = HashMap::new();
        for c in &connectors {
            let domain = c.id_domain();
            if let Some(existing) = domains.insert(domain.clone(), c.name().to_string()) {
                bail!(
                    "connectors '{}' and '{}' share identity domain '{}'; streams must be disjoint",
                    existing,
                    c.name(),
                    domain
                );
            }
        }

        let (tx, rx) = mpsc::channel(cfg.channel_capacity.max(1));
        let mut handles = Vec::with_capacity(connectors.len());
        for connector in connectors {
            let emitter = Emitter::new(tx.clone());
            handles.push(tokio::spawn(supervise(
                connector,
                emitter,
                cfg.restart_delay,
            )));
        }
        // Connector tasks hold the only senders; dropping tx here lets the
        // receiver close once every task is gone.
        drop(tx);

        Ok((Self { handles }, rx))
    }

    pub fn task_count(&self) -> usize {
        self.handles.len()
    }

    /// Abort every connector task (tests and shutdown paths).
    pub fn abort_all(&self) {
        for h in &self.handles {
            h.abort();
        }
    }
}

/// Run one connector forever, restarting after abnormal exits.
async fn supervise(connector: Arc<dyn Connector>, emit: Emitter, restart_delay: Duration) {
    loop {
        match connector.run(&emit).await {
            Ok(()) => {
                tracing::warn!(connector = connector.name(), "loop exited; restarting");
            }
            Err(ConnectorError::ChannelClosed) => {
                tracing::info!(connector = connector.name(), "pipeline closed; stopping");
                return;
            }
            Err(ConnectorError::FatalConfig(e)) => {
                tracing::error!(
                    connector = connector.name(),
                    error = ?e,
                    "fatal configuration error; connector disabled"
                );
                return;
            }
            Err(ConnectorError::Other(e)) => {
                tracing::warn!(connector = connector.name(), error = ?e, "loop failed; restarting");
            }
        }
        counter!("connector_restarts_total").increment(1);
        tokio::time::sleep(restart_delay).await;
    }
}
