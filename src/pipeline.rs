// src/pipeline.rs
//! Fan-in consumer: merged connector output -> validate -> geo-enrich ->
//! event cache + retrieval index.
//!
//! Malformed records are dropped before enrichment with an observable
//! counter; an embedding failure for one event is skipped, never aborting
//! the loop. The same per-event path backs the HTTP intake endpoint.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cache::EventCache;
use crate::geo;
use crate::ingest::types::CanonicalEvent;
use crate::rag::index::RetrievalIndex;

/// Process one canonical event end to end. Returns the reason when the
/// record is dropped at the validation boundary.
pub async fn ingest_one(
    mut event: CanonicalEvent,
    cache: &EventCache,
    index: &RetrievalIndex,
) -> Result<(), &'static str> {
    if let Err(reason) = event.validate() {
        counter!("pipeline_dropped_total").increment(1);
        tracing::debug!(reason, "dropped malformed record");
        return Err(reason);
    }

    geo::enrich(&mut event);
    cache.push(event.clone());

    if let Err(e) = index.index(&event).await {
        // Skip and continue; the cache already holds the event.
        tracing::warn!(error = ?e, source = %event.source, "indexing failed, event skipped");
        counter!("index_errors_total").increment(1);
    }
    Ok(())
}

/// Spawn the long-lived consumer over the supervisor's merged receiver.
/// The task ends when every connector sender is gone.
pub fn spawn(
    mut rx: mpsc::Receiver<CanonicalEvent>,
    cache: Arc<EventCache>,
    index: Arc<RetrievalIndex>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let _ = ingest_one(event, &cache, &index).await;
        }
        tracing::info!("pipeline input closed");
    })
}
