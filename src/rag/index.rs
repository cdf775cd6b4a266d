// src/rag/index.rs
//! Retrieval index: event text -> embedding vector, brute-force cosine
//! top-K. Each canonical event becomes exactly one entry; no chunking,
//! re-ranking, or cross-event dedup at this layer.
//!
//! The index lifetime is independent of the event cache: entries are not
//! evicted when the cache rotates. An optional `max_entries` cap bounds
//! growth; unset reproduces the historical unbounded behavior.

use std::sync::RwLock;

use anyhow::Result;
use metrics::gauge;

use crate::ingest::types::CanonicalEvent;
use crate::rag::embed::{cosine_similarity, DynEmbedder};

/// Provenance carried alongside each entry and returned with hits.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EventMeta {
    pub source: String,
    pub url: String,
    pub timestamp: f64,
    pub bias: String,
}

#[derive(Debug)]
struct IndexEntry {
    id: String,
    text: String,
    vector: Vec<f32>,
    meta: EventMeta,
}

/// One ranked retrieval result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Hit {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub meta: EventMeta,
}

pub struct RetrievalIndex {
    embedder: DynEmbedder,
    entries: RwLock<Vec<IndexEntry>>,
    max_entries: Option<usize>,
}

impl RetrievalIndex {
    pub fn new(embedder: DynEmbedder, max_entries: Option<usize>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("index rwlock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index one event. Empty text is skipped. The embedding call runs
    /// before the write lock is taken; the lock covers the single insert
    /// only.
    pub async fn index(&self, event: &CanonicalEvent) -> Result<bool> {
        if event.text.trim().is_empty() {
            return Ok(false);
        }
        let vector = self.embedder.embed(&event.text).await?;

        let entry = IndexEntry {
            id: event.id(),
            text: event.text.clone(),
            vector,
            meta: EventMeta {
                source: event.source.clone(),
                url: event.url.clone(),
                timestamp: event.timestamp,
                bias: event.bias.clone(),
            },
        };

        let mut entries = self.entries.write().expect("index rwlock poisoned");
        entries.push(entry);
        if let Some(cap) = self.max_entries {
            if entries.len() > cap {
                let excess = entries.len() - cap;
                entries.drain(0..excess);
            }
        }
        gauge!("index_entries").set(entries.len() as f64);
        Ok(true)
    }

    /// Top-k entries by cosine similarity to the query text, ranked
    /// descending. Reflects a recent snapshot; indexing may proceed
    /// concurrently.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<Hit>> {
        let qvec = self.embedder.embed(text).await?;

        let entries = self.entries.read().expect("index rwlock poisoned");
        let mut scored: Vec<Hit> = entries
            .iter()
            .map(|e| Hit {
                id: e.id.clone(),
                text: e.text.clone(),
                score: cosine_similarity(&qvec, &e.vector),
                meta: e.meta.clone(),
            })
            .collect();
        drop(entries);

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}
