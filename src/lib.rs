// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod cache;
pub mod config;
pub mod geo;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod rag;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::cache::EventCache;
pub use crate::ingest::supervisor::{Supervisor, SupervisorCfg};
pub use crate::ingest::types::{CanonicalEvent, Connector, ConnectorError, Emitter, PollError};
pub use crate::rag::index::RetrievalIndex;
pub use crate::rag::service::{QueryError, QueryService};
