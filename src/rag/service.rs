// src/rag/service.rs
//! Query service: retrieve top-K context from the index, assemble a
//! grounded prompt, and forward it to the generation collaborator.
//!
//! The situation report is a separate, on-demand operation grounded on
//! the WHOLE current event cache, not the index.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;

use crate::cache::EventCache;
use crate::ingest::types::CanonicalEvent;
use crate::rag::generate::DynGenClient;
use crate::rag::index::{Hit, RetrievalIndex};

/// Typed failure of the query/report path, surfaced to the caller.
#[derive(Debug)]
pub enum QueryError {
    /// Embedding or lookup failed.
    Index(anyhow::Error),
    /// The generation collaborator failed.
    Generation(anyhow::Error),
    /// The generation collaborator exceeded the query-path timeout.
    Timeout(Duration),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Index(e) => write!(f, "retrieval failed: {e}"),
            QueryError::Generation(e) => write!(f, "generation failed: {e}"),
            QueryError::Timeout(d) => {
                write!(f, "generation timed out after {}s", d.as_secs())
            }
        }
    }
}

impl std::error::Error for QueryError {}

pub struct QueryService {
    index: Arc<RetrievalIndex>,
    client: DynGenClient,
    /// Bound on the generation call, distinct from ingestion timeouts.
    timeout: Duration,
    default_k: usize,
}

impl QueryService {
    pub fn new(
        index: Arc<RetrievalIndex>,
        client: DynGenClient,
        timeout: Duration,
        default_k: usize,
    ) -> Self {
        Self {
            index,
            client,
            timeout,
            default_k: default_k.max(1),
        }
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Context block in retrieval-rank order followed by the question.
    pub fn build_answer_prompt(hits: &[Hit], question: &str) -> String {
        let context = hits
            .iter()
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        format!("Given the following documents : \n {context} \nanswer this query: {question}")
    }

    /// SITREP instruction over the current cache contents, one cited
    /// line per event.
    pub fn build_report_prompt(events: &[CanonicalEvent]) -> String {
        let context = events
            .iter()
            .map(|d| format!("- {}-{}-{}", d.text, d.source, d.bias))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "TASK: Synthesize the provided 'Raw Intel' into a professional News Briefing.\n\
             CONSTRAINTS:\n\
             1. Use ONLY the provided text below. Do NOT fill in missing data like names, dates, or events not present.\n\
             2. Tone: Objective, Journalistic, Concise.\n\
             3. Cite the source name in brackets [Source] for every claim.\n\
             4. Reply in plain text, do not give response in markdown.\n\
             \n\
             RAW INTEL:\n\
             {context}\n\
             \n\
             REQUIRED OUTPUT FORMAT:\n\
             GLOBAL SITUATION SUMMARY\n\
             KEY DEVELOPMENTS\n\
             OUTLOOK"
        )
    }

    /// Answer a natural-language question grounded on the top-k context
    /// events. Returns the collaborator's output verbatim.
    pub async fn answer(&self, question: &str, k: Option<usize>) -> Result<String, QueryError> {
        counter!("query_requests_total").increment(1);
        let k = k.unwrap_or(self.default_k).max(1);
        let hits = self
            .index
            .query(question, k)
            .await
            .map_err(QueryError::Index)?;
        let prompt = Self::build_answer_prompt(&hits, question);
        self.generate_bounded(&prompt).await
    }

    /// Synthesize a structured situation summary over the entire current
    /// event cache.
    pub async fn report(&self, cache: &EventCache) -> Result<String, QueryError> {
        counter!("report_requests_total").increment(1);
        let events = cache.read_all();
        let prompt = Self::build_report_prompt(&events);
        self.generate_bounded(&prompt).await
    }

    async fn generate_bounded(&self, prompt: &str) -> Result<String, QueryError> {
        match tokio::time::timeout(self.timeout, self.client.generate(prompt)).await {
            Ok(Ok(out)) => Ok(out),
            Ok(Err(e)) => Err(QueryError::Generation(e)),
            Err(_) => Err(QueryError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::index::EventMeta;

    fn hit(text: &str) -> Hit {
        Hit {
            id: "x".into(),
            text: text.into(),
            score: 1.0,
            meta: EventMeta {
                source: "S".into(),
                url: "u".into(),
                timestamp: 0.0,
                bias: "B".into(),
            },
        }
    }

    #[test]
    fn answer_prompt_keeps_rank_order_and_question() {
        let prompt =
            QueryService::build_answer_prompt(&[hit("first"), hit("second")], "what happened?");
        let ctx_first = prompt.find("first").unwrap();
        let ctx_second = prompt.find("second").unwrap();
        assert!(ctx_first < ctx_second);
        assert!(prompt.ends_with("answer this query: what happened?"));
    }

    #[test]
    fn report_prompt_cites_source_and_bias_per_line() {
        let ev = CanonicalEvent {
            source: "Wire".into(),
            text: "Border crossing closed".into(),
            url: "u".into(),
            timestamp: 0.0,
            bias: "Independent".into(),
            lat: None,
            lon: None,
        };
        let prompt = QueryService::build_report_prompt(&[ev]);
        assert!(prompt.contains("- Border crossing closed-Wire-Independent"));
        assert!(prompt.contains("RAW INTEL"));
    }
}
