// src/ingest/connectors/news.rs
//! News-search API connector (GNews-style), polling mode.
//!
//! Fetches a full result snapshot per poll, diffs against the local dedup
//! set by article URL, and emits only unseen articles. HTTP 403 is the
//! provider's quota signal and is handled as a rate-limit cool-down, not
//! as an error.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::ingest::types::{CanonicalEvent, Connector, ConnectorError, Emitter, PollError};
use crate::ingest::{combine_title_body, DedupSet};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: String,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

pub struct NewsConnector {
    endpoint: String,
    api_key: String,
    query: String,
    bias: String,
    interval: Duration,
    cooldown: Duration,
    http: reqwest::Client,
    seen: Mutex<DedupSet>,
}

impl NewsConnector {
    pub fn new(
        endpoint: String,
        api_key: String,
        query: String,
        bias: String,
        interval: Duration,
        cooldown: Duration,
    ) -> Result<Self> {
        Ok(Self {
            endpoint,
            api_key,
            query,
            bias,
            interval,
            cooldown,
            http: super::http_client()?,
            seen: Mutex::new(DedupSet::default()),
        })
    }

    async fn poll_once(&self) -> Result<Vec<CanonicalEvent>, PollError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", self.query.as_str()),
                ("lang", "en"),
                ("sortby", "publishedAt"),
                ("token", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PollError::Transient(anyhow!(e).context("news api get")))?;

        if resp.status() == reqwest::StatusCode::FORBIDDEN {
            // Quota exceeded on this provider.
            return Err(PollError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(PollError::Transient(anyhow!(
                "news api status {}",
                resp.status()
            )));
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| PollError::Transient(anyhow!(e).context("news api payload")))?;

        let now = chrono::Utc::now().timestamp() as f64;
        let mut out = Vec::new();
        let mut seen = self.seen.lock().expect("news dedup mutex poisoned");
        for article in body.articles {
            if !seen.insert(&article.url) {
                continue;
            }
            let text = combine_title_body(
                article.title.as_deref().unwrap_or_default(),
                article.description.as_deref().unwrap_or_default(),
            );
            if text.is_empty() {
                continue;
            }
            let provider = article
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "Unknown".to_string());
            out.push(CanonicalEvent {
                source: format!("News/{provider}"),
                text,
                url: article.url,
                timestamp: now,
                bias: self.bias.clone(),
                lat: None,
                lon: None,
            });
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl Connector for NewsConnector {
    fn name(&self) -> &str {
        "news"
    }

    fn id_domain(&self) -> String {
        format!("news:url:{}|{}", self.endpoint, self.query)
    }

    async fn run(&self, emit: &Emitter) -> Result<(), ConnectorError> {
        if self.api_key.trim().is_empty() {
            return Err(ConnectorError::FatalConfig(
                anyhow!("empty api key").context("news connector"),
            ));
        }
        tracing::info!(query = %self.query, "news connector started");
        super::poll_loop("news", self.interval, self.cooldown, emit, || {
            self.poll_once()
        })
        .await
    }
}
