// src/ingest/connectors/forum.rs
//! Public forum connector (reddit-style listing API), polling mode.
//!
//! Polls the newest-posts listing across the configured multi-board
//! query, dedups by provider-native post id, and combines title + body
//! for text posts. HTTP 429 is a first-class rate-limit transition.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::ingest::types::{CanonicalEvent, Connector, ConnectorError, Emitter, PollError};
use crate::ingest::{combine_title_body, DedupSet};

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    is_self: bool,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    created_utc: f64,
}

pub struct ForumConnector {
    base_url: String,
    subreddits: String,
    post_limit: usize,
    interval: Duration,
    cooldown: Duration,
    http: reqwest::Client,
    seen: Mutex<DedupSet>,
}

impl ForumConnector {
    pub fn new(
        base_url: String,
        subreddits: String,
        post_limit: usize,
        interval: Duration,
        cooldown: Duration,
    ) -> Result<Self> {
        Ok(Self {
            base_url,
            subreddits,
            post_limit,
            interval,
            cooldown,
            http: super::http_client()?,
            seen: Mutex::new(DedupSet::default()),
        })
    }

    fn collect_unseen(&self, listing: Listing) -> Vec<CanonicalEvent> {
        let mut out = Vec::new();
        let mut seen = self.seen.lock().expect("forum dedup mutex poisoned");
        for child in listing.data.children {
            let post = child.data;
            let Some(id) = post.id else { continue };
            if !seen.insert(&id) {
                continue;
            }
            // Link posts carry no body; selftext belongs to text posts only.
            let body = if post.is_self { post.selftext.as_str() } else { "" };
            let text = combine_title_body(&post.title, body);
            if text.is_empty() {
                continue;
            }
            out.push(CanonicalEvent {
                source: "Forum".to_string(),
                text,
                url: format!("{}{}", self.base_url, post.permalink),
                timestamp: post.created_utc,
                bias: "Varied/Unknown".to_string(),
                lat: None,
                lon: None,
            });
        }
        out
    }

    async fn poll_once(&self) -> Result<Vec<CanonicalEvent>, PollError> {
        let url = format!(
            "{}/r/{}/new.json?limit={}",
            self.base_url, self.subreddits, self.post_limit
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PollError::Transient(anyhow!(e).context("forum get")))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PollError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(PollError::Transient(anyhow!(
                "forum status {}",
                resp.status()
            )));
        }

        let listing: Listing = resp
            .json()
            .await
            .map_err(|e| PollError::Transient(anyhow!(e).context("forum payload")))?;
        Ok(self.collect_unseen(listing))
    }
}

#[async_trait::async_trait]
impl Connector for ForumConnector {
    fn name(&self) -> &str {
        "forum"
    }

    fn id_domain(&self) -> String {
        format!("forum:post-id:{}", self.subreddits)
    }

    async fn run(&self, emit: &Emitter) -> Result<(), ConnectorError> {
        tracing::info!(boards = %self.subreddits, "forum connector started");
        super::poll_loop("forum", self.interval, self.cooldown, emit, || {
            self.poll_once()
        })
        .await
    }
}
