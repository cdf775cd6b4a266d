// src/ingest/connectors/rss.rs
//! Syndication feed connector, polling mode.
//!
//! Fetches the feed XML, deserializes rss/channel/item via quick-xml,
//! strips markup space-safely, and dedups by entry link. Feed dates are
//! RFC 2822; an absent or unparseable date becomes 0 and stays advisory.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::types::{CanonicalEvent, Connector, ConnectorError, Emitter, PollError};
use crate::ingest::{combine_title_body, DedupSet};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> f64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .filter(|x| *x >= 0)
        .unwrap_or(0) as f64
}

/// Replace HTML entities that are undeclared in XML before the parse.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

pub struct RssConnector {
    url: String,
    source: String,
    bias: String,
    interval: Duration,
    cooldown: Duration,
    http: reqwest::Client,
    seen: Mutex<DedupSet>,
}

impl RssConnector {
    pub fn new(
        url: String,
        source: String,
        bias: String,
        interval: Duration,
        cooldown: Duration,
    ) -> Result<Self> {
        Ok(Self {
            url,
            source,
            bias,
            interval,
            cooldown,
            http: super::http_client()?,
            seen: Mutex::new(DedupSet::default()),
        })
    }

    fn parse_feed(&self, xml: &str) -> Result<Vec<CanonicalEvent>> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        let mut seen = self.seen.lock().expect("rss dedup mutex poisoned");
        for it in rss.channel.item {
            let Some(link) = it.link else { continue };
            if !seen.insert(&link) {
                continue;
            }
            let text = combine_title_body(
                it.title.as_deref().unwrap_or_default(),
                it.description.as_deref().unwrap_or_default(),
            );
            if text.is_empty() {
                continue;
            }
            out.push(CanonicalEvent {
                source: self.source.clone(),
                text,
                url: link,
                timestamp: it
                    .pub_date
                    .as_deref()
                    .map(parse_rfc2822_to_unix)
                    .unwrap_or(0.0),
                bias: self.bias.clone(),
                lat: None,
                lon: None,
            });
        }
        Ok(out)
    }

    async fn poll_once(&self) -> Result<Vec<CanonicalEvent>, PollError> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PollError::Transient(anyhow!(e).context("rss get")))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PollError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(PollError::Transient(anyhow!(
                "rss status {} for {}",
                resp.status(),
                self.url
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| PollError::Transient(anyhow!(e).context("rss body")))?;
        self.parse_feed(&body).map_err(PollError::Transient)
    }
}

#[async_trait::async_trait]
impl Connector for RssConnector {
    fn name(&self) -> &str {
        "rss"
    }

    fn id_domain(&self) -> String {
        format!("rss:url:{}", self.url)
    }

    async fn run(&self, emit: &Emitter) -> Result<(), ConnectorError> {
        tracing::info!(source = %self.source, url = %self.url, "rss connector started");
        super::poll_loop(&self.source, self.interval, self.cooldown, emit, || {
            self.poll_once()
        })
        .await
    }
}
