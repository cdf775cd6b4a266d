// src/config.rs
//! Engine configuration: one TOML file describing the HTTP surface, the
//! cache/index sizing, the embedding and generation collaborators, and the
//! list of connector descriptors the assembly step turns into live tasks.
//!
//! Load order: `$ENGINE_CONFIG_PATH` -> `config/engine.toml` -> built-in
//! defaults. Secrets are declared as `"ENV"` and resolved from the
//! environment when the connector is built, never stored in the file.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::rag::embed::EmbedConfig;
use crate::rag::generate::GenConfig;

pub const ENV_CONFIG_PATH: &str = "ENGINE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/engine.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Bound of the supervisor's merge channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
    /// Timeout for the query/report path (generation collaborator),
    /// distinct from per-fetch ingestion timeouts.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_k")]
    pub default_k: usize,
    /// Optional retention cap for the retrieval index. `None` reproduces
    /// the historical unbounded growth.
    #[serde(default)]
    pub index_max_entries: Option<usize>,
    #[serde(default)]
    pub embedding: EmbedConfig,
    #[serde(default)]
    pub generation: GenConfig,
    #[serde(default)]
    pub connectors: Vec<ConnectorSpec>,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_cache_capacity() -> usize {
    crate::cache::DEFAULT_CAPACITY
}
fn default_channel_capacity() -> usize {
    256
}
fn default_restart_delay_secs() -> u64 {
    5
}
fn default_query_timeout_secs() -> u64 {
    30
}
fn default_k() -> usize {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cache_capacity: default_cache_capacity(),
            channel_capacity: default_channel_capacity(),
            restart_delay_secs: default_restart_delay_secs(),
            query_timeout_secs: default_query_timeout_secs(),
            default_k: default_k(),
            index_max_entries: None,
            embedding: EmbedConfig::default(),
            generation: GenConfig::default(),
            connectors: Vec::new(),
        }
    }
}

/// One connector descriptor. The assembly function in
/// `ingest::connectors` maps each variant to a live connector; there is
/// exactly one wiring path regardless of how many descriptors appear.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ConnectorSpec {
    /// News-search API (GNews-style), polling.
    News {
        /// Literal key, or "ENV" to read `NEWS_API_KEY`.
        api_key: String,
        query: String,
        #[serde(default = "default_news_endpoint")]
        endpoint: String,
        #[serde(default = "default_news_bias")]
        bias: String,
        #[serde(default = "default_news_poll_secs")]
        poll_secs: u64,
        #[serde(default = "default_cooldown_secs")]
        cooldown_secs: u64,
    },
    /// Syndication feed, polling.
    Rss {
        url: String,
        source: String,
        bias: String,
        #[serde(default = "default_rss_poll_secs")]
        poll_secs: u64,
        #[serde(default = "default_cooldown_secs")]
        cooldown_secs: u64,
    },
    /// Public forum new-posts listing, polling with 429 cool-down.
    Forum {
        /// Multi-board syntax, e.g. "worldnews+geopolitics+news".
        subreddits: String,
        #[serde(default = "default_forum_base")]
        base_url: String,
        #[serde(default = "default_post_limit")]
        post_limit: usize,
        #[serde(default = "default_forum_poll_secs")]
        poll_secs: u64,
        #[serde(default = "default_cooldown_secs")]
        cooldown_secs: u64,
    },
    /// Push-streaming channels behind a gateway bridge. Requires the
    /// one-time session artifact produced by the out-of-band auth step.
    Channel {
        gateway_url: String,
        session_path: PathBuf,
        channels: Vec<ChannelSpec>,
        #[serde(default = "default_backfill_limit")]
        backfill_limit: usize,
    },
    /// JSONL replay for demos and load tests.
    Replay {
        path: PathBuf,
        #[serde(default = "default_replay_interval_secs")]
        interval_secs: u64,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSpec {
    pub name: String,
    #[serde(default = "default_channel_bias")]
    pub bias: String,
}

fn default_news_endpoint() -> String {
    "https://gnews.io/api/v4/search".to_string()
}
fn default_news_bias() -> String {
    "Western/Global".to_string()
}
fn default_news_poll_secs() -> u64 {
    60
}
fn default_rss_poll_secs() -> u64 {
    300
}
fn default_forum_base() -> String {
    "https://www.reddit.com".to_string()
}
fn default_post_limit() -> usize {
    50
}
fn default_forum_poll_secs() -> u64 {
    60
}
fn default_cooldown_secs() -> u64 {
    600
}
fn default_backfill_limit() -> usize {
    20
}
fn default_replay_interval_secs() -> u64 {
    10
}
fn default_channel_bias() -> String {
    "Independent".to_string()
}

/// Load configuration from an explicit TOML path.
pub fn load_from(path: &Path) -> Result<EngineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading engine config from {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration using env var + fallbacks:
/// 1) $ENGINE_CONFIG_PATH
/// 2) config/engine.toml
/// 3) built-in defaults (no connectors; mock collaborators)
pub fn load_default() -> Result<EngineConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to a non-existent path"));
    }
    let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_p.exists() {
        return load_from(&default_p);
    }
    Ok(EngineConfig::default())
}

/// Resolve an `"ENV"`-marked secret from the environment.
pub fn resolve_secret(raw: &str, env_var: &str) -> Result<String> {
    if raw.trim().eq_ignore_ascii_case("env") {
        std::env::var(env_var).map_err(|_| anyhow!("missing {env_var} env var"))
    } else {
        Ok(raw.to_string())
    }
}
