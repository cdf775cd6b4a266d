// src/rag/generate.rs
//! Generation collaborator: grounded prompt -> prose answer.
//!
//! Provider abstraction in the same shape as the embedding side:
//! "openai" (chat-completions HTTP call), "mock" (deterministic echo for
//! tests and offline demos), "disabled" (typed error).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[async_trait::async_trait]
pub trait GenClient: Send + Sync {
    /// Turn a fully assembled prompt into prose. Errors are surfaced to
    /// the query/report caller, never swallowed.
    async fn generate(&self, prompt: &str) -> Result<String>;
    fn provider_name(&self) -> &'static str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenConfig {
    /// "openai" | "mock" | "disabled"
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default = "default_key")]
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_key() -> String {
    "ENV".to_string()
}
fn default_max_tokens() -> u32 {
    800
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: default_model(),
            api_key: default_key(),
            max_tokens: default_max_tokens(),
        }
    }
}

pub type DynGenClient = Arc<dyn GenClient>;

/// Factory: build a generation client according to config and environment.
/// `GEN_TEST_MODE=mock` forces the deterministic mock.
pub fn build_gen_client(cfg: &GenConfig) -> DynGenClient {
    if std::env::var("GEN_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockGenClient);
    }
    match cfg.provider.to_lowercase().as_str() {
        "openai" => {
            let key = crate::config::resolve_secret(&cfg.api_key, "OPENAI_API_KEY")
                .unwrap_or_default();
            if key.is_empty() {
                tracing::warn!("generation key missing; generation disabled");
                return Arc::new(DisabledGenClient);
            }
            Arc::new(OpenAiGenClient::new(key, cfg.model.clone(), cfg.max_tokens))
        }
        "mock" => Arc::new(MockGenClient),
        _ => Arc::new(DisabledGenClient),
    }
}

/// Chat-completions HTTP provider.
pub struct OpenAiGenClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiGenClient {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("flashpoint-engine/0.1 (+generation)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model,
            max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl GenClient for OpenAiGenClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
            max_tokens: self.max_tokens,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("generation request")?;

        if !resp.status().is_success() {
            bail!("generation api status {}", resp.status());
        }
        let body: Resp = resp.json().await.context("generation payload")?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.is_empty() {
            bail!("empty generation response");
        }
        Ok(content)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Deterministic echo used in tests and offline demos: callers can assert
/// on the prompt the service assembled.
pub struct MockGenClient;

#[async_trait::async_trait]
impl GenClient for MockGenClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(format!("[mock] {prompt}"))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Typed failure for every call; used when generation is not configured.
pub struct DisabledGenClient;

#[async_trait::async_trait]
impl GenClient for DisabledGenClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        bail!("generation provider is disabled")
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}
