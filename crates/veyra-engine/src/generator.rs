//! Response generation for comments and replies.
//!
//! The engine only ever talks to [`SafeGenerator`], which bounds time and
//! length and always hands back usable text.

use crate::config::{AgentConfig, GeneratorConfig, GeneratorKind};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Comment,
    Reply,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationContext {
    pub text: Option<String>,
    pub sender_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Generator returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Generator returned no text")]
    Empty,
    #[error("Comment pool is empty")]
    EmptyPool,
}

#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        kind: GenerationKind,
        context: &GenerationContext,
    ) -> Result<String, GeneratorError>;
}

/// Fixed set of canned texts, picked at random.
pub struct CommentPool {
    comments: Vec<String>,
}

impl CommentPool {
    pub fn new(comments: Vec<String>) -> Self {
        Self {
            comments: comments
                .into_iter()
                .filter(|c| !c.trim().is_empty())
                .collect(),
        }
    }

    pub fn pick(&self) -> Option<&str> {
        self.comments
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }
}

#[async_trait]
impl ResponseGenerator for CommentPool {
    async fn generate(
        &self,
        _kind: GenerationKind,
        _context: &GenerationContext,
    ) -> Result<String, GeneratorError> {
        self.pick()
            .map(str::to_string)
            .ok_or(GeneratorError::EmptyPool)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI-compatible chat-completions client.
pub struct HttpGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpGenerator {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: std::env::var(&config.api_key_env).ok(),
        }
    }

    fn prompt(kind: GenerationKind, context: &GenerationContext) -> String {
        let text = context.text.as_deref().unwrap_or("").trim();
        match kind {
            GenerationKind::Comment if text.is_empty() => {
                "Write one short, friendly comment for a social media post.".to_string()
            }
            GenerationKind::Comment => format!(
                "Write one short, friendly comment for a social media post that reads:\n{}",
                text
            ),
            GenerationKind::Reply => {
                let sender = context.sender_name.as_deref().unwrap_or("someone");
                format!(
                    "Write one short, friendly reply to a direct message from {}. Their last message was:\n{}",
                    sender, text
                )
            }
        }
    }
}

#[async_trait]
impl ResponseGenerator for HttpGenerator {
    async fn generate(
        &self,
        kind: GenerationKind,
        context: &GenerationContext,
    ) -> Result<String, GeneratorError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: "Reply with the text only. No quotes, no hashtags.".into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: Self::prompt(kind, context),
                },
            ],
            max_tokens: 120,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(GeneratorError::Empty)
    }
}

/// Wraps any generator with a timeout, a length bound and a fallback.
pub struct SafeGenerator {
    inner: Box<dyn ResponseGenerator>,
    timeout: Duration,
    max_chars: usize,
    fallback_comment: String,
    fallback_reply: String,
}

impl SafeGenerator {
    pub fn new(inner: Box<dyn ResponseGenerator>, config: &GeneratorConfig) -> Self {
        Self {
            inner,
            timeout: config.timeout(),
            max_chars: config.max_chars.max(1),
            fallback_comment: config.fallback_comment.clone(),
            fallback_reply: config.fallback_reply.clone(),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        let inner: Box<dyn ResponseGenerator> = match config.generator.kind {
            GeneratorKind::Pool => Box::new(CommentPool::new(config.comment_pool.clone())),
            GeneratorKind::Http => Box::new(HttpGenerator::new(&config.generator)),
        };
        Self::new(inner, &config.generator)
    }

    fn fallback(&self, kind: GenerationKind) -> String {
        match kind {
            GenerationKind::Comment => self.fallback_comment.clone(),
            GenerationKind::Reply => self.fallback_reply.clone(),
        }
    }

    /// Never fails and never blocks past the configured timeout.
    pub async fn generate(&self, kind: GenerationKind, context: &GenerationContext) -> String {
        let text = match tokio::time::timeout(self.timeout, self.inner.generate(kind, context)).await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Generator failed ({:?}), using fallback: {}", kind, e);
                self.fallback(kind)
            }
            Err(_) => {
                warn!(
                    "Generator timed out after {:?} ({:?}), using fallback",
                    self.timeout, kind
                );
                self.fallback(kind)
            }
        };

        let bounded = bound_text(&text, self.max_chars);
        if bounded.is_empty() {
            return bound_text(&self.fallback(kind), self.max_chars);
        }
        debug!("Generated {:?}: {}", kind, bounded);
        bounded
    }
}

/// Trim, collapse to one line and cut to `max_chars` characters.
fn bound_text(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = single_line.trim_matches(|c| c == '"' || c == '\'');
    trimmed.chars().take(max_chars).collect::<String>().trim().to_string()
}
