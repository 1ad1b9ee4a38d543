//! Assistant bot collaborator: given the consumer's opening message, produce
//! the first reply. Generation failures surface to the consumer as a
//! `botError` event; they never take the router down.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("bot endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("bot endpoint returned an empty reply")]
    EmptyReply,
}

#[async_trait]
pub trait BotResponder: Send + Sync {
    async fn generate_reply(&self, message: &str) -> Result<String, BotError>;
}

/// Default responder when no bot endpoint is configured.
pub struct EchoBot;

#[async_trait]
impl BotResponder for EchoBot {
    async fn generate_reply(&self, message: &str) -> Result<String, BotError> {
        Ok(format!("Echo: {message}"))
    }
}

/// Posts the prompt to the product's answer endpoint.
pub struct HttpBot {
    client: reqwest::Client,
    url: String,
}

impl HttpBot {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[derive(Serialize)]
struct BotRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct BotReply {
    reply: String,
}

#[async_trait]
impl BotResponder for HttpBot {
    async fn generate_reply(&self, message: &str) -> Result<String, BotError> {
        let response = self
            .client
            .post(&self.url)
            .json(&BotRequest { message })
            .send()
            .await?
            .error_for_status()?;
        let body: BotReply = response.json().await?;
        if body.reply.is_empty() {
            return Err(BotError::EmptyReply);
        }
        Ok(body.reply)
    }
}
