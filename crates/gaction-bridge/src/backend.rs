//! Remote dialog backend.
//!
//! [`DialogBackend`] is the seam between a turn and the conversational
//! engine; [`RecastClient`] is the HTTP implementation against the Recast
//! `build/v1/dialog` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use gaction_core::BackendConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::directive::Directive;
use crate::error::BackendError;

/// The user utterance forwarded to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

impl DialogInput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogRequest {
    pub input: DialogInput,
    pub conversation_id: String,
    pub memory: Map<String, Value>,
    /// Language code, e.g. `fr`.
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DialogConversation {
    #[serde(default)]
    pub memory: Option<Map<String, Value>>,
}

/// Ordered directives plus the updated memory.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DialogReply {
    #[serde(default)]
    pub messages: Vec<Directive>,
    #[serde(default)]
    pub conversation: DialogConversation,
}

impl DialogReply {
    pub fn into_parts(self) -> (Vec<Directive>, Map<String, Value>) {
        (self.messages, self.conversation.memory.unwrap_or_default())
    }
}

#[async_trait]
pub trait DialogBackend: Send + Sync {
    /// One dialog call for the bot identified by `bot_token`. Single attempt.
    async fn dialog(&self, bot_token: &str, request: &DialogRequest)
        -> Result<DialogReply, BackendError>;
}

#[derive(Serialize)]
struct RecastDialogBody<'a> {
    message: &'a DialogInput,
    conversation_id: &'a str,
    memory: &'a Map<String, Value>,
    language: &'a str,
}

#[derive(Deserialize)]
struct RecastDialogEnvelope {
    results: DialogReply,
}

/// HTTP client for the Recast dialog API.
#[derive(Clone)]
pub struct RecastClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl RecastClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn dialog_url(&self) -> String {
        format!("{}/build/v1/dialog", self.base_url)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout_secs)
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl DialogBackend for RecastClient {
    async fn dialog(
        &self,
        bot_token: &str,
        request: &DialogRequest,
    ) -> Result<DialogReply, BackendError> {
        let body = RecastDialogBody {
            message: &request.input,
            conversation_id: &request.conversation_id,
            memory: &request.memory,
            language: &request.language,
        };

        let response = self
            .client
            .post(self.dialog_url())
            .header("Authorization", format!("Token {}", bot_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: RecastDialogEnvelope = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        Ok(envelope.results)
    }
}
