//! Chat-completion calls against OpenAI-style deployments.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{Result, ServiceClient, ServiceError};

/// One turn of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// A message with an arbitrary role.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Instructions that frame the conversation.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// A turn written by the end user.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// A prior model reply, replayed as history.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Request body for a chat-completion deployment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// A request with the deployment's default sampling settings.
    pub fn new(messages: impl Into<Vec<ChatMessage>>) -> Self {
        Self {
            messages: messages.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Sampling temperature; higher is more varied.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Upper bound on generated tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// First choice of a chat completion, plus the raw document.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletion {
    pub content: String,
    pub finish_reason: Option<String>,
    pub raw: JsonValue,
}

#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub(crate) fn decode_completion(raw: JsonValue) -> Result<ChatCompletion> {
    let envelope = CompletionEnvelope::deserialize(&raw)
        .map_err(|err| ServiceError::Decode(format!("invalid chat completion: {err}")))?;
    let choice = envelope
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::Decode("chat completion has no choices".to_owned()))?;

    Ok(ChatCompletion {
        content: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        raw,
    })
}

impl ServiceClient {
    /// Posts `request` to the deployment at `path` and returns the first choice.
    ///
    /// The call goes through [`ServiceClient::send`], so it is cooled down
    /// and retried like any other operation of this client.
    pub async fn chat_completion(&self, path: &str, request: &ChatRequest) -> Result<ChatCompletion> {
        let response = self.send(self.post(path).json(request)?).await?;
        decode_completion(response.json()?)
    }
}
