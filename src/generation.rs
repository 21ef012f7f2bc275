use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::model::StoryLength;
use crate::sanitize::strip_reasoning;

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";
pub const TEMPERATURE: f32 = 0.7;
pub const FALLBACK_STORY: &str = "Error generating story. Please try again later.";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// One chat-completion call, in the OpenAI wire shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// The remote text-generation call: prompt in, raw text out.
pub trait CompletionBackend: Send + Sync + 'static {
    fn complete(&self, request: CompletionRequest) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Groq's OpenAI-compatible chat completions endpoint.
#[derive(Clone, Debug)]
pub struct GroqBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GroqBackend {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
           api_key: api_key.into(),
        })
    }
}

impl CompletionBackend for GroqBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.api_base);

        let resp = self.client
        .post(&url)
        .bearer_auth(&self.api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| GenerationError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status, message });
        }

        let body: ChatResponse = resp
        .json()
        .await
        .map_err(|e| GenerationError::Parse(e.to_string()))?;

        body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(GenerationError::EmptyResponse)
    }
}

/// Result of one generation attempt. A failure still carries displayable text.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Generated(String),
    Failed { reason: String },
}

impl GenerationOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, GenerationOutcome::Generated(_))
    }

    pub fn story_text(&self) -> &str {
        match self {
            GenerationOutcome::Generated(text) => text,
            GenerationOutcome::Failed { .. } => FALLBACK_STORY,
        }
    }

    pub fn into_story(self) -> String {
        match self {
            GenerationOutcome::Generated(text) => text,
            GenerationOutcome::Failed { .. } => FALLBACK_STORY.to_string(),
        }
    }
}

/// Wraps a backend with the decoding parameters and output cleanup.
pub struct GenerationClient<B> {
    backend: B,
    model: String,
}

impl<B: CompletionBackend> GenerationClient<B> {
    pub fn new(backend: B, model: impl Into<String>) -> Self {
        Self { backend, model: model.into() }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn request_for(&self, prompt: &str, length: StoryLength) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: length.max_tokens(),
            temperature: TEMPERATURE,
        }
    }

    /// Single attempt, no retry. Backend errors become `Failed`.
    pub async fn generate(&self, prompt: &str, length: StoryLength) -> GenerationOutcome {
        let request = self.request_for(prompt, length);

        match self.backend.complete(request).await {
            Ok(raw) => GenerationOutcome::Generated(strip_reasoning(&raw)),
            Err(e) => {
                tracing::error!(error = %e, model = %self.model, "story generation failed");
                GenerationOutcome::Failed { reason: e.to_string() }
            }
        }
    }
}
