use super::{ensure_success, ChatModel, HttpClient};
use crate::errors::{ApiError, ApiResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const SOURCE_NAME: &str = "openrouter";

/// One prompt for a chat model
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenRouter chat completions client bound to one model
pub struct OpenRouterClient {
    http_client: HttpClient,
    url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub const EXPERT_MODEL: &'static str = "meta-llama/llama-3-70b-instruct";
    pub const ASSISTANT_MODEL: &'static str = "openai/gpt-4o";

    pub fn new(http_client: HttpClient, url: String, api_key: String, model: &str) -> Self {
        Self {
            http_client,
            url,
            api_key,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenRouterClient {
    async fn complete(&self, request: ChatRequest) -> ApiResult<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: &request.prompt,
        });

        let body = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: 0.7,
        };

        let resp = self
            .http_client
            .get_client()
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "Star Collector")
            .json(&body)
            .send()
            .await?;

        let completion: CompletionResponse = ensure_success(SOURCE_NAME, resp)?.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ApiError::payload(SOURCE_NAME, "completion had no content"))
    }
}
