//! OpenAI-compatible chat-completions backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::assistant::{Completion, ImageInput, LlmAssistant};
use crate::extraction::{AssistantError, AssistantResult};
use crate::prompts::Prompt;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpCompletion {
    config: HttpConfig,
    client: reqwest::Client,
}

/// The assistant backed by a remote provider.
pub type HttpAssistant = LlmAssistant<HttpCompletion>;

impl HttpCompletion {
    pub fn new(config: HttpConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn body(&self, prompt: &Prompt, image: Option<&ImageInput>) -> Value {
        let user = match image {
            Some(image) => json!([
                {"type": "text", "text": prompt.user},
                {
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:{};base64,{}", image.mime_type, image.data_base64)
                    }
                }
            ]),
            None => Value::String(prompt.user.clone()),
        };

        let mut body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": user}
            ]
        });
        if prompt.json {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }
}

impl HttpAssistant {
    pub fn from_config(config: HttpConfig) -> AssistantResult<Self> {
        let backend = HttpCompletion::new(config).map_err(|e| AssistantError::Http(e.to_string()))?;
        Ok(LlmAssistant::new(backend))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl Completion for HttpCompletion {
    async fn complete(&self, prompt: &Prompt, image: Option<&ImageInput>) -> AssistantResult<String> {
        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));
        debug!(url = %url, model = %self.config.model, json = prompt.json, "calling AI provider");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.body(prompt, image))
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| {
                warn!(error = %e, "AI provider request failed");
                if e.is_timeout() {
                    AssistantError::Unavailable(format!("AI provider timed out: {}", e))
                } else {
                    AssistantError::Http(e.to_string())
                }
            })?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::InvalidFormat(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AssistantError::InvalidFormat("response has no message content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion() -> HttpCompletion {
        HttpCompletion::new(HttpConfig {
            api_key: "test".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_json_prompt_requests_json_object() {
        let prompt = Prompt {
            system: "sys".into(),
            user: "usr".into(),
            json: true,
        };
        let body = completion().body(&prompt, None);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][1]["content"], "usr");
    }

    #[test]
    fn test_image_is_sent_as_data_url() {
        let prompt = Prompt {
            system: "sys".into(),
            user: "usr".into(),
            json: false,
        };
        let image = ImageInput {
            mime_type: "image/png".into(),
            data_base64: "AAAA".into(),
        };
        let body = completion().body(&prompt, Some(&image));
        assert!(body.get("response_format").is_none());
        assert_eq!(
            body["messages"][1]["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }
}
