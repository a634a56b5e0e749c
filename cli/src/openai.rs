//! OpenAI-compatible chat completion capability.

use std::time::Duration;

use async_trait::async_trait;
use dvtreport::{GenerationCapability, TaskError};
use log::debug;
use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str = "You are a technical writer preparing design verification test \
reports for a regulated medical device company. Write precise, factual text and never invent data.";

/// Text generation through a `/chat/completions` endpoint.
pub struct ChatCompletionCapability {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ChatCompletionCapability {
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn url(&self) -> String {
        if self.endpoint.ends_with("/chat/completions") {
            self.endpoint.clone()
        } else {
            format!("{}/chat/completions", self.endpoint)
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl GenerationCapability for ChatCompletionCapability {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, TaskError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature,
        };

        let url = self.url();
        debug!(
            "POST {} (model {}, temperature {}, {} prompt chars)",
            url,
            self.model,
            temperature,
            prompt.chars().count()
        );
        let mut request = self.client.post(url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TaskError::Capability("request timed out".to_string())
            } else {
                TaskError::Capability(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TaskError::Capability(format!(
                "endpoint returned {}: {}",
                status,
                detail.chars().take(200).collect::<String>()
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| TaskError::Malformed(e.to_string()))?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(TaskError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_appends_path_once() {
        let capability =
            ChatCompletionCapability::new("http://localhost:8080/v1/", "m", None, 5).unwrap();
        assert_eq!(capability.url(), "http://localhost:8080/v1/chat/completions");

        let capability = ChatCompletionCapability::new(
            "http://localhost:8080/v1/chat/completions",
            "m",
            Some(" ".into()),
            5,
        )
        .unwrap();
        assert_eq!(capability.url(), "http://localhost:8080/v1/chat/completions");
        assert!(capability.api_key.is_none());
    }

    #[test]
    fn test_response_shape() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"Hello"}}]}"#;
        let reply: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(reply.choices[0].message.content.as_deref(), Some("Hello"));
    }
}
