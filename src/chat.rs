//! Chat model providers implementing the core [`ChatModel`] trait.
//!
//! Both providers send a single user message and return the assistant's
//! reply text. They back the `prompt` command and multi-query expansion.

use async_trait::async_trait;
use rag_harness_core::chat::ChatModel;
use rag_harness_core::{Result, RetrievalError};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{ChatConfig, Credentials};
use crate::http::{endpoint, Service};

const OPENAI_URL: &str = "https://api.openai.com/v1";
const OLLAMA_URL: &str = "http://localhost:11434";

/// OpenAI-compatible `POST {url}/chat/completions`.
pub struct OpenAIChat {
    model: String,
    temperature: f32,
    url: String,
    api_key: String,
    service: Service,
}

impl OpenAIChat {
    /// # Errors
    ///
    /// `ConfigurationMissing` when `OPENAI_API_KEY` is not set.
    pub fn new(config: &ChatConfig, creds: &Credentials) -> Result<Self> {
        let api_key = creds.require_openai()?.to_string();
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            url: config.url.clone().unwrap_or_else(|| OPENAI_URL.to_string()),
            api_key,
            service: Service::new("OpenAI chat", config.timeout_secs, config.max_retries)?,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });
        debug!(model = %self.model, chars = prompt.len(), "chat completion");
        let reply = self
            .service
            .post_json(&endpoint(&self.url, "chat/completions"), Some(&self.api_key), &body)
            .await?;
        reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.service.unavailable("invalid response: missing choices[0].message.content"))
    }
}

/// Ollama `POST {url}/api/chat` with streaming disabled.
pub struct OllamaChat {
    model: String,
    temperature: f32,
    url: String,
    service: Service,
}

impl OllamaChat {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            url: config.url.clone().unwrap_or_else(|| OLLAMA_URL.to_string()),
            service: Service::new("Ollama chat", config.timeout_secs, config.max_retries)?,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "stream": false,
            "options": {"temperature": self.temperature},
            "messages": [{"role": "user", "content": prompt}],
        });
        let reply = self
            .service
            .post_json(&endpoint(&self.url, "api/chat"), None, &body)
            .await?;
        reply
            .pointer("/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.service.unavailable("invalid response: missing message.content"))
    }
}

/// Create the [`ChatModel`] named by `config.provider`.
///
/// A `"disabled"` provider yields `ConfigurationMissing`.
pub fn create_chat_model(config: &ChatConfig, creds: &Credentials) -> Result<Box<dyn ChatModel>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAIChat::new(config, creds)?)),
        "ollama" => Ok(Box::new(OllamaChat::new(config)?)),
        "disabled" => Err(RetrievalError::ConfigurationMissing(
            "chat provider is disabled".to_string(),
        )),
        other => Err(RetrievalError::InvalidParameter(format!(
            "unknown chat provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn config(provider: &str, url: &str) -> ChatConfig {
        ChatConfig {
            provider: provider.to_string(),
            url: Some(url.to_string()),
            ..ChatConfig::default()
        }
    }

    #[tokio::test]
    async fn test_openai_chat_returns_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "Explain attention"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "chatcmpl-1",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": "Attention weighs tokens."}}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let creds = Credentials {
            openai_api_key: Some("sk-test".to_string()),
        };
        let chat = OpenAIChat::new(&config("openai", &server.url()), &creds).unwrap();
        let reply = chat.complete("Explain attention").await.unwrap();
        assert_eq!(reply, "Attention weighs tokens.");
        mock.assert_async().await;
    }

    #[test]
    fn test_openai_chat_requires_key() {
        let err = create_chat_model(&config("openai", "http://127.0.0.1:1"), &Credentials::default())
            .err()
            .unwrap();
        assert!(matches!(err, RetrievalError::ConfigurationMissing(_)));
    }

    #[test]
    fn test_disabled_chat() {
        let err = create_chat_model(&config("disabled", "http://127.0.0.1:1"), &Credentials::default())
            .err()
            .unwrap();
        assert!(matches!(err, RetrievalError::ConfigurationMissing(_)));
    }

    #[tokio::test]
    async fn test_ollama_chat_returns_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({"stream": false})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": {"role": "assistant", "content": "hi"}, "done": true}"#)
            .create_async()
            .await;

        let chat = OllamaChat::new(&config("ollama", &server.url())).unwrap();
        assert_eq!(chat.complete("hello").await.unwrap(), "hi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ollama_chat_bad_payload_is_unavailable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"done": true}"#)
            .create_async()
            .await;

        let chat = OllamaChat::new(&config("ollama", &server.url())).unwrap();
        assert!(chat.complete("hello").await.unwrap_err().is_unavailable());
    }
}
