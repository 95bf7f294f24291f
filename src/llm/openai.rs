//! Chat model backed by an OpenAI-compatible completions endpoint (Groq by default).

use super::LanguageModel;
use crate::config::LlmSettings;
use crate::error::{Result, ScoutError};
use crate::openai::{create_client, map_api_error};
use crate::retry::RetryPolicy;
use async_openai::types::{
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, Stop,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Hosted chat model driven with a single user prompt per decision round.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl OpenAIChatModel {
    /// Create a chat model from settings and an API key.
    pub fn new(settings: &LlmSettings, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: create_client(
                &settings.api_base,
                api_key,
                Duration::from_secs(settings.timeout_secs),
            )?,
            model: settings.model.clone(),
            temperature: settings.temperature,
            retry: RetryPolicy::default(),
        })
    }

    /// Set the retry policy for completion requests.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn complete_once(&self, prompt: &str, stop: &[String]) -> Result<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| ScoutError::LanguageModel(e.to_string()))?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(vec![message.into()])
            .temperature(self.temperature);
        if !stop.is_empty() {
            args.stop(Stop::StringArray(stop.to_vec()));
        }
        let request = args
            .build()
            .map_err(|e| ScoutError::LanguageModel(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| map_api_error("Chat API error", e, ScoutError::LanguageModel))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ScoutError::LanguageModel("Empty response from model".to_string()))?;

        debug!("Model returned {} chars", content.len());
        Ok(content)
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    #[instrument(skip(self, prompt, stop), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String> {
        self.retry
            .run("chat completion", || self.complete_once(prompt, stop))
            .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    fn settings_for(server: &MockServer) -> LlmSettings {
        LlmSettings {
            api_base: format!("{}/v1", server.uri()),
            ..LlmSettings::default()
        }
    }

    #[test]
    fn test_model_name() {
        let model = OpenAIChatModel::new(&LlmSettings::default(), "key").unwrap();
        assert_eq!(model.model_name(), "llama-3.3-70b-versatile");
    }

    #[tokio::test]
    async fn test_complete_sends_stop_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "model": "llama-3.3-70b-versatile",
                "stop": ["\nObservation"]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body(" I should use the calculator.")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let model = OpenAIChatModel::new(&settings_for(&server), "key")
            .unwrap()
            .with_retry(RetryPolicy::none());
        let out = model
            .complete("Question: 2+2", &["\nObservation".to_string()])
            .await
            .unwrap();

        assert_eq!(out, " I should use the calculator.");
    }

    #[tokio::test]
    async fn test_rate_limit_fails_fast_without_retry_policy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "message": "Rate limit reached",
                    "type": "rate_limit_exceeded",
                    "param": null,
                    "code": "rate_limit_exceeded"
                }
            })))
            .mount(&server)
            .await;

        let settings = LlmSettings {
            timeout_secs: 1,
            ..settings_for(&server)
        };
        let model = OpenAIChatModel::new(&settings, "key")
            .unwrap()
            .with_retry(RetryPolicy::none());

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            model.complete("Question: 2+2", &[]),
        )
        .await
        .expect("rate-limited call must not block");

        let err = result.unwrap_err();
        assert!(matches!(err, ScoutError::Provider(_)));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_gateway_error_page_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>Service Unavailable</html>"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Final Answer: 4")))
            .mount(&server)
            .await;

        let retry = RetryPolicy {
            max_retries: 1,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            multiplier: 1.0,
        };
        let model = OpenAIChatModel::new(&settings_for(&server), "key")
            .unwrap()
            .with_retry(retry);

        let out = model.complete("Question: 2+2", &[]).await.unwrap();

        assert_eq!(out, "Final Answer: 4");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}
