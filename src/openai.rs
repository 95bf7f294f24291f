//! Clients for OpenAI-compatible provider APIs.

use crate::error::{Result, ScoutError};
use async_openai::{config::OpenAIConfig, Client};
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;

/// Create a client for an OpenAI-compatible API with an explicit base URL,
/// key and request timeout.
///
/// The client's built-in rate-limit backoff is disabled: a 429 surfaces
/// immediately as a retryable `Provider` error and `RetryPolicy` decides
/// whether to try again.
pub fn create_client(api_base: &str, api_key: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ScoutError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    let no_backoff = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(no_backoff))
}

/// Map an API error to a Scout error, marking transport and server-side
/// failures as retryable. Permanent failures are wrapped with `permanent`.
pub fn map_api_error(
    context: &str,
    err: async_openai::error::OpenAIError,
    permanent: fn(String) -> ScoutError,
) -> ScoutError {
    use async_openai::error::OpenAIError;

    match err {
        OpenAIError::Reqwest(e) => ScoutError::Provider(format!("{}: {}", context, e)),
        // Gateway pages (502/503 HTML) fail to decode as an API error body
        OpenAIError::JSONDeserialize(e) => ScoutError::Provider(format!("{}: {}", context, e)),
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.clone().unwrap_or_default();
            let message = format!("{}: {}", context, api.message);
            if kind.contains("server") || kind.contains("rate_limit") || kind.contains("overloaded") {
                ScoutError::Provider(message)
            } else {
                permanent(message)
            }
        }
        other => permanent(format!("{}: {}", context, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client() {
        assert!(create_client("https://api.groq.com/openai/v1/", "key", Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_map_api_error_classification() {
        use async_openai::error::{ApiError, OpenAIError};

        let rate_limited = OpenAIError::ApiError(ApiError {
            message: "slow down".to_string(),
            r#type: Some("rate_limit_exceeded".to_string()),
            param: None,
            code: None,
        });
        assert!(map_api_error("chat", rate_limited, ScoutError::LanguageModel).is_retryable());

        let invalid = OpenAIError::ApiError(ApiError {
            message: "bad request".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: None,
        });
        let mapped = map_api_error("embed", invalid, ScoutError::Embedding);
        assert!(!mapped.is_retryable());
        assert!(matches!(mapped, ScoutError::Embedding(_)));

        let gateway_page = serde_json::from_str::<serde_json::Value>("<html>502</html>").unwrap_err();
        let mapped = map_api_error(
            "chat",
            OpenAIError::JSONDeserialize(gateway_page),
            ScoutError::LanguageModel,
        );
        assert!(mapped.is_retryable());
    }
}
