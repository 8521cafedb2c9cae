use crate::config::UpstreamConfig;
use crate::error::UpstreamError;
use crate::model::{ChatCompletionRequest, ChatCompletionResponse};
use crate::prompt::Prompt;
use crate::stats::UpstreamStats;
use std::time::Instant;
use tracing::{debug, warn};

/// Answer returned when no upstream credential is configured.
pub const FALLBACK_ANSWER: &str =
    "The AI advisor is offline right now (no upstream key configured). Stick to needs, skip the wants, and ask again later.";

#[derive(Debug)]
struct Upstream {
    client: reqwest::Client,
    config: UpstreamConfig,
}

#[derive(Debug)]
pub struct InferenceGateway {
    upstream: Option<Upstream>,
    pub stats: UpstreamStats,
}

impl InferenceGateway {
    pub fn new(config: Option<UpstreamConfig>) -> Result<Self, reqwest::Error> {
        let upstream = match config {
            Some(config) => {
                let client = reqwest::Client::builder().timeout(config.timeout).build()?;
                Some(Upstream { client, config })
            }
            None => None,
        };
        Ok(Self {
            upstream,
            stats: UpstreamStats::new(),
        })
    }

    pub fn fallback() -> Self {
        Self {
            upstream: None,
            stats: UpstreamStats::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.upstream.is_none()
    }

    pub fn mode(&self) -> &'static str {
        if self.is_fallback() {
            "fallback"
        } else {
            "upstream"
        }
    }

    /// One upstream call, no retries.
    pub async fn answer(&self, prompt: &Prompt) -> Result<String, UpstreamError> {
        let Some(upstream) = &self.upstream else {
            debug!("No upstream configured, returning fallback answer");
            return Ok(FALLBACK_ANSWER.to_string());
        };

        let start = Instant::now();
        let result = upstream.call(prompt).await;
        match &result {
            Ok(_) => self.stats.record_success(start.elapsed()),
            Err(e) => {
                self.stats.record_failure();
                warn!("Upstream call failed after {:?}: {}", start.elapsed(), e);
            }
        }
        result
    }
}

impl Upstream {
    async fn call(&self, prompt: &Prompt) -> Result<String, UpstreamError> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: prompt.messages(),
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                self.classify(e)
            } else {
                UpstreamError::Malformed(e.to_string())
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| UpstreamError::Malformed("no choices in response".to_string()))
    }

    fn classify(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            UpstreamError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Request;
    use crate::prompt::PromptBuilder;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, timeout: Duration) -> UpstreamConfig {
        UpstreamConfig {
            endpoint: format!("{}/v1/chat/completions", server.uri()),
            api_key: "hf_test".to_string(),
            model: "test-model".to_string(),
            timeout,
            max_tokens: 512,
        }
    }

    fn prompt() -> Prompt {
        PromptBuilder::default().build(&Request::new("Can I buy a ₹10 pen?"))
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "cmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic_and_offline() {
        let gateway = InferenceGateway::new(None).unwrap();
        assert!(gateway.is_fallback());
        assert_eq!(gateway.mode(), "fallback");
        let first = gateway.answer(&prompt()).await.unwrap();
        let second = gateway.answer(&prompt()).await.unwrap();
        assert_eq!(first, FALLBACK_ANSWER);
        assert_eq!(first, second);
        assert_eq!(gateway.stats.snapshot().requests, 0);
    }

    #[tokio::test]
    async fn test_upstream_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("hf_test"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "max_tokens": 512,
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Yes, a pen is a need.")))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = InferenceGateway::new(Some(config(&server, Duration::from_secs(5)))).unwrap();
        assert_eq!(gateway.mode(), "upstream");
        let answer = gateway.answer(&prompt()).await.unwrap();
        assert_eq!(answer, "Yes, a pen is a need.");
        assert_eq!(gateway.stats.snapshot().requests, 1);
        assert_eq!(gateway.stats.snapshot().errors, 0);
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model is loading"))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = InferenceGateway::new(Some(config(&server, Duration::from_secs(5)))).unwrap();
        let err = gateway.answer(&prompt()).await.unwrap_err();
        assert_eq!(
            err,
            UpstreamError::Status {
                status: 503,
                body: "model is loading".to_string()
            }
        );
        assert_eq!(gateway.stats.snapshot().errors, 1);
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("late"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let gateway = InferenceGateway::new(Some(config(&server, Duration::from_millis(200)))).unwrap();
        let err = gateway.answer(&prompt()).await.unwrap_err();
        assert_eq!(err, UpstreamError::Timeout(200));
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let gateway = InferenceGateway::new(Some(config(&server, Duration::from_secs(5)))).unwrap();
        let err = gateway.answer(&prompt()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let config = UpstreamConfig {
            endpoint: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            api_key: "hf_test".to_string(),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(2),
            max_tokens: 16,
        };
        let gateway = InferenceGateway::new(Some(config)).unwrap();
        let err = gateway.answer(&prompt()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Network(_) | UpstreamError::Timeout(_)));
    }
}
