use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::collaborator::{CollaboratorError, LlmClient, LlmRequest, LlmResponse};
use crate::dsl::LlmUsage;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub request_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            default_model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// OpenAI-compatible chat-completions client. Structured output is requested
/// through `response_format: json_schema` and the reply content is parsed
/// back into a JSON value.
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn build_headers(&self) -> Result<HeaderMap, CollaboratorError> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|e| CollaboratorError::AuthenticationError(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn build_payload(&self, request: &LlmRequest) -> Value {
        let model = request
            .params
            .model
            .clone()
            .unwrap_or_else(|| self.config.default_model.clone());

        let mut payload = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
        });

        if let Some(temp) = request.params.temperature {
            if let Some(n) = serde_json::Number::from_f64(temp) {
                payload["temperature"] = Value::Number(n);
            }
        }
        if let Some(top_p) = request.params.top_p {
            if let Some(n) = serde_json::Number::from_f64(top_p) {
                payload["top_p"] = Value::Number(n);
            }
        }
        if let Some(max_tokens) = request.params.max_tokens {
            payload["max_tokens"] = Value::Number(serde_json::Number::from(max_tokens));
        }
        if let Some(schema) = &request.response_schema {
            payload["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "node_output",
                    "strict": true,
                    "schema": schema,
                },
            });
        }

        payload
    }

    fn parse_usage(body: &Value) -> LlmUsage {
        let usage = body.get("usage").cloned().unwrap_or(Value::Null);
        LlmUsage {
            prompt_tokens: usage
                .get("prompt_tokens")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
            completion_tokens: usage
                .get("completion_tokens")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
            total_tokens: usage
                .get("total_tokens")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
        }
    }

    fn parse_content(body: &Value) -> Result<String, CollaboratorError> {
        body.get("choices")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                CollaboratorError::InvalidResponse("response carries no message content".into())
            })
    }

    fn map_error(status: u16, body: &str, retry_after: Option<u64>) -> CollaboratorError {
        if status == 401 || status == 403 {
            return CollaboratorError::AuthenticationError(body.to_string());
        }
        if status == 429 {
            return CollaboratorError::RateLimited { retry_after };
        }
        CollaboratorError::ApiError {
            status,
            message: body.to_string(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, CollaboratorError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = self.build_payload(&request);
        let structured = request.response_schema.is_some();

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers()?)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollaboratorError::Timeout
                } else {
                    CollaboratorError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_error(status.as_u16(), &body, retry_after));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
        let content = Self::parse_content(&body)?;
        let usage = Self::parse_usage(&body);

        let value = if structured {
            serde_json::from_str(&content).map_err(|e| {
                CollaboratorError::InvalidResponse(format!(
                    "expected structured JSON content: {}",
                    e
                ))
            })?
        } else {
            Value::String(content)
        };

        Ok(LlmResponse {
            value,
            usage: Some(usage),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::LlmParams;
    use serde_json::json;

    fn client() -> OpenAiClient {
        OpenAiClient::new(OpenAiConfig {
            api_key: "sk-test".into(),
            default_model: "test-model".into(),
            ..OpenAiConfig::default()
        })
    }

    fn request(schema: Option<Value>) -> LlmRequest {
        LlmRequest {
            prompt: "Summarize: hello world".into(),
            response_schema: schema,
            params: LlmParams::default(),
        }
    }

    #[test]
    fn test_build_payload_plain() {
        let payload = client().build_payload(&request(None));
        assert_eq!(payload["model"], "test-model");
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][0]["content"], "Summarize: hello world");
        assert!(payload.get("response_format").is_none());
        assert!(payload.get("temperature").is_none());
    }

    #[test]
    fn test_build_payload_with_schema_and_params() {
        let schema = json!({ "type": "object", "properties": {} });
        let mut req = request(Some(schema.clone()));
        req.params = LlmParams {
            model: Some("other-model".into()),
            temperature: Some(0.1),
            top_p: None,
            max_tokens: Some(256),
        };
        let payload = client().build_payload(&req);
        assert_eq!(payload["model"], "other-model");
        assert_eq!(payload["temperature"], 0.1);
        assert_eq!(payload["max_tokens"], 256);
        assert_eq!(payload["response_format"]["type"], "json_schema");
        assert_eq!(payload["response_format"]["json_schema"]["strict"], true);
        assert_eq!(payload["response_format"]["json_schema"]["schema"], schema);
    }

    #[test]
    fn test_parse_content_and_usage() {
        let body = json!({
            "model": "test-model",
            "choices": [
                { "message": { "role": "assistant", "content": "{\"summary\":\"hi\"}" } }
            ],
            "usage": { "prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16 }
        });
        assert_eq!(
            OpenAiClient::parse_content(&body).unwrap(),
            "{\"summary\":\"hi\"}"
        );
        let usage = OpenAiClient::parse_usage(&body);
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.total_tokens, 16);
    }

    #[test]
    fn test_parse_content_missing() {
        let body = json!({ "choices": [] });
        let err = OpenAiClient::parse_content(&body).unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidResponse(_)));
    }

    #[test]
    fn test_map_error_auth() {
        assert!(matches!(
            OpenAiClient::map_error(401, "bad key", None),
            CollaboratorError::AuthenticationError(_)
        ));
        assert!(matches!(
            OpenAiClient::map_error(403, "forbidden", None),
            CollaboratorError::AuthenticationError(_)
        ));
    }

    #[test]
    fn test_map_error_rate_limited() {
        let err = OpenAiClient::map_error(429, "slow down", Some(12));
        assert!(matches!(
            err,
            CollaboratorError::RateLimited {
                retry_after: Some(12)
            }
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_map_error_other() {
        let err = OpenAiClient::map_error(500, "server error", None);
        assert!(matches!(
            err,
            CollaboratorError::ApiError { status: 500, .. }
        ));
        assert!(!err.is_retryable());
    }
}
