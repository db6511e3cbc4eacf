use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::{GeminiConfig, SupportedModel};
use crate::errors::{GeminiError, GeminiResult, ReplyError, ReplyResult};
use crate::types::*;

/// Anything that can turn a conversation into one reply turn.
///
/// Given the full ordered history (the endpoint keeps no state of its own),
/// returns a single `model` turn with exactly one text part.
#[async_trait]
pub trait ReplyClient: Send + Sync {
    async fn send(&self, history: &[Turn]) -> ReplyResult<Turn>;
}

/// Client for interacting with the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: SupportedModel,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini API client.
    ///
    /// Fails fast on a blank API key or a model outside the allow-list.
    pub fn new(config: &GeminiConfig) -> GeminiResult<Self> {
        let api_key = config.api_key()?.to_string();
        let model = config.model()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            GeminiError::ConfigError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn model(&self) -> SupportedModel {
        self.model
    }

    /// Switch the model used for subsequent requests
    pub fn set_model(&mut self, model: SupportedModel) {
        debug!(model = %model, "Switching model");
        self.model = model;
    }

    /// Get the generateContent URL, without the key
    fn get_endpoint_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Generate content using the Gemini API and return the reply text
    pub async fn generate_content(&self, history: &[Turn]) -> ReplyResult<String> {
        let url = self.get_endpoint_url();
        let request = GenerateContentRequest { contents: history };
        debug!(url = %url, turns = history.len(), "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| ReplyError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ReplyError::Network(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = extract_error_message(&body)
                .unwrap_or_else(|| format!("API error (HTTP {})", status.as_u16()));
            warn!(status = status.as_u16(), message = %message, "Gemini API request failed");
            return Err(ReplyError::Remote(message));
        }

        let response_body: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            ReplyError::MalformedResponse(format!("Failed to parse response: {}", e))
        })?;

        extract_text_from_response(&response_body)
    }
}

#[async_trait]
impl ReplyClient for GeminiClient {
    async fn send(&self, history: &[Turn]) -> ReplyResult<Turn> {
        let text = self.generate_content(history).await?;
        Ok(Turn::model_text(text))
    }
}

/// Pulls `error.message` out of an error body, if there is one
fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorResponse>(body)
        .ok()?
        .error?
        .message
        .filter(|message| !message.is_empty())
}

/// Locates `candidates[0].content.parts[0].text`
pub fn extract_text_from_response(response: &GenerateContentResponse) -> ReplyResult<String> {
    let candidate = response.candidates.first().ok_or_else(|| {
        ReplyError::MalformedResponse("No candidates in response".to_string())
    })?;

    let content = candidate.content.as_ref().ok_or_else(|| {
        let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        ReplyError::MalformedResponse(format!("No content in candidate (finish reason: {})", reason))
    })?;

    let part = content
        .parts
        .first()
        .ok_or_else(|| ReplyError::MalformedResponse("No parts in content".to_string()))?;

    part.text
        .clone()
        .ok_or_else(|| ReplyError::MalformedResponse("No text in part".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn test_config(base_url: &str) -> GeminiConfig {
        GeminiConfig {
            api_key: Some("test-api-key".to_string()),
            base_url: Some(base_url.to_string()),
            ..GeminiConfig::default()
        }
    }

    fn test_client(base_url: &str) -> GeminiClient {
        GeminiClient::new(&test_config(base_url)).unwrap()
    }

    fn reply_body(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn test_new_rejects_missing_key() {
        let config = GeminiConfig::default();
        assert!(matches!(
            GeminiClient::new(&config),
            Err(GeminiError::ConfigError(_))
        ));
    }

    #[test]
    fn test_new_rejects_unknown_model() {
        let mut config = test_config("http://localhost");
        config.model_name = Some("gemini-0.1-nano".to_string());
        assert!(matches!(
            GeminiClient::new(&config),
            Err(GeminiError::UnsupportedModel(_))
        ));
    }

    #[tokio::test]
    async fn test_send_posts_full_history() {
        let server = MockServer::start().await;
        let history = vec![
            Turn::user_text("hello"),
            Turn::model_text("hi"),
            Turn {
                role: Role::User,
                parts: vec![
                    Part::text("what is this?"),
                    Part::InlineData(Attachment::from_bytes(b"abc", "image/png")),
                ],
            },
        ];

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(query_param("key", "test-api-key"))
            .and(body_json(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hello"}]},
                    {"role": "model", "parts": [{"text": "hi"}]},
                    {"role": "user", "parts": [
                        {"text": "what is this?"},
                        {"inline_data": {"data": "YWJj", "mime_type": "image/png"}}
                    ]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("a picture")))
            .expect(1)
            .mount(&server)
            .await;

        let turn = test_client(&server.uri()).send(&history).await.unwrap();
        assert_eq!(turn, Turn::model_text("a picture"));
    }

    #[tokio::test]
    async fn test_remote_error_message_surfaced_verbatim() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"code": 429, "message": "quota exceeded", "status": "RESOURCE_EXHAUSTED"}
            })))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .send(&[Turn::user_text("hello")])
            .await
            .unwrap_err();
        assert_eq!(err, ReplyError::Remote("quota exceeded".to_string()));
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[tokio::test]
    async fn test_remote_error_without_body_is_generic() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .send(&[Turn::user_text("hello")])
            .await
            .unwrap_err();
        assert_eq!(err, ReplyError::Remote("API error (HTTP 502)".to_string()));
    }

    #[tokio::test]
    async fn test_success_without_text_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .send(&[Turn::user_text("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, ReplyError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_success_with_non_json_body_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .send(&[Turn::user_text("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, ReplyError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let err = test_client(&uri)
            .send(&[Turn::user_text("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, ReplyError::Network(_)));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out_as_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(reply_body("late"))
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.request_timeout_secs = Some(1);
        let client = GeminiClient::new(&config).unwrap();

        let err = client.send(&[Turn::user_text("hello")]).await.unwrap_err();
        assert!(matches!(err, ReplyError::Network(_)));
    }

    #[tokio::test]
    async fn test_set_model_changes_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("pro reply")))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = test_client(&server.uri());
        client.set_model(SupportedModel::Gemini15Pro);

        let turn = client.send(&[Turn::user_text("hello")]).await.unwrap();
        assert_eq!(turn.texts().next(), Some("pro reply"));
    }

    #[test]
    fn test_empty_text_is_located_not_malformed() {
        let response: GenerateContentResponse =
            serde_json::from_value(reply_body("")).unwrap();
        assert_eq!(extract_text_from_response(&response).unwrap(), "");
    }
}
