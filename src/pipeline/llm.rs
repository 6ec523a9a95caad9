//! Model interaction: submit one prompt, get back raw text.
//!
//! Everything network-shaped lives behind [`CompletionBackend`]. The trait is
//! narrow (one prompt in, optional text out) so that prompt
//! construction, post-processing and status bookkeeping never depend on a
//! particular vendor, and tests can script a backend in a few lines.
//!
//! Two implementations ship with the crate:
//!
//! * [`GeminiBackend`] speaks the Gemini `generateContent` REST API directly.
//!   The credential travels per call as the `x-goog-api-key` header, which is
//!   what lets the key live in [`crate::config::ConversionConfig`] instead of
//!   process-global state.
//! * [`ProviderBackend`] adapts any pre-built `edgequake_llm::LLMProvider`
//!   (OpenAI, Anthropic, Ollama, …). Those providers own their
//!   authentication, so they report `requires_credential() == false` and
//!   the per-call credential is ignored.
//!
//! `Ok(None)` means the service answered but produced no text. Whether that is
//! an error is the client's decision, not the backend's.

use crate::credential::Credential;
use crate::error::Md2DocError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// One prompt submission.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub credential: &'a Credential,
    pub temperature: Option<f32>,
}

/// A remote text-generation service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether calls need the per-request [`Credential`]. Backends that
    /// authenticate on their own return false.
    fn requires_credential(&self) -> bool {
        true
    }

    /// Submit one prompt. `Ok(None)` when the service returned no text.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Option<String>, Md2DocError>;
}

// ── Gemini over reqwest ──────────────────────────────────────────────────────

/// Native Gemini `generateContent` client.
pub struct GeminiBackend {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    status: Option<String>,
}

impl GeminiBackend {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, Md2DocError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Md2DocError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, model)
    }
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Option<String>, Md2DocError> {
        let start = Instant::now();
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart {
                    text: request.prompt,
                }],
            }],
            generation_config: request
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        };

        let response = self
            .client
            .post(self.url(request.model))
            .header("x-goog-api-key", request.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Md2DocError::upstream(format!("Could not connect to {}", self.endpoint))
                } else if e.is_timeout() {
                    Md2DocError::upstream("Request to the conversion service timed out")
                } else {
                    Md2DocError::upstream(e.to_string())
                }
            })?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| Md2DocError::upstream(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Md2DocError::upstream(api_error_message(status.as_u16(), &raw)));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|e| Md2DocError::upstream(format!("Invalid response from Gemini: {e}")))?;

        debug!(
            "gemini {}: {} response bytes in {:?}",
            request.model,
            raw.len(),
            start.elapsed()
        );

        Ok(response_text(&parsed))
    }
}

/// Concatenate the text parts of the first candidate, skipping thought parts.
fn response_text(response: &GenerateContentResponse) -> Option<String> {
    let parts = &response.candidates.first()?.content.as_ref()?.parts;
    let texts: Vec<&str> = parts
        .iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text.as_deref())
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    }
}

/// Turn an error body into a readable message, falling back to the raw text.
fn api_error_message(status: u16, raw: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(raw) {
        Ok(body) => match body.error.status {
            Some(code) => format!("{} ({code}, HTTP {status})", body.error.message),
            None => format!("{} (HTTP {status})", body.error.message),
        },
        Err(_) if raw.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {}", raw.trim()),
    }
}

// ── edgequake-llm provider adapter ───────────────────────────────────────────

/// Adapter over a pre-configured `edgequake_llm` provider.
///
/// The provider's own model wins; `request.model` is only logged.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CompletionBackend for ProviderBackend {
    fn name(&self) -> &str {
        "edgequake-llm"
    }

    fn requires_credential(&self) -> bool {
        false
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Option<String>, Md2DocError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(request.prompt)];
        let options = CompletionOptions {
            temperature: request.temperature,
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| Md2DocError::upstream(e.to_string()))?;

        debug!(
            "provider (requested model {}): {} input tokens, {} output tokens, {:?}",
            request.model,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.is_empty() {
            Ok(None)
        } else {
            Ok(Some(response.content))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).expect("valid fixture")
    }

    #[test]
    fn text_from_first_candidate() {
        let r = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"<h1>A</h1>"},{"text":"<p>b</p>"}]}},
                              {"content":{"parts":[{"text":"ignored"}]}}]}"#,
        );
        assert_eq!(response_text(&r).as_deref(), Some("<h1>A</h1><p>b</p>"));
    }

    #[test]
    fn thought_parts_are_skipped() {
        let r = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"thinking…","thought":true},{"text":"<p>x</p>"}]}}]}"#,
        );
        assert_eq!(response_text(&r).as_deref(), Some("<p>x</p>"));
    }

    #[test]
    fn no_candidates_is_none() {
        assert!(response_text(&parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)).is_none());
        assert!(response_text(&parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#)).is_none());
    }

    #[test]
    fn request_serialises_camel_case() {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: "hi" }],
            }],
            generation_config: Some(GenerationConfig { temperature: 0.2 }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert!(json.get("generationConfig").is_some());
    }

    #[test]
    fn api_error_message_prefers_structured_body() {
        let raw = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            api_error_message(400, raw),
            "API key not valid. (INVALID_ARGUMENT, HTTP 400)"
        );
        assert_eq!(api_error_message(502, "bad gateway"), "HTTP 502: bad gateway");
        assert_eq!(api_error_message(500, ""), "HTTP 500");
    }

    #[test]
    fn gemini_url_joins_endpoint_and_model() {
        let backend = GeminiBackend::new("http://localhost:8080/").unwrap();
        assert_eq!(
            backend.url("gemini-2.5-flash"),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
