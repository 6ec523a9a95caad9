//! One conversion call: Markdown + credential in, cleaned HTML out.
//!
//! [`ConversionClient`] owns the backend choice and nothing else. It never
//! touches queue state and never retries; the queue decides what to do with a
//! failure, and the user decides when to try again.

use crate::config::ConversionConfig;
use crate::credential::Credential;
use crate::error::Md2DocError;
use crate::pipeline::llm::{CompletionBackend, CompletionRequest, GeminiBackend, ProviderBackend};
use crate::pipeline::postprocess;
use crate::prompts::build_conversion_prompt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Performs exactly one conversion request per [`ConversionClient::convert`].
#[derive(Clone)]
pub struct ConversionClient {
    backend: Arc<dyn CompletionBackend>,
    model: String,
    temperature: Option<f32>,
    timeout: Option<Duration>,
    strict_empty_response: bool,
}

impl ConversionClient {
    /// Resolve the backend from the config, most specific first:
    ///
    /// 1. `config.backend`: caller-supplied, used as is (tests, middleware)
    /// 2. `config.provider`: an edgequake-llm provider, wrapped
    /// 3. the built-in Gemini backend at `config.endpoint`
    pub fn from_config(config: &ConversionConfig) -> Result<Self, Md2DocError> {
        let backend: Arc<dyn CompletionBackend> = if let Some(ref backend) = config.backend {
            Arc::clone(backend)
        } else if let Some(ref provider) = config.provider {
            Arc::new(ProviderBackend::new(Arc::clone(provider)))
        } else {
            Arc::new(GeminiBackend::new(config.endpoint.clone())?)
        };

        Ok(Self {
            backend,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.request_timeout_secs.map(Duration::from_secs),
            strict_empty_response: config.strict_empty_response,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// False when the backend authenticates on its own.
    pub fn requires_credential(&self) -> bool {
        self.backend.requires_credential()
    }

    /// Convert `markdown` to post-processed HTML.
    ///
    /// # Errors
    /// - [`Md2DocError::MissingCredential`] if `credential` is blank and the
    ///   backend needs one
    /// - [`Md2DocError::UpstreamError`] if the call fails, times out, or (in
    ///   strict mode) returns no text
    pub async fn convert(
        &self,
        markdown: &str,
        credential: &Credential,
    ) -> Result<String, Md2DocError> {
        if credential.is_empty() && self.requires_credential() {
            return Err(Md2DocError::MissingCredential);
        }

        let start = Instant::now();
        let prompt = build_conversion_prompt(markdown);
        let request = CompletionRequest {
            model: &self.model,
            prompt: &prompt,
            credential,
            temperature: self.temperature,
        };

        let call = self.backend.complete(request);
        let raw = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                Md2DocError::upstream(format!(
                    "Conversion timed out after {}s",
                    limit.as_secs()
                ))
            })??,
            None => call.await?,
        };

        let raw = match raw {
            Some(text) => text,
            None if self.strict_empty_response => {
                return Err(Md2DocError::upstream("The model returned an empty response"));
            }
            None => {
                warn!(
                    "{} returned no text for a {}-byte document; treating as empty HTML",
                    self.backend.name(),
                    markdown.len()
                );
                String::new()
            }
        };

        let html = postprocess::clean_html(&raw);
        debug!(
            "{} via {}: {} → {} bytes in {:?}",
            self.model,
            self.backend.name(),
            markdown.len(),
            html.len(),
            start.elapsed()
        );
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<Option<String>, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(reply: Result<Option<String>, String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: CompletionRequest<'_>,
        ) -> Result<Option<String>, Md2DocError> {
            self.prompts.lock().unwrap().push(request.prompt.to_string());
            self.reply.clone().map_err(Md2DocError::upstream)
        }
    }

    fn client(backend: Arc<Scripted>, strict: bool) -> ConversionClient {
        let config = ConversionConfig::builder()
            .backend(backend)
            .strict_empty_response(strict)
            .build()
            .unwrap();
        ConversionClient::from_config(&config).unwrap()
    }

    fn key() -> Credential {
        Credential::new("AIzaSy-test-key-000000000000")
    }

    #[tokio::test]
    async fn empty_credential_fails_before_calling_backend() {
        let backend = Scripted::new(Ok(Some("<p>x</p>".into())));
        let err = client(backend.clone(), false)
            .convert("# A", &Credential::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, Md2DocError::MissingCredential));
        assert!(backend.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn output_is_post_processed() {
        let backend = Scripted::new(Ok(Some("```html\n<h1>A</h1><hr>\n```".into())));
        let html = client(backend.clone(), false)
            .convert("# A", &key())
            .await
            .unwrap();
        assert_eq!(html, "<h1 style=\"font-weight: normal;\">A</h1>");
        assert!(backend.prompts.lock().unwrap()[0].ends_with("# A"));
    }

    #[tokio::test]
    async fn empty_response_is_empty_html_by_default() {
        let html = client(Scripted::new(Ok(None)), false)
            .convert("# A", &key())
            .await
            .unwrap();
        assert_eq!(html, "");
    }

    #[tokio::test]
    async fn empty_response_is_error_in_strict_mode() {
        let err = client(Scripted::new(Ok(None)), true)
            .convert("# A", &key())
            .await
            .unwrap_err();
        assert!(matches!(err, Md2DocError::UpstreamError { .. }));
    }

    #[tokio::test]
    async fn backend_failure_is_upstream_error() {
        let err = client(Scripted::new(Err("503 overloaded".into())), false)
            .convert("# A", &key())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "503 overloaded");
    }

    struct Stalled;

    #[async_trait]
    impl CompletionBackend for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        fn requires_credential(&self) -> bool {
            false
        }

        async fn complete(&self, _: CompletionRequest<'_>) -> Result<Option<String>, Md2DocError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some("<p>late</p>".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let config = ConversionConfig::builder()
            .backend(Arc::new(Stalled))
            .request_timeout_secs(1)
            .build()
            .unwrap();
        let client = ConversionClient::from_config(&config).unwrap();

        let err = client.convert("# A", &key()).await.unwrap_err();
        assert!(matches!(err, Md2DocError::UpstreamError { .. }));
        assert_eq!(err.to_string(), "Conversion timed out after 1s");
    }

    #[tokio::test]
    async fn requires_credential_follows_backend() {
        let config = ConversionConfig::builder()
            .backend(Arc::new(Stalled))
            .build()
            .unwrap();
        let client = ConversionClient::from_config(&config).unwrap();
        assert!(!client.requires_credential());

        let config = ConversionConfig::builder()
            .backend(Scripted::new(Ok(Some("<p>x</p>".into()))))
            .build()
            .unwrap();
        assert!(ConversionClient::from_config(&config).unwrap().requires_credential());
    }
}
