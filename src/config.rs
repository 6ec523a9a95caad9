//! Configuration types for Markdown-to-DOCX conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The credential is part of the config
//! rather than ambient state: whoever builds the config decides where the key
//! came from (environment, store, flag), and the client and queue simply
//! receive it.

use crate::credential::Credential;
use crate::error::Md2DocError;
use crate::pipeline::export::DocxOptions;
use crate::pipeline::llm::{CompletionBackend, DEFAULT_GEMINI_ENDPOINT};
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for a conversion session.
///
/// # Example
/// ```rust
/// use edgequake_md2doc::{ConversionConfig, Credential};
///
/// let config = ConversionConfig::builder()
///     .model("gemini-2.5-flash")
///     .credential(Credential::new("AIzaSy-example-key-0000000000"))
///     .build()
///     .unwrap();
/// assert!(config.credential.is_some());
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Model identifier sent with every request. Default: `gemini-2.5-flash`.
    pub model: String,

    /// Base URL of the Gemini REST API. Default: the public Google endpoint.
    pub endpoint: String,

    /// API key. `None` means conversion fails fast with `MissingCredential`.
    pub credential: Option<Credential>,

    /// Pre-constructed backend. Takes precedence over `provider` and the
    /// built-in Gemini backend.
    pub backend: Option<Arc<dyn CompletionBackend>>,

    /// Pre-constructed edgequake-llm provider, used when `backend` is unset.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. `None` leaves the service default.
    pub temperature: Option<f32>,

    /// Per-call timeout in seconds. Default: `None` (wait indefinitely).
    pub request_timeout_secs: Option<u64>,

    /// Treat an empty model response as an error. Default: false, in which
    /// case empty text converts to an empty document.
    pub strict_empty_response: bool,

    /// Page setup for DOCX export.
    pub docx: DocxOptions,

    /// Optional per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            credential: None,
            backend: None,
            provider: None,
            temperature: None,
            request_timeout_secs: None,
            strict_empty_response: false,
            docx: DocxOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("strict_empty_response", &self.strict_empty_response)
            .field("docx", &self.docx)
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// True when a non-blank credential is configured.
    pub fn has_credential(&self) -> bool {
        self.credential.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.config.credential = Some(credential);
        self
    }

    pub fn maybe_credential(mut self, credential: Option<Credential>) -> Self {
        self.config.credential = credential;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn strict_empty_response(mut self, v: bool) -> Self {
        self.config.strict_empty_response = v;
        self
    }

    pub fn docx(mut self, options: DocxOptions) -> Self {
        self.config.docx = options;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2DocError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(Md2DocError::InvalidConfig("model must not be empty".into()));
        }
        if c.backend.is_none() && c.provider.is_none() && c.endpoint.trim().is_empty() {
            return Err(Md2DocError::InvalidConfig(
                "endpoint must not be empty".into(),
            ));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(Md2DocError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.endpoint, DEFAULT_GEMINI_ENDPOINT);
        assert!(c.credential.is_none());
        assert!(c.request_timeout_secs.is_none());
        assert!(!c.strict_empty_response);
    }

    #[test]
    fn blank_credential_does_not_count() {
        let c = ConversionConfig::builder()
            .credential(Credential::new("   "))
            .build()
            .unwrap();
        assert!(!c.has_credential());
    }

    #[test]
    fn empty_model_rejected() {
        let err = ConversionConfig::builder().model(" ").build().unwrap_err();
        assert!(matches!(err, Md2DocError::InvalidConfig(_)));
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(ConversionConfig::builder()
            .request_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = ConversionConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, Some(2.0));
    }

    #[test]
    fn debug_redacts_credential() {
        let c = ConversionConfig::builder()
            .credential(Credential::new("AIzaSy-super-secret-value-123"))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
    }
}
