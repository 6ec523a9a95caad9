//! The conversion-service credential and its on-disk store.
//!
//! There is exactly one secret: the API key for the conversion backend. It is
//! loaded once at startup, held in [`crate::config::ConversionConfig`], and
//! written back whenever the user sets a new one. Nothing else in the crate
//! reads the store, so the key only travels as the backend's auth parameter.

use crate::error::Md2DocError;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Key under which the secret is persisted inside the store file.
pub const CREDENTIAL_KEY: &str = "gemini_api_key";

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "edgequake-md2doc";

/// Store file name inside [`APP_DIR`].
pub const STORE_FILE: &str = "credentials.json";

/// Shortest key accepted by [`Credential::parse`].
pub const MIN_KEY_LEN: usize = 20;

/// An opaque API secret. `Debug` never prints the value, and there is no
/// serde impl: the store writes it explicitly.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw secret without validation.
    ///
    /// Used for values coming from the environment or the store, which were
    /// either validated on save or are the user's explicit choice.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Validate user input: trimmed, and at least [`MIN_KEY_LEN`] characters.
    pub fn parse(input: &str) -> Result<Self, Md2DocError> {
        let trimmed = input.trim();
        if trimmed.chars().count() < MIN_KEY_LEN {
            return Err(Md2DocError::InvalidCredential(
                "Invalid API Key format. It should be a long string.".into(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// JSON file holding the persisted credential.
///
/// The file is a JSON object. Keys other than [`CREDENTIAL_KEY`] are kept as
/// they are, whatever their type, when the credential is saved.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the platform config directory, e.g.
    /// `~/.config/edgequake-md2doc/credentials.json`.
    pub fn default_location() -> Result<Self, Md2DocError> {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .ok_or_else(|| Md2DocError::CredentialStore {
                path: PathBuf::from(STORE_FILE),
                reason: "no config or home directory for this user".into(),
            })?;
        Ok(Self::at(base.join(APP_DIR).join(STORE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential. A missing file is not an error.
    pub async fn load(&self) -> Result<Option<Credential>, Md2DocError> {
        let Some(file) = self.read_object().await? else {
            debug!("No credential store at {}", self.path.display());
            return Ok(None);
        };

        Ok(file
            .get(CREDENTIAL_KEY)
            .and_then(Value::as_str)
            .filter(|v| !v.trim().is_empty())
            .map(Credential::new))
    }

    /// Persist `credential`, keeping any other keys already in the file.
    ///
    /// Uses an atomic write (temp file + rename) so a crash never leaves a
    /// truncated store behind. On unix the file is readable by its owner only.
    /// A store that cannot be read or parsed is reported, never overwritten.
    pub async fn save(&self, credential: &Credential) -> Result<(), Md2DocError> {
        let mut file = self.read_object().await?.unwrap_or_default();
        file.insert(
            CREDENTIAL_KEY.to_string(),
            Value::String(credential.expose().to_string()),
        );

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.store_error(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(&Value::Object(file))
            .map_err(|e| self.store_error(e.to_string()))?;
        let tmp_path = self.path.with_extension("json.tmp");
        write_private(&tmp_path, json.as_bytes())
            .await
            .map_err(|e| self.store_error(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.store_error(e.to_string()))?;

        info!("Saved API key to {}", self.path.display());
        Ok(())
    }

    /// Read the store as a JSON object. `Ok(None)` only when the file is absent.
    async fn read_object(&self) -> Result<Option<Map<String, Value>>, Md2DocError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.store_error(e.to_string())),
        };
        match serde_json::from_str::<Value>(&raw).map_err(|e| self.store_error(e.to_string()))? {
            Value::Object(map) => Ok(Some(map)),
            _ => Err(self.store_error("expected a JSON object".into())),
        }
    }

    fn store_error(&self, reason: String) -> Md2DocError {
        Md2DocError::CredentialStore {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Write `bytes` to a fresh file at `path`, mode 0600 on unix.
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}
