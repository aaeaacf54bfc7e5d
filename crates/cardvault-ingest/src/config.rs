//! Ingestion configuration.

use std::time::Duration;

use cardvault_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default upload limit: 20 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Default artifact key prefix for images.
pub const DEFAULT_IMAGE_PREFIX: &str = "images";

/// Default idle lifetime of a per-character handle.
pub const DEFAULT_HANDLE_TTL_SECS: u64 = 300;

/// Ingestion pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Uploads larger than this are rejected before parsing.
    pub max_upload_bytes: u64,
    /// Artifact key prefix; images live at `{prefix}/{character_id}.png`.
    pub image_prefix: String,
    /// Whether the post-commit artifact hook runs.
    pub hook_enabled: bool,
    /// Idle seconds before a per-character handle is evicted.
    pub handle_ttl_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            image_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
            hook_enabled: true,
            handle_ttl_secs: DEFAULT_HANDLE_TTL_SECS,
        }
    }
}

impl IngestConfig {
    /// Loads configuration from `CARDVAULT_*` environment variables.
    ///
    /// Unset or blank variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a variable cannot be parsed or the
    /// result fails [`IngestConfig::validate`].
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(max) = env_u64("CARDVAULT_MAX_UPLOAD_BYTES")? {
            config.max_upload_bytes = max;
        }
        if let Some(prefix) = env_string("CARDVAULT_IMAGE_PREFIX") {
            config.image_prefix = prefix;
        }
        if let Some(enabled) = env_bool("CARDVAULT_HOOK_ENABLED")? {
            config.hook_enabled = enabled;
        }
        if let Some(ttl) = env_u64("CARDVAULT_HANDLE_TTL_SECS")? {
            config.handle_ttl_secs = ttl;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks limits and the key prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a zero limit or TTL, or a prefix
    /// that is empty or not a plain relative key.
    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(Error::InvalidInput(
                "CARDVAULT_MAX_UPLOAD_BYTES must be greater than zero".to_string(),
            ));
        }
        if self.handle_ttl_secs == 0 {
            return Err(Error::InvalidInput(
                "CARDVAULT_HANDLE_TTL_SECS must be greater than zero".to_string(),
            ));
        }
        let prefix = self.image_prefix.trim_matches('/');
        if prefix.is_empty() || prefix.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(Error::InvalidInput(format!(
                "CARDVAULT_IMAGE_PREFIX is not a valid key prefix: {:?}",
                self.image_prefix
            )));
        }
        Ok(())
    }

    /// Upload limit as `usize`, saturating on narrow targets.
    #[must_use]
    pub fn max_upload_len(&self) -> usize {
        usize::try_from(self.max_upload_bytes).unwrap_or(usize::MAX)
    }

    /// Handle TTL as a [`Duration`].
    #[must_use]
    pub const fn handle_ttl(&self) -> Duration {
        Duration::from_secs(self.handle_ttl_secs)
    }

    /// Artifact key of a character's image.
    #[must_use]
    pub fn image_key(&self, character: impl std::fmt::Display) -> String {
        format!("{}/{character}.png", self.image_prefix.trim_matches('/'))
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u64: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &v).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = IngestConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.handle_ttl(), Duration::from_secs(300));
        assert!(config.hook_enabled);
    }

    #[test]
    fn image_key_layout() {
        let config = IngestConfig {
            image_prefix: "cards/img/".to_string(),
            ..IngestConfig::default()
        };
        assert_eq!(config.image_key("01ABC"), "cards/img/01ABC.png");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero = IngestConfig {
            max_upload_bytes: 0,
            ..IngestConfig::default()
        };
        assert!(zero.validate().is_err());

        for prefix in ["", "/", "a/../b", "a//b"] {
            let config = IngestConfig {
                image_prefix: prefix.to_string(),
                ..IngestConfig::default()
            };
            assert!(config.validate().is_err(), "prefix {prefix:?} accepted");
        }
    }

    #[test]
    fn parse_bool_values() {
        assert!(parse_bool("TEST", "Yes").unwrap());
        assert!(!parse_bool("TEST", "0").unwrap());
        assert!(parse_bool("TEST", "maybe").is_err());
    }

    #[test]
    fn deserializes_partial_config() {
        let config: IngestConfig = serde_json::from_str(r#"{"hook_enabled": false}"#).unwrap();
        assert!(!config.hook_enabled);
        assert_eq!(config.image_prefix, DEFAULT_IMAGE_PREFIX);
    }
}
