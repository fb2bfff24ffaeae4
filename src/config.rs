//! Configuration file parser for ~/.config/infinilist/config.toml.
//!
//! Every key is optional and so is the file itself. Keys this version does
//! not know are reported in the log and otherwise ignored.

use serde::Deserialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

use crate::list::FailurePolicy;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] io::Error),

    #[error("Config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// Well-formed TOML with a value that cannot be used.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Application-wide list settings. `Debug` hides `api_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rows requested per page.
    pub page_size: u32,

    /// Keep a header sentinel row at the top of every list.
    pub has_header: bool,

    /// Append a footer sentinel row once all pages are loaded.
    pub has_footer: bool,

    /// Persist list state in session storage across navigation.
    pub cache: bool,

    /// Maximum number of list states kept in session storage.
    pub session_capacity: usize,

    /// What a failed page fetch leaves behind ("latch" or "rewind").
    pub failure_policy: FailurePolicy,

    /// Record field used for stable row keys.
    pub id_field: String,

    /// Base URL of the REST entity API. When unset the demo uses SQLite.
    pub api_base_url: Option<String>,

    /// Bearer token for the REST entity API.
    pub api_token: Option<String>,

    /// Per-request timeout for the REST entity API.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: 20,
            has_header: false,
            has_footer: false,
            cache: true,
            session_capacity: 64,
            failure_policy: FailurePolicy::Latch,
            id_field: "id".to_string(),
            api_base_url: None,
            api_token: None,
            request_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("page_size", &self.page_size)
            .field("has_header", &self.has_header)
            .field("has_footer", &self.has_footer)
            .field("cache", &self.cache)
            .field("session_capacity", &self.session_capacity)
            .field("failure_policy", &self.failure_policy)
            .field("id_field", &self.id_field)
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 10] = [
        "page_size",
        "has_header",
        "has_footer",
        "cache",
        "session_capacity",
        "failure_policy",
        "id_field",
        "api_base_url",
        "api_token",
        "request_timeout_secs",
    ];

    /// Read and parse `path`.
    ///
    /// A missing file is not an error and yields the defaults. Files over
    /// 1 MB are refused before being read.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let size = file.metadata()?.len();
        if size > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "{} is {size} bytes, limit is {}",
                path.display(),
                Self::MAX_FILE_SIZE
            )));
        }

        // The file may grow after the size check.
        let mut content = String::new();
        file.take(Self::MAX_FILE_SIZE + 1)
            .read_to_string(&mut content)?;
        if content.len() as u64 > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "{} grew past {} bytes while reading",
                path.display(),
                Self::MAX_FILE_SIZE
            )));
        }

        Self::parse(&content)
    }

    /// Parse TOML text. Blank text yields the defaults; unknown keys are
    /// logged and skipped.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let table: toml::Table = content.parse()?;
        let unknown: Vec<&str> = table
            .keys()
            .map(String::as_str)
            .filter(|key| !Self::KNOWN_KEYS.contains(key))
            .collect();
        if !unknown.is_empty() {
            tracing::warn!(keys = ?unknown, "Ignoring unknown config keys");
        }

        let config: Config = toml::Value::Table(table).try_into()?;
        config.validate()?;
        tracing::info!(
            page_size = config.page_size,
            cache = config.cache,
            failure_policy = ?config.failure_policy,
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        if let Some(base) = &self.api_base_url {
            url::Url::parse(base)
                .map_err(|e| ConfigError::Invalid(format!("api_base_url '{base}': {e}")))?;
        }
        if self.id_field.trim().is_empty() {
            return Err(ConfigError::Invalid("id_field must not be empty".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.page_size, 20);
        assert!(!config.has_header);
        assert!(!config.has_footer);
        assert!(config.cache);
        assert_eq!(config.session_capacity, 64);
        assert_eq!(config.failure_policy, FailurePolicy::Latch);
        assert_eq!(config.id_field, "id");
        assert!(config.api_base_url.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/infinilist_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.page_size, 20);
    }

    #[test]
    fn test_whitespace_only_returns_default() {
        let config = Config::parse("   \n  \n  ").unwrap();
        assert_eq!(config.page_size, 20);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let config = Config::parse("page_size = 50\n").unwrap();
        assert_eq!(config.page_size, 50);
        assert!(config.cache);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
page_size = 25
has_header = true
has_footer = true
cache = false
session_capacity = 8
failure_policy = "rewind"
id_field = "customerId"
api_base_url = "https://crm.example.com/api"
api_token = "secret-token"
request_timeout_secs = 10
"#;
        let config = Config::parse(content).unwrap();
        assert_eq!(config.page_size, 25);
        assert!(config.has_header);
        assert!(config.has_footer);
        assert!(!config.cache);
        assert_eq!(config.session_capacity, 8);
        assert_eq!(config.failure_policy, FailurePolicy::Rewind);
        assert_eq!(config.id_field, "customerId");
        assert_eq!(
            config.api_base_url.as_deref(),
            Some("https://crm.example.com/api")
        );
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::parse("this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("not valid TOML"));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = Config::parse("page_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_api_url_rejected() {
        let err = Config::parse("api_base_url = \"not a url\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_failure_policy_rejected() {
        let result = Config::parse("failure_policy = \"explode\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::parse("page_size = 10\ntotally_fake_key = 1\n").unwrap();
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("infinilist_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join("infinilist_config_test_load");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "has_footer = true\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.has_footer);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_masks_api_token() {
        let config = Config {
            api_token: Some("super-secret-token".to_string()),
            ..Config::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-token"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
