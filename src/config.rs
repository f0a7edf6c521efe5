//! Configuration types, loaded from the environment at startup.

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Gemini model used for classification.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default upstream request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default cap on uploaded file size (10 MiB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub server: ServerConfig,
}

/// Configuration for the Gemini classifier client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key, exposed only when building the request URL.
    pub api_key: SecretString,
    /// Model identifier, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// Hard bound on a single upstream call.
    pub timeout: Duration,
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// CORS origins; `*` allows any origin.
    pub allowed_origins: Vec<String>,
    /// Body size cap for the classify route.
    pub max_upload_bytes: usize,
}

impl Config {
    /// Read configuration from environment variables.
    ///
    /// `GEMINI_API_KEY` is required; everything else has a default. A
    /// variable that is set but unparseable is an error rather than a
    /// silent fallback.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs: u64 = parse_var("GEMINI_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        let host = std::env::var("TRIAGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = parse_var("TRIAGE_PORT", 8000)?;

        let allowed_origins =
            split_csv(&std::env::var("TRIAGE_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()));

        let max_upload_bytes: usize =
            parse_var("TRIAGE_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        Ok(Self {
            gemini: GeminiConfig {
                api_key,
                model,
                timeout: Duration::from_secs(timeout_secs),
            },
            server: ServerConfig {
                host,
                port,
                allowed_origins,
                max_upload_bytes,
            },
        })
    }
}

/// Parse an optional environment variable, erroring on present-but-invalid.
fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated list, trimming entries and dropping empties.
fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
