//! Error types for Inbox Triage.
//!
//! Each pipeline stage has its own enum; the handler maps variants to
//! response payloads explicitly, so there is no crate-wide aggregate.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors while reading text out of an uploaded file.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to extract PDF text: {0}")]
    Pdf(String),

    #[error("Text file is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the upstream classification call.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Gemini request failed: {reason}")]
    Request { reason: String },

    #[error("Gemini API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Could not parse a classification from the model response")]
    MalformedResponse { raw: String },
}
