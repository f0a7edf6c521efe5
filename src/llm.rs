//! Email classification against the Gemini `generateContent` API.
//!
//! The handler depends on the [`EmailClassifier`] trait, not on Gemini
//! directly; tests substitute stubs. The production client asks for
//! constrained JSON output (`responseMimeType` + `responseSchema`) and
//! strictly parses the result, so an off-contract reply surfaces as
//! [`ClassifyError::MalformedResponse`] with the raw text attached.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::GeminiConfig;
use crate::error::ClassifyError;

/// Google AI API root.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The two triage categories an email can land in.
///
/// The wire labels are the Portuguese literals the model is prompted
/// with; any other string fails deserialization instead of defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailCategory {
    #[serde(rename = "Produtivo")]
    Productive,
    #[serde(rename = "Improdutivo")]
    Unproductive,
}

impl EmailCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailCategory::Productive => "Produtivo",
            EmailCategory::Unproductive => "Improdutivo",
        }
    }
}

/// A classified email: its category plus a drafted reply.
///
/// `suggested_response` may carry literal `<br>` markers for line breaks;
/// they are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailClassification {
    pub category: EmailCategory,
    pub suggested_response: String,
}

/// Classification backend seam. The server holds an `Arc<dyn EmailClassifier>`.
#[async_trait]
pub trait EmailClassifier: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Classify normalized email text. Exactly one upstream call, no retries.
    async fn classify(&self, email_text: &str) -> Result<EmailClassification, ClassifyError>;
}

/// Gemini-backed classifier.
pub struct GeminiClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Build a client with a bounded per-request timeout.
    pub fn new(config: &GeminiConfig) -> Result<Self, ClassifyError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClassifyError::Request {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: GEMINI_BASE_URL.to_string(),
            model: config.model.clone(),
        })
    }

    /// Point the client at a different endpoint (tests use a local mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the API URL for a given method. The key travels in the
    /// `x-goog-api-key` header, never the URL, so transport errors that
    /// echo the URL cannot leak it.
    fn api_url(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }
}

#[async_trait]
impl EmailClassifier for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn classify(&self, email_text: &str) -> Result<EmailClassification, ClassifyError> {
        let prompt = build_classification_prompt(email_text);
        let request_body = build_request_body(&prompt);

        debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            "Sending classification request"
        );

        let response = self
            .client
            .post(self.api_url("generateContent"))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ClassifyError::Request {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClassifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw_body = response.text().await.map_err(|e| ClassifyError::Request {
            reason: e.to_string(),
        })?;

        let Some(payload) = candidate_text(&raw_body) else {
            error!(raw_response = %raw_body, "Gemini response carried no candidate text");
            return Err(ClassifyError::MalformedResponse { raw: raw_body });
        };

        match parse_classification(&payload) {
            Ok(result) => Ok(result),
            Err(e) => {
                error!(
                    raw_response = %payload,
                    error = %e,
                    "Failed to parse classification from Gemini response"
                );
                Err(ClassifyError::MalformedResponse { raw: payload })
            }
        }
    }
}

// ── Prompt and request construction ─────────────────────────────────

/// Build the fixed Portuguese instruction prompt around the email text.
fn build_classification_prompt(email_text: &str) -> String {
    format!(
        "Você é um assistente de email. Analise este email e:\n\n\
         1. Classifique como 'Produtivo' se requer ação ou 'Improdutivo' se não requer.\n\
         2. Sugira uma resposta apropriada em formato de email profissional e em português. \
         Utilize <br> para quebras de linha.\n\n\
         Email: {email_text}"
    )
}

/// Build the `generateContent` request body: a single user turn plus a
/// generation config that pins the output to the two-field JSON object.
fn build_request_body(prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": prompt}]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "category": {"type": "STRING"},
                    "suggested_response": {"type": "STRING"}
                },
                "required": ["category", "suggested_response"]
            }
        }
    })
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
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
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

/// Pull the text of the first candidate out of a raw response body,
/// joining multiple parts in order. `None` when there is nothing to parse.
fn candidate_text(body: &str) -> Option<String> {
    let response: GenerateContentResponse = serde_json::from_str(body).ok()?;
    let content = response.candidates.into_iter().next()?.content?;

    let mut text = String::new();
    for part in content.parts {
        if let Some(part_text) = part.text {
            text.push_str(&part_text);
        }
    }

    if text.is_empty() { None } else { Some(text) }
}

/// Strict parse of the model payload into a classification.
fn parse_classification(raw: &str) -> Result<EmailClassification, serde_json::Error> {
    serde_json::from_str(raw)
}
