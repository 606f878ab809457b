//! Turns a free-text company name into a structured [`CompanyRecord`] with
//! the help of a chat-completion model.

pub mod openai;

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::error::ValidationError;
use crate::registry::{CompanyRecord, RawRecord, REQUIRED_FIELDS};

pub use openai::OpenAiCompletionClient;

pub const SYSTEM_PROMPT: &str = "You are an expert in identifying global companies and their \
investor relations pages. Return only valid JSON.";

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("Company name must not be empty")]
    EmptyName,

    #[error("No API key available: {0}")]
    ApiKey(#[from] crate::secrets::SecretError),

    #[error("Completion request failed: {0}")]
    Transport(String),

    #[error("Completion service returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Completion service returned no content")]
    EmptyResponse,

    #[error("AI returned invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Incomplete company data: {0}")]
    InvalidRecord(#[from] ValidationError),

    #[error("Field '{0}' must not be empty")]
    EmptyField(String),
}

/// A service that answers one prompt with one piece of text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, RecognitionError>;
}

/// Asks the completion service what company a name refers to.
#[derive(Clone)]
pub struct CompanyRecognizer {
    client: Arc<dyn CompletionClient>,
}

impl CompanyRecognizer {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    pub async fn recognize(&self, company_name: &str) -> Result<CompanyRecord, RecognitionError> {
        let company_name = company_name.trim();
        if company_name.is_empty() {
            return Err(RecognitionError::EmptyName);
        }

        let text = self
            .client
            .complete(SYSTEM_PROMPT, &build_prompt(company_name))
            .await?;
        let record = parse_recognition_response(&text)?;
        tracing::info!(
            query = %company_name,
            company_id = %record.company_id,
            "recognized company"
        );
        Ok(record)
    }
}

pub fn build_prompt(company_name: &str) -> String {
    format!(
        r#"Extract company information from this company name: "{company_name}"

Return ONLY a JSON object (no markdown, no explanation) with these fields:
{{
  "company_id": "lowercase_id_with_underscores",
  "company_name": "Official Company Name",
  "country": "ISO_COUNTRY_CODE",
  "website": "https://www.company.com",
  "ir_url": "https://investor.company.com or null if unknown"
}}

Be accurate with the official company names and websites. If unsure about ir_url, set to null."#
    )
}

static RE_CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*(?:```)?$").unwrap());

/// Removes a surrounding Markdown code fence, with or without a language tag.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    match RE_CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text,
    }
}

/// Parses a model answer into a record.
///
/// The four required fields must be non-empty strings; a missing, `null` or
/// empty `ir_url` becomes `""`.
pub fn parse_recognition_response(text: &str) -> Result<CompanyRecord, RecognitionError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(RecognitionError::EmptyResponse);
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| RecognitionError::InvalidJson(e.to_string()))?;
    let raw: RawRecord = match value {
        Value::Object(map) => map,
        other => {
            return Err(RecognitionError::InvalidJson(format!(
                "expected an object, got {}",
                json_kind(&other)
            )))
        }
    };

    let record = CompanyRecord::from_raw(&raw)?;
    for (name, value) in REQUIRED_FIELDS.iter().zip(record.columns()) {
        if value.is_empty() {
            return Err(RecognitionError::EmptyField(name.to_string()));
        }
    }
    Ok(record)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
