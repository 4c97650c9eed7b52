//! Classification of registry responses.

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use crate::error::{RegistryError, Result};

/// The registry accepted the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Success {
    /// Identifier assigned to the document
    pub value: String,
    pub timestamp: String,
}

impl Success {
    /// Parse the timestamp as RFC 3339, if it is one.
    pub fn parsed_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }
}

/// The registry rejected the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub code: String,
    pub error: String,
    pub message: String,
    pub path: String,
}

/// Outcome of a submission that reached the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    Success(Success),
    Failure(Failure),
}

impl SubmissionResult {
    /// Classify a response body by the fields it carries.
    ///
    /// `value` marks a success, `error` or `code` a rejection. A body with
    /// both markers, neither, or that is not a JSON object is rejected as
    /// [`RegistryError::Deserialization`]. The status only annotates errors;
    /// a rejection may arrive with any status.
    pub fn classify(status: u16, body: &str) -> Result<Self> {
        let malformed = |reason: String| RegistryError::Deserialization { status, reason };

        let parsed: Value =
            serde_json::from_str(body).map_err(|e| malformed(format!("invalid JSON: {}", e)))?;
        let Value::Object(fields) = parsed else {
            return Err(malformed("response body is not a JSON object".to_string()));
        };

        let value = text_field(&fields, "value");
        let code = text_field(&fields, "code");
        let error = text_field(&fields, "error");

        match (value, code.is_some() || error.is_some()) {
            (Some(value), false) => Ok(SubmissionResult::Success(Success {
                value,
                timestamp: text_field(&fields, "timestamp").unwrap_or_default(),
            })),
            (None, true) => Ok(SubmissionResult::Failure(Failure {
                code: code.unwrap_or_default(),
                error: error.unwrap_or_default(),
                message: text_field(&fields, "message").unwrap_or_default(),
                path: text_field(&fields, "path").unwrap_or_default(),
            })),
            (Some(_), true) => Err(malformed(
                "response carries both a value and an error".to_string(),
            )),
            (None, false) => Err(malformed(
                "response carries neither a value nor an error".to_string(),
            )),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionResult::Success(_))
    }

    pub fn as_success(&self) -> Option<&Success> {
        match self {
            SubmissionResult::Success(success) => Some(success),
            SubmissionResult::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&Failure> {
        match self {
            SubmissionResult::Success(_) => None,
            SubmissionResult::Failure(failure) => Some(failure),
        }
    }
}

/// Read a field as text. Null counts as absent; numbers keep their JSON form.
fn text_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
