use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::CliError;

pub const SCHEMA_VERSION: &str = "v1.0.0";

/// Standard response envelope for all `martlens` machine-readable outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn with_errors(
        meta: EnvelopeMeta,
        data: T,
        errors: Vec<EnvelopeError>,
    ) -> Result<Self, CliError> {
        meta.validate()?;
        for error in &errors {
            error.validate()?;
        }

        Ok(Self { meta, data, errors })
    }
}

/// Metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub trace_id: String,
    pub schema_version: String,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    /// Database file path, or `:memory:`.
    pub database: String,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn validate(&self) -> Result<(), CliError> {
        if self.request_id.trim().len() < 8 {
            return Err(CliError::Validation(String::from("request_id is too short")));
        }
        if !is_valid_trace_id(&self.trace_id) {
            return Err(CliError::Validation(format!(
                "trace_id '{}' is not 32 hex characters",
                self.trace_id
            )));
        }
        if !is_valid_schema_version(&self.schema_version) {
            return Err(CliError::Validation(format!(
                "schema_version '{}' is not vMAJOR.MINOR.PATCH",
                self.schema_version
            )));
        }
        Ok(())
    }
}

/// Structured error payload for partial or failed responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    /// Catalogue entry or table the error belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl EnvelopeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn validate(&self) -> Result<(), CliError> {
        if self.code.trim().is_empty() {
            return Err(CliError::Validation(String::from("error code must not be empty")));
        }
        if self.message.trim().is_empty() {
            return Err(CliError::Validation(String::from(
                "error message must not be empty",
            )));
        }
        Ok(())
    }
}

fn is_valid_schema_version(value: &str) -> bool {
    let Some(version) = value.strip_prefix('v') else {
        return false;
    };

    let parts = version.split('.').collect::<Vec<_>>();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()))
}

pub(crate) fn is_valid_trace_id(value: &str) -> bool {
    value.len() == 32
        && value.chars().all(|ch| ch.is_ascii_hexdigit())
        && value.chars().any(|ch| ch != '0')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> EnvelopeMeta {
        EnvelopeMeta {
            request_id: String::from("123e4567-e89b-42d3-a456-426614174000"),
            trace_id: String::from("0123456789abcdef0123456789abcdef"),
            schema_version: String::from(SCHEMA_VERSION),
            generated_at: OffsetDateTime::UNIX_EPOCH,
            database: String::from(":memory:"),
            latency_ms: 12,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn serializes_generated_at_as_rfc3339() {
        let envelope = Envelope::with_errors(meta(), serde_json::json!({}), Vec::new())
            .expect("envelope");
        let value = serde_json::to_value(&envelope).expect("json");

        assert_eq!(
            value.pointer("/meta/generated_at"),
            Some(&serde_json::Value::from("1970-01-01T00:00:00Z"))
        );
        assert!(value.get("errors").is_none());
    }

    #[test]
    fn rejects_malformed_schema_version() {
        let mut meta = meta();
        meta.schema_version = String::from("1.0");
        assert!(Envelope::with_errors(meta, (), Vec::new()).is_err());
    }

    #[test]
    fn rejects_blank_error_message() {
        let error = EnvelopeError::new("report_failed", " ");
        assert!(Envelope::with_errors(meta(), (), vec![error]).is_err());
    }
}
