//! Uniform response envelope and the user-facing message table.
//!
//! This is the only place where an [`ExtractError`] becomes text a user
//! sees. Diagnostic detail is logged and then dropped.

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::{ErrorKind, ExtractError, ValidationError};
use crate::format::describe_suffixes;

/// Response envelope returned by every entry point.
///
/// The constructors keep `success == true` paired with `error == None` and
/// `success == false` paired with empty `content`. Values built by hand or
/// deserialized are taken as they are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Whether extraction succeeded.
    pub success: bool,
    /// Extracted text (empty on failure).
    pub content: String,
    /// User-facing failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    /// A successful extraction.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            error: None,
        }
    }

    /// A failed extraction. Logs the diagnostic detail and keeps only the mapped message.
    pub fn failure(err: &ExtractError) -> Self {
        log_failure(err);
        Self {
            success: false,
            content: String::new(),
            error: Some(user_message(err)),
        }
    }

    /// Fold a decoder outcome into the envelope.
    pub fn from_outcome(outcome: Result<String, ExtractError>) -> Self {
        match outcome {
            Ok(content) => Self::success(content),
            Err(err) => Self::failure(&err),
        }
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> String {
        // A struct of a bool and strings cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"content":"","error":"Unexpected error."}"#.to_string()
        })
    }
}

impl From<Result<String, ExtractError>> for ExtractionResult {
    fn from(outcome: Result<String, ExtractError>) -> Self {
        Self::from_outcome(outcome)
    }
}

/// Fixed user-facing message for an error.
pub fn user_message(err: &ExtractError) -> String {
    match err {
        ExtractError::Validation(validation) => validation_message(validation),
        ExtractError::CorruptFile(_) => {
            "We couldn't read this file. It may be damaged or not match its extension. \
             Please try a different file."
                .to_string()
        }
        ExtractError::EngineNotReady => {
            "The document reader is still starting up. Please try again shortly.".to_string()
        }
        ExtractError::Unreadable => {
            "This document is password protected. Please remove the protection and upload it again."
                .to_string()
        }
        ExtractError::Internal(_) => {
            "Something went wrong while extracting text. Please try again or use a different file."
                .to_string()
        }
    }
}

fn validation_message(err: &ValidationError) -> String {
    match err {
        ValidationError::MissingFile { supported } => format!(
            "No file was provided. Please upload a {} file.",
            describe_suffixes(supported)
        ),
        ValidationError::UnsupportedFormat { supported, .. } => format!(
            "Unsupported file type. Please upload a {} file.",
            describe_suffixes(supported)
        ),
        ValidationError::LegacyUnavailable => {
            "Legacy Word (.doc) files are not supported here. \
             Please save the document as .docx or .pdf and upload it again."
                .to_string()
        }
        ValidationError::TooLarge { limit, .. } => format!(
            "The file is too large. Please upload a file smaller than {}.",
            describe_size(*limit)
        ),
    }
}

fn describe_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB {
        format!("{} MB", bytes / MIB)
    } else if bytes < 1024 {
        format!("{} bytes", bytes)
    } else {
        format!("{} KB", bytes.div_ceil(1024))
    }
}

fn log_failure(err: &ExtractError) {
    match err.kind() {
        ErrorKind::Internal => error!("Extraction failed unexpectedly: {}", err),
        _ => warn!("Extraction failed: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{CLIENT_SUFFIXES, LEGACY_SUFFIXES};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_success_envelope() {
        let result = ExtractionResult::success("hello");
        assert!(result.success);
        assert_eq!(result.content, "hello");
        assert_eq!(result.error, None);
        assert_eq!(result.to_json(), r#"{"success":true,"content":"hello"}"#);
    }

    #[test]
    fn test_failure_envelope_has_empty_content() {
        let result = ExtractionResult::failure(&ExtractError::corrupt("zip: invalid header"));
        assert!(!result.success);
        assert_eq!(result.content, "");
        assert!(result.error.is_some());
    }

    #[test]
    fn test_internal_detail_never_leaks() {
        let detail = "thread 'main' panicked at src/lib.rs:42";
        let err = ExtractError::Internal(detail.to_string());
        let message = ExtractionResult::failure(&err).error.unwrap();
        assert!(!message.contains(detail));
        assert!(!message.contains("src/lib.rs"));

        let err = ExtractError::corrupt("lopdf: invalid xref at offset 918");
        let message = ExtractionResult::failure(&err).error.unwrap();
        assert!(!message.contains("xref"));
    }

    #[test]
    fn test_unsupported_lists_suffixes() {
        let err = ExtractError::from(ValidationError::UnsupportedFormat {
            suffix: Some("rtf".to_string()),
            supported: CLIENT_SUFFIXES,
        });
        assert_eq!(
            user_message(&err),
            "Unsupported file type. Please upload a .txt, .docx or .pdf file."
        );
    }

    #[test]
    fn test_missing_file_on_legacy_endpoint() {
        let err = ExtractError::from(ValidationError::MissingFile {
            supported: LEGACY_SUFFIXES,
        });
        assert_eq!(user_message(&err), "No file was provided. Please upload a .doc file.");
    }

    #[test]
    fn test_message_classes() {
        assert!(user_message(&ExtractError::EngineNotReady).contains("try again shortly"));
        assert!(user_message(&ExtractError::Unreadable).contains("password protected"));
        assert!(user_message(&ExtractError::corrupt("x")).contains("try a different file"));
        assert!(user_message(&ValidationError::LegacyUnavailable.into()).contains(".doc"));
    }

    #[test]
    fn test_too_large_message() {
        let err = ExtractError::from(ValidationError::TooLarge {
            size: 30 * 1024 * 1024,
            limit: 25 * 1024 * 1024,
        });
        assert_eq!(
            user_message(&err),
            "The file is too large. Please upload a file smaller than 25 MB."
        );
    }

    #[test]
    fn test_describe_size_units() {
        assert_eq!(describe_size(256), "256 bytes");
        assert_eq!(describe_size(1024), "1 KB");
        assert_eq!(describe_size(1500), "2 KB");
        assert_eq!(describe_size(3 * 1024 * 1024), "3 MB");
    }

    #[test]
    fn test_parsed_envelope_is_taken_as_is() {
        let parsed: ExtractionResult =
            serde_json::from_str(r#"{"success":false,"content":"partial","error":"x"}"#).unwrap();
        assert_eq!(parsed.content, "partial");
        assert_ne!(parsed, ExtractionResult::failure(&ExtractError::Unreadable));
    }

    #[test]
    fn test_round_trip_without_error_field() {
        let parsed: ExtractionResult =
            serde_json::from_str(r#"{"success":true,"content":"a"}"#).unwrap();
        assert_eq!(parsed, ExtractionResult::success("a"));
    }
}
