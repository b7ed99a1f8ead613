//! Error types for the docsieve-core library.

use serde::Serialize;
use thiserror::Error;

/// Main error type for every decoder path.
///
/// Decoders raise the most specific variant they can determine. The detail
/// strings are diagnostics for logs; they never reach the user-facing
/// envelope (see [`crate::result::ExtractionResult`]).
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The request was rejected before any decoder ran.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The bytes do not form a readable document of the declared format.
    #[error("corrupt file: {0}")]
    CorruptFile(String),

    /// The PDF engine has not reached the Ready state.
    #[error("PDF engine is not ready")]
    EngineNotReady,

    /// The document is password protected or encrypted.
    #[error("document is password protected")]
    Unreadable,

    /// Anything unanticipated.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Reasons a request is rejected up front.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No file was supplied at all.
    #[error("no file supplied")]
    MissingFile { supported: &'static [&'static str] },

    /// The declared suffix is not one this entry point handles.
    #[error("unsupported file suffix {suffix:?}")]
    UnsupportedFormat {
        suffix: Option<String>,
        supported: &'static [&'static str],
    },

    /// A legacy `.doc` file reached an entry point without the legacy decoder.
    #[error("legacy .doc documents are not handled by this entry point")]
    LegacyUnavailable,

    /// The input exceeds the configured size limit.
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Coarse error classification used for message mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    CorruptFile,
    EngineNotReady,
    Unreadable,
    Internal,
}

impl ExtractError {
    /// Shorthand for a corrupt-file error with a diagnostic detail.
    pub fn corrupt(detail: impl Into<String>) -> Self {
        Self::CorruptFile(detail.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::CorruptFile(_) => ErrorKind::CorruptFile,
            Self::EngineNotReady => ErrorKind::EngineNotReady,
            Self::Unreadable => ErrorKind::Unreadable,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Errors raised while bootstrapping the PDF engine.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// A single-byte encoding table could not be built.
    #[error("failed to build {name} table: {reason}")]
    Table { name: &'static str, reason: String },

    /// A custom loader failed.
    #[error("engine loader failed: {0}")]
    Loader(String),
}

/// Result type for the docsieve-core library.
pub type Result<T> = std::result::Result<T, ExtractError>;
