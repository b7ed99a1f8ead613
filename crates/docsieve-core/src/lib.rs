//! Core library for document text extraction.
//!
//! This crate provides:
//! - Format detection from the declared file name
//! - Plain text, OOXML (`.docx`) and PDF decoders
//! - A lazily bootstrapped, shareable PDF engine
//! - The `{success, content, error}` response envelope
//!
//! Legacy `.doc` decoding lives in `docsieve-legacy` and is not linked here.

pub mod error;
pub mod format;
pub mod models;
pub mod ooxml;
pub mod pdf;
pub mod pipeline;
pub mod result;
pub mod text;

pub use error::{EngineError, ErrorKind, ExtractError, Result, ValidationError};
pub use format::{ALL_SUFFIXES, CLIENT_SUFFIXES, FormatVariant, LEGACY_SUFFIXES};
pub use models::{DocsieveConfig, PageText, SourceDocument};
pub use ooxml::OpenXmlDocumentDecoder;
pub use pdf::{EngineHandle, EngineLoader, EngineState, PdfProcessor, PortableDocumentDecoder};
pub use pipeline::{Extractor, check_upload};
pub use result::ExtractionResult;
pub use text::PlainTextDecoder;
