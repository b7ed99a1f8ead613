//! Client extraction pipeline: detect, validate, decode, assemble.
//!
//! This pipeline never links the legacy binary decoder. A `.doc` upload
//! is rejected as a validation failure.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Result, ValidationError};
use crate::format::{CLIENT_SUFFIXES, FormatVariant, suffix_of};
use crate::models::{DocsieveConfig, LimitsConfig, SourceDocument};
use crate::ooxml::OpenXmlDocumentDecoder;
use crate::pdf::{EngineHandle, EngineLoader, PortableDocumentDecoder, StandardEngineLoader};
use crate::result::ExtractionResult;
use crate::text::PlainTextDecoder;

/// Reject a document before any decoder runs.
///
/// An empty file name means nothing was uploaded. `supported` names the
/// suffixes offered back to the user.
pub fn check_upload(
    doc: &SourceDocument,
    limits: &LimitsConfig,
    supported: &'static [&'static str],
) -> Result<()> {
    if doc.file_name().trim().is_empty() {
        return Err(ValidationError::MissingFile { supported }.into());
    }
    if limits.max_file_bytes > 0 && doc.len() > limits.max_file_bytes {
        return Err(ValidationError::TooLarge {
            size: doc.len(),
            limit: limits.max_file_bytes,
        }
        .into());
    }
    Ok(())
}

/// The rejection for a suffix an entry point does not handle.
pub fn unsupported(doc: &SourceDocument, supported: &'static [&'static str]) -> ValidationError {
    ValidationError::UnsupportedFormat {
        suffix: suffix_of(doc.file_name()),
        supported,
    }
}

/// Dispatches client-decodable formats to their decoders.
pub struct Extractor<L: EngineLoader = StandardEngineLoader> {
    text: PlainTextDecoder,
    ooxml: OpenXmlDocumentDecoder,
    pdf: PortableDocumentDecoder<L>,
    limits: LimitsConfig,
}

impl Extractor<StandardEngineLoader> {
    /// Pipeline with default settings and its own engine handle.
    pub fn new() -> Self {
        Self::with_config(&DocsieveConfig::default())
    }

    /// Pipeline with the given settings and its own engine handle.
    pub fn with_config(config: &DocsieveConfig) -> Self {
        Self::with_engine(Arc::new(EngineHandle::standard()), config)
    }
}

impl Default for Extractor<StandardEngineLoader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: EngineLoader> Extractor<L> {
    /// Pipeline sharing an existing engine handle.
    pub fn with_engine(engine: Arc<EngineHandle<L>>, config: &DocsieveConfig) -> Self {
        Self {
            text: PlainTextDecoder::new(),
            ooxml: OpenXmlDocumentDecoder::new().with_part_limit(config.limits.max_part_bytes),
            pdf: PortableDocumentDecoder::new(engine).with_config(config.pdf.clone()),
            limits: config.limits.clone(),
        }
    }

    /// The PDF engine handle.
    pub fn engine(&self) -> &Arc<EngineHandle<L>> {
        self.pdf.engine()
    }

    /// Decode a document, returning the raw outcome.
    pub async fn decode(&self, doc: &SourceDocument) -> Result<String> {
        check_upload(doc, &self.limits, CLIENT_SUFFIXES)?;
        debug!("Dispatching {} as {:?}", doc.file_name(), doc.format());

        match doc.format() {
            FormatVariant::PlainText => self.text.decode(doc.bytes()),
            FormatVariant::OpenXmlDocument => self.ooxml.decode(doc.bytes()),
            FormatVariant::PortableDocument => self.pdf.decode(doc.bytes()).await,
            FormatVariant::LegacyBinaryDocument => Err(ValidationError::LegacyUnavailable.into()),
            FormatVariant::Unsupported => Err(unsupported(doc, CLIENT_SUFFIXES).into()),
        }
    }

    /// Decode a document into the response envelope.
    pub async fn extract(&self, doc: &SourceDocument) -> ExtractionResult {
        let result = ExtractionResult::from_outcome(self.decode(doc).await);
        if result.success {
            info!("Extracted {} chars from {}", result.content.chars().count(), doc.file_name());
        }
        result
    }

    /// Convenience wrapper over [`extract`](Self::extract) for raw input.
    pub async fn extract_bytes(&self, bytes: &[u8], file_name: &str) -> ExtractionResult {
        self.extract(&SourceDocument::new(bytes, file_name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ExtractError};
    use crate::ooxml::fixtures::docx;
    use crate::pdf::fixtures::pdf_with_pages;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_plain_text() {
        let result = Extractor::new().extract_bytes(b"hello\nworld", "notes.txt").await;
        assert_eq!(result, ExtractionResult::success("hello\nworld"));
    }

    #[tokio::test]
    async fn test_docx() {
        let bytes = docx("<w:p><w:r><w:t>Dear reader,</w:t></w:r></w:p><w:p><w:r><w:t>Thanks.</w:t></w:r></w:p>");
        let result = Extractor::new().extract_bytes(&bytes, "Letter.DOCX").await;
        assert_eq!(result, ExtractionResult::success("Dear reader,\nThanks."));
    }

    #[tokio::test]
    async fn test_pdf() {
        let bytes = pdf_with_pages(&[&["page one"], &["page two"]]);
        let result = Extractor::new().extract_bytes(&bytes, "report.pdf").await;
        assert_eq!(result, ExtractionResult::success("page one\npage two"));
    }

    #[tokio::test]
    async fn test_legacy_doc_rejected() {
        let extractor = Extractor::new();
        let doc = SourceDocument::new(vec![0xD0, 0xCF, 0x11, 0xE0], "thesis.doc");
        let err = extractor.decode(&doc).await.unwrap_err();
        assert!(matches!(err, ExtractError::Validation(ValidationError::LegacyUnavailable)));

        let result = extractor.extract(&doc).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains(".doc"));
    }

    #[tokio::test]
    async fn test_unsupported_suffix_names_supported_ones() {
        let result = Extractor::new().extract_bytes(b"{\\rtf1}", "essay.rtf").await;
        assert!(!result.success);
        assert_eq!(result.content, "");
        assert_eq!(
            result.error.as_deref(),
            Some("Unsupported file type. Please upload a .txt, .docx or .pdf file.")
        );
    }

    #[tokio::test]
    async fn test_missing_file_name() {
        let err = Extractor::new()
            .decode(&SourceDocument::new(Vec::new(), ""))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_size_limit() {
        let mut config = DocsieveConfig::default();
        config.limits.max_file_bytes = 4;
        let extractor = Extractor::with_config(&config);
        let err = extractor
            .decode(&SourceDocument::new(b"too long".to_vec(), "a.txt"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Validation(ValidationError::TooLarge { size: 8, limit: 4 })
        ));
    }

    #[tokio::test]
    async fn test_docx_part_limit_from_config() {
        let mut config = DocsieveConfig::default();
        config.limits.max_part_bytes = 64;
        let data = docx("<w:p><w:r><w:t>longer than sixty-four bytes once wrapped</w:t></w:r></w:p>");

        let err = Extractor::with_config(&config)
            .decode(&SourceDocument::new(data.clone(), "big.docx"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptFile);

        let result = Extractor::new().extract_bytes(&data, "big.docx").await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_mismatched_content_is_corrupt() {
        let err = Extractor::new()
            .decode(&SourceDocument::new(b"plain words".to_vec(), "fake.docx"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptFile);
    }

    #[tokio::test]
    async fn test_shared_engine() {
        let engine = Arc::new(EngineHandle::standard());
        let a = Extractor::with_engine(Arc::clone(&engine), &DocsieveConfig::default());
        let b = Extractor::with_engine(Arc::clone(&engine), &DocsieveConfig::default());
        let pdf = pdf_with_pages(&[&["x"]]);
        a.extract_bytes(&pdf, "a.pdf").await;
        b.extract_bytes(&pdf, "b.pdf").await;
        assert_eq!(engine.attempts(), 1);
    }
}
