//! Request-scoped document types.

use serde::{Deserialize, Serialize};

use crate::format::FormatVariant;

/// A document as received from the caller.
///
/// The bytes are owned and never mutated. Decoders borrow them for the
/// duration of one call only.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    bytes: Vec<u8>,
    file_name: String,
    format: FormatVariant,
}

impl SourceDocument {
    /// Wrap raw bytes and the declared file name. The format is detected once here.
    pub fn new(bytes: impl Into<Vec<u8>>, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let format = FormatVariant::from_file_name(&file_name);
        Self {
            bytes: bytes.into(),
            file_name,
            format,
        }
    }

    /// Raw document bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Format detected from the file name.
    pub fn format(&self) -> FormatVariant {
        self.format
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Text of a single PDF page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// Page number (1-indexed).
    pub number: u32,
    /// Extracted text; empty when the page carries no text runs.
    pub text: String,
}
