//! OOXML word-processing (`.docx`) decoding.

mod body;
mod package;

pub use body::extract_body_text;
pub use package::{DEFAULT_MAIN_PART, Package};

use tracing::debug;

use crate::error::Result;
use crate::models::config::DEFAULT_MAX_PART_BYTES;

/// Decoder for `.docx` packages.
#[derive(Debug, Clone, Copy)]
pub struct OpenXmlDocumentDecoder {
    max_part_bytes: usize,
}

impl OpenXmlDocumentDecoder {
    /// Create a new decoder with the default part limit.
    pub fn new() -> Self {
        Self {
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
        }
    }

    /// Cap on the inflated size of any part read (0 = unlimited).
    pub fn with_part_limit(mut self, limit: usize) -> Self {
        self.max_part_bytes = limit;
        self
    }

    /// Extract body text: paragraphs in document order, separated by a single newline.
    pub fn decode(&self, data: &[u8]) -> Result<String> {
        let mut package = Package::open(data)?.with_part_limit(self.max_part_bytes);
        let part = package.main_part_name();
        let xml = package.read_part(&part)?;
        let text = extract_body_text(&xml)?;
        debug!("Extracted {} chars from {}", text.chars().count(), part);
        Ok(text)
    }
}

impl Default for OpenXmlDocumentDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Build a ZIP package from (name, content) pairs.
    pub fn zip_package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, content) in parts {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Wrap paragraph markup in a minimal `word/document.xml`.
    pub fn document_xml(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
    }

    /// A minimal `.docx` with the default part layout.
    pub fn docx(body: &str) -> Vec<u8> {
        let rels = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;
        zip_package(&[
            ("_rels/.rels", rels),
            ("word/document.xml", &document_xml(body)),
        ])
    }
}
