//! Format detection from the declared file name.
//!
//! Only the suffix is consulted. A file whose suffix lies about its content
//! is routed to the wrong decoder and fails there as a corrupt file.

use serde::{Deserialize, Serialize};

/// Suffixes handled by the client pipeline.
pub const CLIENT_SUFFIXES: &[&str] = &["txt", "docx", "pdf"];

/// Suffixes handled by the trusted legacy endpoint.
pub const LEGACY_SUFFIXES: &[&str] = &["doc"];

/// Every suffix any entry point recognises.
pub const ALL_SUFFIXES: &[&str] = &["txt", "docx", "pdf", "doc"];

/// Closed set of document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatVariant {
    /// UTF-8 plain text (`.txt`).
    PlainText,
    /// OOXML word-processing package (`.docx`).
    OpenXmlDocument,
    /// Portable document (`.pdf`).
    PortableDocument,
    /// Legacy compound binary word-processing document (`.doc`).
    LegacyBinaryDocument,
    /// Anything else.
    Unsupported,
}

impl FormatVariant {
    /// Detect the format from a file name.
    pub fn from_file_name(file_name: &str) -> Self {
        match suffix_of(file_name).as_deref() {
            Some("txt") => FormatVariant::PlainText,
            Some("docx") => FormatVariant::OpenXmlDocument,
            Some("pdf") => FormatVariant::PortableDocument,
            Some("doc") => FormatVariant::LegacyBinaryDocument,
            _ => FormatVariant::Unsupported,
        }
    }

    /// Canonical suffix for this variant.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            FormatVariant::PlainText => Some("txt"),
            FormatVariant::OpenXmlDocument => Some("docx"),
            FormatVariant::PortableDocument => Some("pdf"),
            FormatVariant::LegacyBinaryDocument => Some("doc"),
            FormatVariant::Unsupported => None,
        }
    }

    /// Whether a decoder reachable from untrusted code handles this variant.
    pub fn is_client_decodable(&self) -> bool {
        matches!(
            self,
            FormatVariant::PlainText | FormatVariant::OpenXmlDocument | FormatVariant::PortableDocument
        )
    }
}

/// Lowercased text after the last `.`, if there is any.
///
/// Directory components are ignored. A trailing dot (`notes.`) yields no suffix.
pub fn suffix_of(file_name: &str) -> Option<String> {
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);
    let (_, suffix) = base.rsplit_once('.')?;
    if suffix.is_empty() {
        return None;
    }
    Some(suffix.to_lowercase())
}

/// Human-readable list of suffixes, e.g. `.txt, .docx or .pdf`.
pub fn describe_suffixes(suffixes: &[&str]) -> String {
    let dotted: Vec<String> = suffixes.iter().map(|s| format!(".{}", s)).collect();
    match dotted.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}
