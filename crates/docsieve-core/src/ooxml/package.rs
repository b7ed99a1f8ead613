//! ZIP package access and main-part resolution.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, trace};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{ExtractError, Result};

/// Conventional location of the main document part.
pub const DEFAULT_MAIN_PART: &str = "word/document.xml";

const PACKAGE_RELS: &str = "_rels/.rels";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";

/// An opened OOXML package.
pub struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    max_part_bytes: usize,
}

impl<'a> Package<'a> {
    /// Open the bytes as a ZIP archive.
    pub fn open(data: &'a [u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| ExtractError::corrupt(format!("not a ZIP package: {}", e)))?;
        debug!("Opened package with {} entries", archive.len());
        Ok(Self {
            archive,
            max_part_bytes: 0,
        })
    }

    /// Refuse to inflate any part beyond `limit` bytes (0 = unlimited).
    pub fn with_part_limit(mut self, limit: usize) -> Self {
        self.max_part_bytes = limit;
        self
    }

    /// Name of the main document part.
    ///
    /// Resolved from the package relationships, falling back to
    /// [`DEFAULT_MAIN_PART`] when they are absent or name no office document.
    pub fn main_part_name(&mut self) -> String {
        match self.read_part(PACKAGE_RELS) {
            Ok(rels) => match office_document_target(&rels) {
                Some(target) => target,
                None => {
                    debug!("No officeDocument relationship, using {}", DEFAULT_MAIN_PART);
                    DEFAULT_MAIN_PART.to_string()
                }
            },
            Err(_) => DEFAULT_MAIN_PART.to_string(),
        }
    }

    /// Read a part as UTF-8 text, inflating at most the part limit.
    pub fn read_part(&mut self, name: &str) -> Result<String> {
        let limit = self.max_part_bytes;
        let mut file = self.archive.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => ExtractError::corrupt(format!("missing part {}", name)),
            other => ExtractError::corrupt(format!("unreadable part {}: {}", name, other)),
        })?;

        let too_large = || ExtractError::corrupt(format!("part {} inflates past {} bytes", name, limit));
        if limit > 0 && file.size() > limit as u64 {
            return Err(too_large());
        }

        // The declared size may lie, so the read itself is bounded too.
        let cap = if limit > 0 { limit as u64 + 1 } else { u64::MAX };
        let mut bytes = Vec::new();
        file.by_ref()
            .take(cap)
            .read_to_end(&mut bytes)
            .map_err(|e| ExtractError::corrupt(format!("failed to read {}: {}", name, e)))?;
        if limit > 0 && bytes.len() > limit {
            return Err(too_large());
        }

        let content = String::from_utf8(bytes)
            .map_err(|e| ExtractError::corrupt(format!("part {} is not UTF-8: {}", name, e)))?;
        trace!("Read part {} ({} bytes)", name, content.len());
        Ok(content)
    }
}

/// Target of the `officeDocument` relationship, normalised to an archive path.
fn office_document_target(rels_xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(rels_xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"Relationship" => {
                let mut rel_type = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value().ok()?.into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Type" => rel_type = Some(value),
                        b"Target" => target = Some(value),
                        _ => {}
                    }
                }
                if let (Some(rel_type), Some(target)) = (rel_type, target) {
                    if rel_type.ends_with(OFFICE_DOCUMENT_REL) {
                        return Some(target.trim_start_matches('/').to_string());
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}
