//! PDF page text extraction using lopdf.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::PdfProcessor;
use super::content::{ContentWalker, page_text};
use super::engine::PdfEngine;
use crate::error::{ExtractError, Result};
use crate::models::{PageText, PdfConfig};

/// Extracts text from one loaded PDF with a ready engine.
pub struct PdfExtractor<'e> {
    engine: &'e PdfEngine,
    config: PdfConfig,
    document: Option<Document>,
}

impl<'e> PdfExtractor<'e> {
    /// Create an extractor with no document loaded.
    pub fn new(engine: &'e PdfEngine, config: PdfConfig) -> Self {
        Self {
            engine,
            config,
            document: None,
        }
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| ExtractError::Internal("no PDF document loaded".to_string()))
    }

    /// Text of every page, ascending and without gaps.
    pub fn pages(&self) -> Result<Vec<PageText>> {
        let doc = self.document()?;
        let pages = doc.get_pages();

        let mut result = Vec::with_capacity(pages.len());
        for (expected, (number, page_id)) in (1u32..).zip(pages) {
            if number != expected {
                return Err(ExtractError::corrupt(format!(
                    "page tree skips from {} to {}",
                    expected - 1,
                    number
                )));
            }
            result.push(PageText {
                number,
                text: self.text_of(doc, page_id)?,
            });
        }

        debug!("Extracted text from {} pages", result.len());
        Ok(result)
    }

    fn text_of(&self, doc: &Document, page_id: ObjectId) -> Result<String> {
        let content = doc
            .get_page_content(page_id)
            .map_err(|e| ExtractError::corrupt(format!("unreadable page content: {}", e)))?;
        if content.is_empty() {
            trace!("Page {:?} has no content stream", page_id);
            return Ok(String::new());
        }

        let resources = self.get_page_resources(doc, page_id);
        let walker = ContentWalker::new(doc, self.engine, &self.config);
        let items = walker.items(&content, resources)?;
        Ok(page_text(&items))
    }

    /// Get resources dictionary for a page, handling inheritance
    fn get_page_resources<'d>(&self, doc: &'d Document, page_id: ObjectId) -> Option<&'d Dictionary> {
        self.get_inherited_resources(doc, page_id, 0)
    }

    fn get_inherited_resources<'d>(
        &self,
        doc: &'d Document,
        node_id: ObjectId,
        depth: usize,
    ) -> Option<&'d Dictionary> {
        // Page trees are shallow; a deeper chain is a cycle.
        if depth > 64 {
            return None;
        }
        let dict = doc.get_object(node_id).ok()?.as_dict().ok()?;

        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
                return Some(res_dict);
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.get_inherited_resources(doc, *parent_id, depth + 1),
            _ => None,
        }
    }
}

impl PdfProcessor for PdfExtractor<'_> {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data)
            .map_err(|e| ExtractError::corrupt(format!("not a readable PDF: {}", e)))?;

        // Documents encrypted with an empty user password open normally
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(ExtractError::Unreadable);
            }
            debug!("Decrypted PDF with empty password");
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(ExtractError::corrupt("PDF has no pages"));
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        Ok(super::join_pages(&self.pages()?))
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        let doc = self.document()?;
        let pages = doc.get_pages();
        let page_id = pages
            .get(&page)
            .ok_or_else(|| ExtractError::Internal(format!("page {} out of range", page)))?;
        self.text_of(doc, *page_id)
    }
}
