//! Content-stream walking: operators in, typed items out.

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object};
use tracing::{debug, trace};

use super::engine::PdfEngine;
use super::fonts::{FontDecoder, FontSet, decode_fallback};
use crate::error::{ExtractError, Result};
use crate::models::PdfConfig;

/// Nesting limit for form XObjects drawn from other forms.
const MAX_FORM_DEPTH: usize = 8;

/// One content-stream instruction, reduced to what text extraction needs.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    /// A decoded text run.
    Text(String),
    /// Any other operator.
    Other,
}

impl ContentItem {
    /// Text payload, if this is a text run.
    pub fn text(&self) -> Option<&str> {
        match self {
            ContentItem::Text(text) => Some(text),
            ContentItem::Other => None,
        }
    }
}

/// Join the text runs of a page with single spaces. Runs keep their own
/// leading and trailing spaces.
pub fn page_text(items: &[ContentItem]) -> String {
    let runs: Vec<&str> = items.iter().filter_map(ContentItem::text).collect();
    runs.join(" ")
}

/// Walks the content streams of one document.
pub struct ContentWalker<'a> {
    doc: &'a Document,
    engine: &'a PdfEngine,
    config: &'a PdfConfig,
}

impl<'a> ContentWalker<'a> {
    pub fn new(doc: &'a Document, engine: &'a PdfEngine, config: &'a PdfConfig) -> Self {
        Self { doc, engine, config }
    }

    /// Decode a content stream into items.
    pub fn items(&self, content: &[u8], resources: Option<&Dictionary>) -> Result<Vec<ContentItem>> {
        let mut items = Vec::new();
        self.collect(content, resources, 0, &mut items)?;
        Ok(items)
    }

    fn collect(
        &self,
        content: &[u8],
        resources: Option<&Dictionary>,
        depth: usize,
        items: &mut Vec<ContentItem>,
    ) -> Result<()> {
        let content = Content::decode(content)
            .map_err(|e| ExtractError::corrupt(format!("unparseable content stream: {}", e)))?;
        let fonts = FontSet::from_resources(self.doc, resources, self.engine);
        let mut font: Option<&FontDecoder> = None;

        trace!("Walking {} operations at depth {}", content.operations.len(), depth);
        for op in &content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "Tf" => {
                    font = operands
                        .first()
                        .and_then(|name| name.as_name().ok())
                        .and_then(|name| fonts.get(name));
                    items.push(ContentItem::Other);
                }
                "Tj" | "'" => self.push_text(items, operands.first().map(|o| self.show(font, o))),
                "\"" => self.push_text(items, operands.get(2).map(|o| self.show(font, o))),
                "TJ" => {
                    let text = operands
                        .first()
                        .and_then(|o| o.as_array().ok())
                        .map(|parts| self.show_array(font, parts));
                    self.push_text(items, text);
                }
                "Do" => {
                    items.push(ContentItem::Other);
                    let name = operands.first().and_then(|o| o.as_name().ok());
                    if let (Some(name), Some(resources)) = (name, resources) {
                        self.draw_form(name, resources, depth, items)?;
                    }
                }
                _ => items.push(ContentItem::Other),
            }
        }
        Ok(())
    }

    fn push_text(&self, items: &mut Vec<ContentItem>, text: Option<String>) {
        match text {
            Some(text) if !text.is_empty() => items.push(ContentItem::Text(text)),
            _ => items.push(ContentItem::Other),
        }
    }

    /// Decode one string operand, folding line breaks into spaces.
    fn show(&self, font: Option<&FontDecoder>, operand: &Object) -> String {
        let Object::String(bytes, _) = operand else {
            return String::new();
        };
        let text = match font {
            Some(font) => font.decode(bytes, self.engine),
            None => decode_fallback(bytes, self.engine),
        };
        text.replace(['\r', '\n'], " ")
    }

    fn show_array(&self, font: Option<&FontDecoder>, parts: &[Object]) -> String {
        let mut text = String::new();
        for part in parts {
            match part {
                Object::String(..) => text.push_str(&self.show(font, part)),
                Object::Integer(_) | Object::Real(_) => {
                    let adjustment = part.as_float().unwrap_or(0.0);
                    if adjustment < self.config.tj_space_threshold && !text.is_empty() && !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
                _ => {}
            }
        }
        text
    }

    fn draw_form(
        &self,
        name: &[u8],
        resources: &Dictionary,
        depth: usize,
        items: &mut Vec<ContentItem>,
    ) -> Result<()> {
        if depth >= MAX_FORM_DEPTH {
            debug!("Skipping form XObject nested {} deep", depth);
            return Ok(());
        }

        let stream = resources
            .get(b"XObject")
            .and_then(|obj| self.doc.dereference(obj))
            .and_then(|(_, obj)| obj.as_dict())
            .and_then(|xobjects| xobjects.get(name))
            .and_then(|obj| self.doc.dereference(obj))
            .and_then(|(_, obj)| obj.as_stream());
        let Ok(stream) = stream else {
            return Ok(());
        };
        if stream.dict.get(b"Subtype").and_then(Object::as_name).ok() != Some(&b"Form"[..]) {
            return Ok(());
        }

        let content = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let form_resources = stream
            .dict
            .get(b"Resources")
            .and_then(|obj| self.doc.dereference(obj))
            .and_then(|(_, obj)| obj.as_dict())
            .unwrap_or(resources);
        self.collect(&content, Some(form_resources), depth + 1, items)
    }
}
