//! PDF processing module.

mod content;
mod encoding;
mod engine;
mod extractor;
mod fonts;

pub use content::{ContentItem, ContentWalker, page_text};
pub use encoding::{CodeTable, GlyphNames};
pub use engine::{EngineHandle, EngineLoader, EngineState, PdfEngine, StandardEngineLoader};
pub use extractor::PdfExtractor;
pub use fonts::{FontDecoder, FontSet, ToUnicodeMap};

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::models::{PageText, PdfConfig};

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract text from the entire PDF.
    fn extract_text(&self) -> Result<String>;

    /// Extract text from a specific page.
    fn extract_page_text(&self, page: u32) -> Result<String>;
}

/// Join page texts with one `\n` each and trim the ends.
///
/// Only non-newline whitespace is trimmed, so leading or trailing textless
/// pages keep their (empty) segment.
pub fn join_pages(pages: &[PageText]) -> String {
    let joined = pages
        .iter()
        .map(|page| page.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    joined
        .trim_matches(|c: char| c.is_whitespace() && c != '\n')
        .to_string()
}

/// Decoder for `.pdf` documents.
///
/// The engine handle is shared; every decoder built from the same handle
/// waits on the same bootstrap.
pub struct PortableDocumentDecoder<L: EngineLoader = StandardEngineLoader> {
    engine: Arc<EngineHandle<L>>,
    config: PdfConfig,
}

impl<L: EngineLoader> PortableDocumentDecoder<L> {
    /// Create a decoder on a shared engine handle.
    pub fn new(engine: Arc<EngineHandle<L>>) -> Self {
        Self {
            engine,
            config: PdfConfig::default(),
        }
    }

    /// Replace the extraction settings.
    pub fn with_config(mut self, config: PdfConfig) -> Self {
        self.config = config;
        self
    }

    /// The shared engine handle.
    pub fn engine(&self) -> &Arc<EngineHandle<L>> {
        &self.engine
    }

    /// Decode, waiting for the engine to become ready first.
    pub async fn decode(&self, data: &[u8]) -> Result<String> {
        let engine = self.engine.ready().await?;
        self.decode_with(&engine, data)
    }

    /// Decode only if the engine is already ready.
    pub fn decode_now(&self, data: &[u8]) -> Result<String> {
        let engine = self.engine.get()?;
        self.decode_with(&engine, data)
    }

    /// Per-page text, waiting for the engine.
    pub async fn pages(&self, data: &[u8]) -> Result<Vec<PageText>> {
        let engine = self.engine.ready().await?;
        let mut extractor = PdfExtractor::new(&engine, self.config.clone());
        extractor.load(data)?;
        extractor.pages()
    }

    fn decode_with(&self, engine: &PdfEngine, data: &[u8]) -> Result<String> {
        let mut extractor = PdfExtractor::new(engine, self.config.clone());
        extractor.load(data)?;
        let text = extractor.extract_text()?;
        debug!("Decoded {} pages into {} chars", extractor.page_count(), text.len());
        Ok(text)
    }
}

impl PortableDocumentDecoder<StandardEngineLoader> {
    /// Decoder with its own handle on the bundled tables.
    pub fn standard() -> Self {
        Self::new(Arc::new(EngineHandle::standard()))
    }
}

impl Default for PortableDocumentDecoder<StandardEngineLoader> {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use encoding_rs::WINDOWS_1252;
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

    fn font(doc: &mut Document) -> ObjectId {
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        })
    }

    fn content_stream(doc: &mut Document, runs: &[&str]) -> ObjectId {
        let mut operations = Vec::new();
        if !runs.is_empty() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            for (i, run) in runs.iter().enumerate() {
                let bytes = WINDOWS_1252.encode(run).0.into_owned();
                operations.push(Operation::new("Td", vec![72.into(), (700 - 14 * i as i64).into()]));
                operations.push(Operation::new("Tj", vec![Object::String(bytes, StringFormat::Literal)]));
            }
            operations.push(Operation::new("ET", vec![]));
        }
        let encoded = Content { operations }.encode().unwrap();
        doc.add_object(Stream::new(dictionary! {}, encoded))
    }

    fn finish(mut doc: Document, pages_id: ObjectId, pages: Object) -> Vec<u8> {
        doc.objects.insert(pages_id, pages);
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    /// One page per entry, each drawing its runs with a WinAnsi Helvetica.
    pub fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = font(&mut doc);

        let mut kids: Vec<Object> = Vec::new();
        for runs in pages {
            let content_id = content_stream(&mut doc, runs);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        finish(doc, pages_id, Object::Dictionary(pages))
    }

    /// A single page whose font comes from the parent `Pages` node.
    pub fn pdf_with_shared_resources(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = font(&mut doc);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let content_id = content_stream(&mut doc, &[text]);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        finish(doc, pages_id, Object::Dictionary(pages))
    }
}
