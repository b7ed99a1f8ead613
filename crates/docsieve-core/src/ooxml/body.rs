//! Walks WordprocessingML body markup and collects paragraph text.

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::trace;

use crate::error::{ExtractError, Result};

/// Paragraph text being assembled, one entry per open `w:p`.
#[derive(Default)]
struct BodyWalker {
    open: Vec<String>,
    paragraphs: Vec<String>,
    run_depth: usize,
    in_text: bool,
}

impl BodyWalker {
    fn start(&mut self, local: &[u8]) {
        match local {
            b"p" => self.open.push(String::new()),
            b"r" => self.run_depth += 1,
            b"t" if self.run_depth > 0 => self.in_text = true,
            _ => {}
        }
    }

    fn empty(&mut self, local: &[u8]) {
        match local {
            b"p" => self.paragraphs.push(String::new()),
            b"tab" if self.run_depth > 0 => self.push_str("\t"),
            b"br" | b"cr" if self.run_depth > 0 => self.push_str("\n"),
            b"noBreakHyphen" if self.run_depth > 0 => self.push_str("-"),
            _ => {}
        }
    }

    fn end(&mut self, local: &[u8]) {
        match local {
            b"p" => {
                if let Some(paragraph) = self.open.pop() {
                    self.paragraphs.push(paragraph);
                }
            }
            b"r" => self.run_depth = self.run_depth.saturating_sub(1),
            b"t" => self.in_text = false,
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_text {
            self.push_str(text);
        }
    }

    fn push_str(&mut self, text: &str) {
        if let Some(current) = self.open.last_mut() {
            current.push_str(text);
        }
    }

    fn finish(self) -> String {
        self.paragraphs.join("\n")
    }
}

/// Concatenate the text of every paragraph in document order.
///
/// Only `w:t` content is body text; `w:delText` and `w:instrText` are
/// skipped because they are distinct elements.
pub fn extract_body_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut walker = BodyWalker::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => walker.start(e.local_name().as_ref()),
            Ok(Event::Empty(e)) => walker.empty(e.local_name().as_ref()),
            Ok(Event::End(e)) => walker.end(e.local_name().as_ref()),
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| {
                    ExtractError::corrupt(format!(
                        "bad text at {}: {}",
                        reader.buffer_position(),
                        err
                    ))
                })?;
                walker.text(&text);
            }
            Ok(Event::CData(e)) => walker.text(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::corrupt(format!(
                    "malformed document body at {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    if !walker.open.is_empty() {
        return Err(ExtractError::corrupt("document body ends inside a paragraph"));
    }

    trace!("Collected {} paragraphs", walker.paragraphs.len());
    Ok(walker.finish())
}
