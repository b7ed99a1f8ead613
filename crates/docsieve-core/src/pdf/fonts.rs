//! Font-aware string decoding for content-stream text runs.

use std::collections::HashMap;
use std::iter::Peekable;

use encoding_rs::UTF_16BE;
use lopdf::{Dictionary, Document, Object};
use tracing::trace;

use super::encoding::{CodeTable, UNMAPPED};
use super::engine::PdfEngine;

/// Largest `bfrange` expanded into individual entries.
const MAX_RANGE_SPAN: u32 = 0xFFFF;

/// How the bytes of a string operand become text.
pub enum FontDecoder {
    /// One byte per code through a 256-entry table.
    Simple(Box<CodeTable>),
    /// A `/ToUnicode` CMap.
    CMap(ToUnicodeMap),
    /// Two-byte codes with no mapping, read as code points.
    TwoByte,
    /// No usable font information.
    Fallback,
}

impl FontDecoder {
    /// Choose a decoder for a font dictionary.
    pub fn from_dict(doc: &Document, font: &Dictionary, engine: &PdfEngine) -> Self {
        if let Some(map) = to_unicode(doc, font) {
            return FontDecoder::CMap(map);
        }

        let subtype = font.get(b"Subtype").and_then(Object::as_name).unwrap_or(&b""[..]);
        if subtype == b"Type0" {
            return FontDecoder::TwoByte;
        }

        let default = if subtype == b"TrueType" {
            engine.win_ansi()
        } else {
            engine.standard()
        };

        let encoding = font.get(b"Encoding").ok().map(|obj| resolve(doc, obj));
        let table = match encoding {
            Some(Object::Name(name)) => *engine.base_encoding(name).unwrap_or(default),
            Some(Object::Dictionary(dict)) => with_differences(doc, dict, engine, default),
            _ => *default,
        };
        FontDecoder::Simple(Box::new(table))
    }

    /// Decode a string operand.
    pub fn decode(&self, bytes: &[u8], engine: &PdfEngine) -> String {
        match self {
            FontDecoder::Simple(table) => map_bytes(table, bytes),
            FontDecoder::CMap(map) => map.decode(bytes),
            FontDecoder::TwoByte => bytes
                .chunks_exact(2)
                .filter_map(|pair| char::from_u32(u16::from_be_bytes([pair[0], pair[1]]) as u32))
                .collect(),
            FontDecoder::Fallback => decode_fallback(bytes, engine),
        }
    }
}

/// Text strings outside a known font: UTF-16BE with a byte order mark, else PDFDocEncoding.
pub fn decode_fallback(bytes: &[u8], engine: &PdfEngine) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(rest) => UTF_16BE.decode_without_bom_handling(rest).0.into_owned(),
        None => map_bytes(engine.pdf_doc(), bytes),
    }
}

fn map_bytes(table: &CodeTable, bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| table[*b as usize])
        .filter(|c| *c != UNMAPPED)
        .collect()
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    doc.dereference(obj).map(|(_, o)| o).unwrap_or(obj)
}

fn with_differences(doc: &Document, dict: &Dictionary, engine: &PdfEngine, default: &CodeTable) -> CodeTable {
    let mut table = dict
        .get(b"BaseEncoding")
        .and_then(Object::as_name)
        .ok()
        .and_then(|name| engine.base_encoding(name))
        .copied()
        .unwrap_or(*default);

    let differences = match dict.get(b"Differences").map(|obj| resolve(doc, obj)) {
        Ok(Object::Array(items)) => items,
        _ => return table,
    };

    let mut code: usize = 0;
    for item in differences {
        match item {
            Object::Integer(start) => code = (*start).clamp(0, 255) as usize,
            Object::Name(name) => {
                if code < 256 {
                    if let Some(c) = std::str::from_utf8(name).ok().and_then(|n| engine.glyph(n)) {
                        table[code] = c;
                    }
                }
                code += 1;
            }
            _ => {}
        }
    }
    table
}

fn to_unicode(doc: &Document, font: &Dictionary) -> Option<ToUnicodeMap> {
    let obj = resolve(doc, font.get(b"ToUnicode").ok()?);
    let stream = obj.as_stream().ok()?;
    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    let map = ToUnicodeMap::parse(&data);
    if map.is_empty() {
        trace!("Ignoring empty ToUnicode CMap");
        return None;
    }
    Some(map)
}

/// Decoders for the fonts named in a resource dictionary.
#[derive(Default)]
pub struct FontSet {
    fonts: HashMap<Vec<u8>, FontDecoder>,
}

impl FontSet {
    /// Build decoders for every entry of `/Font`.
    pub fn from_resources(doc: &Document, resources: Option<&Dictionary>, engine: &PdfEngine) -> Self {
        let mut fonts = HashMap::new();
        let font_dict = resources
            .and_then(|res| res.get(b"Font").ok())
            .map(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_dict().ok());

        if let Some(font_dict) = font_dict {
            for (name, obj) in font_dict.iter() {
                let decoder = match resolve(doc, obj).as_dict() {
                    Ok(font) => FontDecoder::from_dict(doc, font, engine),
                    Err(_) => FontDecoder::Fallback,
                };
                fonts.insert(name.clone(), decoder);
            }
        }
        trace!("Resolved {} fonts", fonts.len());
        Self { fonts }
    }

    /// Decoder for a resource name.
    pub fn get(&self, name: &[u8]) -> Option<&FontDecoder> {
        self.fonts.get(name)
    }
}

/// Parsed `bfchar`/`bfrange` mappings of a ToUnicode CMap.
#[derive(Debug, Default)]
pub struct ToUnicodeMap {
    /// Keyed by (code length in bytes, code).
    map: HashMap<(usize, u32), String>,
    /// Codespace ranges as per-byte (low, high) bounds.
    codespace: Vec<(Vec<u8>, Vec<u8>)>,
    shortest: usize,
}

#[derive(Debug, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    ArrayOpen,
    ArrayClose,
    Word(String),
}

impl ToUnicodeMap {
    /// Parse CMap program text. Unknown constructs are ignored.
    pub fn parse(data: &[u8]) -> Self {
        let mut tokens = tokenize(data).into_iter().peekable();
        let mut cmap = ToUnicodeMap::default();

        while let Some(token) = tokens.next() {
            let Token::Word(word) = token else { continue };
            match word.as_str() {
                "begincodespacerange" => {
                    while let (Some(low), Some(high)) = (next_hex(&mut tokens), next_hex(&mut tokens)) {
                        if low.len() == high.len() {
                            cmap.codespace.push((low, high));
                        }
                    }
                }
                "beginbfchar" => {
                    while let (Some(src), Some(dst)) = (next_hex(&mut tokens), next_hex(&mut tokens)) {
                        if let Some(code) = code_value(&src) {
                            cmap.map.insert((src.len(), code), utf16_text(&units(&dst)));
                        }
                    }
                }
                "beginbfrange" => {
                    while let (Some(low), Some(high)) = (next_hex(&mut tokens), next_hex(&mut tokens)) {
                        if let Some(dst) = next_hex(&mut tokens) {
                            let base = units(&dst);
                            cmap.insert_range(&low, &high, |offset| {
                                let mut dst = base.clone();
                                if let Some(last) = dst.last_mut() {
                                    *last = last.wrapping_add(offset as u16);
                                }
                                Some(utf16_text(&dst))
                            });
                        } else if tokens.next_if_eq(&Token::ArrayOpen).is_some() {
                            let mut targets = Vec::new();
                            while let Some(dst) = next_hex(&mut tokens) {
                                targets.push(utf16_text(&units(&dst)));
                            }
                            tokens.next_if_eq(&Token::ArrayClose);
                            cmap.insert_range(&low, &high, |offset| targets.get(offset as usize).cloned());
                        } else {
                            break;
                        }
                    }
                }
                _ => {}
            }
        }

        cmap.shortest = cmap.map.keys().map(|(len, _)| *len).min().unwrap_or(1);
        cmap
    }

    fn insert_range(&mut self, low: &[u8], high: &[u8], target: impl Fn(u32) -> Option<String>) {
        let (Some(start), Some(end)) = (code_value(low), code_value(high)) else {
            return;
        };
        if end < start || end - start > MAX_RANGE_SPAN {
            return;
        }
        for offset in 0..=end - start {
            if let Some(text) = target(offset) {
                self.map.insert((low.len(), start + offset), text);
            }
        }
    }

    /// Number of mapped codes.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no code is mapped.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Decode a string operand. Unmapped codes are dropped.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let mut text = String::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let len = self.code_length(&bytes[pos..]);
            let end = (pos + len).min(bytes.len());
            if let Some(mapped) = code_value(&bytes[pos..end]).and_then(|code| self.map.get(&(end - pos, code))) {
                text.push_str(mapped);
            }
            pos = end;
        }
        text
    }

    fn code_length(&self, rest: &[u8]) -> usize {
        self.codespace
            .iter()
            .filter(|(low, high)| {
                low.len() <= rest.len()
                    && low
                        .iter()
                        .zip(high)
                        .zip(rest)
                        .all(|((lo, hi), b)| (*lo..=*hi).contains(b))
            })
            .map(|(low, _)| low.len())
            .min()
            .unwrap_or(self.shortest)
    }
}

fn next_hex(tokens: &mut Peekable<impl Iterator<Item = Token>>) -> Option<Vec<u8>> {
    match tokens.next_if(|token| matches!(token, Token::Hex(_)))? {
        Token::Hex(bytes) => Some(bytes),
        _ => None,
    }
}

fn code_value(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 4 {
        return None;
    }
    Some(bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
}

fn units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => *single as u16,
            _ => 0,
        })
        .collect()
}

fn utf16_text(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        match data[i] {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => {
                tokens.push(Token::Word("<<".to_string()));
                i += 2;
            }
            b'>' if data.get(i + 1) == Some(&b'>') => {
                tokens.push(Token::Word(">>".to_string()));
                i += 2;
            }
            b'<' => {
                let mut digits = Vec::new();
                i += 1;
                while i < data.len() && data[i] != b'>' {
                    if let Some(d) = (data[i] as char).to_digit(16) {
                        digits.push(d as u8);
                    }
                    i += 1;
                }
                i += 1;
                if digits.len() % 2 == 1 {
                    digits.push(0);
                }
                tokens.push(Token::Hex(digits.chunks(2).map(|p| (p[0] << 4) | p[1]).collect()));
            }
            b'[' => {
                tokens.push(Token::ArrayOpen);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayClose);
                i += 1;
            }
            b'(' => {
                // Literal strings only appear in CMap metadata.
                let mut depth = 0usize;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            c if c.is_ascii_whitespace() || c == b'>' || c == b')' || c == 0 => i += 1,
            _ => {
                let start = i;
                i += 1;
                while i < data.len() && !is_delimiter(data[i]) {
                    i += 1;
                }
                tokens.push(Token::Word(String::from_utf8_lossy(&data[start..i]).into_owned()));
            }
        }
    }
    tokens
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'<' | b'>' | b'[' | b']' | b'(' | b')' | b'/' | b'%' | 0)
}
