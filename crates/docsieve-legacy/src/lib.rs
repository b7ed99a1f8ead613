//! Legacy Word (`.doc`) text extraction.
//!
//! This crate is linked only into trusted binaries (the CLI and its HTTP
//! server). It provides:
//! - [`LegacyBinaryDocumentDecoder`] for compound binary `.doc` files
//! - [`LegacyEndpoint`], the `.doc`-only entry point behind the server
//! - [`TrustedExtractor`], which handles every supported format

mod fib;
mod normalize;
mod pieces;

pub use fib::{Fib, FormatError};
pub use normalize::normalize;
pub use pieces::{Piece, parse_clx};

use std::io::{Cursor, Read};

use cfb::CompoundFile;
use tracing::{debug, info};

use docsieve_core::format::{ALL_SUFFIXES, FormatVariant, LEGACY_SUFFIXES};
use docsieve_core::models::{DocsieveConfig, LimitsConfig};
use docsieve_core::pipeline::{Extractor, check_upload, unsupported};
use docsieve_core::{ExtractError, ExtractionResult, Result, SourceDocument};

const WORD_DOCUMENT: &str = "WordDocument";

/// Decoder for compound binary `.doc` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyBinaryDocumentDecoder;

impl LegacyBinaryDocumentDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self
    }

    /// Extract the main body text.
    pub fn decode(&self, data: &[u8]) -> Result<String> {
        let mut container = CompoundFile::open(Cursor::new(data))
            .map_err(|e| ExtractError::corrupt(format!("not a compound file: {}", e)))?;

        let word = read_stream(&mut container, WORD_DOCUMENT)?;
        let fib = Fib::parse(&word)?;
        debug!(
            "FIB: {} chars of body text, Clx {} bytes in {}",
            fib.ccp_text, fib.lcb_clx, fib.table_stream
        );

        let table = read_stream(&mut container, fib.table_stream)?;
        let start = fib.fc_clx as usize;
        let clx = table
            .get(start..start + fib.lcb_clx as usize)
            .ok_or(FormatError::Truncated {
                what: "Clx",
                needed: start + fib.lcb_clx as usize,
                len: table.len(),
            })?;

        let pieces = parse_clx(clx)?;
        let raw = pieces::body_text(&word, &pieces, fib.ccp_text)?;
        Ok(normalize(&raw))
    }
}

fn read_stream(container: &mut CompoundFile<Cursor<&[u8]>>, name: &str) -> Result<Vec<u8>> {
    let mut stream = container
        .open_stream(name)
        .map_err(|e| ExtractError::corrupt(format!("missing {} stream: {}", name, e)))?;
    let mut data = Vec::new();
    stream
        .read_to_end(&mut data)
        .map_err(|e| ExtractError::corrupt(format!("failed to read {}: {}", name, e)))?;
    Ok(data)
}

/// The `.doc`-only entry point served over HTTP.
#[derive(Debug, Clone, Default)]
pub struct LegacyEndpoint {
    decoder: LegacyBinaryDocumentDecoder,
    limits: LimitsConfig,
}

impl LegacyEndpoint {
    /// Endpoint with the given input limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            decoder: LegacyBinaryDocumentDecoder::new(),
            limits,
        }
    }

    /// Validate and decode, returning the raw outcome.
    pub fn decode(&self, doc: &SourceDocument) -> Result<String> {
        check_upload(doc, &self.limits, LEGACY_SUFFIXES)?;
        match doc.format() {
            FormatVariant::LegacyBinaryDocument => self.decoder.decode(doc.bytes()),
            _ => Err(unsupported(doc, LEGACY_SUFFIXES).into()),
        }
    }

    /// Validate and decode into the response envelope.
    pub fn extract(&self, doc: &SourceDocument) -> ExtractionResult {
        ExtractionResult::from_outcome(self.decode(doc))
    }
}

/// Dispatcher for trusted callers: every format, including `.doc`.
pub struct TrustedExtractor {
    client: Extractor,
    legacy: LegacyBinaryDocumentDecoder,
    limits: LimitsConfig,
}

impl TrustedExtractor {
    /// Dispatcher with the given settings.
    pub fn with_config(config: &DocsieveConfig) -> Self {
        Self {
            client: Extractor::with_config(config),
            legacy: LegacyBinaryDocumentDecoder::new(),
            limits: config.limits.clone(),
        }
    }

    /// Decode a document, returning the raw outcome.
    pub async fn decode(&self, doc: &SourceDocument) -> Result<String> {
        check_upload(doc, &self.limits, ALL_SUFFIXES)?;
        match doc.format() {
            FormatVariant::LegacyBinaryDocument => self.legacy.decode(doc.bytes()),
            FormatVariant::Unsupported => Err(unsupported(doc, ALL_SUFFIXES).into()),
            _ => self.client.decode(doc).await,
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
}

impl Default for TrustedExtractor {
    fn default() -> Self {
        Self::with_config(&DocsieveConfig::default())
    }
}

/// In-memory `.doc` builders for tests of this crate and its dependents.
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures {
    use std::io::{Cursor, Write};

    use cfb::CompoundFile;
    use encoding_rs::WINDOWS_1252;

    pub const FLAG_ENCRYPTED: u16 = 0x0100;
    pub const FLAG_WHICH_TABLE: u16 = 0x0200;
    pub const FLAG_OBFUSCATED: u16 = 0x8000;

    /// Where the body text starts in the generated `WordDocument` stream.
    pub const TEXT_OFFSET: usize = 1024;

    /// A Word 97 FIB: `csw` 14, `cslw` 22, `cbRgFcLcb` 93.
    pub fn fib_bytes(flags: u16, ccp_text: u32, fc_clx: u32, lcb_clx: u32) -> Vec<u8> {
        let mut fib = vec![0u8; 898];
        fib[0..2].copy_from_slice(&0xA5ECu16.to_le_bytes());
        fib[2..4].copy_from_slice(&0x00C1u16.to_le_bytes());
        fib[0x0A..0x0C].copy_from_slice(&flags.to_le_bytes());
        fib[32..34].copy_from_slice(&14u16.to_le_bytes());
        fib[62..64].copy_from_slice(&22u16.to_le_bytes());
        fib[76..80].copy_from_slice(&ccp_text.to_le_bytes());
        fib[152..154].copy_from_slice(&93u16.to_le_bytes());
        fib[0x1A2..0x1A6].copy_from_slice(&fc_clx.to_le_bytes());
        fib[0x1A6..0x1AA].copy_from_slice(&lcb_clx.to_le_bytes());
        fib
    }

    /// One piece descriptor as stored in the `PlcPcd`.
    #[derive(Debug, Clone, Copy)]
    pub struct PieceSpec {
        pub cp_start: u32,
        pub cp_end: u32,
        pub fc: u32,
    }

    impl PieceSpec {
        /// Windows-1252 text at a byte offset.
        pub fn compressed(cp_start: u32, cp_end: u32, offset: u32) -> Self {
            Self {
                cp_start,
                cp_end,
                fc: (offset * 2) | 0x4000_0000,
            }
        }

        /// UTF-16LE text at a byte offset.
        pub fn unicode(cp_start: u32, cp_end: u32, offset: u32) -> Self {
            Self { cp_start, cp_end, fc: offset }
        }
    }

    /// A `Clx`, optionally preceded by a `Prc`.
    pub fn clx(pieces: &[PieceSpec], with_prc: bool) -> Vec<u8> {
        let mut clx = Vec::new();
        if with_prc {
            clx.push(0x01);
            clx.extend_from_slice(&2i16.to_le_bytes());
            clx.extend_from_slice(&[0xAA, 0xBB]);
        }

        let mut plc = Vec::new();
        for piece in pieces {
            plc.extend_from_slice(&piece.cp_start.to_le_bytes());
        }
        if let Some(last) = pieces.last() {
            plc.extend_from_slice(&last.cp_end.to_le_bytes());
        }
        for piece in pieces {
            plc.extend_from_slice(&[0, 0]);
            plc.extend_from_slice(&piece.fc.to_le_bytes());
            plc.extend_from_slice(&[0, 0]);
        }

        clx.push(0x02);
        clx.extend_from_slice(&(plc.len() as u32).to_le_bytes());
        clx.extend_from_slice(&plc);
        clx
    }

    /// Pack streams into a compound file.
    pub fn compound_file(streams: &[(&str, &[u8])]) -> Vec<u8> {
        let mut container = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        for (name, data) in streams {
            let mut stream = container.create_stream(name).unwrap();
            stream.write_all(data).unwrap();
            stream.flush().unwrap();
        }
        container.flush().unwrap();
        container.into_inner().into_inner()
    }

    /// A `.doc` whose body is `text`, stored as one piece.
    pub fn word_document(text: &str, flags: u16, compressed: bool) -> Vec<u8> {
        let ccp_text = text.chars().count() as u32;
        let (stored, piece) = if compressed {
            let bytes = WINDOWS_1252.encode(text).0.into_owned();
            (bytes, PieceSpec::compressed(0, ccp_text, TEXT_OFFSET as u32))
        } else {
            let bytes: Vec<u8> = text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
            (bytes, PieceSpec::unicode(0, ccp_text, TEXT_OFFSET as u32))
        };
        word_document_with(&stored, &[piece], ccp_text, flags)
    }

    /// A `.doc` from raw stored text bytes and explicit pieces.
    pub fn word_document_with(stored: &[u8], pieces: &[PieceSpec], ccp_text: u32, flags: u16) -> Vec<u8> {
        let clx = clx(pieces, true);
        let mut word = fib_bytes(flags | FLAG_WHICH_TABLE, ccp_text, 0, clx.len() as u32);
        word.resize(TEXT_OFFSET, 0);
        word.extend_from_slice(stored);
        compound_file(&[("WordDocument", &word), ("1Table", &clx)])
    }
}
