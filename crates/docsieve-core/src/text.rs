//! Plain text decoding.

use tracing::debug;

use crate::error::{ExtractError, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Strict UTF-8 decoder for `.txt` uploads.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextDecoder;

impl PlainTextDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self
    }

    /// Decode bytes as UTF-8. Invalid sequences are a corrupt file, never replaced.
    pub fn decode(&self, data: &[u8]) -> Result<String> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        let text = std::str::from_utf8(data).map_err(|e| {
            ExtractError::corrupt(format!(
                "invalid UTF-8 at byte {}",
                e.valid_up_to()
            ))
        })?;
        debug!("Decoded {} bytes of plain text", data.len());
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_utf8() {
        let text = PlainTextDecoder::new().decode("Zażółć gęślą jaźń\n".as_bytes()).unwrap();
        assert_eq!(text, "Zażółć gęślą jaźń\n");
    }

    #[test]
    fn test_bom_is_stripped() {
        let text = PlainTextDecoder::new().decode(b"\xEF\xBB\xBFhello").unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_whitespace_preserved() {
        let text = PlainTextDecoder::new().decode(b"  indented\r\n\ttabbed  ").unwrap();
        assert_eq!(text, "  indented\r\n\ttabbed  ");
    }

    #[test]
    fn test_invalid_utf8_is_corrupt() {
        let err = PlainTextDecoder::new().decode(&[0x68, 0x69, 0xFF, 0xFE]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptFile);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(PlainTextDecoder::new().decode(b"").unwrap(), "");
    }
}
