//! Piece table (`Clx`) parsing and raw body text assembly.

use encoding_rs::WINDOWS_1252;
use tracing::trace;

use crate::fib::{FormatError, read_u32};

const CLXT_PRC: u8 = 0x01;
const CLXT_PCDT: u8 = 0x02;
const PCD_LEN: usize = 8;
const FC_COMPRESSED: u32 = 0x4000_0000;
const FC_MASK: u32 = 0x3FFF_FFFF;

/// A run of characters stored contiguously in the `WordDocument` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    /// First character position.
    pub cp_start: u32,
    /// One past the last character position.
    pub cp_end: u32,
    /// Byte offset of the first character.
    pub offset: usize,
    /// One byte per character (Windows-1252) instead of UTF-16LE.
    pub compressed: bool,
}

/// Parse the pieces out of a `Clx`.
pub fn parse_clx(clx: &[u8]) -> Result<Vec<Piece>, FormatError> {
    let mut pos = 0;

    // Skip any Prc entries
    while clx.get(pos) == Some(&CLXT_PRC) {
        let size = clx
            .get(pos + 1..pos + 3)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .ok_or_else(|| FormatError::PieceTable("truncated Prc".to_string()))?;
        if size < 0 {
            return Err(FormatError::PieceTable(format!("negative Prc size {}", size)));
        }
        pos += 3 + size as usize;
    }

    if clx.get(pos) != Some(&CLXT_PCDT) {
        return Err(FormatError::PieceTable("missing Pcdt".to_string()));
    }
    let lcb = read_u32(clx, pos + 1, "Pcdt")? as usize;
    let plc = clx
        .get(pos + 5..pos + 5 + lcb)
        .ok_or_else(|| FormatError::PieceTable(format!("PlcPcd of {} bytes overruns Clx", lcb)))?;
    if lcb < 4 || (lcb - 4) % (4 + PCD_LEN) != 0 {
        return Err(FormatError::PieceTable(format!("PlcPcd size {} is not 12n+4", lcb)));
    }

    let count = (lcb - 4) / (4 + PCD_LEN);
    let descriptors = (count + 1) * 4;
    let mut pieces = Vec::with_capacity(count);
    for i in 0..count {
        let cp_start = read_u32(plc, i * 4, "PlcPcd")?;
        let cp_end = read_u32(plc, (i + 1) * 4, "PlcPcd")?;
        if cp_end < cp_start {
            return Err(FormatError::PieceTable(format!("piece {} runs backwards", i)));
        }
        let fc = read_u32(plc, descriptors + i * PCD_LEN + 2, "Pcd")?;
        let compressed = fc & FC_COMPRESSED != 0;
        let fc = (fc & FC_MASK) as usize;
        pieces.push(Piece {
            cp_start,
            cp_end,
            offset: if compressed { fc / 2 } else { fc },
            compressed,
        });
    }

    trace!("Parsed {} pieces", pieces.len());
    Ok(pieces)
}

/// Read the first `ccp_text` characters of the document body.
pub fn body_text(word: &[u8], pieces: &[Piece], ccp_text: u32) -> Result<String, FormatError> {
    let mut text = String::new();
    let mut remaining = ccp_text;

    for piece in pieces {
        if remaining == 0 {
            break;
        }
        let chars = (piece.cp_end - piece.cp_start).min(remaining);
        remaining -= chars;

        let width = if piece.compressed { 1 } else { 2 };
        let len = chars as usize * width;
        let bytes = word.get(piece.offset..piece.offset + len).ok_or(FormatError::Truncated {
            what: "piece",
            needed: piece.offset + len,
            len: word.len(),
        })?;

        if piece.compressed {
            text.push_str(&WINDOWS_1252.decode_without_bom_handling(bytes).0);
        } else {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .collect();
            text.push_str(&String::from_utf16_lossy(&units));
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{PieceSpec, clx};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_compressed_piece() {
        let pieces = parse_clx(&clx(&[PieceSpec::compressed(0, 5, 1024)], false)).unwrap();
        assert_eq!(
            pieces,
            vec![Piece {
                cp_start: 0,
                cp_end: 5,
                offset: 1024,
                compressed: true,
            }]
        );
    }

    #[test]
    fn test_prc_entries_skipped() {
        let pieces = parse_clx(&clx(&[PieceSpec::unicode(0, 3, 2048)], true)).unwrap();
        assert_eq!(pieces.len(), 1);
        assert!(!pieces[0].compressed);
        assert_eq!(pieces[0].offset, 2048);
    }

    #[test]
    fn test_missing_pcdt() {
        assert!(parse_clx(&[0x05, 0, 0]).is_err());
        assert!(parse_clx(&[]).is_err());
    }

    #[test]
    fn test_body_text_mixes_piece_kinds() {
        let mut word = vec![0u8; 64];
        word[10..17].copy_from_slice(b"Price: ");
        let wide: Vec<u8> = "100 zł".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        word[32..32 + wide.len()].copy_from_slice(&wide);

        let pieces = vec![
            Piece { cp_start: 0, cp_end: 7, offset: 10, compressed: true },
            Piece { cp_start: 7, cp_end: 13, offset: 32, compressed: false },
        ];
        assert_eq!(body_text(&word, &pieces, 13).unwrap(), "Price: 100 zł");
        assert_eq!(body_text(&word, &pieces, 9).unwrap(), "Price: 10");
    }

    #[test]
    fn test_piece_past_end_of_stream() {
        let pieces = vec![Piece { cp_start: 0, cp_end: 10, offset: 60, compressed: true }];
        assert!(body_text(&[0u8; 64], &pieces, 10).is_err());
    }
}
