//! File Information Block parsing.
//!
//! Only the fields needed to find the body text are read: the protection
//! flags, the table stream selector, `ccpText` and the `Clx` location.

use thiserror::Error;

use docsieve_core::ExtractError;

const FIB_MAGIC: u16 = 0xA5EC;

const F_ENCRYPTED: u16 = 0x0100;
const F_WHICH_TBL_STM: u16 = 0x0200;
const F_OBFUSCATED: u16 = 0x8000;

/// `FibBase` is fixed size; `csw` follows it.
const FIB_BASE_LEN: usize = 32;
/// Index of `ccpText` in `FibRgLw97`.
const CCP_TEXT_INDEX: usize = 3;
/// Index of the `fcClx`/`lcbClx` pair in `FibRgFcLcb97`.
const CLX_PAIR_INDEX: usize = 33;

/// Structural problems in the `WordDocument` or table streams.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("{what} ends at byte {needed}, stream has {len}")]
    Truncated {
        what: &'static str,
        needed: usize,
        len: usize,
    },

    #[error("bad FIB magic 0x{0:04X}")]
    BadMagic(u16),

    #[error("document is encrypted or obfuscated")]
    Protected,

    #[error("malformed piece table: {0}")]
    PieceTable(String),
}

impl From<FormatError> for ExtractError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Protected => ExtractError::Unreadable,
            other => ExtractError::corrupt(other.to_string()),
        }
    }
}

/// The FIB fields text extraction depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fib {
    /// Name of the table stream holding the `Clx`.
    pub table_stream: &'static str,
    /// Characters in the main document body.
    pub ccp_text: u32,
    /// Offset of the `Clx` in the table stream.
    pub fc_clx: u32,
    /// Size of the `Clx`.
    pub lcb_clx: u32,
}

impl Fib {
    /// Parse the FIB at the start of a `WordDocument` stream.
    pub fn parse(word: &[u8]) -> Result<Self, FormatError> {
        let magic = read_u16(word, 0, "FibBase")?;
        if magic != FIB_MAGIC {
            return Err(FormatError::BadMagic(magic));
        }

        let flags = read_u16(word, 0x0A, "FibBase")?;
        if flags & (F_ENCRYPTED | F_OBFUSCATED) != 0 {
            return Err(FormatError::Protected);
        }
        let table_stream = if flags & F_WHICH_TBL_STM != 0 {
            "1Table"
        } else {
            "0Table"
        };

        let csw = read_u16(word, FIB_BASE_LEN, "csw")? as usize;
        let rg_lw = FIB_BASE_LEN + 2 + csw * 2 + 2;
        let cslw = read_u16(word, rg_lw - 2, "cslw")? as usize;
        if cslw <= CCP_TEXT_INDEX {
            return Err(FormatError::Truncated {
                what: "FibRgLw",
                needed: CCP_TEXT_INDEX + 1,
                len: cslw,
            });
        }
        let ccp_text = read_u32(word, rg_lw + CCP_TEXT_INDEX * 4, "ccpText")?;

        let rg_fc_lcb = rg_lw + cslw * 4 + 2;
        let pairs = read_u16(word, rg_fc_lcb - 2, "cbRgFcLcb")? as usize;
        if pairs <= CLX_PAIR_INDEX {
            return Err(FormatError::Truncated {
                what: "FibRgFcLcb",
                needed: CLX_PAIR_INDEX + 1,
                len: pairs,
            });
        }
        let clx = rg_fc_lcb + CLX_PAIR_INDEX * 8;
        let fc_clx = read_u32(word, clx, "fcClx")?;
        let lcb_clx = read_u32(word, clx + 4, "lcbClx")?;

        Ok(Self {
            table_stream,
            ccp_text,
            fc_clx,
            lcb_clx,
        })
    }
}

pub(crate) fn read_u16(data: &[u8], at: usize, what: &'static str) -> Result<u16, FormatError> {
    data.get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(FormatError::Truncated {
            what,
            needed: at + 2,
            len: data.len(),
        })
}

pub(crate) fn read_u32(data: &[u8], at: usize, what: &'static str) -> Result<u32, FormatError> {
    data.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(FormatError::Truncated {
            what,
            needed: at + 4,
            len: data.len(),
        })
}
