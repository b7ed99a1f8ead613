//! Single-byte text encodings and glyph names used by simple PDF fonts.
//!
//! Tables map a byte code to a `char`; `'\0'` marks an unmapped code.

use std::collections::HashMap;

use encoding_rs::{Encoding, MACINTOSH, WINDOWS_1252};

use crate::error::EngineError;

/// A 256-entry byte-to-char table.
pub type CodeTable = [char; 256];

/// Marker for codes without a mapping.
pub const UNMAPPED: char = '\0';

/// Build a table by decoding every byte through an `encoding_rs` encoding.
///
/// Control codes below 0x20 stay unmapped; fonts never draw them as text.
pub fn single_byte_table(encoding: &'static Encoding, name: &'static str) -> Result<CodeTable, EngineError> {
    let mut table = [UNMAPPED; 256];
    for code in 0x20..=0xFFu8 {
        let byte = [code];
        let (decoded, had_errors) = encoding.decode_without_bom_handling(&byte);
        let mut chars = decoded.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !had_errors => table[code as usize] = c,
            _ => {
                return Err(EngineError::Table {
                    name,
                    reason: format!("byte 0x{:02X} did not decode to one char", code),
                });
            }
        }
    }
    Ok(table)
}

/// `WinAnsiEncoding` (Windows-1252).
pub fn win_ansi_table() -> Result<CodeTable, EngineError> {
    single_byte_table(WINDOWS_1252, "WinAnsiEncoding")
}

/// `MacRomanEncoding`.
pub fn mac_roman_table() -> Result<CodeTable, EngineError> {
    single_byte_table(MACINTOSH, "MacRomanEncoding")
}

/// Adobe `StandardEncoding`.
pub fn standard_table() -> CodeTable {
    let mut table = [UNMAPPED; 256];
    for code in 0x20..0x7Fu8 {
        table[code as usize] = code as char;
    }
    table[0x27] = '\u{2019}';
    table[0x60] = '\u{2018}';

    const HIGH: &[(u8, char)] = &[
        (0xA1, '¡'), (0xA2, '¢'), (0xA3, '£'), (0xA4, '⁄'), (0xA5, '¥'), (0xA6, 'ƒ'),
        (0xA7, '§'), (0xA8, '¤'), (0xA9, '\''), (0xAA, '“'), (0xAB, '«'), (0xAC, '‹'),
        (0xAD, '›'), (0xAE, 'ﬁ'), (0xAF, 'ﬂ'), (0xB1, '–'), (0xB2, '†'), (0xB3, '‡'),
        (0xB4, '·'), (0xB6, '¶'), (0xB7, '•'), (0xB8, '‚'), (0xB9, '„'), (0xBA, '”'),
        (0xBB, '»'), (0xBC, '…'), (0xBD, '‰'), (0xBF, '¿'), (0xC1, '`'), (0xC2, '´'),
        (0xC3, 'ˆ'), (0xC4, '˜'), (0xC5, '¯'), (0xC6, '˘'), (0xC7, '˙'), (0xC8, '¨'),
        (0xCA, '˚'), (0xCB, '¸'), (0xCD, '˝'), (0xCE, '˛'), (0xCF, 'ˇ'), (0xD0, '—'),
        (0xE1, 'Æ'), (0xE3, 'ª'), (0xE8, 'Ł'), (0xE9, 'Ø'), (0xEA, 'Œ'), (0xEB, 'º'),
        (0xF1, 'æ'), (0xF5, 'ı'), (0xF8, 'ł'), (0xF9, 'ø'), (0xFA, 'œ'), (0xFB, 'ß'),
    ];
    for &(code, c) in HIGH {
        table[code as usize] = c;
    }
    table
}

/// `PDFDocEncoding`, used for strings outside any font (and as a last resort).
pub fn pdf_doc_table() -> CodeTable {
    let mut table = [UNMAPPED; 256];
    table[0x09] = '\t';
    table[0x0A] = '\n';
    table[0x0D] = '\r';
    for code in 0x20..=0xFFu8 {
        table[code as usize] = code as char;
    }

    const ACCENTS: [char; 8] = ['˘', 'ˇ', 'ˆ', '˙', '˝', '˛', '˚', '˜'];
    for (i, c) in ACCENTS.iter().enumerate() {
        table[0x18 + i] = *c;
    }

    const SPECIALS: [char; 31] = [
        '•', '†', '‡', '…', '—', '–', 'ƒ', '⁄', '‹', '›', '−', '‰', '„', '“', '”', '‘',
        '’', '‚', '™', 'ﬁ', 'ﬂ', 'Ł', 'Œ', 'Š', 'Ÿ', 'Ž', 'ı', 'ł', 'œ', 'š', 'ž',
    ];
    for (i, c) in SPECIALS.iter().enumerate() {
        table[0x80 + i] = *c;
    }
    table[0x9F] = UNMAPPED;
    table[0x7F] = UNMAPPED;
    table[0xA0] = '€';
    table
}

/// Glyph names that differ from their character, for `/Differences` arrays.
const GLYPH_NAMES: &[(&str, char)] = &[
    ("space", ' '), ("exclam", '!'), ("quotedbl", '"'), ("numbersign", '#'),
    ("dollar", '$'), ("percent", '%'), ("ampersand", '&'), ("quotesingle", '\''),
    ("parenleft", '('), ("parenright", ')'), ("asterisk", '*'), ("plus", '+'),
    ("comma", ','), ("hyphen", '-'), ("period", '.'), ("slash", '/'),
    ("zero", '0'), ("one", '1'), ("two", '2'), ("three", '3'), ("four", '4'),
    ("five", '5'), ("six", '6'), ("seven", '7'), ("eight", '8'), ("nine", '9'),
    ("colon", ':'), ("semicolon", ';'), ("less", '<'), ("equal", '='),
    ("greater", '>'), ("question", '?'), ("at", '@'), ("bracketleft", '['),
    ("backslash", '\\'), ("bracketright", ']'), ("asciicircum", '^'),
    ("underscore", '_'), ("grave", '`'), ("braceleft", '{'), ("bar", '|'),
    ("braceright", '}'), ("asciitilde", '~'), ("quoteleft", '‘'),
    ("quoteright", '’'), ("quotedblleft", '“'), ("quotedblright", '”'),
    ("quotesinglbase", '‚'), ("quotedblbase", '„'), ("guillemotleft", '«'),
    ("guillemotright", '»'), ("guilsinglleft", '‹'), ("guilsinglright", '›'),
    ("endash", '–'), ("emdash", '—'), ("bullet", '•'), ("ellipsis", '…'),
    ("dagger", '†'), ("daggerdbl", '‡'), ("periodcentered", '·'),
    ("section", '§'), ("paragraph", '¶'), ("copyright", '©'),
    ("registered", '®'), ("trademark", '™'), ("degree", '°'), ("minus", '−'),
    ("multiply", '×'), ("divide", '÷'), ("plusminus", '±'), ("Euro", '€'),
    ("sterling", '£'), ("yen", '¥'), ("cent", '¢'), ("currency", '¤'),
    ("florin", 'ƒ'), ("fraction", '⁄'), ("perthousand", '‰'),
    ("exclamdown", '¡'), ("questiondown", '¿'), ("nbspace", '\u{A0}'),
    ("sfthyphen", '\u{AD}'), ("fi", 'ﬁ'), ("fl", 'ﬂ'), ("ff", 'ﬀ'),
    ("ffi", 'ﬃ'), ("ffl", 'ﬄ'), ("dotlessi", 'ı'), ("germandbls", 'ß'),
    ("ae", 'æ'), ("oe", 'œ'), ("AE", 'Æ'), ("OE", 'Œ'), ("oslash", 'ø'), ("lslash", 'ł'), ("eth", 'ð'),
    ("thorn", 'þ'), ("ordfeminine", 'ª'), ("ordmasculine", 'º'),
    ("agrave", 'à'), ("aacute", 'á'), ("acircumflex", 'â'), ("atilde", 'ã'),
    ("adieresis", 'ä'), ("aring", 'å'), ("aogonek", 'ą'), ("ccedilla", 'ç'),
    ("cacute", 'ć'), ("ccaron", 'č'), ("egrave", 'è'), ("eacute", 'é'),
    ("ecircumflex", 'ê'), ("edieresis", 'ë'), ("eogonek", 'ę'), ("ecaron", 'ě'),
    ("igrave", 'ì'), ("iacute", 'í'), ("icircumflex", 'î'), ("idieresis", 'ï'),
    ("ntilde", 'ñ'), ("nacute", 'ń'), ("ncaron", 'ň'), ("ograve", 'ò'),
    ("oacute", 'ó'), ("ocircumflex", 'ô'), ("otilde", 'õ'), ("odieresis", 'ö'),
    ("rcaron", 'ř'), ("sacute", 'ś'), ("scaron", 'š'), ("tcaron", 'ť'),
    ("ugrave", 'ù'), ("uacute", 'ú'), ("ucircumflex", 'û'), ("udieresis", 'ü'),
    ("uring", 'ů'), ("yacute", 'ý'), ("ydieresis", 'ÿ'), ("zacute", 'ź'),
    ("zdotaccent", 'ż'), ("zcaron", 'ž'),
];

/// Glyph-name lookup for `/Differences` arrays.
pub struct GlyphNames {
    names: HashMap<&'static str, char>,
}

impl GlyphNames {
    /// Build the lookup table.
    pub fn new() -> Self {
        let names: HashMap<&'static str, char> = GLYPH_NAMES.iter().copied().collect();
        Self { names }
    }

    /// Resolve a glyph name to a character.
    ///
    /// Handles `uniXXXX`, `uXXXX`..`uXXXXXX`, and capitalised forms of known
    /// lowercase accented names (`Eacute` from `eacute`).
    pub fn resolve(&self, name: &str) -> Option<char> {
        if let Some(c) = self.names.get(name) {
            return Some(*c);
        }
        // Single-letter names are their own character.
        if let [letter] = name.as_bytes() {
            if letter.is_ascii_alphabetic() {
                return Some(*letter as char);
            }
        }
        if let Some(hex) = name.strip_prefix("uni") {
            if hex.len() >= 4 {
                return u32::from_str_radix(&hex[..4], 16).ok().and_then(char::from_u32);
            }
        }
        if let Some(hex) = name.strip_prefix('u') {
            if (4..=6).contains(&hex.len()) {
                if let Some(c) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                    return Some(c);
                }
            }
        }
        // Variants like "a.sc" or "one.oldstyle" share the base glyph.
        if let Some((base, _)) = name.split_once('.') {
            if !base.is_empty() {
                return self.resolve(base);
            }
        }
        let mut chars = name.chars();
        let first = chars.next()?;
        if first.is_ascii_uppercase() && name.len() > 1 {
            let lower = format!("{}{}", first.to_ascii_lowercase(), chars.as_str());
            let c = self.names.get(lower.as_str())?;
            return c.to_uppercase().next();
        }
        None
    }

    /// Number of known names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for GlyphNames {
    fn default() -> Self {
        Self::new()
    }
}
