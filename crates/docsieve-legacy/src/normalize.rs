//! Word control characters to plain text.

const CELL_MARK: char = '\u{07}';
const FIELD_BEGIN: char = '\u{13}';
const FIELD_SEPARATOR: char = '\u{14}';
const FIELD_END: char = '\u{15}';
const NON_BREAKING_HYPHEN: char = '\u{1E}';
const OPTIONAL_HYPHEN: char = '\u{1F}';

/// Map paragraph, cell and field markers to plain text and trim the result.
///
/// Field instructions (between begin and separator) are dropped; field
/// results are kept. Fields may nest.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    // One entry per open field: true while still inside its instructions.
    let mut fields: Vec<bool> = Vec::new();

    for c in raw.chars() {
        match c {
            FIELD_BEGIN => {
                fields.push(true);
                continue;
            }
            FIELD_SEPARATOR => {
                if let Some(top) = fields.last_mut() {
                    *top = false;
                }
                continue;
            }
            FIELD_END => {
                fields.pop();
                continue;
            }
            _ => {}
        }
        if fields.iter().any(|in_instructions| *in_instructions) {
            continue;
        }

        match c {
            '\r' | '\u{0B}' | '\u{0C}' => out.push('\n'),
            CELL_MARK => out.push('\t'),
            NON_BREAKING_HYPHEN => out.push('-'),
            '\u{01}' | '\u{08}' | OPTIONAL_HYPHEN => {}
            c => out.push(c),
        }
    }

    out.trim().to_string()
}
