//! Line-level CSV tokenizing for the published-sheet exports.
//!
//! The sheets are human-maintained exports, not RFC 4180 documents: quote
//! characters only toggle whether a comma is a separator and are never
//! retained in field text, and a doubled quote inside a quoted field is NOT
//! un-escaped to a literal quote. Two variants exist because callers depend
//! on differing whitespace behavior: the strict variant keeps fields
//! verbatim, the trimming variant trims each field as it is flushed.

/// Split one CSV record into fields, honoring double-quote toggling.
///
/// A comma is a separator only outside quotes. Quote characters are consumed
/// as mode toggles. An unterminated quote swallows the remainder of the line
/// rather than raising an error. The trailing buffer is always flushed, so an
/// empty line yields one empty field and a trailing comma yields a trailing
/// empty field.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }

    fields.push(current);
    fields
}

/// Trimming variant of [`parse_line`]. Same tokenization, but each field is
/// whitespace-trimmed as it is appended. Kept separate from the strict
/// variant: the record mapper wants trimmed key columns while raw views want
/// the sheet text untouched.
pub fn parse_line_trimmed(line: &str) -> Vec<String> {
    parse_line(line)
        .into_iter()
        .map(|field| field.trim().to_string())
        .collect()
}

/// Split a CSV body into non-blank lines, ready for [`parse_line`].
///
/// Handles both `\n` and `\r\n` exports; lines that are empty after trimming
/// are dropped here so the mapper never sees them.
pub fn split_lines(body: &str) -> Vec<&str> {
    body.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .collect()
}
