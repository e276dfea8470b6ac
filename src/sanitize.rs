//! Text sanitization for XML output.
//!
//! XLSX worksheet parts are XML 1.0 documents, so cell text must not carry
//! code points outside the XML 1.0 character set. Entity escaping itself is
//! delegated to `quick_xml::escape`; this module only removes characters no
//! escape can represent.

use std::borrow::Cow;

/// Whether a code point belongs to the XML 1.0 legal character set.
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Remove code points outside the XML 1.0 legal set.
///
/// Returns the input unchanged (borrowed) when it is already clean.
pub fn clean_text(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.chars().filter(|c| is_xml_char(*c)).collect())
}

/// Decode bytes as UTF-8, dropping invalid sequences.
///
/// Valid input is returned borrowed; invalid sequences are removed rather
/// than replaced, so the result contains only bytes present in the input.
pub fn decode_lossy(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            let mut out = String::with_capacity(bytes.len());
            for chunk in bytes.utf8_chunks() {
                out.push_str(chunk.valid());
            }
            Cow::Owned(out)
        }
    }
}
