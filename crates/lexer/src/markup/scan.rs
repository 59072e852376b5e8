//! Byte-level scanning helpers for the markup grammar.
//!
//! The grammar only cuts at ASCII structural bytes (`<`, `>`, quotes,
//! whitespace, name characters). ASCII bytes never occur inside a multi-byte
//! UTF-8 sequence, so every cut is a character boundary.

use memchr::{memchr, memmem};

use super::MarkupDialect;

pub(crate) const COMMENT_START: &[u8] = b"<!--";
pub(crate) const COMMENT_END: &[u8] = b"-->";

/// Tag and attribute name characters: ASCII `[A-Za-z0-9:_-]`.
pub(crate) fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

pub(crate) fn name_len(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| is_name_byte(**b)).count()
}

pub(crate) fn whitespace_len(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_whitespace()).count()
}

/// Length of the UTF-8 sequence that starts with `lead`.
pub(crate) fn char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

/// Length of a comment starting at `bytes[0]`; unterminated comments run to
/// the end of `bytes`.
pub(crate) fn comment_len(bytes: &[u8]) -> usize {
    debug_assert!(bytes.starts_with(COMMENT_START));
    let body = &bytes[COMMENT_START.len()..];
    memmem::find(body, COMMENT_END)
        .map_or(bytes.len(), |at| COMMENT_START.len() + at + COMMENT_END.len())
}

/// Offset of the first `</name` in `haystack` that is not followed by
/// another name character.
///
/// Matching only starts at ASCII `<`, so the result is a character boundary.
pub(crate) fn find_close_tag(haystack: &str, name: &str, dialect: MarkupDialect) -> Option<usize> {
    let hay = haystack.as_bytes();
    let name = name.as_bytes();
    let needed = name.len() + 2;
    let mut i = 0;
    while i + needed <= hay.len() {
        let rel = memchr(b'<', &hay[i..])?;
        i += rel;
        if i + needed > hay.len() {
            return None;
        }
        if hay[i + 1] == b'/'
            && dialect.bytes_match(&hay[i + 2..i + needed], name)
            && hay.get(i + needed).is_none_or(|b| !is_name_byte(*b))
        {
            return Some(i);
        }
        i += 1;
    }
    None
}
