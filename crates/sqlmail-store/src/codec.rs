//! Message literal splitting and lazy MIME parsing
//!
//! A stored message is split once at append time into header and body
//! at the first blank-line boundary; the two halves concatenate back
//! to the original literal byte for byte. At fetch/search time the
//! full entity is parsed lazily, at most once per row, no matter how
//! many projections need it.

use mail_parser::{Message, MessageParser};

/// Split a raw message literal into (header, body) at the first blank
/// line. CRLF-CRLF is preferred; LF-LF is accepted as a fallback. If
/// neither occurs the whole input is the body and the header is empty.
///
/// The header keeps its terminating blank line, so
/// `[header, body].concat() == raw` always holds.
pub fn split(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(pos) = find(raw, b"\r\n\r\n") {
        return raw.split_at(pos + 4);
    }
    if let Some(pos) = find(raw, b"\n\n") {
        return raw.split_at(pos + 2);
    }
    (&[], raw)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// A message entity parsed on demand and cached for the lifetime of a
/// fetched row.
pub struct LazyEntity<'a> {
    raw: &'a [u8],
    parsed: Option<Option<Message<'a>>>,
}

impl<'a> LazyEntity<'a> {
    pub fn new(raw: &'a [u8]) -> Self {
        Self { raw, parsed: None }
    }

    /// Parse the entity if this is the first request for it. Returns
    /// `None` when the content is not parseable; callers degrade the
    /// affected projection rather than failing the row.
    pub fn get(&mut self) -> Option<&Message<'a>> {
        if self.parsed.is_none() {
            self.parsed = Some(MessageParser::default().parse(self.raw));
        }
        match &self.parsed {
            Some(entity) => entity.as_ref(),
            None => None,
        }
    }
}
