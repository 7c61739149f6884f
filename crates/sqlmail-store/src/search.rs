//! Search criteria and candidate matching
//!
//! Criteria are conjunctive: a message matches only if every
//! configured component matches. Range components follow the same
//! open-endpoint conventions as [`crate::sequence::SeqRange`].

use crate::codec::LazyEntity;
use crate::sequence::SeqRange;
use chrono::{DateTime, Utc};

/// Conjunctive search criteria over a mailbox's messages.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    /// Case-insensitive substring over the whole message (headers and
    /// body).
    pub text: Option<String>,
    /// Case-insensitive substring over the decoded body only.
    pub body: Option<String>,
    /// Flags the message must carry.
    pub with_flags: Vec<String>,
    /// Flags the message must not carry.
    pub without_flags: Vec<String>,
    /// UID ranges; empty means unconstrained.
    pub uid: Vec<SeqRange>,
    /// Sequence-number ranges; empty means unconstrained.
    pub seq: Vec<SeqRange>,
    /// Internal date on or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Internal date strictly before this instant.
    pub before: Option<DateTime<Utc>>,
}

impl SearchCriteria {
    pub(crate) fn matches_ids(&self, seqnum: u32, uid: u32) -> bool {
        let seq_ok = self.seq.is_empty() || self.seq.iter().any(|r| r.contains(seqnum));
        let uid_ok = self.uid.is_empty() || self.uid.iter().any(|r| r.contains(uid));
        seq_ok && uid_ok
    }

    pub(crate) fn matches_flags(&self, flags: &[String]) -> bool {
        self.with_flags.iter().all(|f| flags.iter().any(|g| g == f))
            && self.without_flags.iter().all(|f| !flags.iter().any(|g| g == f))
    }

    pub(crate) fn matches_date(&self, date: DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if date < since {
                return false;
            }
        }
        if let Some(before) = self.before {
            if date >= before {
                return false;
            }
        }
        true
    }

    /// Content predicates against the (lazily parsed) entity. A parse
    /// failure degrades to a raw byte scan instead of failing the
    /// message.
    pub(crate) fn matches_content(
        &self,
        entity: &mut LazyEntity<'_>,
        raw: &[u8],
        body: &[u8],
    ) -> bool {
        if let Some(needle) = &self.text {
            let haystack = String::from_utf8_lossy(raw);
            if !contains_ci(&haystack, needle) {
                return false;
            }
        }
        if let Some(needle) = &self.body {
            let decoded = entity
                .get()
                .and_then(|m| m.body_text(0))
                .map(|t| t.into_owned());
            let haystack =
                decoded.unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
            if !contains_ci(&haystack, needle) {
                return false;
            }
        }
        true
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
